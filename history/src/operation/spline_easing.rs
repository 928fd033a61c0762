use strata_core::{CoreObject, SplineEasing, SplineField};

use super::ChangeOperation;
use crate::context::OperationExecutionContext;
use crate::error::{HistoryError, OperationResult};
use crate::path;

/// Writes one control point of a spline easing. The last path segment names
/// the field (`X1`, `Y1`, `X2` or `Y2`).
#[derive(Debug)]
pub struct UpdateSplineEasingOperation {
    sequence_number: u64,
    easing: SplineEasing,
    property_path: String,
    new_value: f32,
    old_value: f32,
    parent: Option<CoreObject>,
}

impl UpdateSplineEasingOperation {
    pub fn new(
        easing: SplineEasing,
        property_path: impl Into<String>,
        new_value: f32,
        old_value: f32,
        sequence_number: u64,
    ) -> Self {
        Self {
            sequence_number,
            easing,
            property_path: property_path.into(),
            new_value,
            old_value,
            parent: None,
        }
    }

    /// Records the object holding the easing (typically a key frame).
    #[must_use]
    pub fn with_parent(mut self, parent: Option<CoreObject>) -> Self {
        self.parent = parent;
        self
    }

    pub fn easing(&self) -> &SplineEasing {
        &self.easing
    }

    pub fn parent(&self) -> Option<&CoreObject> {
        self.parent.as_ref()
    }

    pub fn new_value(&self) -> f32 {
        self.new_value
    }

    pub fn old_value(&self) -> f32 {
        self.old_value
    }

    fn write(&self, value: f32) -> OperationResult {
        let name = path::last_segment(&self.property_path);
        let field = SplineField::from_name(name).ok_or_else(|| {
            HistoryError::invalid_operation(
                &self.property_path,
                format!("`{name}` is not a spline control point"),
            )
        })?;
        self.easing.set(field, value);
        Ok(())
    }
}

impl ChangeOperation for UpdateSplineEasingOperation {
    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn apply(&mut self, _ctx: &OperationExecutionContext) -> OperationResult {
        self.write(self.new_value)
    }

    fn revert(&mut self, _ctx: &OperationExecutionContext) -> OperationResult {
        self.write(self.old_value)
    }

    fn description(&self) -> &str {
        &self.property_path
    }

    fn property_path(&self) -> Option<&str> {
        Some(&self.property_path)
    }

    fn try_merge(&mut self, other: Box<dyn ChangeOperation>) -> Option<Box<dyn ChangeOperation>> {
        if let Some(other) = other.downcast_ref::<Self>()
            && other.easing.ptr_eq(&self.easing)
            && other.property_path == self.property_path
        {
            self.new_value = other.new_value;
            return None;
        }
        Some(other)
    }
}

#[cfg(test)]
mod tests {
    use strata_core::{Easing, KeyFrame};

    use super::*;

    fn ctx() -> OperationExecutionContext {
        OperationExecutionContext::new(KeyFrame::new(0.0, 0.0, Easing::Linear).into_object())
    }

    #[test]
    fn apply_and_revert_field() {
        let spline = SplineEasing::new(0.0, 0.0, 1.0, 1.0);
        let mut op = UpdateSplineEasingOperation::new(spline.clone(), "Easing.X1", 0.4, 0.0, 1);
        op.apply(&ctx()).unwrap();
        assert_eq!(spline.x1(), 0.4);
        op.revert(&ctx()).unwrap();
        assert_eq!(spline.x1(), 0.0);
    }

    #[test]
    fn unknown_field_is_invalid() {
        let spline = SplineEasing::new(0.0, 0.0, 1.0, 1.0);
        let mut op = UpdateSplineEasingOperation::new(spline, "Easing.X3", 0.4, 0.0, 1);
        assert!(matches!(
            op.apply(&ctx()),
            Err(HistoryError::InvalidOperation { ref path, .. }) if path == "Easing.X3"
        ));
    }

    #[test]
    fn merge_requires_same_easing_and_field() {
        let spline = SplineEasing::new(0.0, 0.0, 1.0, 1.0);
        let mut op = UpdateSplineEasingOperation::new(spline.clone(), "Y2", 0.8, 1.0, 1);

        let same = UpdateSplineEasingOperation::new(spline.clone(), "Y2", 0.6, 0.8, 2);
        assert!(op.try_merge(Box::new(same)).is_none());
        assert_eq!((op.old_value(), op.new_value()), (1.0, 0.6));

        let other_field = UpdateSplineEasingOperation::new(spline, "X2", 0.5, 1.0, 3);
        assert!(op.try_merge(Box::new(other_field)).is_some());

        let other_spline =
            UpdateSplineEasingOperation::new(SplineEasing::new(0.0, 0.0, 1.0, 1.0), "Y2", 0.1, 1.0, 4);
        assert!(op.try_merge(Box::new(other_spline)).is_some());
    }

    #[test]
    fn keeps_parent() {
        let key_frame = KeyFrame::new(1.0, 2.0, Easing::Linear);
        let op = UpdateSplineEasingOperation::new(SplineEasing::new(0.0, 0.0, 1.0, 1.0), "X1", 0.1, 0.0, 1)
            .with_parent(Some(key_frame.as_object().clone()));
        assert_eq!(op.parent(), Some(key_frame.as_object()));
    }
}
