use strata_core::{CoreObject, KeyFrameAnimation, Value};

use super::ChangeOperation;
use crate::context::OperationExecutionContext;
use crate::error::{HistoryError, OperationResult};
use crate::path::{self, AuxSlot};

/// Writes a property of an object.
///
/// The last path segment names the property. If the path ends in
/// `.Animation` or `.Expression` and the preceding segment names an engine
/// property of the owner, the write goes to that auxiliary slot instead.
/// Writing an auxiliary slot of a non-animatable property fails.
#[derive(Debug)]
pub struct UpdatePropertyValueOperation {
    sequence_number: u64,
    owner: CoreObject,
    property_path: String,
    new_value: Value,
    old_value: Value,
}

impl UpdatePropertyValueOperation {
    pub fn new(
        owner: CoreObject,
        property_path: impl Into<String>,
        new_value: Value,
        old_value: Value,
        sequence_number: u64,
    ) -> Self {
        Self {
            sequence_number,
            owner,
            property_path: property_path.into(),
            new_value,
            old_value,
        }
    }

    pub fn owner(&self) -> &CoreObject {
        &self.owner
    }

    pub fn new_value(&self) -> &Value {
        &self.new_value
    }

    pub fn old_value(&self) -> &Value {
        &self.old_value
    }

    fn write(&self, ctx: &OperationExecutionContext, value: &Value) -> OperationResult {
        let owner = ctx.resolve(&self.owner);
        let (name, aux) = path::split_slot(&self.property_path);
        if let Some(aux) = aux
            && let Some(property) = owner.engine_property(name)
        {
            match aux {
                AuxSlot::Animation => {
                    let animation = match value {
                        Value::Null => None,
                        Value::Object(object) => Some(
                            KeyFrameAnimation::from_object(object.clone()).ok_or_else(|| {
                                HistoryError::invalid_operation(
                                    &self.property_path,
                                    format!("{object:?} is not an animation"),
                                )
                            })?,
                        ),
                        other => {
                            return Err(HistoryError::invalid_operation(
                                &self.property_path,
                                format!("{other:?} is not an animation"),
                            ));
                        }
                    };
                    if !property.set_animation(animation) {
                        return Err(HistoryError::invalid_operation(
                            &self.property_path,
                            format!("`{name}` is not animatable"),
                        ));
                    }
                }
                AuxSlot::Expression => {
                    let expression = match value {
                        Value::Null => None,
                        Value::Expression(expression) => Some(expression.clone()),
                        other => {
                            return Err(HistoryError::invalid_operation(
                                &self.property_path,
                                format!("{other:?} is not an expression"),
                            ));
                        }
                    };
                    if !property.set_expression(expression) {
                        return Err(HistoryError::invalid_operation(
                            &self.property_path,
                            format!("`{name}` is not animatable"),
                        ));
                    }
                }
            }
            return Ok(());
        }

        let name = path::last_segment(&self.property_path);
        if !owner.has_property(name) {
            return Err(HistoryError::invalid_operation(
                &self.property_path,
                format!("{} has no property `{name}`", owner.type_name()),
            ));
        }
        owner.set(name, value.clone())?;
        Ok(())
    }
}

impl ChangeOperation for UpdatePropertyValueOperation {
    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn apply(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        self.write(ctx, &self.new_value)
    }

    fn revert(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        self.write(ctx, &self.old_value)
    }

    fn description(&self) -> &str {
        &self.property_path
    }

    fn property_path(&self) -> Option<&str> {
        Some(&self.property_path)
    }

    fn try_merge(&mut self, other: Box<dyn ChangeOperation>) -> Option<Box<dyn ChangeOperation>> {
        if let Some(other) = other.downcast_ref::<Self>()
            && other.owner.ptr_eq(&self.owner)
            && other.property_path == self.property_path
        {
            self.new_value = other.new_value.clone();
            return None;
        }
        Some(other)
    }
}
