use strata_core::{KeyFrameAnimation, NodeItem, Value};

use super::ChangeOperation;
use crate::context::OperationExecutionContext;
use crate::error::{HistoryError, OperationResult};
use crate::path::{self, ANIMATION};

/// Writes a node item's port value, or its animation when the path ends in
/// `Animation`.
#[derive(Debug)]
pub struct UpdateNodeItemOperation {
    sequence_number: u64,
    node_item: NodeItem,
    property_path: String,
    new_value: Value,
    old_value: Value,
}

impl UpdateNodeItemOperation {
    pub fn new(
        node_item: NodeItem,
        property_path: impl Into<String>,
        new_value: Value,
        old_value: Value,
        sequence_number: u64,
    ) -> Self {
        Self {
            sequence_number,
            node_item,
            property_path: property_path.into(),
            new_value,
            old_value,
        }
    }

    pub fn node_item(&self) -> &NodeItem {
        &self.node_item
    }

    pub fn new_value(&self) -> &Value {
        &self.new_value
    }

    pub fn old_value(&self) -> &Value {
        &self.old_value
    }

    fn write(&self, ctx: &OperationExecutionContext, value: &Value) -> OperationResult {
        let item = ctx.resolve(self.node_item.as_object());
        let port = item.node_port().ok_or_else(|| {
            HistoryError::invalid_operation(&self.property_path, "node item has no port")
        })?;

        if path::last_segment(&self.property_path) == ANIMATION {
            let animation = match value {
                Value::Null => None,
                Value::Object(object) => KeyFrameAnimation::from_object(object.clone()),
                _ => None,
            };
            if animation.is_none() && !value.is_null() {
                return Err(HistoryError::invalid_operation(
                    &self.property_path,
                    format!("{value:?} is not an animation"),
                ));
            }
            if !port.set_animation(animation) {
                return Err(HistoryError::invalid_operation(
                    &self.property_path,
                    format!("port `{}` is not animatable", port.name()),
                ));
            }
        } else {
            port.set_value(value.clone());
        }
        Ok(())
    }
}

impl ChangeOperation for UpdateNodeItemOperation {
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
            && other.node_item == self.node_item
            && other.property_path == self.property_path
        {
            self.new_value = other.new_value.clone();
            return None;
        }
        Some(other)
    }
}
