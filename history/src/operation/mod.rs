//! Invertible, path-addressed change operations.
//!
//! - [`ChangeOperation`] — one recorded change with `apply` / `revert`
//! - [`UpdatePropertyValueOperation`] — plain, engine, animation and
//!   expression slot writes
//! - [`UpdateNodeItemOperation`] — node port value and animation writes
//! - [`UpdateSplineEasingOperation`] — spline control point writes
//! - collection insert / remove / move, in item and range forms
//! - [`CustomOperation`] — closure-backed and state-capturing operations
//!
//! Operations keep the object they were recorded against but re-resolve it
//! through the [`OperationExecutionContext`] on every replay.

mod collection;
mod custom;
mod node_item;
mod property;
mod spline_easing;

use std::any::Any;
use std::fmt;

use strata_core::{CoreList, CoreObject, Value};

use crate::context::OperationExecutionContext;
use crate::error::{HistoryError, OperationResult};
use crate::path::{self, NODE_PROPERTY};

pub use collection::{
    InsertCollectionItemOperation, InsertCollectionRangeOperation, MoveCollectionItemOperation,
    MoveCollectionRangeOperation, RemoveCollectionItemOperation, RemoveCollectionRangeOperation,
};
pub use custom::{CustomOperation, StateCapturingOperationBuilder};
pub use node_item::UpdateNodeItemOperation;
pub use property::UpdatePropertyValueOperation;
pub use spline_easing::UpdateSplineEasingOperation;

/// Helper trait for downcasting trait objects to concrete types.
///
/// Automatically implemented for all `'static` types. Used through
/// `<dyn ChangeOperation>::downcast_ref` when merging.
pub trait AsAny: 'static {
    /// Returns a reference to `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A recorded, invertible change (Command pattern).
///
/// `apply` moves the target from the state before the change to the state
/// after it, `revert` moves it back. Each is the exact inverse of the other
/// as long as it is replayed against the graph that produced it.
///
/// # Merging
///
/// Incremental changes (every step of a drag) coalesce through
/// [`try_merge`](Self::try_merge): the recorder offers each new operation
/// to the last one in the open transaction, which absorbs it by taking over
/// its new value while keeping its own old value.
///
/// # Example
///
/// ```ignore
/// let mut op = UpdatePropertyValueOperation::new(
///     shape.clone(), "Opacity", Value::Float(0.5), Value::Float(1.0), seq.next(),
/// );
/// op.apply(&ctx)?;  // Opacity == 0.5
/// op.revert(&ctx)?; // Opacity == 1.0
/// ```
pub trait ChangeOperation: fmt::Debug + AsAny {
    /// Position of this operation in the process-wide order.
    fn sequence_number(&self) -> u64;

    /// Applies the change (forward / redo direction).
    fn apply(&mut self, ctx: &OperationExecutionContext) -> OperationResult;

    /// Reverses the change (undo direction).
    fn revert(&mut self, ctx: &OperationExecutionContext) -> OperationResult;

    /// A short, human-readable description.
    fn description(&self) -> &str;

    /// Dotted path of the slot this operation targets, if it has one.
    fn property_path(&self) -> Option<&str> {
        None
    }

    /// Tries to merge `other` into `self`, taking ownership.
    ///
    /// Returns `None` if `other` was absorbed, or `Some(other)` back to the
    /// caller if the two cannot be merged. Does not merge by default.
    fn try_merge(&mut self, other: Box<dyn ChangeOperation>) -> Option<Box<dyn ChangeOperation>> {
        Some(other)
    }
}

impl dyn ChangeOperation {
    /// Downcasts to a concrete operation type.
    pub fn downcast_ref<T: ChangeOperation>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns `true` if this operation is of type `T`.
    pub fn is<T: ChangeOperation>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Resolves the list addressed by the last segment of `path` on `owner`.
///
/// A node item's `Property` segment selects its port value; otherwise the
/// segment names a core or engine property whose current value must be a
/// list.
pub(crate) fn resolve_list(owner: &CoreObject, property_path: &str) -> OperationResult<CoreList> {
    let name = path::last_segment(property_path);
    let value = match owner.node_port() {
        Some(port) if name == NODE_PROPERTY => port.value(),
        _ if owner.has_property(name) => owner.get(name)?,
        _ => {
            return Err(HistoryError::invalid_operation(
                property_path,
                format!("{} has no property `{name}`", owner.type_name()),
            ));
        }
    };
    match value {
        Value::List(list) => Ok(list),
        other => Err(HistoryError::invalid_operation(
            property_path,
            format!("expected a collection, found {other:?}"),
        )),
    }
}


#[cfg(test)]
mod tests {
    use strata_core::{CoreObject, NodeItem, NodePort};

    use super::fixtures::SHAPE;
    use super::*;

    #[derive(Debug)]
    struct Noop(u64);

    impl ChangeOperation for Noop {
        fn sequence_number(&self) -> u64 {
            self.0
        }

        fn apply(&mut self, _ctx: &OperationExecutionContext) -> OperationResult {
            Ok(())
        }

        fn revert(&mut self, _ctx: &OperationExecutionContext) -> OperationResult {
            Ok(())
        }

        fn description(&self) -> &str {
            "Noop"
        }
    }

    #[test]
    fn default_merge_returns_other() {
        let mut a = Noop(1);
        let returned = a.try_merge(Box::new(Noop(2)));
        assert_eq!(returned.map(|op| op.sequence_number()), Some(2));
        assert_eq!(a.property_path(), None);
    }

    #[test]
    fn downcast_through_box() {
        let boxed: Box<dyn ChangeOperation> = Box::new(Noop(3));
        assert!(boxed.is::<Noop>());
        assert_eq!(boxed.downcast_ref::<Noop>().map(|n| n.0), Some(3));
        assert!(boxed.downcast_ref::<UpdatePropertyValueOperation>().is_none());
    }

    #[test]
    fn resolve_list_targets() {
        let shape = CoreObject::new(&SHAPE);
        assert!(resolve_list(&shape, "Items").is_ok());
        assert!(resolve_list(&shape, "Root.Points").is_ok());
        assert!(matches!(
            resolve_list(&shape, "Name"),
            Err(HistoryError::InvalidOperation { path, .. }) if path == "Name"
        ));
        assert!(resolve_list(&shape, "Missing").is_err());

        let list = CoreList::new();
        let item = NodeItem::new(Some(NodePort::new("Values", list.clone())));
        let resolved = resolve_list(item.as_object(), "Property").unwrap();
        assert!(resolved.ptr_eq(&list));
    }
}
