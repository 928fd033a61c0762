use std::fmt;

use crate::context::OperationExecutionContext;
use crate::error::OperationResult;
use crate::operation::ChangeOperation;

/// An ordered group of operations undone and redone as one step.
#[derive(Default)]
pub struct Transaction {
    name: String,
    operations: Vec<Box<dyn ChangeOperation>>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = &dyn ChangeOperation> {
        self.operations.iter().map(|op| op.as_ref())
    }

    /// Appends `operation`, or merges it into the last recorded operation.
    ///
    /// Returns `true` if the operation was merged.
    pub(crate) fn record(&mut self, operation: Box<dyn ChangeOperation>) -> bool {
        let operation = match self.operations.last_mut() {
            Some(last) => match last.try_merge(operation) {
                None => return true,
                Some(returned) => returned,
            },
            None => operation,
        };
        self.operations.push(operation);
        false
    }

    /// Applies every operation in recorded order.
    pub(crate) fn apply_all(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        for operation in &mut self.operations {
            operation.apply(ctx)?;
        }
        Ok(())
    }

    /// Reverts every operation in reverse recorded order.
    pub(crate) fn revert_all(&mut self, ctx: &OperationExecutionContext) -> OperationResult {
        for operation in self.operations.iter_mut().rev() {
            operation.revert(ctx)?;
        }
        Ok(())
    }

    pub fn info(&self) -> TransactionInfo {
        TransactionInfo {
            name: self.name.clone(),
            operation_count: self.operations.len(),
            first_sequence: self.operations.first().map(|op| op.sequence_number()),
            last_sequence: self.operations.last().map(|op| op.sequence_number()),
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("name", &self.name)
            .field("operations", &self.operations.len())
            .finish()
    }
}

/// Metadata describing a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub name: String,
    pub operation_count: usize,
    /// Sequence number of the first recorded operation.
    pub first_sequence: Option<u64>,
    /// Sequence number of the last recorded operation.
    pub last_sequence: Option<u64>,
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use strata_core::{CoreObject, Value};

    use super::*;
    use crate::operation::fixtures::SHAPE;
    use crate::operation::{CustomOperation, UpdatePropertyValueOperation};

    fn update(
        shape: &CoreObject,
        path: &str,
        new: i64,
        old: i64,
        seq: u64,
    ) -> Box<dyn ChangeOperation> {
        Box::new(UpdatePropertyValueOperation::new(
            shape.clone(),
            path,
            Value::Int(new),
            Value::Int(old),
            seq,
        ))
    }

    #[test]
    fn same_target_updates_merge() {
        let shape = CoreObject::new(&SHAPE);
        let mut transaction = Transaction::new();

        assert!(!transaction.record(update(&shape, "Value", 10, 0, 1)));
        assert!(transaction.record(update(&shape, "Value", 20, 10, 2)));
        assert!(transaction.record(update(&shape, "Value", 30, 20, 3)));

        assert_eq!(transaction.len(), 1);
        let op = transaction
            .operations()
            .next()
            .and_then(|op| op.downcast_ref::<UpdatePropertyValueOperation>())
            .unwrap();
        assert_eq!(op.old_value(), &Value::Int(0));
        assert_eq!(op.new_value(), &Value::Int(30));
    }

    #[test]
    fn merge_only_considers_last_operation() {
        let shape = CoreObject::new(&SHAPE);
        let mut transaction = Transaction::new();

        transaction.record(update(&shape, "Value", 1, 0, 1));
        transaction.record(update(&shape, "ZIndex", 1, 0, 2));
        transaction.record(update(&shape, "Value", 2, 1, 3));

        assert_eq!(transaction.len(), 3);
        let info = transaction.info();
        assert_eq!(info.first_sequence, Some(1));
        assert_eq!(info.last_sequence, Some(3));
    }

    #[test]
    fn replay_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut transaction = Transaction::new();
        for id in 1..=3 {
            let (on_apply, on_revert) = (Rc::clone(&log), Rc::clone(&log));
            transaction.record(Box::new(CustomOperation::create(
                move || on_apply.borrow_mut().push(id),
                move || on_revert.borrow_mut().push(-id),
                id as u64,
                "step",
            )));
        }
        let ctx = OperationExecutionContext::new(CoreObject::new(&SHAPE));

        transaction.revert_all(&ctx).unwrap();
        transaction.apply_all(&ctx).unwrap();

        assert_eq!(*log.borrow(), vec![-3, -2, -1, 1, 2, 3]);
    }
}
