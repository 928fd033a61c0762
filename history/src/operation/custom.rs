use std::fmt;
use std::rc::Rc;

use super::ChangeOperation;
use crate::context::OperationExecutionContext;
use crate::error::OperationResult;

/// An operation backed by caller-supplied closures.
///
/// Either built from an explicit `do` / `undo` pair with
/// [`create`](Self::create), or from a state snapshot taken before and after
/// a mutation with [`capture_state`](Self::capture_state):
///
/// ```ignore
/// let builder = CustomOperation::capture_state(
///     move || doc.borrow().selection.clone(),
///     move |sel| doc.borrow_mut().selection = sel,
///     seq.next(),
///     "Select all",
/// );
/// doc.borrow_mut().select_all();
/// history.record(Box::new(builder.complete()))?;
/// ```
pub struct CustomOperation {
    sequence_number: u64,
    description: String,
    apply: Box<dyn FnMut()>,
    revert: Box<dyn FnMut()>,
}

impl CustomOperation {
    pub fn create(
        apply: impl FnMut() + 'static,
        revert: impl FnMut() + 'static,
        sequence_number: u64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            sequence_number,
            description: description.into(),
            apply: Box::new(apply),
            revert: Box::new(revert),
        }
    }

    /// Snapshots the current state with `capture`. The returned builder
    /// takes the second snapshot when completed.
    pub fn capture_state<T: Clone + 'static>(
        capture: impl Fn() -> T + 'static,
        apply_state: impl Fn(T) + 'static,
        sequence_number: u64,
        description: impl Into<String>,
    ) -> StateCapturingOperationBuilder<T> {
        StateCapturingOperationBuilder {
            before: capture(),
            capture: Box::new(capture),
            apply_state: Rc::new(apply_state),
            sequence_number,
            description: description.into(),
        }
    }
}

impl ChangeOperation for CustomOperation {
    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn apply(&mut self, _ctx: &OperationExecutionContext) -> OperationResult {
        (self.apply)();
        Ok(())
    }

    fn revert(&mut self, _ctx: &OperationExecutionContext) -> OperationResult {
        (self.revert)();
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for CustomOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomOperation")
            .field("sequence_number", &self.sequence_number)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Holds the "before" snapshot of a state-capturing operation.
pub struct StateCapturingOperationBuilder<T> {
    before: T,
    capture: Box<dyn Fn() -> T>,
    apply_state: Rc<dyn Fn(T)>,
    sequence_number: u64,
    description: String,
}

impl<T: Clone + 'static> StateCapturingOperationBuilder<T> {
    /// The state captured when the builder was created.
    pub fn before(&self) -> &T {
        &self.before
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Captures the current state and builds an operation that swaps
    /// between the two snapshots.
    pub fn complete(self) -> CustomOperation {
        let after = (self.capture)();
        let before = self.before;
        let forward = Rc::clone(&self.apply_state);
        let backward = self.apply_state;
        CustomOperation::create(
            move || forward(after.clone()),
            move || backward(before.clone()),
            self.sequence_number,
            self.description,
        )
    }
}

impl<T> fmt::Debug for StateCapturingOperationBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCapturingOperationBuilder")
            .field("sequence_number", &self.sequence_number)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use strata_core::CoreObject;

    use super::*;
    use crate::operation::fixtures::SHAPE;

    fn ctx() -> OperationExecutionContext {
        OperationExecutionContext::new(CoreObject::new(&SHAPE))
    }

    #[test]
    fn create_runs_closures() {
        let counter = Rc::new(Cell::new(0));
        let (up, down) = (Rc::clone(&counter), Rc::clone(&counter));
        let mut op = CustomOperation::create(
            move || up.set(up.get() + 1),
            move || down.set(down.get() - 1),
            7,
            "Bump",
        );

        op.apply(&ctx()).unwrap();
        op.apply(&ctx()).unwrap();
        assert_eq!(counter.get(), 2);
        op.revert(&ctx()).unwrap();
        assert_eq!(counter.get(), 1);
        assert_eq!(op.description(), "Bump");
        assert_eq!(op.sequence_number(), 7);
        assert_eq!(op.property_path(), None);
    }

    #[test]
    fn capture_state_swaps_snapshots() {
        let state = Rc::new(RefCell::new(vec![1, 2]));
        let (read, write) = (Rc::clone(&state), Rc::clone(&state));
        let builder = CustomOperation::capture_state(
            move || read.borrow().clone(),
            move |v| *write.borrow_mut() = v,
            1,
            "Append",
        );
        assert_eq!(builder.before(), &vec![1, 2]);

        state.borrow_mut().push(3);
        let mut op = builder.complete();

        op.revert(&ctx()).unwrap();
        assert_eq!(*state.borrow(), vec![1, 2]);
        op.apply(&ctx()).unwrap();
        assert_eq!(*state.borrow(), vec![1, 2, 3]);
    }
}
