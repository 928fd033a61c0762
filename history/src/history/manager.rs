use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use strata_core::{CoreObject, ListenerSet};

use super::config::HistoryConfig;
use super::scope::RecordingScope;
use super::transaction::{Transaction, TransactionInfo};
use crate::context::OperationExecutionContext;
use crate::error::{HistoryError, OperationResult};
use crate::observer::{OperationObserver, OperationSink};
use crate::operation::{ChangeOperation, CustomOperation};
use crate::sequence::OperationSequenceGenerator;
use crate::suppression::PublishingSuppression;

/// Snapshot of the undo/redo stacks, published after every commit, undo,
/// redo and clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_count: usize,
    pub redo_count: usize,
}

/// Records operations into transactions and manages undo/redo.
///
/// Operations arrive through [`record`](Self::record), usually from an
/// observer tree attached with [`subscribe`](Self::subscribe), and collect
/// in an open transaction. [`commit`](Self::commit) pushes the transaction
/// onto the bounded undo stack and clears the redo stack;
/// [`rollback`](Self::rollback) reverts and discards it.
///
/// Undo, redo and rollback replay operations inside a
/// [`PublishingSuppression`] scope, so observers do not record the replay.
///
/// # Example
///
/// ```ignore
/// let seq = OperationSequenceGenerator::new();
/// let history = HistoryManager::new(root.clone(), seq.clone());
/// let observer = CoreObjectObserver::new(None, root.clone(), seq, "", None);
/// history.subscribe(&observer);
///
/// root.set("Name", "renamed")?;
/// history.commit("Rename")?;
///
/// history.undo()?; // Name restored
/// history.redo()?; // Name == "renamed"
/// ```
pub struct HistoryManager {
    inner: Rc<ManagerInner>,
}

pub(crate) struct ManagerInner {
    root: CoreObject,
    sequence: OperationSequenceGenerator,
    context: OperationExecutionContext,
    config: HistoryConfig,
    stacks: RefCell<Stacks>,
    state_changed: ListenerSet<HistoryState>,
    disposed: Cell<bool>,
}

struct Stacks {
    current: Option<Transaction>,
    undo_stack: VecDeque<Transaction>,
    redo_stack: Vec<Transaction>,
    /// Tracks distance from the saved state.
    ///
    /// - `Some(0)` — the current state matches the last save.
    /// - `Some(n)` where `n > 0` — `n` undos needed to reach the saved state.
    /// - `Some(n)` where `n < 0` — `|n|` redos needed to reach the saved state.
    /// - `None` — the save point is permanently unreachable (dropped by the
    ///   depth bound, or the redo branch holding it was discarded).
    save_distance: Option<i64>,
}

impl Stacks {
    fn state(&self) -> HistoryState {
        HistoryState {
            can_undo: !self.undo_stack.is_empty(),
            can_redo: !self.redo_stack.is_empty(),
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
        }
    }

    fn push_undo(&mut self, transaction: Transaction, max_undo: usize) {
        self.undo_stack.push_back(transaction);
        if self.undo_stack.len() > max_undo {
            self.undo_stack.pop_front();
            // If the save point was beyond the oldest surviving entry, it's gone.
            if let Some(d) = self.save_distance
                && d > self.undo_stack.len() as i64
            {
                self.save_distance = None;
            }
        }
    }
}

impl HistoryManager {
    /// Creates a manager for the graph rooted at `root` with the default
    /// configuration.
    pub fn new(root: CoreObject, sequence: OperationSequenceGenerator) -> Self {
        Self::build(root, sequence, HistoryConfig::default())
    }

    /// Creates a manager with an explicit configuration.
    pub fn with_config(
        root: CoreObject,
        sequence: OperationSequenceGenerator,
        config: HistoryConfig,
    ) -> OperationResult<Self> {
        config.validate()?;
        Ok(Self::build(root, sequence, config))
    }

    fn build(root: CoreObject, sequence: OperationSequenceGenerator, config: HistoryConfig) -> Self {
        Self {
            inner: Rc::new(ManagerInner {
                context: OperationExecutionContext::new(root.clone()),
                root,
                sequence,
                config,
                stacks: RefCell::new(Stacks {
                    current: None,
                    undo_stack: VecDeque::new(),
                    redo_stack: Vec::new(),
                    save_distance: Some(0),
                }),
                state_changed: ListenerSet::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn root(&self) -> &CoreObject {
        &self.inner.root
    }

    /// The generator this manager draws sequence numbers from.
    pub fn sequence(&self) -> &OperationSequenceGenerator {
        &self.inner.sequence
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.inner.config
    }

    /// Makes this manager the downstream sink of `observer`.
    ///
    /// The observer does not keep the manager alive; operations published
    /// after the manager is dropped are discarded.
    pub fn subscribe(&self, observer: &dyn OperationObserver) {
        observer.subscribe(Rc::new(HistorySink(Rc::downgrade(&self.inner))));
    }

    /// Records an operation into the open transaction, opening one if
    /// needed. The operation is not applied.
    pub fn record(&self, operation: Box<dyn ChangeOperation>) -> OperationResult {
        self.inner.record(operation)
    }

    /// Records a closure pair as a [`CustomOperation`] without running
    /// either closure.
    pub fn record_action(
        &self,
        apply: impl FnMut() + 'static,
        revert: impl FnMut() + 'static,
        description: impl Into<String>,
    ) -> OperationResult {
        self.ensure_alive()?;
        let sequence_number = self.inner.sequence.next();
        let operation = CustomOperation::create(apply, revert, sequence_number, description);
        self.record(Box::new(operation))
    }

    /// Starts a scope that records the change of a piece of state.
    ///
    /// `capture` is called now and again when the scope completes; the
    /// recorded operation restores either snapshot through `apply`.
    pub fn begin_recording_scope<T: Clone + 'static>(
        &self,
        capture: impl Fn() -> T + 'static,
        apply: impl Fn(T) + 'static,
        description: impl Into<String>,
    ) -> OperationResult<RecordingScope<'_, T>> {
        self.ensure_alive()?;
        let builder = CustomOperation::capture_state(
            capture,
            apply,
            self.inner.sequence.next(),
            description,
        );
        Ok(RecordingScope::new(self, builder))
    }

    /// Freezes the open transaction under `name` and pushes it onto the undo
    /// stack.
    ///
    /// An empty or missing transaction is never pushed and leaves the redo
    /// stack untouched. State listeners are notified either way.
    pub fn commit(&self, name: impl Into<String>) -> OperationResult {
        self.ensure_alive()?;
        self.push_current(name.into());
        self.publish(self.state());
        Ok(())
    }

    /// Reverts the open transaction's operations newest first and discards
    /// it. The undo and redo stacks are untouched.
    pub fn rollback(&self) -> OperationResult {
        self.ensure_alive()?;
        let transaction = self.inner.stacks.borrow_mut().current.take();
        let Some(mut transaction) = transaction else {
            return Ok(());
        };
        log::debug!("rollback ({} operations)", transaction.len());
        let _guard = PublishingSuppression::enter();
        transaction.revert_all(&self.inner.context)
    }

    /// Reverts the most recent committed transaction.
    ///
    /// Pending operations are committed first. Returns `Ok(false)` if there
    /// is nothing to undo. If an operation fails, the transaction is dropped
    /// and the error returned.
    pub fn undo(&self) -> OperationResult<bool> {
        self.ensure_alive()?;
        self.commit_pending();
        let popped = self.inner.stacks.borrow_mut().undo_stack.pop_back();
        let Some(mut transaction) = popped else {
            return Ok(false);
        };
        log::debug!("undo `{}`", transaction.name());

        let result = {
            let _guard = PublishingSuppression::enter();
            transaction.revert_all(&self.inner.context)
        };
        let state = {
            let mut stacks = self.inner.stacks.borrow_mut();
            if result.is_ok() {
                stacks.redo_stack.push(transaction);
                if let Some(d) = &mut stacks.save_distance {
                    *d -= 1;
                }
            } else {
                stacks.save_distance = None;
            }
            stacks.state()
        };
        self.publish(state);
        result.map(|()| true)
    }

    /// Re-applies the most recently undone transaction.
    ///
    /// Pending operations are committed first, which discards the redo stack.
    /// Returns `Ok(false)` if there is nothing to redo.
    pub fn redo(&self) -> OperationResult<bool> {
        self.ensure_alive()?;
        let committed = self.commit_pending();
        let popped = self.inner.stacks.borrow_mut().redo_stack.pop();
        let Some(mut transaction) = popped else {
            if committed {
                self.publish(self.state());
            }
            return Ok(false);
        };
        log::debug!("redo `{}`", transaction.name());

        let result = {
            let _guard = PublishingSuppression::enter();
            transaction.apply_all(&self.inner.context)
        };
        let state = {
            let mut stacks = self.inner.stacks.borrow_mut();
            if result.is_ok() {
                if let Some(d) = &mut stacks.save_distance {
                    *d += 1;
                }
                stacks.push_undo(transaction, self.inner.config.max_undo);
            } else {
                stacks.save_distance = None;
            }
            stacks.state()
        };
        self.publish(state);
        result.map(|()| true)
    }

    /// Runs `action` and commits its operations under `name`, or rolls them
    /// back and returns the action's error.
    pub fn execute_in_transaction<R, E>(
        &self,
        action: impl FnOnce() -> Result<R, E>,
        name: impl Into<String>,
    ) -> Result<R, E>
    where
        E: From<HistoryError>,
    {
        self.ensure_alive()?;
        match action() {
            Ok(value) => {
                self.commit(name)?;
                Ok(value)
            }
            Err(err) => {
                self.rollback()?;
                Err(err)
            }
        }
    }

    /// Discards both stacks. The live graph and the open transaction are
    /// untouched.
    pub fn clear(&self) -> OperationResult {
        self.ensure_alive()?;
        let state = {
            let mut stacks = self.inner.stacks.borrow_mut();
            stacks.undo_stack.clear();
            stacks.redo_stack.clear();
            // If we were at the save point, clearing history doesn't change
            // the graph, so we're still at the saved state.
            if stacks.save_distance != Some(0) {
                stacks.save_distance = None;
            }
            stacks.state()
        };
        log::debug!("history cleared");
        self.publish(state);
        Ok(())
    }

    /// Drops all history and refuses further mutating calls.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let mut stacks = self.inner.stacks.borrow_mut();
        stacks.current = None;
        stacks.undo_stack.clear();
        stacks.redo_stack.clear();
        log::debug!("history manager disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Metadata of the transaction [`undo`](Self::undo) would revert.
    pub fn peek_undo(&self) -> Option<TransactionInfo> {
        self.inner.stacks.borrow().undo_stack.back().map(Transaction::info)
    }

    /// Metadata of the transaction [`redo`](Self::redo) would apply.
    pub fn peek_redo(&self) -> Option<TransactionInfo> {
        self.inner.stacks.borrow().redo_stack.last().map(Transaction::info)
    }

    pub fn state(&self) -> HistoryState {
        self.inner.stacks.borrow().state()
    }

    /// Listeners notified with the new [`HistoryState`] after every commit,
    /// undo, redo and clear.
    pub fn state_changed(&self) -> &ListenerSet<HistoryState> {
        &self.inner.state_changed
    }

    pub fn can_undo(&self) -> bool {
        !self.inner.stacks.borrow().undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.inner.stacks.borrow().redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.inner.stacks.borrow().undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.inner.stacks.borrow().redo_stack.len()
    }

    /// Number of operations in the open transaction.
    pub fn pending_count(&self) -> usize {
        self.inner
            .stacks
            .borrow()
            .current
            .as_ref()
            .map_or(0, Transaction::len)
    }

    /// Committed transaction names, most recent first.
    pub fn undo_descriptions(&self) -> Vec<String> {
        let stacks = self.inner.stacks.borrow();
        stacks
            .undo_stack
            .iter()
            .rev()
            .map(|t| t.name().to_owned())
            .collect()
    }

    /// Undone transaction names, most recent first.
    pub fn redo_descriptions(&self) -> Vec<String> {
        let stacks = self.inner.stacks.borrow();
        stacks
            .redo_stack
            .iter()
            .rev()
            .map(|t| t.name().to_owned())
            .collect()
    }

    /// Records the current state as the saved state.
    ///
    /// After calling this, [`has_unsaved_changes`](Self::has_unsaved_changes)
    /// returns `false` until a transaction is committed, undone or redone.
    pub fn mark_saved(&self) {
        self.inner.stacks.borrow_mut().save_distance = Some(0);
    }

    /// Returns `true` if the graph differs from the last saved state, or
    /// the open transaction holds unrecorded work.
    pub fn has_unsaved_changes(&self) -> bool {
        let stacks = self.inner.stacks.borrow();
        stacks.save_distance != Some(0)
            || stacks.current.as_ref().is_some_and(|t| !t.is_empty())
    }

    fn ensure_alive(&self) -> OperationResult {
        if self.inner.disposed.get() {
            return Err(HistoryError::Disposed);
        }
        Ok(())
    }

    /// Commits non-empty pending work under an empty name without
    /// notifying state listeners. Returns `true` if a transaction was pushed.
    fn commit_pending(&self) -> bool {
        self.push_current(String::new())
    }

    /// Pushes the open transaction if it holds operations.
    fn push_current(&self, name: String) -> bool {
        let mut stacks = self.inner.stacks.borrow_mut();
        let Some(mut transaction) = stacks.current.take() else {
            return false;
        };
        if transaction.is_empty() {
            return false;
        }
        transaction.set_name(name);
        log::debug!(
            "commit `{}` ({} operations)",
            transaction.name(),
            transaction.len()
        );

        // Clearing the redo stack invalidates a save point that was in redo.
        stacks.redo_stack.clear();
        if let Some(d) = stacks.save_distance
            && d < 0
        {
            stacks.save_distance = None;
        }
        if let Some(d) = &mut stacks.save_distance {
            *d += 1;
        }
        stacks.push_undo(transaction, self.inner.config.max_undo);
        true
    }

    fn publish(&self, state: HistoryState) {
        self.inner.state_changed.emit(&state);
    }
}

impl ManagerInner {
    fn record(&self, operation: Box<dyn ChangeOperation>) -> OperationResult {
        if self.disposed.get() {
            log::warn!("disposed history manager dropped {operation:?}");
            return Err(HistoryError::Disposed);
        }
        if operation.property_path() == Some("") {
            return Err(HistoryError::InvalidArgument(format!(
                "operation `{}` has an empty property path",
                operation.description()
            )));
        }
        log::trace!(
            "record #{} {}",
            operation.sequence_number(),
            operation.description()
        );
        let mut stacks = self.stacks.borrow_mut();
        let transaction = stacks.current.get_or_insert_with(Transaction::new);
        if transaction.record(operation) {
            log::trace!("merged into previous operation");
        }
        Ok(())
    }
}

impl fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stacks = self.inner.stacks.borrow();
        f.debug_struct("HistoryManager")
            .field("undo_count", &stacks.undo_stack.len())
            .field("redo_count", &stacks.redo_stack.len())
            .field("pending", &stacks.current.as_ref().map_or(0, Transaction::len))
            .field("max_undo", &self.inner.config.max_undo)
            .field("save_distance", &stacks.save_distance)
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

/// Feeds an observer's operations into a manager it does not own.
struct HistorySink(Weak<ManagerInner>);

impl OperationSink for HistorySink {
    fn on_next(&self, operation: Box<dyn ChangeOperation>) {
        if let Some(inner) = self.0.upgrade()
            && let Err(err) = inner.record(operation)
        {
            log::warn!("operation not recorded: {err}");
        }
    }

    fn on_completed(&self) {
        log::debug!("observer completed");
    }
}
