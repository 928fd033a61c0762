use crate::error::OperationResult;
use crate::operation::StateCapturingOperationBuilder;

use super::HistoryManager;

/// Records the change of a piece of state between its creation and
/// completion.
///
/// Call [`complete`](Self::complete) to record the operation into the open
/// transaction, or [`cancel`](Self::cancel) to discard it. A scope dropped
/// without either completes itself. The caller commits the transaction, so
/// scopes and other recorded operations form one undo step.
#[must_use = "a recording scope completes when dropped"]
pub struct RecordingScope<'a, T: Clone + 'static> {
    history: &'a HistoryManager,
    builder: Option<StateCapturingOperationBuilder<T>>,
}

impl<'a, T: Clone + 'static> RecordingScope<'a, T> {
    pub(crate) fn new(
        history: &'a HistoryManager,
        builder: StateCapturingOperationBuilder<T>,
    ) -> Self {
        Self {
            history,
            builder: Some(builder),
        }
    }

    /// The state captured when the scope began.
    pub fn before(&self) -> Option<&T> {
        self.builder.as_ref().map(StateCapturingOperationBuilder::before)
    }

    /// Captures the final state and records the operation. Nothing is
    /// committed.
    pub fn complete(mut self) -> OperationResult {
        self.finish()
    }

    /// Discards the scope. Nothing is recorded and the state is left as is.
    pub fn cancel(mut self) {
        self.builder = None;
    }

    fn finish(&mut self) -> OperationResult {
        let Some(builder) = self.builder.take() else {
            return Ok(());
        };
        self.history.record(Box::new(builder.complete()))
    }
}

impl<T: Clone + 'static> Drop for RecordingScope<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            log::warn!("recording scope not recorded: {err}");
        }
    }
}
