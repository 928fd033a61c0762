use strata_core::ModelError;
use thiserror::Error;

/// Errors raised by operations, observers and the history manager.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// A caller-supplied argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation's path does not resolve on its live target.
    #[error("invalid operation: cannot resolve `{path}` ({reason})")]
    InvalidOperation { path: String, reason: String },

    /// The history manager has been disposed.
    #[error("history manager has been disposed")]
    Disposed,

    /// A configuration document could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The object model rejected a mutation.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl HistoryError {
    pub(crate) fn invalid_operation(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Result type for operation and history calls.
pub type OperationResult<T = ()> = Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            HistoryError::invalid_operation("Items.Title", "unknown property").to_string(),
            "invalid operation: cannot resolve `Items.Title` (unknown property)"
        );
        assert_eq!(
            HistoryError::Disposed.to_string(),
            "history manager has been disposed"
        );
        assert_eq!(
            HistoryError::from(ModelError::IndexOutOfRange { index: 3, len: 1 }).to_string(),
            "index 3 out of range for length 1"
        );
    }
}
