//! Transactions and the undo/redo history.
//!
//! The [`HistoryManager`] collects recorded operations into an open
//! [`Transaction`], commits it onto a bounded undo stack, and replays
//! committed transactions for undo and redo.

mod config;
mod manager;
mod scope;
mod transaction;

pub use config::{DEFAULT_MAX_UNDO, HistoryConfig};
pub use manager::{HistoryManager, HistoryState};
pub use scope::RecordingScope;
pub use transaction::{Transaction, TransactionInfo};
