//! # Strata History
//!
//! Change tracking and undo/redo for a live [`strata_core`] object graph.
//!
//! - [`observer`] — observer tree that turns graph notifications into
//!   [`ChangeOperation`]s, addressed by dotted property paths
//! - [`operation`] — invertible operations and their merge protocol
//! - [`HistoryManager`] — transactions, bounded undo/redo stacks and
//!   recording scopes
//! - [`PublishingSuppression`] — thread-local guard that silences observers
//!   while history replays operations
//! - [`OperationSequenceGenerator`] — shared monotonic ordering of operations
//!
//! ```ignore
//! use strata_history::{CoreObjectObserver, HistoryManager, OperationSequenceGenerator};
//!
//! let seq = OperationSequenceGenerator::new();
//! let history = HistoryManager::new(root.clone(), seq.clone());
//! let observer = CoreObjectObserver::new(None, root.clone(), seq, "", None);
//! history.subscribe(&observer);
//!
//! root.set("Name", "Title")?;
//! history.commit("Rename")?;
//! history.undo()?;
//! ```

mod context;
mod error;
mod history;
pub mod observer;
pub mod operation;
pub mod path;
mod sequence;
mod suppression;

pub use context::OperationExecutionContext;
pub use error::{HistoryError, OperationResult};
pub use history::{
    DEFAULT_MAX_UNDO, HistoryConfig, HistoryManager, HistoryState, RecordingScope, Transaction,
    TransactionInfo,
};
pub use observer::{
    CollectionObserver, CoreObjectObserver, EnginePropertyObserver, NodeItemObserver,
    OperationObserver, OperationSink, SplineEasingObserver,
};
pub use operation::{ChangeOperation, CustomOperation, UpdatePropertyValueOperation};
pub use path::TrackedPaths;
pub use sequence::OperationSequenceGenerator;
pub use suppression::{PublishingSuppression, SuppressionGuard};

/// History library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
