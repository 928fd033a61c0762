//! Scoped publishing suppression.
//!
//! While at least one [`SuppressionGuard`] is alive on the current thread,
//! observers keep rewiring themselves but publish nothing. The history
//! manager enters suppression around every replay so that the mutations an
//! operation performs never re-enter the log.
//!
//! ```ignore
//! {
//!     let _guard = PublishingSuppression::enter();
//!     object.set("Name", "silent")?; // not recorded
//! }
//! object.set("Name", "loud")?; // recorded
//! ```

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Entry point for the per-thread suppression counter.
pub struct PublishingSuppression;

impl PublishingSuppression {
    /// Enters a suppression scope that lasts until the guard is dropped.
    #[must_use = "suppression ends when the guard is dropped"]
    pub fn enter() -> SuppressionGuard {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        SuppressionGuard {
            _not_send: PhantomData,
        }
    }

    /// Returns `true` while any suppression scope is open on this thread.
    pub fn is_suppressed() -> bool {
        Self::depth() > 0
    }

    /// Number of nested scopes currently open on this thread.
    pub fn depth() -> usize {
        DEPTH.with(Cell::get)
    }
}

/// Releases one level of suppression on drop.
///
/// Guards are tied to the thread that created them.
pub struct SuppressionGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
