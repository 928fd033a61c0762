use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic source of operation sequence numbers.
///
/// Cloning a generator creates another handle to the same counter, so every
/// observer in a tree and the history manager draw from one total order.
#[derive(Debug, Clone, Default)]
pub struct OperationSequenceGenerator {
    counter: Arc<AtomicU64>,
}

impl OperationSequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number. The first call yields `1`.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently issued number, or `0` if none was issued.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
