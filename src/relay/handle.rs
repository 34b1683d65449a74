use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::shutdown::ShutdownToken;

// -----------------------------------------------------------------------------
// ----- ReactorHandle ---------------------------------------------------------

/// Cross-thread view of a running reactor: request shutdown, read how many
/// peers are registered.
#[derive(Clone, Debug, Default)]
pub struct ReactorHandle {
    shutdown: ShutdownToken,
    connections: Arc<AtomicUsize>,
}

impl ReactorHandle {
    pub(crate) fn new(shutdown: ShutdownToken) -> Self {
        Self {
            shutdown,
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Ask the reactor to stop after its current cycle.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    pub(crate) fn publish_connection_count(&self, count: usize) {
        self.connections.store(count, Ordering::Release);
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
