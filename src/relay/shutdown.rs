use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// -----------------------------------------------------------------------------
// ----- ShutdownToken ---------------------------------------------------------

/// Cooperative stop flag. The reactor polls it between cycles, so the cycle in
/// flight always completes.
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
