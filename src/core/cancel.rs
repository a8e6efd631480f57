// Copyright @yucwang 2026

use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };

/// Cooperative cancellation flag shared between the embedder, the server
/// accept loop and in-flight probe renders. A signal handler in the host
/// process only ever calls `cancel()`; the loops poll at their suspension
/// points.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
