//! The Active Flag: the one piece of state shared across components.
//!
//! Written only by the session manager, read by the sampler task on every
//! tick. The sampler holds a clone of the handle, never a copy of the value,
//! so a `clear()` is observed by the very next tick no matter when the
//! schedule was created.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "sampling may proceed" flag.
#[derive(Debug, Clone, Default)]
pub struct ActiveFlag {
    inner: Arc<AtomicBool>,
}

impl ActiveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.inner.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}
