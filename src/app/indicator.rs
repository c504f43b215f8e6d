//! Shared "uplink connected" flag.
//!
//! Written by the supervisor on the dispatcher thread, polled by the
//! status LED thread.  A single atomic is all the two sides share.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct LinkIndicator {
    up: Arc<AtomicBool>,
}

impl LinkIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, up: bool) {
        self.up.store(up, Ordering::Release);
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }
}
