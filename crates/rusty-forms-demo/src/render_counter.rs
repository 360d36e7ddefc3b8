// File: rusty-forms-demo/src/render_counter.rs
// Purpose: Counts how often the form would re-render

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Owned by the consumer, shared with the watcher that bumps it
#[derive(Debug, Clone, Default)]
pub struct RenderCounter {
    renders: Arc<AtomicU32>,
}

impl RenderCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a render and return the new count
    pub fn bump(&self) -> u32 {
        self.renders.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn count(&self) -> u32 {
        self.renders.load(Ordering::Relaxed)
    }
}
