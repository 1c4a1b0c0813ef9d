use std::time::Duration;

use crate::constants::{DEBOUNCE_WINDOW, MAX_TRAVERSAL_BREADTH, MAX_TRAVERSAL_DEPTH};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Quiet window before a debounced recompute fires. Also the
    /// accepted staleness bound: a recompute reflects store state at
    /// fire time, not at first-notification time.
    pub debounce: Duration,
    /// Depth bound for child traversal fetches.
    pub max_depth: u32,
    /// Pages of children per traversal level.
    pub max_breadth: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_WINDOW,
            max_depth: MAX_TRAVERSAL_DEPTH,
            max_breadth: MAX_TRAVERSAL_BREADTH,
        }
    }
}
