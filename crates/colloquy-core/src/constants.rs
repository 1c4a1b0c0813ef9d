//! Crate-wide constants
//!
//! Centralized location for record type names and tuning values that
//! are used across multiple modules.

use std::time::Duration;

/// Maximum depth for a single hierarchy traversal fetch.
pub const MAX_TRAVERSAL_DEPTH: u32 = 15;

/// Pages of children fetched per level. The store serves fixed-size
/// pages and no pagination follow-up is made, so collections with more
/// children than one page are undercounted.
pub const MAX_TRAVERSAL_BREADTH: u32 = 1;

/// Quiet window a scope must observe before its recompute fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// State record types stored on nodes.
pub mod records {
    /// Child half of an edge. Lives on the parent collection, keyed by
    /// the child's id.
    pub const CHILD_EDGE: &str = "collection.child";
    /// Parent half of an edge. Lives on the child node, keyed by the
    /// parent's id.
    pub const PARENT_EDGE: &str = "collection.parent";
}
