//! Collection and discussion hierarchy management on top of an
//! eventually consistent, multi-writer state store.
//!
//! The store holds a graph of linked records: collections (grouping
//! nodes) and discussions (leaf resources), connected by edges written
//! as two independent directional records. This crate keeps a transient
//! derived view of that graph fresh from a stream of change
//! notifications, and pushes join-rule changes back out to every edge
//! touching a collection, best effort, one write at a time.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod notify;
pub mod ops;
pub mod propagate;
pub mod store;

// Re-export the main surface at the crate root for convenience.
pub use config::CoreConfig;
pub use engine::HierarchyEngine;
pub use error::{EdgeWriteFailure, StoreError};
pub use models::{
    EdgeContent, EdgeHalf, EdgePayload, EdgeRecord, JoinRule, Membership, NodeId, NodeKind,
    NodeRecord, NodeSummary, Visibility,
};
pub use ops::{AttachOutcome, CollectionSettings, NameAvailability, SettingsOutcome, SettingsUpdate};
pub use propagate::{propagate, PropagationOutcome};
pub use store::{CreateNodeSpec, MemoryStore, StateStore, StoreEvent};
