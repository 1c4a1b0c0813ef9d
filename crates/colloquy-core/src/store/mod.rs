//! Abstract state store: remote graph storage and notification source.
//!
//! The store is eventually consistent and multi-writer. Reads may lag
//! writes, two clients may observe different states, and nothing here
//! is transactional. Everything the rest of the crate knows about the
//! graph flows through this capability set.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::models::{
    EdgeContent, EdgeHalf, EdgeRecord, JoinRule, NodeId, NodeRecord, Visibility,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// A change notification from the store.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Node lifecycle or membership changed.
    NodeChanged(NodeId),
    /// Display name changed.
    NameChanged(NodeId),
    /// An edge record changed on `node`.
    EdgeChanged {
        node: NodeId,
        half: EdgeHalf,
        key: NodeId,
    },
}

/// Everything a node is created with.
#[derive(Debug, Clone)]
pub struct CreateNodeSpec {
    /// Human-readable alias registered for the node.
    pub alias: String,
    pub name: String,
    pub topic: String,
    /// Declare a grouping type in the creation record.
    pub grouping: bool,
    pub join_rule: JoinRule,
    pub visibility: Visibility,
}

/// Remote graph storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Resolve an alias to a node id. Fails with `NotFound` when no
    /// node maps to the alias.
    async fn resolve_alias(&self, alias: &str) -> StoreResult<NodeId>;

    async fn join(&self, node: &NodeId) -> StoreResult<()>;

    async fn node(&self, node: &NodeId) -> StoreResult<Option<NodeRecord>>;

    /// All nodes currently visible to the local actor.
    async fn visible_nodes(&self) -> StoreResult<Vec<NodeRecord>>;

    /// Depth-bounded traversal rooted at `root`, `max_breadth` pages of
    /// children per level. The root itself is always the first entry of
    /// the result.
    async fn hierarchy(
        &self,
        root: &NodeId,
        max_depth: u32,
        max_breadth: u32,
    ) -> StoreResult<Vec<NodeRecord>>;

    async fn edge_record(
        &self,
        node: &NodeId,
        half: EdgeHalf,
        key: &NodeId,
    ) -> StoreResult<Option<EdgeRecord>>;

    async fn edge_records(&self, node: &NodeId, half: EdgeHalf) -> StoreResult<Vec<EdgeRecord>>;

    /// Idempotent upsert of one directional edge record.
    async fn write_edge_record(
        &self,
        node: &NodeId,
        half: EdgeHalf,
        content: EdgeContent,
        key: &NodeId,
    ) -> StoreResult<()>;

    async fn create_node(&self, spec: CreateNodeSpec) -> StoreResult<NodeId>;

    async fn join_rule(&self, node: &NodeId) -> StoreResult<JoinRule>;

    async fn set_join_rule(&self, node: &NodeId, rule: JoinRule) -> StoreResult<()>;

    async fn set_name(&self, node: &NodeId, name: &str) -> StoreResult<()>;

    async fn directory_visibility(&self, node: &NodeId) -> StoreResult<Visibility>;

    async fn set_directory_visibility(
        &self,
        node: &NodeId,
        visibility: Visibility,
    ) -> StoreResult<()>;

    /// Change notifications. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;

    /// Routing hint attached to edges written by the local actor.
    fn home_server(&self) -> String;
}
