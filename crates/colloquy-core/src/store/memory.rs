//! In-memory state store for tests and local development.
//!
//! Pre-populate nodes, aliases and edge records, inject per-edge write
//! failures, and read back call counters. Every mutation emits the
//! matching `StoreEvent` so the notification-driven paths can be
//! exercised without a remote store.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{CreateNodeSpec, StateStore, StoreEvent, StoreResult};
use crate::error::StoreError;
use crate::models::{
    EdgeContent, EdgeHalf, EdgeRecord, JoinRule, Membership, NodeId, NodeRecord, Visibility,
};

/// Children the store serves per page of a hierarchy response.
const HIERARCHY_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct NodeState {
    record: NodeRecord,
    join_rule: JoinRule,
    visibility: Visibility,
    topic: String,
}

pub struct MemoryStore {
    home_server: String,
    nodes: RwLock<BTreeMap<NodeId, NodeState>>,
    aliases: RwLock<BTreeMap<String, NodeId>>,
    edges: RwLock<BTreeMap<(NodeId, EdgeHalf, NodeId), EdgeContent>>,
    /// Edge writes keyed by (node, key) that fail with `Denied`.
    rejected_edge_writes: RwLock<HashSet<(NodeId, NodeId)>>,
    alias_probes: AtomicUsize,
    visible_calls: AtomicUsize,
    hierarchy_calls: AtomicUsize,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new(home_server: &str) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            home_server: home_server.to_string(),
            nodes: RwLock::new(BTreeMap::new()),
            aliases: RwLock::new(BTreeMap::new()),
            edges: RwLock::new(BTreeMap::new()),
            rejected_edge_writes: RwLock::new(HashSet::new()),
            alias_probes: AtomicUsize::new(0),
            visible_calls: AtomicUsize::new(0),
            hierarchy_calls: AtomicUsize::new(0),
            events,
        }
    }

    /// Seed a node. Join rule defaults to public, directory visibility
    /// to private.
    pub fn add_node(&self, record: NodeRecord) {
        let id = record.id.clone();
        self.nodes.write().insert(
            id.clone(),
            NodeState {
                record,
                join_rule: JoinRule::Public,
                visibility: Visibility::Private,
                topic: String::new(),
            },
        );
        self.emit(StoreEvent::NodeChanged(id));
    }

    pub fn insert_alias(&self, alias: &str, node: &NodeId) {
        self.aliases
            .write()
            .insert(alias.to_string(), node.clone());
    }

    /// Seed one directional edge record without going through the
    /// write path (no failure injection, still emits the event).
    pub fn put_edge(&self, node: &NodeId, half: EdgeHalf, key: &NodeId, content: EdgeContent) {
        self.edges
            .write()
            .insert((node.clone(), half, key.clone()), content);
        self.emit(StoreEvent::EdgeChanged {
            node: node.clone(),
            half,
            key: key.clone(),
        });
    }

    /// Read one edge record back for inspection.
    pub fn edge(&self, node: &NodeId, half: EdgeHalf, key: &NodeId) -> Option<EdgeContent> {
        self.edges
            .read()
            .get(&(node.clone(), half, key.clone()))
            .cloned()
    }

    /// Make every `write_edge_record` for (node, key) fail with
    /// `Denied` until `allow_edge_writes` is called.
    pub fn reject_edge_writes(&self, node: &NodeId, key: &NodeId) {
        self.rejected_edge_writes
            .write()
            .insert((node.clone(), key.clone()));
    }

    pub fn allow_edge_writes(&self, node: &NodeId, key: &NodeId) {
        self.rejected_edge_writes
            .write()
            .remove(&(node.clone(), key.clone()));
    }

    pub fn set_membership(&self, node: &NodeId, membership: Membership) {
        if let Some(state) = self.nodes.write().get_mut(node) {
            state.record.membership = membership;
        }
        self.emit(StoreEvent::NodeChanged(node.clone()));
    }

    /// How many alias resolutions were attempted.
    pub fn alias_probe_count(&self) -> usize {
        self.alias_probes.load(Ordering::SeqCst)
    }

    /// How many `visible_nodes` reads were served.
    pub fn visible_call_count(&self) -> usize {
        self.visible_calls.load(Ordering::SeqCst)
    }

    /// How many hierarchy traversals were served.
    pub fn hierarchy_call_count(&self) -> usize {
        self.hierarchy_calls.load(Ordering::SeqCst)
    }

    pub fn topic(&self, node: &NodeId) -> Option<String> {
        self.nodes.read().get(node).map(|s| s.topic.clone())
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn resolve_alias(&self, alias: &str) -> StoreResult<NodeId> {
        self.alias_probes.fetch_add(1, Ordering::SeqCst);
        self.aliases
            .read()
            .get(alias)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("no node for alias: {alias}")))
    }

    async fn join(&self, node: &NodeId) -> StoreResult<()> {
        let mut nodes = self.nodes.write();
        let state = nodes
            .get_mut(node)
            .ok_or_else(|| StoreError::NotFound(format!("unknown node: {node}")))?;
        state.record.membership = Membership::Joined;
        drop(nodes);
        self.emit(StoreEvent::NodeChanged(node.clone()));
        Ok(())
    }

    async fn node(&self, node: &NodeId) -> StoreResult<Option<NodeRecord>> {
        Ok(self.nodes.read().get(node).map(|s| s.record.clone()))
    }

    async fn visible_nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        self.visible_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .nodes
            .read()
            .values()
            .map(|s| s.record.clone())
            .collect())
    }

    async fn hierarchy(
        &self,
        root: &NodeId,
        max_depth: u32,
        max_breadth: u32,
    ) -> StoreResult<Vec<NodeRecord>> {
        self.hierarchy_calls.fetch_add(1, Ordering::SeqCst);
        let nodes = self.nodes.read();
        let edges = self.edges.read();

        let root_state = nodes
            .get(root)
            .ok_or_else(|| StoreError::NotFound(format!("unknown node: {root}")))?;

        let page_cap = (max_breadth as usize).saturating_mul(HIERARCHY_PAGE_SIZE);
        let mut result = vec![root_state.record.clone()];
        let mut seen: HashSet<NodeId> = HashSet::from([root.clone()]);
        let mut frontier = vec![root.clone()];

        for _ in 0..max_depth {
            let mut next = Vec::new();
            for parent in &frontier {
                let children = edges
                    .range((parent.clone(), EdgeHalf::Child, NodeId::new(""))..)
                    .take_while(|((node, half, _), _)| node == parent && *half == EdgeHalf::Child)
                    .filter(|(_, content)| !content.is_void())
                    .map(|((_, _, key), _)| key.clone())
                    .take(page_cap);
                for child in children {
                    if !seen.insert(child.clone()) {
                        continue;
                    }
                    if let Some(state) = nodes.get(&child) {
                        result.push(state.record.clone());
                        next.push(child);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Ok(result)
    }

    async fn edge_record(
        &self,
        node: &NodeId,
        half: EdgeHalf,
        key: &NodeId,
    ) -> StoreResult<Option<EdgeRecord>> {
        Ok(self
            .edges
            .read()
            .get(&(node.clone(), half, key.clone()))
            .map(|content| EdgeRecord {
                node: node.clone(),
                half,
                key: key.clone(),
                content: content.clone(),
            }))
    }

    async fn edge_records(&self, node: &NodeId, half: EdgeHalf) -> StoreResult<Vec<EdgeRecord>> {
        Ok(self
            .edges
            .read()
            .range((node.clone(), half, NodeId::new(""))..)
            .take_while(|((n, h, _), _)| n == node && *h == half)
            .map(|((_, _, key), content)| EdgeRecord {
                node: node.clone(),
                half,
                key: key.clone(),
                content: content.clone(),
            })
            .collect())
    }

    async fn write_edge_record(
        &self,
        node: &NodeId,
        half: EdgeHalf,
        content: EdgeContent,
        key: &NodeId,
    ) -> StoreResult<()> {
        if self
            .rejected_edge_writes
            .read()
            .contains(&(node.clone(), key.clone()))
        {
            return Err(StoreError::Denied(format!(
                "edge write rejected: {node} -> {key}"
            )));
        }
        self.edges
            .write()
            .insert((node.clone(), half, key.clone()), content);
        self.emit(StoreEvent::EdgeChanged {
            node: node.clone(),
            half,
            key: key.clone(),
        });
        Ok(())
    }

    async fn create_node(&self, spec: CreateNodeSpec) -> StoreResult<NodeId> {
        if self.aliases.read().contains_key(&spec.alias) {
            return Err(StoreError::Denied(format!(
                "alias already in use: {}",
                spec.alias
            )));
        }
        let id = NodeId::new(format!("!{}:{}", Uuid::new_v4(), self.home_server));
        let record = NodeRecord {
            id: id.clone(),
            name: spec.name,
            membership: Membership::Joined,
            avatar: None,
            grouping: spec.grouping,
            has_resource: false,
        };
        self.nodes.write().insert(
            id.clone(),
            NodeState {
                record,
                join_rule: spec.join_rule,
                visibility: spec.visibility,
                topic: spec.topic,
            },
        );
        self.aliases.write().insert(spec.alias, id.clone());
        self.emit(StoreEvent::NodeChanged(id.clone()));
        Ok(id)
    }

    async fn join_rule(&self, node: &NodeId) -> StoreResult<JoinRule> {
        self.nodes
            .read()
            .get(node)
            .map(|s| s.join_rule)
            .ok_or_else(|| StoreError::NotFound(format!("unknown node: {node}")))
    }

    async fn set_join_rule(&self, node: &NodeId, rule: JoinRule) -> StoreResult<()> {
        let mut nodes = self.nodes.write();
        let state = nodes
            .get_mut(node)
            .ok_or_else(|| StoreError::NotFound(format!("unknown node: {node}")))?;
        state.join_rule = rule;
        drop(nodes);
        self.emit(StoreEvent::NodeChanged(node.clone()));
        Ok(())
    }

    async fn set_name(&self, node: &NodeId, name: &str) -> StoreResult<()> {
        let mut nodes = self.nodes.write();
        let state = nodes
            .get_mut(node)
            .ok_or_else(|| StoreError::NotFound(format!("unknown node: {node}")))?;
        state.record.name = name.to_string();
        drop(nodes);
        self.emit(StoreEvent::NameChanged(node.clone()));
        Ok(())
    }

    async fn directory_visibility(&self, node: &NodeId) -> StoreResult<Visibility> {
        self.nodes
            .read()
            .get(node)
            .map(|s| s.visibility)
            .ok_or_else(|| StoreError::NotFound(format!("unknown node: {node}")))
    }

    async fn set_directory_visibility(
        &self,
        node: &NodeId,
        visibility: Visibility,
    ) -> StoreResult<()> {
        let mut nodes = self.nodes.write();
        let state = nodes
            .get_mut(node)
            .ok_or_else(|| StoreError::NotFound(format!("unknown node: {node}")))?;
        state.visibility = visibility;
        drop(nodes);
        self.emit(StoreEvent::NodeChanged(node.clone()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn home_server(&self) -> String {
        self.home_server.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(id: &str, name: &str) -> NodeRecord {
        NodeRecord {
            id: NodeId::from(id),
            name: name.to_string(),
            membership: Membership::Joined,
            avatar: None,
            grouping: true,
            has_resource: false,
        }
    }

    fn discussion(id: &str, name: &str) -> NodeRecord {
        NodeRecord {
            id: NodeId::from(id),
            name: name.to_string(),
            membership: Membership::NotJoined,
            avatar: None,
            grouping: false,
            has_resource: true,
        }
    }

    #[tokio::test]
    async fn alias_resolution_and_probe_counting() {
        let store = MemoryStore::new("example.org");
        let books = collection("!books:example.org", "Books");
        store.add_node(books.clone());
        store.insert_alias("books", &books.id);

        assert_eq!(store.resolve_alias("books").await.unwrap(), books.id);
        let missing = store.resolve_alias("films").await.unwrap_err();
        assert!(missing.is_not_found());
        assert_eq!(store.alias_probe_count(), 2);
    }

    #[tokio::test]
    async fn hierarchy_lists_root_first_and_descends() {
        let store = MemoryStore::new("example.org");
        let root = collection("!root:example.org", "Root");
        let mid = collection("!mid:example.org", "Mid");
        let leaf = discussion("!leaf:example.org", "Leaf");
        store.add_node(root.clone());
        store.add_node(mid.clone());
        store.add_node(leaf.clone());
        let via = EdgeContent::routed(vec!["example.org".to_string()]);
        store.put_edge(&root.id, EdgeHalf::Child, &mid.id, via.clone());
        store.put_edge(&mid.id, EdgeHalf::Child, &leaf.id, via);

        let listing = store.hierarchy(&root.id, 15, 1).await.unwrap();
        let ids: Vec<&NodeId> = listing.iter().map(|r| &r.id).collect();
        assert_eq!(ids, vec![&root.id, &mid.id, &leaf.id]);
    }

    #[tokio::test]
    async fn hierarchy_respects_the_depth_bound() {
        let store = MemoryStore::new("example.org");
        let root = collection("!root:example.org", "Root");
        let mid = collection("!mid:example.org", "Mid");
        let leaf = discussion("!leaf:example.org", "Leaf");
        store.add_node(root.clone());
        store.add_node(mid.clone());
        store.add_node(leaf.clone());
        let via = EdgeContent::routed(vec!["example.org".to_string()]);
        store.put_edge(&root.id, EdgeHalf::Child, &mid.id, via.clone());
        store.put_edge(&mid.id, EdgeHalf::Child, &leaf.id, via);

        let listing = store.hierarchy(&root.id, 1, 1).await.unwrap();
        assert_eq!(listing.len(), 2); // root + mid, leaf is one level too deep
    }

    #[tokio::test]
    async fn void_edges_do_not_resolve() {
        let store = MemoryStore::new("example.org");
        let root = collection("!root:example.org", "Root");
        let leaf = discussion("!leaf:example.org", "Leaf");
        store.add_node(root.clone());
        store.add_node(leaf.clone());
        store.put_edge(&root.id, EdgeHalf::Child, &leaf.id, EdgeContent::default());

        let listing = store.hierarchy(&root.id, 15, 1).await.unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[tokio::test]
    async fn rejected_edge_writes_fail_and_leave_no_record() {
        let store = MemoryStore::new("example.org");
        let a = NodeId::from("!a:example.org");
        let b = NodeId::from("!b:example.org");
        store.reject_edge_writes(&a, &b);

        let err = store
            .write_edge_record(&a, EdgeHalf::Child, EdgeContent::default(), &b)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Denied(format!("edge write rejected: {a} -> {b}")));
        assert!(store.edge(&a, EdgeHalf::Child, &b).is_none());

        // Lifting the injection lets the same write land.
        store.allow_edge_writes(&a, &b);
        store
            .write_edge_record(&a, EdgeHalf::Child, EdgeContent::default(), &b)
            .await
            .unwrap();
        assert!(store.edge(&a, EdgeHalf::Child, &b).is_some());
    }

    #[tokio::test]
    async fn create_node_registers_the_alias() {
        let store = MemoryStore::new("example.org");
        let id = store
            .create_node(CreateNodeSpec {
                alias: "books".to_string(),
                name: "Books".to_string(),
                topic: "reading group".to_string(),
                grouping: true,
                join_rule: JoinRule::Public,
                visibility: Visibility::Private,
            })
            .await
            .unwrap();

        assert_eq!(store.resolve_alias("books").await.unwrap(), id);
        assert_eq!(store.topic(&id).unwrap(), "reading group");
        let record = store.node(&id).await.unwrap().unwrap();
        assert!(record.is_collection());
        assert!(record.joined());
    }
}
