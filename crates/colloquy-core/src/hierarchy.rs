//! Bounded-depth traversal fetch for a collection's children.

use tracing::debug;

use crate::config::CoreConfig;
use crate::error::StoreError;
use crate::models::{NodeId, NodeSummary};
use crate::store::StateStore;

/// Fetch the child summaries of `root` in one traversal call.
///
/// The store lists the root itself first in its raw result; exactly
/// that first entry is dropped. One page of breadth per level, no
/// pagination follow-up: collections with more children than the
/// store's page limit are undercounted.
pub async fn fetch_children<S: StateStore + ?Sized>(
    store: &S,
    root: &NodeId,
    config: &CoreConfig,
) -> Result<Vec<NodeSummary>, StoreError> {
    let nodes = store
        .hierarchy(root, config.max_depth, config.max_breadth)
        .await?;
    debug!(root = %root, fetched = nodes.len(), "hierarchy fetch");
    Ok(nodes
        .into_iter()
        .skip(1)
        .map(|record| record.summary())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EdgeContent, EdgeHalf, Membership, NodeRecord};
    use crate::store::MemoryStore;

    fn node(id: &str, grouping: bool) -> NodeRecord {
        NodeRecord {
            id: NodeId::from(id),
            name: id.to_string(),
            membership: Membership::Joined,
            avatar: None,
            grouping,
            has_resource: !grouping,
        }
    }

    #[tokio::test]
    async fn the_root_never_appears_in_its_own_child_list() {
        let store = MemoryStore::new("example.org");
        let root = node("!root:example.org", true);
        let a = node("!a:example.org", false);
        let b = node("!b:example.org", false);
        store.add_node(root.clone());
        store.add_node(a.clone());
        store.add_node(b.clone());
        let via = EdgeContent::routed(vec!["example.org".to_string()]);
        store.put_edge(&root.id, EdgeHalf::Child, &a.id, via.clone());
        store.put_edge(&root.id, EdgeHalf::Child, &b.id, via);

        for (max_depth, max_breadth) in [(1, 1), (15, 1), (15, 3)] {
            let config = CoreConfig {
                max_depth,
                max_breadth,
                ..CoreConfig::default()
            };
            let children = fetch_children(&store, &root.id, &config).await.unwrap();
            assert!(children.iter().all(|child| child.id != root.id));
            assert_eq!(children.len(), 2);
        }
    }

    #[tokio::test]
    async fn a_childless_collection_yields_an_empty_list() {
        let store = MemoryStore::new("example.org");
        let root = node("!root:example.org", true);
        store.add_node(root.clone());

        let children = fetch_children(&store, &root.id, &CoreConfig::default())
            .await
            .unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn a_failed_fetch_reports_the_store_error() {
        let store = MemoryStore::new("example.org");
        let missing = NodeId::from("!gone:example.org");
        let err = fetch_children(&store, &missing, &CoreConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
