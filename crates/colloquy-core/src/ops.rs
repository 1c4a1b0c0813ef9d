//! Thin mutation operations against the store.
//!
//! Each of these writes and returns; none of them touches the derived
//! view directly. The store's notification stream brings the change
//! back around through the debounced recompute path.

use tracing::debug;

use crate::error::{EdgeWriteFailure, StoreError};
use crate::models::{EdgeContent, EdgeHalf, JoinRule, NodeId, NodeSummary, Visibility};
use crate::propagate::{propagate, PropagationOutcome};
use crate::store::{CreateNodeSpec, StateStore};

/// Derive the alias for a proposed name: lowercase it and replace
/// characters an alias cannot carry.
pub fn to_alias(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == ':' { '_' } else { c })
        .collect()
}

/// Outcome of the availability probe for a proposed collection name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameAvailability {
    Available,
    Unavailable,
}

impl NameAvailability {
    pub fn is_available(self) -> bool {
        matches!(self, NameAvailability::Available)
    }
}

/// Probe whether `name`'s derived alias is free.
///
/// An empty name is never available and costs no store query. NotFound
/// from the resolver is the positive "available" signal; any other
/// error is a hard failure for the caller to surface.
pub async fn name_availability<S: StateStore + ?Sized>(
    store: &S,
    name: &str,
) -> Result<NameAvailability, StoreError> {
    if name.is_empty() {
        return Ok(NameAvailability::Unavailable);
    }
    match store.resolve_alias(&to_alias(name)).await {
        Ok(_) => Ok(NameAvailability::Unavailable),
        Err(error) if error.is_not_found() => Ok(NameAvailability::Available),
        Err(error) => Err(error),
    }
}

/// Create a new collection under the derived alias.
pub async fn create_collection<S: StateStore + ?Sized>(
    store: &S,
    name: &str,
    topic: &str,
) -> Result<NodeId, StoreError> {
    let id = store
        .create_node(CreateNodeSpec {
            alias: to_alias(name),
            name: name.to_string(),
            topic: topic.to_string(),
            grouping: true,
            // Anyone may join a fresh collection until its owner
            // tightens the rule.
            join_rule: JoinRule::Public,
            visibility: Visibility::Private,
        })
        .await?;
    debug!(collection = %id, name, "created collection");
    Ok(id)
}

/// Result of attaching a discussion. The two half writes settle
/// independently; one may land while the other fails, leaving a
/// dangling one-way edge. No compensation is attempted; the failures
/// are reported and the caller decides.
#[derive(Debug, Default)]
pub struct AttachOutcome {
    pub failures: Vec<EdgeWriteFailure>,
}

impl AttachOutcome {
    pub fn fully_linked(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Link a discussion into a collection: a child record on the
/// collection and the reciprocal parent record on the discussion.
pub async fn attach_discussion<S: StateStore + ?Sized>(
    store: &S,
    discussion: &NodeId,
    collection: &NodeId,
) -> AttachOutcome {
    let via = vec![store.home_server()];
    let mut outcome = AttachOutcome::default();

    if let Err(error) = store
        .write_edge_record(
            collection,
            EdgeHalf::Child,
            EdgeContent::routed(via.clone()),
            discussion,
        )
        .await
    {
        outcome.failures.push(EdgeWriteFailure {
            node: collection.clone(),
            key: discussion.clone(),
            error,
        });
    }
    if let Err(error) = store
        .write_edge_record(
            discussion,
            EdgeHalf::Parent,
            EdgeContent::routed(via),
            collection,
        )
        .await
    {
        outcome.failures.push(EdgeWriteFailure {
            node: discussion.clone(),
            key: collection.clone(),
            error,
        });
    }
    outcome
}

/// Write a changed join rule, then push it out to the collection's
/// reverse edges. Returns `None` when the rule already had that value
/// and nothing was written.
pub async fn update_join_rule<S: StateStore + ?Sized>(
    store: &S,
    collection: &NodeId,
    rule: JoinRule,
) -> Result<Option<PropagationOutcome>, StoreError> {
    if store.join_rule(collection).await? == rule {
        return Ok(None);
    }
    store.set_join_rule(collection, rule).await?;
    Ok(Some(propagate(store, collection, rule).await?))
}

/// Discussions available to attach: any visible node carrying a
/// resource.
pub async fn visible_discussions<S: StateStore + ?Sized>(
    store: &S,
) -> Result<Vec<NodeSummary>, StoreError> {
    Ok(store
        .visible_nodes()
        .await?
        .into_iter()
        .filter(|record| record.has_resource)
        .map(|record| record.summary())
        .collect())
}

/// Current mutable settings of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSettings {
    pub name: String,
    pub join_rule: JoinRule,
    pub visibility: Visibility,
}

/// Read the settings a settings form starts from.
pub async fn collection_settings<S: StateStore + ?Sized>(
    store: &S,
    collection: &NodeId,
) -> Result<CollectionSettings, StoreError> {
    let record = store
        .node(collection)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("unknown collection: {collection}")))?;
    Ok(CollectionSettings {
        name: record.name,
        join_rule: store.join_rule(collection).await?,
        visibility: store.directory_visibility(collection).await?,
    })
}

/// A partial settings change; unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub join_rule: Option<JoinRule>,
    pub visibility: Option<Visibility>,
}

/// What applying a settings bundle did. Each write settles on its own;
/// one failing does not stop the others.
#[derive(Debug, Default)]
pub struct SettingsOutcome {
    pub errors: Vec<StoreError>,
    /// Present when a join-rule change ran propagation.
    pub propagation: Option<PropagationOutcome>,
}

impl SettingsOutcome {
    pub fn clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Apply a settings bundle, writing only the fields that differ from
/// `current`.
pub async fn apply_settings<S: StateStore + ?Sized>(
    store: &S,
    collection: &NodeId,
    current: &CollectionSettings,
    update: SettingsUpdate,
) -> SettingsOutcome {
    let mut outcome = SettingsOutcome::default();

    if let Some(visibility) = update.visibility {
        if visibility != current.visibility {
            if let Err(error) = store.set_directory_visibility(collection, visibility).await {
                outcome.errors.push(error);
            }
        }
    }
    if let Some(rule) = update.join_rule {
        if rule != current.join_rule {
            match update_join_rule(store, collection, rule).await {
                Ok(propagation) => outcome.propagation = propagation,
                Err(error) => outcome.errors.push(error),
            }
        }
    }
    if let Some(name) = update.name {
        if name != current.name {
            if let Err(error) = store.set_name(collection, &name).await {
                outcome.errors.push(error);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Membership, NodeRecord};
    use crate::store::MemoryStore;

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

    #[test]
    fn alias_derivation_replaces_forbidden_characters() {
        assert_eq!(to_alias("Reading Group: 2026"), "reading_group__2026");
        assert_eq!(to_alias("Books"), "books");
        assert_eq!(to_alias(""), "");
    }

    #[tokio::test]
    async fn empty_name_is_unavailable_without_a_probe() {
        let store = MemoryStore::new("example.org");
        let availability = name_availability(&store, "").await.unwrap();
        assert_eq!(availability, NameAvailability::Unavailable);
        assert_eq!(store.alias_probe_count(), 0);
    }

    #[tokio::test]
    async fn a_free_alias_reads_as_available() {
        let store = MemoryStore::new("example.org");
        let availability = name_availability(&store, "foo").await.unwrap();
        assert!(availability.is_available());
        assert_eq!(store.alias_probe_count(), 1);
    }

    #[tokio::test]
    async fn a_taken_alias_reads_as_unavailable() {
        let store = MemoryStore::new("example.org");
        let books = collection("!books:example.org", "Books");
        store.add_node(books.clone());
        store.insert_alias("foo", &books.id);

        let availability = name_availability(&store, "foo").await.unwrap();
        assert_eq!(availability, NameAvailability::Unavailable);
    }

    #[tokio::test]
    async fn only_resource_carriers_count_as_discussions() {
        let store = MemoryStore::new("example.org");
        store.add_node(collection("!c:example.org", "Shelf"));
        store.add_node(NodeRecord {
            id: NodeId::from("!d:example.org"),
            name: "Doc".to_string(),
            membership: Membership::Joined,
            avatar: None,
            grouping: false,
            has_resource: true,
        });

        let discussions = visible_discussions(&store).await.unwrap();
        assert_eq!(discussions.len(), 1);
        assert_eq!(discussions[0].name, "Doc");
    }

    #[tokio::test]
    async fn updating_to_the_same_rule_is_a_no_op() {
        let store = MemoryStore::new("example.org");
        let books = collection("!books:example.org", "Books");
        store.add_node(books.clone());

        // Seeded nodes default to public.
        let outcome = update_join_rule(&store, &books.id, JoinRule::Public)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(store.join_rule(&books.id).await.unwrap(), JoinRule::Public);
    }

    #[tokio::test]
    async fn settings_bundle_writes_only_changed_fields() {
        let store = MemoryStore::new("example.org");
        let books = collection("!books:example.org", "Books");
        store.add_node(books.clone());

        let current = collection_settings(&store, &books.id).await.unwrap();
        assert_eq!(current.visibility, Visibility::Private);

        let outcome = apply_settings(
            &store,
            &books.id,
            &current,
            SettingsUpdate {
                name: Some("Bookshelf".to_string()),
                join_rule: Some(JoinRule::Public), // unchanged
                visibility: Some(Visibility::Public),
            },
        )
        .await;

        assert!(outcome.clean());
        assert!(outcome.propagation.is_none());
        let after = collection_settings(&store, &books.id).await.unwrap();
        assert_eq!(after.name, "Bookshelf");
        assert_eq!(after.visibility, Visibility::Public);
        assert_eq!(after.join_rule, JoinRule::Public);
    }
}
