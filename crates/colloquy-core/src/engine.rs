//! Derived view of the collection graph.
//!
//! A transient, in-process projection rebuilt wholesale from the store:
//! the list of joined collections, plus a child list for each
//! collection an observer has asked about. Nothing here is persisted;
//! the whole view is reconstructible from the store at any time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::error::StoreError;
use crate::hierarchy::fetch_children;
use crate::models::{EdgeHalf, JoinRule, NodeId, NodeSummary};
use crate::notify::{Debouncer, Scope};
use crate::ops::{self, AttachOutcome, NameAvailability};
use crate::propagate::PropagationOutcome;
use crate::store::{StateStore, StoreEvent};

#[derive(Debug, Default)]
struct DerivedView {
    collections: Vec<NodeSummary>,
    /// Loaded child lists, keyed by collection. Absence means not yet
    /// loaded, distinct from a loaded-and-empty list.
    children: HashMap<NodeId, Vec<NodeSummary>>,
}

/// The engine owning the derived view and its refresh machinery.
///
/// All cache mutation happens inside engine methods behind one lock;
/// spawned work holds only a `Weak` handle and drops its result if the
/// engine is gone by the time it settles.
pub struct HierarchyEngine {
    store: Arc<dyn StateStore>,
    config: CoreConfig,
    view: RwLock<DerivedView>,
    /// Collections whose children an observer currently cares about.
    observed: RwLock<HashSet<NodeId>>,
    debouncer: Debouncer,
    revision: watch::Sender<u64>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl HierarchyEngine {
    pub fn new(store: Arc<dyn StateStore>, config: CoreConfig) -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            debouncer: Debouncer::new(config.debounce),
            store,
            config,
            view: RwLock::new(DerivedView::default()),
            observed: RwLock::new(HashSet::new()),
            revision,
            pump: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Start routing store notifications into debounced recomputes.
    /// Idempotent. The pump holds no strong reference to the engine and
    /// exits once the engine is dropped or the store closes its stream.
    pub fn start(self: &Arc<Self>) {
        let mut pump = self.pump.lock();
        if pump.is_some() {
            return;
        }
        let mut events = self.store.subscribe();
        let weak = Arc::downgrade(self);
        *pump = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(engine) = weak.upgrade() else { break };
                        engine.route(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "notification stream lagged; refreshing every scope");
                        let Some(engine) = weak.upgrade() else { break };
                        engine.poke(Scope::Collections);
                        let observed: Vec<NodeId> =
                            engine.observed.read().iter().cloned().collect();
                        for id in observed {
                            engine.poke(Scope::Children(id));
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Stop the pump and cancel every pending recompute timer.
    pub fn stop(&self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
        self.debouncer.cancel_all();
    }

    fn route(self: &Arc<Self>, event: StoreEvent) {
        match event {
            StoreEvent::NodeChanged(id) | StoreEvent::NameChanged(id) => {
                self.poke(Scope::Collections);
                // A membership or name flip on a cached child belongs to
                // the child lists that carry it.
                let holders: Vec<NodeId> = {
                    let view = self.view.read();
                    view.children
                        .iter()
                        .filter(|(_, children)| children.iter().any(|child| child.id == id))
                        .map(|(parent, _)| parent.clone())
                        .collect()
                };
                for parent in holders {
                    self.poke(Scope::Children(parent));
                }
            }
            StoreEvent::EdgeChanged {
                node,
                half: EdgeHalf::Child,
                ..
            } => {
                if self.observed.read().contains(&node) {
                    self.poke(Scope::Children(node));
                }
            }
            StoreEvent::EdgeChanged { .. } => {}
        }
    }

    fn poke(self: &Arc<Self>, scope: Scope) {
        let weak = Arc::downgrade(self);
        let fire_scope = scope.clone();
        self.debouncer.poke(scope, async move {
            // The observer may be gone by fire time.
            let Some(engine) = weak.upgrade() else { return };
            match fire_scope {
                Scope::Collections => {
                    if let Err(error) = engine.recompute_collections().await {
                        warn!(%error, "collection list recompute failed; keeping stale view");
                    }
                }
                Scope::Children(id) => {
                    if !engine.observed.read().contains(&id) {
                        return;
                    }
                    if let Err(error) = engine.recompute_children(&id).await {
                        warn!(collection = %id, %error, "child list recompute failed; keeping stale view");
                    }
                }
            }
        });
    }

    /// Rebuild the collection list from scratch: every visible node the
    /// local actor has joined that classifies as a collection, in a
    /// stable order.
    pub async fn recompute_collections(&self) -> Result<(), StoreError> {
        let nodes = self.store.visible_nodes().await?;
        let mut collections: Vec<NodeSummary> = nodes
            .iter()
            .filter(|record| record.joined() && record.is_collection())
            .map(|record| record.summary())
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let changed = {
            let mut view = self.view.write();
            if view.collections == collections {
                false
            } else {
                view.collections = collections;
                true
            }
        };
        if changed {
            debug!("collection list replaced");
            self.bump();
        }
        Ok(())
    }

    /// Rebuild one collection's child list from scratch. On a store
    /// failure the previous list stays in place (stale but valid) and
    /// the error is handed back.
    pub async fn recompute_children(&self, id: &NodeId) -> Result<(), StoreError> {
        let children = match fetch_children(self.store.as_ref(), id, &self.config).await {
            Ok(children) => children,
            Err(error) => {
                warn!(collection = %id, %error, "child fetch failed; keeping previous list");
                return Err(error);
            }
        };
        let changed = {
            let mut view = self.view.write();
            match view.children.get(id) {
                Some(existing) if *existing == children => false,
                _ => {
                    view.children.insert(id.clone(), children);
                    true
                }
            }
        };
        if changed {
            debug!(collection = %id, "child list replaced");
            self.bump();
        }
        Ok(())
    }

    /// Declare interest in a collection's children and load them once,
    /// immediately. Later edge changes refresh the list through the
    /// debounced path until `unobserve_children`.
    pub async fn observe_children(&self, id: &NodeId) -> Result<(), StoreError> {
        self.observed.write().insert(id.clone());
        self.recompute_children(id).await
    }

    /// Tear down one children scope: cancel its pending timer and drop
    /// its cached list.
    pub fn unobserve_children(&self, id: &NodeId) {
        self.observed.write().remove(id);
        self.debouncer.cancel(&Scope::Children(id.clone()));
        let dropped = self.view.write().children.remove(id).is_some();
        if dropped {
            self.bump();
        }
    }

    /// Snapshot of the collection list.
    pub fn collections(&self) -> Vec<NodeSummary> {
        self.view.read().collections.clone()
    }

    /// Snapshot of one collection's children; `None` until the first
    /// load for that collection completes.
    pub fn children_of(&self, id: &NodeId) -> Option<Vec<NodeSummary>> {
        self.view.read().children.get(id).cloned()
    }

    /// Revision ticks whenever a snapshot changed; re-read on change.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    // --- the mutation surface exposed to consumers ---

    pub async fn name_availability(&self, name: &str) -> Result<NameAvailability, StoreError> {
        ops::name_availability(self.store.as_ref(), name).await
    }

    pub async fn create_collection(&self, name: &str, topic: &str) -> Result<NodeId, StoreError> {
        ops::create_collection(self.store.as_ref(), name, topic).await
    }

    pub async fn attach_discussion(
        &self,
        discussion: &NodeId,
        collection: &NodeId,
    ) -> AttachOutcome {
        ops::attach_discussion(self.store.as_ref(), discussion, collection).await
    }

    pub async fn update_join_rule(
        &self,
        collection: &NodeId,
        rule: JoinRule,
    ) -> Result<Option<PropagationOutcome>, StoreError> {
        ops::update_join_rule(self.store.as_ref(), collection, rule).await
    }
}

impl Drop for HierarchyEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}
