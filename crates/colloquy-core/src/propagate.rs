//! Visibility propagation: converge every known reverse edge of a
//! collection toward its current join rule.
//!
//! Each edge is one independent write against a different node. There
//! is no transaction to lean on, so there is no rollback and no retry:
//! a write either lands or is reported, and the rest proceed.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::{EdgeWriteFailure, StoreError};
use crate::models::{EdgeContent, EdgeHalf, JoinRule, NodeId};
use crate::store::StateStore;

/// What one propagation pass did.
///
/// Completed-with-errors is a normal outcome: the failed writes are
/// listed, the successful ones stand.
#[derive(Debug, Default)]
pub struct PropagationOutcome {
    /// Parents whose child record was rewritten.
    pub updated: Vec<NodeId>,
    /// Records left alone: no reference data, or already converged.
    pub skipped: usize,
    pub failures: Vec<EdgeWriteFailure>,
}

impl PropagationOutcome {
    pub fn fully_converged(&self) -> bool {
        self.failures.is_empty()
    }
}

/// New content for a reference record, or `None` when the record must
/// be skipped: it carries no reference data, or it already matches
/// `rule`. Skipping converged records keeps repeated passes idempotent.
fn rewritten_content(current: &EdgeContent, rule: JoinRule, home_server: &str) -> Option<EdgeContent> {
    let payload = current.payload.as_ref()?;
    let mut next = payload.clone();
    match rule {
        JoinRule::Public => {
            if !payload.private {
                return None;
            }
            next.private = false;
        }
        JoinRule::InviteOnly => {
            if payload.private {
                return None;
            }
            next.private = true;
        }
    }
    Some(EdgeContent {
        via: vec![home_server.to_string()],
        payload: Some(next),
    })
}

/// Push `rule` out to every known parent-reference edge of `collection`.
///
/// The records mutated are the child-half records held by the parents
/// that this collection's own parent-half records point at: the node's
/// inbound declarations, not its outbound children. All writes run
/// concurrently and settle independently; a `?` here covers only the
/// reads needed to learn the edge set.
pub async fn propagate<S: StateStore + ?Sized>(
    store: &S,
    collection: &NodeId,
    rule: JoinRule,
) -> Result<PropagationOutcome, StoreError> {
    let parents = store.edge_records(collection, EdgeHalf::Parent).await?;
    let home_server = store.home_server();

    let mut outcome = PropagationOutcome::default();
    let mut writes: Vec<(NodeId, EdgeContent)> = Vec::new();

    for parent_ref in parents {
        let parent = parent_ref.key;
        let reference = match store.edge_record(&parent, EdgeHalf::Child, collection).await? {
            Some(record) => record,
            None => {
                outcome.skipped += 1;
                continue;
            }
        };
        match rewritten_content(&reference.content, rule, &home_server) {
            Some(next) => writes.push((parent, next)),
            None => outcome.skipped += 1,
        }
    }

    let settled = join_all(writes.into_iter().map(|(parent, content)| async move {
        let result = store
            .write_edge_record(&parent, EdgeHalf::Child, content, collection)
            .await;
        (parent, result)
    }))
    .await;

    for (parent, result) in settled {
        match result {
            Ok(()) => outcome.updated.push(parent),
            Err(error) => {
                warn!(collection = %collection, parent = %parent, %error, "edge write failed during propagation");
                outcome.failures.push(EdgeWriteFailure {
                    node: parent,
                    key: collection.clone(),
                    error,
                });
            }
        }
    }

    debug!(
        collection = %collection,
        updated = outcome.updated.len(),
        skipped = outcome.skipped,
        failed = outcome.failures.len(),
        "propagation settled"
    );
    Ok(outcome)
}
