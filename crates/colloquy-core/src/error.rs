//! Error taxonomy for store-facing operations.

use crate::models::NodeId;

/// A failure reported by the state store.
///
/// `NotFound` is a distinguishing signal rather than a hard failure:
/// the name availability probe reads it as "alias free". `Denied` and
/// `Transport` are surfaced to the caller once and never retried here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    Denied(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// One edge write that failed while others were allowed to proceed.
///
/// Collected by propagation and attach outcomes; the write is not
/// retried and nothing that already landed is rolled back.
#[derive(Debug, Clone)]
pub struct EdgeWriteFailure {
    /// Node the record lives on.
    pub node: NodeId,
    /// Record key: the node at the other end of the edge.
    pub key: NodeId,
    pub error: StoreError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        assert!(StoreError::NotFound("#books".into()).is_not_found());
        assert!(!StoreError::Denied("no power level".into()).is_not_found());
        assert!(!StoreError::Transport("connection reset".into()).is_not_found());
    }
}
