use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::NodeId;
use crate::constants::records;

/// Which directional half of an edge a record represents.
///
/// An edge exists as two independently written records: a child record
/// on the parent and a parent record on the child. The halves are
/// written separately, fail separately, and are not guaranteed to agree
/// at any instant. Nothing in this crate assumes both exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeHalf {
    Child,
    Parent,
}

impl EdgeHalf {
    /// Record type this half is stored under.
    pub fn record_type(self) -> &'static str {
        match self {
            EdgeHalf::Child => records::CHILD_EDGE,
            EdgeHalf::Parent => records::PARENT_EDGE,
        }
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Versioned payload carried by an edge record.
///
/// `private` is the suppression marker. Fields this crate does not own
/// ride along in `rest`, so a rewrite only ever touches the marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgePayload {
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Content of one directional edge record.
///
/// Routing hints sit at the top level; everything else lives under a
/// versioned payload key. A record whose payload is absent carries no
/// reference data and is never rewritten by propagation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeContent {
    /// Server hints needed to resolve the node at the other end.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<String>,
    #[serde(rename = "v1", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EdgePayload>,
}

impl EdgeContent {
    /// A plain routed edge with no payload, as attach writes it.
    pub fn routed(via: Vec<String>) -> Self {
        Self { via, payload: None }
    }

    /// Suppressed iff the payload carries the private marker.
    pub fn is_suppressed(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| p.private)
    }

    /// Advertised iff there is reference data and it is not private.
    pub fn is_advertised(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| !p.private)
    }

    /// True when the content was cleared entirely; the edge no longer
    /// resolves and traversals skip it.
    pub fn is_void(&self) -> bool {
        self.via.is_empty() && self.payload.is_none()
    }
}

/// One directional edge record as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    /// Node the record is stored on.
    pub node: NodeId,
    pub half: EdgeHalf,
    /// Record key: the node at the other end of the edge.
    pub key: NodeId,
    pub content: EdgeContent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suppression_reads() {
        let mut content = EdgeContent::routed(vec!["example.org".to_string()]);
        assert!(!content.is_suppressed());
        assert!(!content.is_advertised()); // no reference data at all

        content.payload = Some(EdgePayload::default());
        assert!(content.is_advertised());

        content.payload.as_mut().unwrap().private = true;
        assert!(content.is_suppressed());
        assert!(!content.is_advertised());
    }

    #[test]
    fn cleared_content_is_void() {
        assert!(EdgeContent::default().is_void());
        assert!(!EdgeContent::routed(vec!["example.org".to_string()]).is_void());
    }

    #[test]
    fn unknown_payload_fields_survive_a_rewrite() {
        let raw = json!({
            "via": ["example.org"],
            "v1": { "private": true, "annotation": "p.14", "color": "#a0c" }
        });
        let mut content: EdgeContent = serde_json::from_value(raw).unwrap();
        assert!(content.is_suppressed());

        // Clear the marker the way propagation does and round-trip.
        content.payload.as_mut().unwrap().private = false;
        let out = serde_json::to_value(&content).unwrap();
        assert_eq!(out["v1"]["annotation"], "p.14");
        assert_eq!(out["v1"]["color"], "#a0c");
        // A cleared marker is dropped, not written as false.
        assert!(out["v1"].get("private").is_none());
    }

    #[test]
    fn half_record_types_differ() {
        assert_ne!(
            EdgeHalf::Child.record_type(),
            EdgeHalf::Parent.record_type()
        );
    }
}
