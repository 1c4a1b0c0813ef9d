use serde::{Deserialize, Serialize};

/// Opaque, globally unique node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The local actor's membership in a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Joined,
    NotJoined,
}

/// What a node is, as far as the derived view cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Grouping node with no attached resource.
    Collection,
    /// Leaf node.
    Discussion,
}

/// Raw node facts as the store reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub membership: Membership,
    pub avatar: Option<String>,
    /// The creation record declared a grouping type.
    pub grouping: bool,
    /// The node carries an attached resource payload.
    pub has_resource: bool,
}

impl NodeRecord {
    /// A node is a collection iff it was created as a grouping node and
    /// carries no resource. Everything else is treated as a leaf.
    pub fn kind(&self) -> NodeKind {
        if self.grouping && !self.has_resource {
            NodeKind::Collection
        } else {
            NodeKind::Discussion
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind() == NodeKind::Collection
    }

    pub fn joined(&self) -> bool {
        self.membership == Membership::Joined
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id.clone(),
            kind: self.kind(),
            name: self.name.clone(),
            membership: self.membership,
            avatar: self.avatar.clone(),
        }
    }
}

/// Snapshot of one node as the derived view carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub membership: Membership,
    pub avatar: Option<String>,
}

impl NodeSummary {
    pub fn joined(&self) -> bool {
        self.membership == Membership::Joined
    }
}
