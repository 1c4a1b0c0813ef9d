use serde::{Deserialize, Serialize};

/// Per-collection join rule. Drives which of the collection's edges are
/// advertised: public collections publish their reverse edges,
/// invite-only collections suppress them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRule {
    Public,
    #[serde(rename = "invite")]
    InviteOnly,
}

/// Directory listing visibility for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}
