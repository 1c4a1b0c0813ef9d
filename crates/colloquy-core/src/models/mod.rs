pub mod edge;
pub mod node;
pub mod policy;

pub use edge::{EdgeContent, EdgeHalf, EdgePayload, EdgeRecord};
pub use node::{Membership, NodeId, NodeKind, NodeRecord, NodeSummary};
pub use policy::{JoinRule, Visibility};
