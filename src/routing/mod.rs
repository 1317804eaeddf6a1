//! Routing model: which shard copies live on which node, and in what state.
//!
//! `RoutingNodes` is a single-owner mutable structure. Callers serialize every
//! query and mutation against one instance; nothing in here locks.

mod node;
mod routing_nodes;
mod shard_id;
mod shard_routing;

pub use node::RoutingNode;
pub use routing_nodes::RoutingNodes;
pub use shard_id::ShardId;
pub use shard_routing::{ShardRouting, ShardRoutingState};
