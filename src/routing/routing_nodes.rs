use super::{RoutingNode, ShardId, ShardRouting, ShardRoutingState};
use crate::core::{ClusterError, Result};
use crate::metadata::{IndexMetaData, MetaData};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Cluster-wide view of every shard copy: the ones placed on nodes and the
/// ones still waiting for a node.
#[derive(Debug, Clone, Default)]
pub struct RoutingNodes {
    nodes: BTreeMap<String, RoutingNode>,
    unassigned: Vec<ShardRouting>,
    next_copy_id: u64,
    /// Stamp replaced on every mutation. Stamps are drawn from one process-wide
    /// counter, so two tables share a stamp only when one is an unmutated
    /// clone of the other, or both are still empty at 0.
    generation: u64,
}

// Routing behavior is split by concern, mirroring the lookup/mutation boundary.
include!("routing_nodes/construct.rs");
include!("routing_nodes/lookups.rs");
include!("routing_nodes/mutations.rs");
