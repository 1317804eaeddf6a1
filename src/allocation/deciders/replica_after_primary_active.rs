use crate::allocation::{AllocationDecider, Decision};
use crate::routing::{RoutingNode, RoutingNodes, ShardRouting};

/// Replicas recover from the primary, so they wait until it has started.
pub struct ReplicaAfterPrimaryActiveDecider;

impl AllocationDecider for ReplicaAfterPrimaryActiveDecider {
    fn name(&self) -> &'static str {
        "replica_after_primary_active"
    }

    fn can_allocate(
        &self,
        shard: &ShardRouting,
        _node: &RoutingNode,
        routing: &RoutingNodes,
    ) -> Decision {
        if shard.primary || routing.active_primary(&shard.shard_id).is_some() {
            Decision::Yes
        } else {
            Decision::No
        }
    }
}
