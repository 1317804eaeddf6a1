use crate::allocation::{AllocationDecider, Decision};
use crate::routing::{RoutingNode, RoutingNodes, ShardRouting};

/// Never put two copies of the same shard on one node.
pub struct SameShardDecider;

impl AllocationDecider for SameShardDecider {
    fn name(&self) -> &'static str {
        "same_shard"
    }

    fn can_allocate(
        &self,
        shard: &ShardRouting,
        node: &RoutingNode,
        _routing: &RoutingNodes,
    ) -> Decision {
        let colocated = node.shards().iter().any(|hosted| {
            hosted.shard_id == shard.shard_id
                && hosted.copy_id != shard.copy_id
                && hosted.state.assigned()
        });
        if colocated {
            Decision::No
        } else {
            Decision::Yes
        }
    }
}
