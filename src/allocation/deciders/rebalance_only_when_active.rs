use crate::allocation::AllocationDecider;
use crate::routing::{RoutingNodes, ShardRouting};

/// Holds rebalancing back until every copy of the shard's index has started.
pub struct RebalanceOnlyWhenActiveDecider;

impl AllocationDecider for RebalanceOnlyWhenActiveDecider {
    fn name(&self) -> &'static str {
        "rebalance_only_when_active"
    }

    fn can_rebalance(&self, shard: &ShardRouting, routing: &RoutingNodes) -> bool {
        !routing.index_has_unsettled_copies(shard.index())
    }
}
