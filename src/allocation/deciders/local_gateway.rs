use crate::allocation::{AllocationDecider, AllocationDeciders, Decision};
use crate::gateway::NodeGatewayStates;
use crate::routing::{RoutingNode, RoutingNodes, ShardRouting};
use tracing::{Level, event};

/// Places primaries back on the node holding the freshest started copy.
///
/// Uses the gateway state each node last reported. An unassigned primary
/// with recorded copies may only go to the live node with the highest
/// recorded version; if none of the recording nodes is live, it waits rather
/// than starting empty elsewhere. Replicas prefer a live node that already
/// holds a recorded copy. Shards nobody recorded are left to later deciders.
pub struct LocalGatewayAllocator {
    states: NodeGatewayStates,
}

impl LocalGatewayAllocator {
    pub fn new(states: NodeGatewayStates) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &NodeGatewayStates {
        &self.states
    }

    /// Live recording nodes, freshest first.
    fn live_records(&self, shard: &ShardRouting, routing: &RoutingNodes) -> (bool, Vec<(String, u64)>) {
        let records = self.states.started_versions(&shard.shard_id);
        let recorded = !records.is_empty();
        let live = records
            .into_iter()
            .filter(|(node_id, _)| routing.node(node_id).is_some())
            .collect();
        (recorded, live)
    }
}

impl AllocationDecider for LocalGatewayAllocator {
    fn name(&self) -> &'static str {
        "local_gateway"
    }

    fn can_allocate(
        &self,
        shard: &ShardRouting,
        node: &RoutingNode,
        routing: &RoutingNodes,
    ) -> Decision {
        if !shard.primary || shard.state.assigned() {
            return Decision::Yes;
        }
        let (recorded, live) = self.live_records(shard, routing);
        if !recorded {
            return Decision::Yes;
        }
        match live.first() {
            Some((_, best)) => {
                let holds_best = live
                    .iter()
                    .any(|(node_id, version)| node_id == node.node_id() && version == best);
                if holds_best {
                    Decision::Yes
                } else {
                    Decision::No
                }
            }
            None => Decision::No,
        }
    }

    fn allocate_unassigned(&self, deciders: &AllocationDeciders, routing: &mut RoutingNodes) -> bool {
        if self.states.is_empty() {
            return false;
        }

        let mut pending = routing.unassigned().to_vec();
        pending.sort_by_key(|shard| !shard.primary);

        let mut changed = false;
        for copy in pending {
            let (recorded, live) = self.live_records(&copy, routing);
            if !recorded {
                continue;
            }
            if live.is_empty() {
                if copy.primary {
                    event!(
                        Level::DEBUG,
                        shard = %copy.shard_id,
                        "primary waits for a node holding its data"
                    );
                }
                continue;
            }

            for (node_id, version) in live {
                let decision = match routing.node(&node_id) {
                    Some(node) => deciders.can_allocate(&copy, node, routing),
                    None => continue,
                };
                if !decision.is_yes() {
                    continue;
                }
                match routing.assign(copy.copy_id, &node_id) {
                    Ok(_) => {
                        event!(
                            Level::INFO,
                            shard = %copy.shard_id,
                            primary = copy.primary,
                            node = %node_id,
                            version,
                            "allocated shard to node holding gateway copy"
                        );
                        changed = true;
                    }
                    Err(err) => {
                        event!(Level::WARN, error = %err, shard = %copy, "gateway allocation failed");
                    }
                }
                break;
            }
        }
        changed
    }
}
