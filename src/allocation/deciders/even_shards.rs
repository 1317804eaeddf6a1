use crate::allocation::{AllocationDecider, AllocationDeciders};
use crate::routing::{RoutingNodes, ShardRouting};
use tracing::{Level, event};

/// Places unassigned copies, primaries first, on the least loaded node the
/// decider chain accepts.
pub struct EvenShardsAllocator;

impl EvenShardsAllocator {
    /// Node ids ordered by hosted copies, then by id.
    fn nodes_by_load(routing: &RoutingNodes) -> Vec<String> {
        let mut nodes: Vec<(usize, String)> = routing
            .nodes()
            .map(|node| (node.len(), node.node_id().to_string()))
            .collect();
        nodes.sort();
        nodes.into_iter().map(|(_, node_id)| node_id).collect()
    }
}

impl AllocationDecider for EvenShardsAllocator {
    fn name(&self) -> &'static str {
        "even_shards"
    }

    fn allocate_unassigned(&self, deciders: &AllocationDeciders, routing: &mut RoutingNodes) -> bool {
        let mut pending: Vec<ShardRouting> = routing.unassigned().to_vec();
        pending.sort_by(|a, b| {
            b.primary
                .cmp(&a.primary)
                .then_with(|| a.shard_id.cmp(&b.shard_id))
                .then_with(|| a.copy_id.cmp(&b.copy_id))
        });

        let mut changed = false;
        for copy in pending {
            for node_id in Self::nodes_by_load(routing) {
                let decision = match routing.node(&node_id) {
                    Some(node) => deciders.can_allocate(&copy, node, routing),
                    None => continue,
                };
                if !decision.is_yes() {
                    continue;
                }
                match routing.assign(copy.copy_id, &node_id) {
                    Ok(assigned) => {
                        event!(Level::DEBUG, shard = %assigned, "allocated unassigned shard");
                        changed = true;
                    }
                    Err(err) => {
                        event!(Level::WARN, error = %err, shard = %copy, "allocation failed");
                    }
                }
                break;
            }
        }
        changed
    }
}
