use super::deciders::{EvenShardsAllocator, LocalGatewayAllocator};
use super::{AllocationDeciders, Decision};
use crate::config::AllocationSettings;
use crate::core::Result;
use crate::gateway::NodeGatewayStates;
use crate::routing::{RoutingNodes, ShardRouting};
use tracing::{Level, event, info_span};

/// Drives the decider chain over a routing table in response to cluster
/// events: shards starting or failing, nodes joining or leaving.
///
/// Each entry point applies the routing transition, notifies the deciders,
/// then reroutes. The caller owns the `RoutingNodes` and must not run two
/// entry points against the same instance concurrently.
pub struct AllocationService {
    deciders: AllocationDeciders,
}

impl AllocationService {
    /// Default chain followed by the even-count allocator.
    pub fn new(settings: &AllocationSettings) -> Self {
        Self::with_deciders(
            AllocationDeciders::with_default_deciders(settings)
                .with(Box::new(EvenShardsAllocator)),
        )
    }

    /// Default chain, then the local gateway allocator, then the even-count
    /// allocator for shards no node has data for.
    pub fn with_gateway_states(settings: &AllocationSettings, states: NodeGatewayStates) -> Self {
        Self::with_deciders(
            AllocationDeciders::with_default_deciders(settings)
                .with(Box::new(LocalGatewayAllocator::new(states)))
                .with(Box::new(EvenShardsAllocator)),
        )
    }

    pub fn with_deciders(deciders: AllocationDeciders) -> Self {
        Self { deciders }
    }

    pub fn deciders(&self) -> &AllocationDeciders {
        &self.deciders
    }

    /// Allocates what it can, then rebalances. Returns true if routing changed.
    pub fn reroute(&self, routing: &mut RoutingNodes) -> bool {
        let span = info_span!("allocation.reroute", unassigned = routing.unassigned().len());
        let _guard = span.enter();

        let mut changed = self.deciders.allocate_unassigned(routing);
        changed |= self.rebalance(routing);
        event!(Level::DEBUG, changed, "reroute finished");
        changed
    }

    pub fn apply_started_shards(
        &self,
        routing: &mut RoutingNodes,
        started: &[ShardRouting],
    ) -> Result<bool> {
        let span = info_span!("allocation.apply_started", count = started.len());
        let _guard = span.enter();

        let mut applied = Vec::with_capacity(started.len());
        for shard in started {
            if routing.start(shard.copy_id)? {
                if let Some(current) = routing.find_copy(shard.copy_id) {
                    applied.push(current.clone());
                }
            } else {
                event!(Level::DEBUG, shard = %shard, "ignoring start of non-initializing copy");
            }
        }

        self.deciders.apply_started_shards(&applied, routing);
        let rerouted = self.reroute(routing);
        Ok(!applied.is_empty() || rerouted)
    }

    pub fn apply_failed_shards(
        &self,
        routing: &mut RoutingNodes,
        failed: &[ShardRouting],
    ) -> Result<bool> {
        let span = info_span!("allocation.apply_failed", count = failed.len());
        let _guard = span.enter();

        let mut applied = Vec::with_capacity(failed.len());
        for shard in failed {
            if routing.fail(shard.copy_id)? {
                event!(Level::INFO, shard = %shard, "shard copy failed");
                applied.push(shard.clone());
            } else {
                event!(Level::DEBUG, shard = %shard, "ignoring failure of unknown copy");
            }
        }

        self.deciders.apply_failed_shards(&applied, routing);
        let rerouted = self.reroute(routing);
        Ok(!applied.is_empty() || rerouted)
    }

    pub fn node_joined(&self, routing: &mut RoutingNodes, node_id: &str) -> Result<bool> {
        let added = routing.add_node(node_id)?;
        if added {
            event!(Level::INFO, node = node_id, "node joined");
        }
        let rerouted = self.reroute(routing);
        Ok(added || rerouted)
    }

    /// Fails every copy the node hosted and reroutes them.
    pub fn node_left(&self, routing: &mut RoutingNodes, node_id: &str) -> Result<bool> {
        let span = info_span!("allocation.node_left", node = node_id);
        let _guard = span.enter();

        let failed = routing.remove_node(node_id)?;
        event!(Level::INFO, node = node_id, failed = failed.len(), "node left");
        self.deciders.apply_failed_shards(&failed, routing);
        self.reroute(routing);
        Ok(true)
    }

    /// Moves started copies from the most loaded node to the least loaded one
    /// while the gap is larger than one copy and the deciders agree.
    pub fn rebalance(&self, routing: &mut RoutingNodes) -> bool {
        let mut changed = false;
        let max_moves = routing.assigned_copies().count();

        for _ in 0..max_moves {
            let mut loads: Vec<(usize, String)> = routing
                .nodes()
                .map(|node| {
                    let load = node.shards().iter().filter(|s| !s.relocating()).count();
                    (load, node.node_id().to_string())
                })
                .collect();
            if loads.len() < 2 {
                break;
            }
            loads.sort();
            let (light_load, light) = loads[0].clone();
            let (heavy_load, heavy) = loads[loads.len() - 1].clone();
            if heavy_load <= light_load + 1 {
                break;
            }

            let candidate = match (routing.node(&heavy), routing.node(&light)) {
                (Some(heavy_node), Some(light_node)) => heavy_node
                    .shards()
                    .iter()
                    .filter(|shard| shard.started())
                    .find(|shard| {
                        self.deciders.can_rebalance(shard, routing)
                            && self.deciders.can_allocate(shard, light_node, routing)
                                == Decision::Yes
                    })
                    .map(|shard| shard.copy_id),
                _ => None,
            };
            let Some(copy_id) = candidate else {
                break;
            };

            match routing.relocate(copy_id, &light) {
                Ok(target) => {
                    event!(
                        Level::INFO,
                        shard = %target.shard_id,
                        from = %heavy,
                        to = %light,
                        "relocating shard for balance"
                    );
                    changed = true;
                }
                Err(err) => {
                    event!(Level::WARN, error = %err, "rebalance relocation failed");
                    break;
                }
            }
        }
        changed
    }
}
