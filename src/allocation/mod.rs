//! Shard allocation: pluggable deciders folded into one verdict.
//!
//! Every operation here runs inside the single serialized cluster-state
//! update context. The deciders see the routing state by reference and never
//! lock it; concurrent use of one `RoutingNodes` is out of contract.

mod decision;
pub mod deciders;
mod service;

pub use decision::Decision;
pub use service::AllocationService;

use crate::config::AllocationSettings;
use crate::routing::{RoutingNode, RoutingNodes, ShardRouting};
use tracing::{Level, event};

/// One allocation policy.
///
/// Every method has a permissive default so a decider only overrides the
/// questions it has an opinion on. The hooks that mutate routing receive the
/// composite they are registered in, so an allocating decider can ask the
/// whole chain before placing a copy.
pub trait AllocationDecider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// May `shard` be placed on (or stay on) `node`?
    fn can_allocate(
        &self,
        _shard: &ShardRouting,
        _node: &RoutingNode,
        _routing: &RoutingNodes,
    ) -> Decision {
        Decision::Yes
    }

    /// May `shard` be moved for load balancing?
    fn can_rebalance(&self, _shard: &ShardRouting, _routing: &RoutingNodes) -> bool {
        true
    }

    /// Chance to place unassigned copies. Returns true if routing changed.
    fn allocate_unassigned(
        &self,
        _deciders: &AllocationDeciders,
        _routing: &mut RoutingNodes,
    ) -> bool {
        false
    }

    /// `started` copies just transitioned to started.
    fn apply_started_shards(
        &self,
        _deciders: &AllocationDeciders,
        _started: &[ShardRouting],
        _routing: &mut RoutingNodes,
    ) {
    }

    /// `failed` copies were lost or abandoned their recovery.
    fn apply_failed_shards(
        &self,
        _deciders: &AllocationDeciders,
        _failed: &[ShardRouting],
        _routing: &mut RoutingNodes,
    ) {
    }
}

/// Ordered chain of deciders.
///
/// The order is fixed at construction. It never changes a verdict, only which
/// decider's diagnostics appear first and, for `allocate_unassigned`, which
/// decider gets to place a copy first.
pub struct AllocationDeciders {
    deciders: Vec<Box<dyn AllocationDecider>>,
}

impl AllocationDeciders {
    pub fn new() -> Self {
        Self {
            deciders: Vec::new(),
        }
    }

    /// Appends a decider to the end of the chain
    pub fn register(&mut self, decider: Box<dyn AllocationDecider>) {
        event!(Level::DEBUG, decider = decider.name(), "registered allocation decider");
        self.deciders.push(decider);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, decider: Box<dyn AllocationDecider>) -> Self {
        self.register(decider);
        self
    }

    /// The fixed default chain: co-location, replica ordering, recovery
    /// throttling, rebalance gating.
    pub fn with_default_deciders(settings: &AllocationSettings) -> Self {
        use deciders::*;

        let mut chain = Self::new();
        chain.register(Box::new(SameShardDecider));
        chain.register(Box::new(ReplicaAfterPrimaryActiveDecider));
        chain.register(Box::new(ThrottlingDecider::new(settings)));
        chain.register(Box::new(RebalanceOnlyWhenActiveDecider));
        chain
    }

    pub fn len(&self) -> usize {
        self.deciders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deciders.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.deciders.iter().map(|d| d.name()).collect()
    }

    pub fn can_allocate(
        &self,
        shard: &ShardRouting,
        node: &RoutingNode,
        routing: &RoutingNodes,
    ) -> Decision {
        Decision::combine(self.deciders.iter().map(|decider| {
            let decision = decider.can_allocate(shard, node, routing);
            if !decision.is_yes() {
                event!(
                    Level::TRACE,
                    decider = decider.name(),
                    shard = %shard,
                    node = node.node_id(),
                    decision = %decision,
                    "allocation not permitted"
                );
            }
            decision
        }))
    }

    /// True only if every decider permits the move.
    pub fn can_rebalance(&self, shard: &ShardRouting, routing: &RoutingNodes) -> bool {
        self.deciders.iter().all(|decider| {
            let allowed = decider.can_rebalance(shard, routing);
            if !allowed {
                event!(
                    Level::TRACE,
                    decider = decider.name(),
                    shard = %shard,
                    "rebalance not permitted"
                );
            }
            allowed
        })
    }

    /// Runs every decider's placement pass in order. Later deciders see the
    /// copies placed by earlier ones.
    pub fn allocate_unassigned(&self, routing: &mut RoutingNodes) -> bool {
        let mut changed = false;
        for decider in &self.deciders {
            changed |= decider.allocate_unassigned(self, routing);
        }
        changed
    }

    pub fn apply_started_shards(&self, started: &[ShardRouting], routing: &mut RoutingNodes) {
        for decider in &self.deciders {
            decider.apply_started_shards(self, started, routing);
        }
    }

    pub fn apply_failed_shards(&self, failed: &[ShardRouting], routing: &mut RoutingNodes) {
        for decider in &self.deciders {
            decider.apply_failed_shards(self, failed, routing);
        }
    }
}

impl Default for AllocationDeciders {
    fn default() -> Self {
        Self::with_default_deciders(&AllocationSettings::default())
    }
}

/// Lets the composing layer keep a handle to a registered decider, e.g. to
/// rebuild throttle bookkeeping or read its counters.
impl<T: AllocationDecider + ?Sized> AllocationDecider for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn can_allocate(
        &self,
        shard: &ShardRouting,
        node: &RoutingNode,
        routing: &RoutingNodes,
    ) -> Decision {
        (**self).can_allocate(shard, node, routing)
    }

    fn can_rebalance(&self, shard: &ShardRouting, routing: &RoutingNodes) -> bool {
        (**self).can_rebalance(shard, routing)
    }

    fn allocate_unassigned(&self, deciders: &AllocationDeciders, routing: &mut RoutingNodes) -> bool {
        (**self).allocate_unassigned(deciders, routing)
    }

    fn apply_started_shards(
        &self,
        deciders: &AllocationDeciders,
        started: &[ShardRouting],
        routing: &mut RoutingNodes,
    ) {
        (**self).apply_started_shards(deciders, started, routing)
    }

    fn apply_failed_shards(
        &self,
        deciders: &AllocationDeciders,
        failed: &[ShardRouting],
        routing: &mut RoutingNodes,
    ) {
        (**self).apply_failed_shards(deciders, failed, routing)
    }
}
