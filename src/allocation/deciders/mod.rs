//! Concrete allocation deciders.
//!
//! The first four form the fixed default chain. The two allocators place
//! unassigned copies and are added by the composing layer.

mod even_shards;
mod local_gateway;
mod noop;
mod rebalance_only_when_active;
mod replica_after_primary_active;
mod same_shard;
mod throttling;

pub use even_shards::EvenShardsAllocator;
pub use local_gateway::LocalGatewayAllocator;
pub use noop::NoopDecider;
pub use rebalance_only_when_active::RebalanceOnlyWhenActiveDecider;
pub use replica_after_primary_active::ReplicaAfterPrimaryActiveDecider;
pub use same_shard::SameShardDecider;
pub use throttling::ThrottlingDecider;
