// ============================================================================
// shardgate: shard allocation deciders and durable gateway state
// ============================================================================

pub mod allocation;
pub mod config;
pub mod core;
pub mod gateway;
pub mod metadata;
pub mod routing;
pub mod stream;

// Re-export main types for convenience
pub use allocation::deciders::{
    EvenShardsAllocator, LocalGatewayAllocator, NoopDecider, RebalanceOnlyWhenActiveDecider,
    ReplicaAfterPrimaryActiveDecider, SameShardDecider, ThrottlingDecider,
};
pub use allocation::{AllocationDecider, AllocationDeciders, AllocationService, Decision};
pub use config::{AllocationSettings, ClusterSettings, GatewayFormat, GatewaySettings};
pub use crate::core::{ClusterError, Result};
pub use gateway::{GatewayState, GatewayStateBuilder, GatewayStore, NodeGatewayStates};
pub use metadata::{IndexMetaData, MetaData};
pub use routing::{RoutingNode, RoutingNodes, ShardId, ShardRouting, ShardRoutingState};
