use crate::metadata::MetaData;
use crate::routing::{RoutingNode, ShardId};
use std::collections::HashMap;
use std::sync::Arc;

/// Durable snapshot of what one node knows: a version, the cluster metadata
/// as of that version, and the shard copies confirmed started on the node.
///
/// A shard present in `shards` reached the started state at the recorded
/// version. Absence only means "not known to have started".
///
/// Values are never mutated. Use [`GatewayState::to_builder`] to derive the
/// next version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayState {
    version: u64,
    metadata: Arc<MetaData>,
    shards: HashMap<ShardId, u64>,
}

impl GatewayState {
    pub fn builder() -> GatewayStateBuilder {
        GatewayStateBuilder::new()
    }

    /// Seeds a builder with a copy of this state.
    pub fn to_builder(&self) -> GatewayStateBuilder {
        GatewayStateBuilder::new().state(self)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    pub fn shards(&self) -> &HashMap<ShardId, u64> {
        &self.shards
    }

    /// Version at which `shard_id` was last confirmed started.
    pub fn started_shard_version(&self, shard_id: &ShardId) -> Option<u64> {
        self.shards.get(shard_id).copied()
    }

    /// Shard entries sorted by shard id, for stable output.
    pub fn sorted_shards(&self) -> Vec<(&ShardId, u64)> {
        let mut entries: Vec<(&ShardId, u64)> =
            self.shards.iter().map(|(id, version)| (id, *version)).collect();
        entries.sort();
        entries
    }
}

/// Staging area for the next [`GatewayState`].
///
/// Owns its shard map outright; metadata is shared with the seed state since
/// it is immutable itself.
#[derive(Debug, Clone, Default)]
pub struct GatewayStateBuilder {
    version: u64,
    metadata: Arc<MetaData>,
    shards: HashMap<ShardId, u64>,
}

impl GatewayStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies version, metadata and shard map from `state`.
    pub fn state(mut self, state: &GatewayState) -> Self {
        self.version = state.version;
        self.metadata = Arc::clone(&state.metadata);
        self.shards = state.shards.clone();
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn metadata(mut self, metadata: MetaData) -> Self {
        self.metadata = Arc::new(metadata);
        self
    }

    pub fn shared_metadata(mut self, metadata: Arc<MetaData>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn put(mut self, shard_id: ShardId, version: u64) -> Self {
        self.shards.insert(shard_id, version);
        self
    }

    pub fn remove(mut self, shard_id: &ShardId) -> Self {
        self.shards.remove(shard_id);
        self
    }

    /// Reconciles the shard map with the copies hosted by `node`.
    ///
    /// Newly active copies are recorded at the builder's current version;
    /// copies already recorded keep their version. Recorded shards with no
    /// active copy on the node are dropped.
    pub fn sync_started_shards(mut self, node: &RoutingNode) -> Self {
        let active: Vec<&ShardId> = node
            .shards()
            .iter()
            .filter(|shard| shard.active())
            .map(|shard| &shard.shard_id)
            .collect();

        self.shards.retain(|shard_id, _| active.contains(&shard_id));
        for shard_id in active {
            self.shards.entry(shard_id.clone()).or_insert(self.version);
        }
        self
    }

    pub fn build(self) -> GatewayState {
        GatewayState {
            version: self.version,
            metadata: self.metadata,
            shards: self.shards,
        }
    }
}
