use super::{ShardId, ShardRouting, ShardRoutingState};

/// The shard copies hosted by a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingNode {
    node_id: String,
    shards: Vec<ShardRouting>,
}

impl RoutingNode {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            shards: Vec::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn shards(&self) -> &[ShardRouting] {
        &self.shards
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Counts hosted copies that are in any of `states`.
    pub fn number_of_shards_with_state(&self, states: &[ShardRoutingState]) -> usize {
        self.shards
            .iter()
            .filter(|shard| states.contains(&shard.state))
            .count()
    }

    /// Returns the copy of `shard_id` hosted here, if any.
    pub fn copy_of(&self, shard_id: &ShardId) -> Option<&ShardRouting> {
        self.shards.iter().find(|shard| &shard.shard_id == shard_id)
    }

    pub(super) fn push(&mut self, shard: ShardRouting) {
        self.shards.push(shard);
    }

    pub(super) fn position(&self, copy_id: u64) -> Option<usize> {
        self.shards.iter().position(|shard| shard.copy_id == copy_id)
    }

    pub(super) fn shard_mut(&mut self, copy_id: u64) -> Option<&mut ShardRouting> {
        self.shards.iter_mut().find(|shard| shard.copy_id == copy_id)
    }

    pub(super) fn shards_mut(&mut self) -> std::slice::IterMut<'_, ShardRouting> {
        self.shards.iter_mut()
    }

    pub(super) fn remove(&mut self, copy_id: u64) -> Option<ShardRouting> {
        let pos = self.position(copy_id)?;
        Some(self.shards.remove(pos))
    }
}
