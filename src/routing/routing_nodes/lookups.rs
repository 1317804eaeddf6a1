impl RoutingNodes {
    /// Changes whenever the routing is mutated. Caches keyed on it stay valid
    /// until the next mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node(&self, node_id: &str) -> Option<&RoutingNode> {
        self.nodes.get(node_id)
    }

    /// Nodes in node-id order.
    pub fn nodes(&self) -> impl Iterator<Item = &RoutingNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn unassigned(&self) -> &[ShardRouting] {
        &self.unassigned
    }

    pub fn has_unassigned(&self) -> bool {
        !self.unassigned.is_empty()
    }

    /// Every copy currently placed on a node.
    pub fn assigned_copies(&self) -> impl Iterator<Item = &ShardRouting> {
        self.nodes.values().flat_map(|node| node.shards().iter())
    }

    /// Looks a copy up by its identity, assigned or not.
    pub fn find_copy(&self, copy_id: u64) -> Option<&ShardRouting> {
        self.assigned_copies()
            .chain(self.unassigned.iter())
            .find(|shard| shard.copy_id == copy_id)
    }

    /// All copies of `shard_id`, placed ones first.
    pub fn copies_of(&self, shard_id: &ShardId) -> Vec<&ShardRouting> {
        self.assigned_copies()
            .chain(self.unassigned.iter())
            .filter(|shard| &shard.shard_id == shard_id)
            .collect()
    }

    /// The primary of `shard_id` if it is started (or started and relocating).
    pub fn active_primary(&self, shard_id: &ShardId) -> Option<&ShardRouting> {
        self.assigned_copies()
            .find(|shard| &shard.shard_id == shard_id && shard.primary && shard.active())
    }

    /// True while any copy of `index` is not yet started: unassigned,
    /// initializing, or relocating.
    pub fn index_has_unsettled_copies(&self, index: &str) -> bool {
        self.assigned_copies()
            .chain(self.unassigned.iter())
            .any(|shard| shard.index() == index && !shard.started())
    }

    pub fn shards_with_state(&self, state: ShardRoutingState) -> Vec<&ShardRouting> {
        self.assigned_copies()
            .chain(self.unassigned.iter())
            .filter(|shard| shard.state == state)
            .collect()
    }

    fn node_of(&self, copy_id: u64) -> Option<String> {
        self.nodes
            .values()
            .find(|node| node.position(copy_id).is_some())
            .map(|node| node.node_id().to_string())
    }
}
