impl RoutingNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a routing table with every copy of every index unassigned.
    pub fn from_metadata(metadata: &MetaData) -> Self {
        let mut routing = Self::new();
        for index in metadata.indices() {
            routing.push_index_copies(index);
        }
        routing
    }

    /// Registers a node with no shards. Returns false if it was already known.
    pub fn add_node(&mut self, node_id: impl Into<String>) -> Result<bool> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(ClusterError::RoutingError(
                "node_id must not be empty".to_string(),
            ));
        }
        if self.nodes.contains_key(&node_id) {
            return Ok(false);
        }
        self.nodes.insert(node_id.clone(), RoutingNode::new(node_id));
        self.touch();
        Ok(true)
    }

    /// Adds one primary and `number_of_replicas` replicas per shard, all unassigned.
    pub fn add_index(&mut self, index: &IndexMetaData) -> Result<()> {
        if index.number_of_shards == 0 {
            return Err(ClusterError::RoutingError(format!(
                "index '{}' must have at least one shard",
                index.index
            )));
        }
        let exists = self.unassigned.iter().any(|s| s.index() == index.index)
            || self.assigned_copies().any(|s| s.index() == index.index);
        if exists {
            return Err(ClusterError::RoutingError(format!(
                "index '{}' is already routed",
                index.index
            )));
        }
        self.push_index_copies(index);
        Ok(())
    }

    fn push_index_copies(&mut self, index: &IndexMetaData) {
        self.touch();
        for id in 0..index.number_of_shards {
            let shard_id = ShardId::new(index.index.clone(), id);
            let copy_id = self.allocate_copy_id();
            self.unassigned
                .push(ShardRouting::unassigned(shard_id.clone(), copy_id, true));
            for _ in 0..index.number_of_replicas {
                let copy_id = self.allocate_copy_id();
                self.unassigned
                    .push(ShardRouting::unassigned(shard_id.clone(), copy_id, false));
            }
        }
    }

    fn touch(&mut self) {
        self.generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
    }

    fn allocate_copy_id(&mut self) -> u64 {
        let id = self.next_copy_id;
        self.next_copy_id = self.next_copy_id.saturating_add(1);
        id
    }
}
