impl RoutingNodes {
    /// Places an unassigned copy on `node_id`; the copy becomes initializing.
    pub fn assign(&mut self, copy_id: u64, node_id: &str) -> Result<ShardRouting> {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return Err(ClusterError::RoutingError(format!(
                "cannot assign copy {} to unknown node '{}'",
                copy_id, node_id
            )));
        };
        let Some(pos) = self.unassigned.iter().position(|s| s.copy_id == copy_id) else {
            return Err(ClusterError::RoutingError(format!(
                "copy {} is not unassigned",
                copy_id
            )));
        };

        let mut shard = self.unassigned.remove(pos);
        shard.state = ShardRoutingState::Initializing;
        shard.current_node_id = Some(node_id.to_string());
        node.push(shard.clone());
        self.touch();
        Ok(shard)
    }

    /// Marks an initializing copy as started.
    ///
    /// Starting a relocation target drops its relocating source. Returns false
    /// when the copy is unknown or not initializing.
    pub fn start(&mut self, copy_id: u64) -> Result<bool> {
        let Some(node_id) = self.node_of(copy_id) else {
            return Ok(false);
        };
        let Some(shard) = self
            .nodes
            .get_mut(&node_id)
            .and_then(|node| node.shard_mut(copy_id))
        else {
            return Ok(false);
        };
        if !shard.initializing() {
            return Ok(false);
        }

        shard.state = ShardRoutingState::Started;
        let source = shard.relocating_node_id.take();
        let shard_id = shard.shard_id.clone();

        if let Some(source_node) = source {
            if let Some(node) = self.nodes.get_mut(&source_node) {
                let source_copy = node
                    .shards()
                    .iter()
                    .find(|s| {
                        s.shard_id == shard_id
                            && s.relocating()
                            && s.relocating_node_id.as_deref() == Some(node_id.as_str())
                    })
                    .map(|s| s.copy_id);
                if let Some(id) = source_copy {
                    node.remove(id);
                }
            }
        }
        self.touch();
        Ok(true)
    }

    /// Fails an assigned copy.
    ///
    /// A failed relocation target only cancels the relocation. Any other copy
    /// goes back to the unassigned list under a fresh copy id; when it was a
    /// primary, a started replica is promoted in its place. Returns false when
    /// the copy is unknown or already unassigned.
    pub fn fail(&mut self, copy_id: u64) -> Result<bool> {
        let Some(node_id) = self.node_of(copy_id) else {
            return Ok(false);
        };
        let Some(shard) = self
            .nodes
            .get_mut(&node_id)
            .and_then(|node| node.remove(copy_id))
        else {
            return Ok(false);
        };
        self.touch();

        if shard.is_relocation_target() {
            if let Some(source_node) = &shard.relocating_node_id {
                if let Some(source) = self.nodes.get_mut(source_node).and_then(|node| {
                    node.shards_mut().find(|s| {
                        s.shard_id == shard.shard_id
                            && s.relocating()
                            && s.relocating_node_id.as_deref() == Some(node_id.as_str())
                    })
                }) {
                    source.state = ShardRoutingState::Started;
                    source.relocating_node_id = None;
                }
            }
            return Ok(true);
        }

        if shard.relocating() {
            if let Some(target_node) = &shard.relocating_node_id {
                if let Some(node) = self.nodes.get_mut(target_node) {
                    let target = node
                        .shards()
                        .iter()
                        .find(|s| {
                            s.shard_id == shard.shard_id
                                && s.is_relocation_target()
                                && s.relocating_node_id.as_deref() == Some(node_id.as_str())
                        })
                        .map(|s| s.copy_id);
                    if let Some(id) = target {
                        node.remove(id);
                    }
                }
            }
        }

        self.return_to_unassigned(shard);
        Ok(true)
    }

    /// Starts moving a started copy to `target_node`.
    ///
    /// The source becomes relocating and a new initializing copy is placed on
    /// the target. Returns the target copy.
    pub fn relocate(&mut self, copy_id: u64, target_node: &str) -> Result<ShardRouting> {
        if !self.nodes.contains_key(target_node) {
            return Err(ClusterError::RoutingError(format!(
                "cannot relocate copy {} to unknown node '{}'",
                copy_id, target_node
            )));
        }
        let Some(source_node) = self.node_of(copy_id) else {
            return Err(ClusterError::RoutingError(format!(
                "copy {} is not assigned",
                copy_id
            )));
        };
        if source_node == target_node {
            return Err(ClusterError::RoutingError(format!(
                "copy {} already lives on '{}'",
                copy_id, target_node
            )));
        }

        let target_copy_id = self.allocate_copy_id();
        let Some(source) = self
            .nodes
            .get_mut(&source_node)
            .and_then(|node| node.shard_mut(copy_id))
        else {
            return Err(ClusterError::RoutingError(format!(
                "copy {} vanished from '{}'",
                copy_id, source_node
            )));
        };
        if !source.started() {
            return Err(ClusterError::RoutingError(format!(
                "only started copies can relocate, copy {} is {}",
                copy_id, source.state
            )));
        }

        source.state = ShardRoutingState::Relocating;
        source.relocating_node_id = Some(target_node.to_string());
        let target = ShardRouting {
            shard_id: source.shard_id.clone(),
            copy_id: target_copy_id,
            current_node_id: Some(target_node.to_string()),
            relocating_node_id: Some(source_node),
            primary: source.primary,
            state: ShardRoutingState::Initializing,
        };

        if let Some(node) = self.nodes.get_mut(target_node) {
            node.push(target.clone());
        }
        self.touch();
        Ok(target)
    }

    /// Removes a node, failing every copy it hosted. Returns the failed copies
    /// as they were before the failure.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Vec<ShardRouting>> {
        let Some(node) = self.nodes.get(node_id) else {
            return Err(ClusterError::RoutingError(format!(
                "unknown node '{}'",
                node_id
            )));
        };

        let hosted = node.shards().to_vec();
        let mut failed = Vec::with_capacity(hosted.len());
        for copy in hosted {
            if self.fail(copy.copy_id)? {
                failed.push(copy);
            }
        }
        self.nodes.remove(node_id);
        self.touch();
        Ok(failed)
    }

    fn return_to_unassigned(&mut self, shard: ShardRouting) {
        let mut primary = shard.primary;
        if primary {
            let promoted = self
                .nodes
                .values_mut()
                .flat_map(|node| node.shards_mut())
                .find(|s| s.shard_id == shard.shard_id && !s.primary && s.started());
            if let Some(replica) = promoted {
                replica.primary = true;
                primary = false;
            }
        }
        let copy_id = self.allocate_copy_id();
        self.unassigned
            .push(ShardRouting::unassigned(shard.shard_id, copy_id, primary));
    }
}
