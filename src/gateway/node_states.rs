use super::GatewayState;
use crate::routing::ShardId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Last known gateway state of every node, shared between the composing
/// layer (which records states as nodes report them) and the gateway
/// allocator (which reads them during allocation passes).
#[derive(Debug, Clone, Default)]
pub struct NodeGatewayStates {
    inner: Arc<RwLock<BTreeMap<String, Arc<GatewayState>>>>,
}

impl NodeGatewayStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `state` for `node_id`, replacing any older one. A state with a
    /// lower version than the recorded one is ignored; returns whether the
    /// record changed.
    pub fn put(&self, node_id: impl Into<String>, state: GatewayState) -> bool {
        let node_id = node_id.into();
        let mut states = self.inner.write();
        if let Some(current) = states.get(&node_id) {
            if current.version() > state.version() {
                return false;
            }
        }
        states.insert(node_id, Arc::new(state));
        true
    }

    pub fn remove(&self, node_id: &str) -> Option<Arc<GatewayState>> {
        self.inner.write().remove(node_id)
    }

    pub fn get(&self, node_id: &str) -> Option<Arc<GatewayState>> {
        self.inner.read().get(node_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Nodes that recorded `shard_id` as started, highest version first,
    /// ties broken by node id.
    pub fn started_versions(&self, shard_id: &ShardId) -> Vec<(String, u64)> {
        let states = self.inner.read();
        let mut records: Vec<(String, u64)> = states
            .iter()
            .filter_map(|(node_id, state)| {
                state
                    .started_shard_version(shard_id)
                    .map(|version| (node_id.clone(), version))
            })
            .collect();
        records.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        records
    }
}
