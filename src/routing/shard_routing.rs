use super::ShardId;
use std::fmt;

/// Life-cycle of one shard copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardRoutingState {
    Unassigned,
    Initializing,
    Started,
    Relocating,
}

impl ShardRoutingState {
    /// Started copies, including ones currently moving away, serve reads.
    pub fn active(&self) -> bool {
        matches!(self, ShardRoutingState::Started | ShardRoutingState::Relocating)
    }

    pub fn assigned(&self) -> bool {
        !matches!(self, ShardRoutingState::Unassigned)
    }
}

impl fmt::Display for ShardRoutingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShardRoutingState::Unassigned => "UNASSIGNED",
            ShardRoutingState::Initializing => "INITIALIZING",
            ShardRoutingState::Started => "STARTED",
            ShardRoutingState::Relocating => "RELOCATING",
        };
        f.write_str(name)
    }
}

/// One copy of a shard.
///
/// `copy_id` identifies the copy itself and is unique within one
/// [`RoutingNodes`](super::RoutingNodes). Several copies share a `shard_id`;
/// at most one of them is primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRouting {
    pub shard_id: ShardId,
    pub copy_id: u64,
    pub current_node_id: Option<String>,
    /// For a relocating source, the target node. For a relocation target, the source node.
    pub relocating_node_id: Option<String>,
    pub primary: bool,
    pub state: ShardRoutingState,
}

impl ShardRouting {
    pub fn unassigned(shard_id: ShardId, copy_id: u64, primary: bool) -> Self {
        Self {
            shard_id,
            copy_id,
            current_node_id: None,
            relocating_node_id: None,
            primary,
            state: ShardRoutingState::Unassigned,
        }
    }

    pub fn index(&self) -> &str {
        &self.shard_id.index
    }

    pub fn active(&self) -> bool {
        self.state.active()
    }

    pub fn initializing(&self) -> bool {
        self.state == ShardRoutingState::Initializing
    }

    pub fn started(&self) -> bool {
        self.state == ShardRoutingState::Started
    }

    pub fn relocating(&self) -> bool {
        self.state == ShardRoutingState::Relocating
    }

    /// True for the initializing half of a relocation.
    pub fn is_relocation_target(&self) -> bool {
        self.initializing() && self.relocating_node_id.is_some()
    }
}

impl fmt::Display for ShardRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{} {} {}",
            self.shard_id,
            self.copy_id,
            if self.primary { "P" } else { "R" },
            self.state
        )?;
        if let Some(node) = &self.current_node_id {
            write!(f, " node[{}]", node)?;
        }
        if let Some(node) = &self.relocating_node_id {
            write!(f, " relocating[{}]", node)?;
        }
        Ok(())
    }
}
