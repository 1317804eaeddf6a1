//! Binary stream form of a gateway state.
//!
//! Layout, read in exactly this order:
//! `[i64 version][metadata][vint shard_count]{[string index][vint id][i64 version]}*`

use super::GatewayState;
use crate::core::{ClusterError, Result};
use crate::metadata::MetaData;
use crate::routing::ShardId;
use crate::stream::{StreamInput, StreamOutput};

pub fn write_to(state: &GatewayState, out: &mut StreamOutput) -> Result<()> {
    out.write_version(state.version(), "state version")?;
    state.metadata().write_to(out)?;

    out.write_vint(state.shards().len() as u32);
    for (shard_id, version) in state.shards() {
        write_shard_id(shard_id, out);
        out.write_version(*version, "shard version")?;
    }
    Ok(())
}

pub fn read_from(input: &mut StreamInput<'_>) -> Result<GatewayState> {
    let version = input.read_version("state version")?;
    let metadata = MetaData::read_from(input)?;

    let count = input.read_vint()?;
    let mut builder = GatewayState::builder().version(version).metadata(metadata);
    for _ in 0..count {
        let shard_id = read_shard_id(input)?;
        let shard_version = input.read_version("shard version")?;
        builder = builder.put(shard_id, shard_version);
    }
    Ok(builder.build())
}

pub fn write_shard_id(shard_id: &ShardId, out: &mut StreamOutput) {
    out.write_string(&shard_id.index);
    out.write_vint(shard_id.id);
}

pub fn read_shard_id(input: &mut StreamInput<'_>) -> Result<ShardId> {
    let index = input.read_string()?;
    let id = input.read_vint()?;
    Ok(ShardId::new(index, id))
}

impl GatewayState {
    /// Encodes the state. Fails when a version exceeds `i64::MAX`, since the
    /// decoder could not read it back.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = StreamOutput::new();
        write_to(self, &mut out)?;
        Ok(out.into_bytes())
    }

    /// Decodes a complete buffer. Bytes left over after the state are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = StreamInput::new(bytes);
        let state = read_from(&mut input)?;
        if input.remaining() != 0 {
            return Err(ClusterError::MalformedState(format!(
                "{} trailing bytes after gateway state",
                input.remaining()
            )));
        }
        Ok(state)
    }
}
