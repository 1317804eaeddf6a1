//! Structured document form of a gateway state.
//!
//! ```json
//! {"state": {"version": 3, "meta-data": {...}, "shards": [{"index": "test", "id": 0, "version": 2}]}}
//! ```
//!
//! Field order inside objects and element order inside `shards` do not
//! matter. Unknown fields are skipped. An empty input, `null`, or a root
//! without a `state` object decodes to the default state.

use super::GatewayState;
use crate::core::{ClusterError, Result};
use crate::metadata::MetaData;
use crate::routing::ShardId;
use serde_json::{Value, json};

pub fn to_document(state: &GatewayState) -> Value {
    let shards: Vec<Value> = state
        .sorted_shards()
        .into_iter()
        .map(|(shard_id, version)| {
            json!({
                "index": shard_id.index,
                "id": shard_id.id,
                "version": version,
            })
        })
        .collect();

    json!({
        "state": {
            "version": state.version(),
            "meta-data": state.metadata().to_document(),
            "shards": shards,
        }
    })
}

pub fn from_document(doc: &Value) -> Result<GatewayState> {
    let state = match doc {
        Value::Null => return Ok(GatewayState::default()),
        Value::Object(root) => match root.get("state") {
            Some(Value::Object(state)) => state,
            Some(Value::Null) | None => return Ok(GatewayState::default()),
            Some(other) => {
                return Err(ClusterError::MalformedState(format!(
                    "'state' must be an object, got {}",
                    other
                )));
            }
        },
        other => {
            return Err(ClusterError::MalformedState(format!(
                "gateway document must be an object, got {}",
                other
            )));
        }
    };

    let mut builder = GatewayState::builder();
    if let Some(version) = state.get("version") {
        builder = builder.version(as_version(version, "state version")?);
    }
    if let Some(metadata) = state.get("meta-data") {
        builder = builder.metadata(MetaData::from_document(metadata)?);
    }
    if let Some(shards) = state.get("shards") {
        let entries = shards.as_array().ok_or_else(|| {
            ClusterError::MalformedState("'shards' must be an array".to_string())
        })?;
        for entry in entries.iter().filter(|entry| entry.is_object()) {
            let index = entry
                .get("index")
                .and_then(Value::as_str)
                .ok_or_else(|| missing_field("index"))?;
            let id = entry.get("id").ok_or_else(|| missing_field("id"))?;
            let id = id
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .ok_or_else(|| {
                    ClusterError::MalformedState(format!(
                        "shard id is not an integer in 0..={}: {}",
                        u32::MAX,
                        id
                    ))
                })?;
            let version = entry.get("version").ok_or_else(|| missing_field("version"))?;
            builder = builder.put(ShardId::new(index, id), as_version(version, "shard version")?);
        }
    }

    Ok(builder.build())
}

fn as_version(value: &Value, what: &str) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        ClusterError::MalformedState(format!("{} is not a non-negative integer: {}", what, value))
    })
}

fn missing_field(field: &str) -> ClusterError {
    ClusterError::MalformedState(format!("shard entry is missing field '{}'", field))
}

impl GatewayState {
    pub fn to_json(&self) -> String {
        to_document(self).to_string()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&to_document(self)).map_err(|err| {
            ClusterError::MalformedState(format!("serialize gateway state: {}", err))
        })
    }

    /// Parses the document form. Whitespace-only input is "no prior state".
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(GatewayState::default());
        }
        let doc: Value = serde_json::from_slice(bytes).map_err(|err| {
            ClusterError::MalformedState(format!("parse gateway document: {}", err))
        })?;
        from_document(&doc)
    }
}
