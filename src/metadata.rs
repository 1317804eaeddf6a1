//! Cluster metadata snapshot embedded in every gateway state.
//!
//! The allocation engine treats this value as opaque. It carries its own
//! binary and document codecs so the gateway codecs can nest it without
//! knowing its layout.

use crate::core::{ClusterError, Result};
use crate::stream::{StreamInput, StreamOutput};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Shape of one index: shard and replica counts plus free-form settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetaData {
    pub index: String,
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub settings: BTreeMap<String, String>,
}

impl IndexMetaData {
    pub fn new(index: impl Into<String>, number_of_shards: u32, number_of_replicas: u32) -> Self {
        Self {
            index: index.into(),
            number_of_shards,
            number_of_replicas,
            settings: BTreeMap::new(),
        }
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// Immutable metadata snapshot. Equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    version: u64,
    indices: BTreeMap<String, IndexMetaData>,
}

impl MetaData {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            indices: BTreeMap::new(),
        }
    }

    pub fn with_index(mut self, index: IndexMetaData) -> Self {
        self.indices.insert(index.index.clone(), index);
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index(&self, name: &str) -> Option<&IndexMetaData> {
        self.indices.get(name)
    }

    pub fn indices(&self) -> impl Iterator<Item = &IndexMetaData> {
        self.indices.values()
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_version(self.version, "metadata version")?;
        out.write_vint(self.indices.len() as u32);
        for index in self.indices.values() {
            out.write_string(&index.index);
            out.write_vint(index.number_of_shards);
            out.write_vint(index.number_of_replicas);
            out.write_vint(index.settings.len() as u32);
            for (key, value) in &index.settings {
                out.write_string(key);
                out.write_string(value);
            }
        }
        Ok(())
    }

    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let version = input.read_version("metadata version")?;
        let mut metadata = MetaData::new(version);
        let count = input.read_vint()?;
        for _ in 0..count {
            let name = input.read_string()?;
            let number_of_shards = input.read_vint()?;
            let number_of_replicas = input.read_vint()?;
            let mut index = IndexMetaData::new(name, number_of_shards, number_of_replicas);
            let settings = input.read_vint()?;
            for _ in 0..settings {
                let key = input.read_string()?;
                let value = input.read_string()?;
                index.settings.insert(key, value);
            }
            metadata = metadata.with_index(index);
        }
        Ok(metadata)
    }

    pub fn to_document(&self) -> Value {
        let mut indices = Map::new();
        for index in self.indices.values() {
            indices.insert(
                index.index.clone(),
                json!({
                    "number_of_shards": index.number_of_shards,
                    "number_of_replicas": index.number_of_replicas,
                    "settings": index.settings,
                }),
            );
        }
        json!({
            "version": self.version,
            "indices": indices,
        })
    }

    /// Parses the `meta-data` object. Unknown fields are ignored.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let obj = doc.as_object().ok_or_else(|| {
            ClusterError::MalformedState("meta-data must be an object".to_string())
        })?;

        let version = match obj.get("version") {
            Some(value) => value.as_u64().ok_or_else(|| {
                ClusterError::MalformedState(format!("meta-data version is not an integer: {}", value))
            })?,
            None => 0,
        };
        let mut metadata = MetaData::new(version);

        if let Some(indices) = obj.get("indices").and_then(Value::as_object) {
            for (name, entry) in indices {
                let number_of_shards = required_u32(entry, "number_of_shards", name)?;
                let number_of_replicas = required_u32(entry, "number_of_replicas", name)?;
                let mut index = IndexMetaData::new(name.clone(), number_of_shards, number_of_replicas);
                if let Some(settings) = entry.get("settings").and_then(Value::as_object) {
                    for (key, value) in settings {
                        let value = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        index.settings.insert(key.clone(), value);
                    }
                }
                metadata = metadata.with_index(index);
            }
        }

        Ok(metadata)
    }
}

fn required_u32(entry: &Value, field: &str, index: &str) -> Result<u32> {
    entry
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            ClusterError::MalformedState(format!(
                "index '{}' is missing integer field '{}'",
                index, field
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetaData {
        MetaData::new(3)
            .with_index(IndexMetaData::new("logs", 5, 1).setting("codec", "best_compression"))
            .with_index(IndexMetaData::new("users", 1, 2))
    }

    #[test]
    fn test_binary_round_trip() {
        let metadata = sample();
        let mut out = StreamOutput::new();
        metadata.write_to(&mut out).unwrap();
        let bytes = out.into_bytes();

        let mut input = StreamInput::new(&bytes);
        assert_eq!(MetaData::read_from(&mut input).unwrap(), metadata);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_document_round_trip() {
        let metadata = sample();
        assert_eq!(MetaData::from_document(&metadata.to_document()).unwrap(), metadata);
    }

    #[test]
    fn test_document_requires_shard_counts() {
        let doc = json!({"version": 1, "indices": {"logs": {"number_of_replicas": 1}}});
        assert!(matches!(
            MetaData::from_document(&doc),
            Err(ClusterError::MalformedState(_))
        ));
    }

    #[test]
    fn test_document_stringifies_non_string_settings() {
        let doc = json!({
            "indices": {"logs": {"number_of_shards": 1, "number_of_replicas": 0, "settings": {"refresh": 5}}},
            "unknown": true
        });
        let metadata = MetaData::from_document(&doc).unwrap();
        assert_eq!(metadata.version(), 0);
        let logs = metadata.index("logs").unwrap();
        assert_eq!(logs.settings.get("refresh").map(String::as_str), Some("5"));
    }
}
