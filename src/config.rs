//! Settings consumed by the allocation engine and the gateway store.

use crate::core::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Recovery concurrency limits enforced by the throttling decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationSettings {
    /// Maximum shard copies initializing on one node at a time.
    pub node_concurrent_recoveries: usize,
    /// Maximum shard copies initializing across the whole cluster.
    pub cluster_concurrent_recoveries: usize,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            node_concurrent_recoveries: 2,
            cluster_concurrent_recoveries: 8,
        }
    }
}

impl AllocationSettings {
    /// Set the per-node recovery limit
    pub fn node_concurrent_recoveries(mut self, limit: usize) -> Self {
        self.node_concurrent_recoveries = limit;
        self
    }

    /// Set the cluster-wide recovery limit
    pub fn cluster_concurrent_recoveries(mut self, limit: usize) -> Self {
        self.cluster_concurrent_recoveries = limit;
        self
    }
}

/// On-disk encoding used by the gateway store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayFormat {
    #[default]
    Binary,
    Json,
}

impl GatewayFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            GatewayFormat::Binary => "bin",
            GatewayFormat::Json => "json",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "bin" => Some(GatewayFormat::Binary),
            "json" => Some(GatewayFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub format: GatewayFormat,
    /// Number of committed state files kept on disk, newest first.
    pub retained_states: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            format: GatewayFormat::Binary,
            retained_states: 2,
        }
    }
}

impl GatewaySettings {
    pub fn format(mut self, format: GatewayFormat) -> Self {
        self.format = format;
        self
    }

    pub fn retained_states(mut self, retained: usize) -> Self {
        self.retained_states = retained;
        self
    }
}

/// Top-level settings document.
///
/// Every section is optional in the JSON form; missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub allocation: AllocationSettings,
    pub gateway: GatewaySettings,
}

impl ClusterSettings {
    /// Parse and validate settings from a JSON document
    pub fn from_json_str(input: &str) -> Result<Self> {
        let settings: ClusterSettings = serde_json::from_str(input)
            .map_err(|err| ClusterError::ConfigError(format!("parse settings: {}", err)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate settings from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            ClusterError::ConfigError(format!("read settings '{}': {}", path.display(), err))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.allocation.node_concurrent_recoveries == 0 {
            return Err(ClusterError::ConfigError(
                "node_concurrent_recoveries must be >= 1".to_string(),
            ));
        }
        if self.allocation.cluster_concurrent_recoveries == 0 {
            return Err(ClusterError::ConfigError(
                "cluster_concurrent_recoveries must be >= 1".to_string(),
            ));
        }
        if self.gateway.retained_states == 0 {
            return Err(ClusterError::ConfigError(
                "retained_states must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
