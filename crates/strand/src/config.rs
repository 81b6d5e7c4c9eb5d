//! Control-plane configuration and loading.
//!
//! All durations are stored in milliseconds so that configuration files stay
//! plain JSON/YAML; accessors hand out [`Duration`]s.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{ControlError, types::PartitionId, types::SYSTEM_PARTITION_ID};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Period of the unfiltered replication cycle.
    pub tick_interval_ms: u64,
    /// How long a partition stays suppressed after invitations were sent for it.
    pub invite_timeout_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            invite_timeout_ms: 30_000,
        }
    }
}

impl ReplicationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn invite_timeout(&self) -> Duration {
        Duration::from_millis(self.invite_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    pub tick_interval_ms: u64,
    /// Suppression window after partition creation requests were sent for a topic.
    pub creation_timeout_ms: u64,
    /// Suppression window after a completion record was appended for a topic.
    pub completion_timeout_ms: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            creation_timeout_ms: 60_000,
            completion_timeout_ms: 60_000,
        }
    }
}

impl ProvisioningConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn creation_timeout(&self) -> Duration {
        Duration::from_millis(self.creation_timeout_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Top-level configuration of the reconciliation loops and their transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub replication: ReplicationConfig,
    pub provisioning: ProvisioningConfig,
    pub transport: TransportConfig,
    pub system_partition_id: PartitionId,
    /// Capacity of each loop's command mailbox.
    pub mailbox_capacity: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            replication: ReplicationConfig::default(),
            provisioning: ProvisioningConfig::default(),
            transport: TransportConfig::default(),
            system_partition_id: SYSTEM_PARTITION_ID,
            mailbox_capacity: 64,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        let checks = [
            ("replication.tick_interval_ms", self.replication.tick_interval_ms),
            ("replication.invite_timeout_ms", self.replication.invite_timeout_ms),
            ("provisioning.tick_interval_ms", self.provisioning.tick_interval_ms),
            ("provisioning.creation_timeout_ms", self.provisioning.creation_timeout_ms),
            ("provisioning.completion_timeout_ms", self.provisioning.completion_timeout_ms),
            ("transport.connect_timeout_ms", self.transport.connect_timeout_ms),
            ("transport.request_timeout_ms", self.transport.request_timeout_ms),
        ];

        for (field, value) in checks {
            if value == 0 {
                return Err(ControlError::InvalidConfig {
                    context: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.mailbox_capacity == 0 {
            return Err(ControlError::InvalidConfig {
                context: "mailbox_capacity".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration loader with file I/O operations.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file.
    /// Supports both JSON (.json) and YAML (.yaml/.yml) formats based on file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ControlConfig, ControlError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ControlError::from_io_error(e, "config loading"))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let config: ControlConfig = match extension.to_lowercase().as_str() {
            "json" => serde_json::from_str(&content)
                .map_err(|e| ControlError::from_parse_error(e, "JSON config parsing"))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| ControlError::from_parse_error(e, "YAML config parsing"))?,
            _ => serde_json::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(|e| {
                    ControlError::from_parse_error(e, "config parsing (tried both JSON and YAML)")
                })?,
        };

        config.validate()?;
        Ok(config)
    }
}
