//! Core value types shared by every strand crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ControlError;

/// Identifier of a partition. Identifiers are globally unique across topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId(pub u32);

impl PartitionId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for PartitionId {
    fn from(id: u32) -> Self {
        PartitionId(id)
    }
}

impl From<PartitionId> for u32 {
    fn from(partition_id: PartitionId) -> Self {
        partition_id.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The partition whose leader is authoritative for cluster-wide topic metadata.
pub const SYSTEM_PARTITION_ID: PartitionId = PartitionId(0);

/// Network address of a cluster node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The address as an `http://` URI, suitable for a gRPC endpoint.
    pub fn to_uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for NodeAddress {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s.rsplit_once(':').ok_or_else(|| ControlError::InvalidConfig {
            context: "node address".to_string(),
            reason: format!("'{s}' is not of the form host:port"),
        })?;

        if host.is_empty() {
            return Err(ControlError::InvalidConfig {
                context: "node address".to_string(),
                reason: format!("'{s}' has an empty host"),
            });
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| ControlError::from_parse_error(e, "node address port"))?;

        Ok(NodeAddress::new(host, port))
    }
}
