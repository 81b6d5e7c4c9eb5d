//! Error types for the strand control plane.

use std::fmt;

use crate::types::PartitionId;

/// Main error type for control-plane operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    /// The topology or desired-state enumeration could not be queried.
    TransientQuery {
        context: String,
        reason: String,
    },
    /// A node selector or id generator could not produce a value.
    Selection {
        context: String,
        reason: String,
    },
    /// An invite or create-partition request to a remote node failed.
    RemoteRequest {
        target: String,
        context: String,
        reason: String,
    },
    /// A client request was malformed or addressed the wrong partition.
    Validation {
        message: String,
    },
    /// The partition is unknown here, or this node is not authoritative for it.
    PartitionNotFound {
        partition_id: u32,
        reason: Option<String>,
    },
    TopicNotFound {
        topic: String,
    },
    /// Invalid configuration or manifest contents.
    InvalidConfig {
        context: String,
        reason: String,
    },
    /// Configuration or manifest file I/O error.
    ConfigIo {
        context: String,
        reason: String,
    },
    /// gRPC transport error.
    Transport {
        context: String,
        reason: String,
    },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::TransientQuery { context, reason } => {
                write!(f, "Query failed in {context}: {reason}")
            }
            ControlError::Selection { context, reason } => {
                write!(f, "Selection failed in {context}: {reason}")
            }
            ControlError::RemoteRequest {
                target,
                context,
                reason,
            } => {
                write!(f, "Request to {target} failed in {context}: {reason}")
            }
            ControlError::Validation { message } => write!(f, "Invalid request: {message}"),
            ControlError::PartitionNotFound {
                partition_id,
                reason,
            } => match reason {
                Some(reason) => write!(f, "Partition {partition_id} not found: {reason}"),
                None => write!(f, "Partition {partition_id} not found"),
            },
            ControlError::TopicNotFound { topic } => write!(f, "Topic '{topic}' not found"),
            ControlError::InvalidConfig { context, reason } => {
                write!(f, "Invalid configuration in {context}: {reason}")
            }
            ControlError::ConfigIo { context, reason } => {
                write!(f, "Configuration I/O error in {context}: {reason}")
            }
            ControlError::Transport { context, reason } => {
                write!(f, "Transport error in {context}: {reason}")
            }
        }
    }
}

impl std::error::Error for ControlError {}

impl ControlError {
    /// The error a client sees when addressing a node that cannot answer for a partition.
    pub fn partition_not_found(partition_id: PartitionId) -> Self {
        ControlError::PartitionNotFound {
            partition_id: partition_id.into(),
            reason: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ControlError::PartitionNotFound { .. } | ControlError::TopicNotFound { .. }
        )
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ControlError::Validation { .. }
                | ControlError::PartitionNotFound { .. }
                | ControlError::TopicNotFound { .. }
                | ControlError::InvalidConfig { .. }
        )
    }

    /// Failures that a later reconciliation cycle is expected to correct on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ControlError::TransientQuery { .. }
                | ControlError::Selection { .. }
                | ControlError::RemoteRequest { .. }
                | ControlError::Transport { .. }
        )
    }

    pub fn from_io_error(e: std::io::Error, context: &str) -> Self {
        ControlError::ConfigIo {
            context: context.to_string(),
            reason: e.to_string(),
        }
    }

    pub fn from_parse_error(e: impl fmt::Display, context: &str) -> Self {
        ControlError::InvalidConfig {
            context: context.to_string(),
            reason: e.to_string(),
        }
    }

    pub fn from_transport_error(e: impl fmt::Display, context: &str) -> Self {
        ControlError::Transport {
            context: context.to_string(),
            reason: e.to_string(),
        }
    }
}
