//! Value types exchanged between the reconciliation loops and their collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export the shared value types from strand core
pub use strand::types::{NodeAddress, PartitionId, SYSTEM_PARTITION_ID};

/// A topic as declared in the desired-state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredTopic {
    pub name: String,
    pub partition_count: u32,
    pub replication_factor: u32,
    /// Partition ids recorded for the topic; empty until its completion record is applied.
    #[serde(default)]
    pub partition_ids: Vec<PartitionId>,
    /// Stable key under which the completion record is appended.
    pub key: u64,
}

impl DesiredTopic {
    pub fn new(name: impl Into<String>, partition_count: u32, replication_factor: u32, key: u64) -> Self {
        Self {
            name: name.into(),
            partition_count,
            replication_factor,
            partition_ids: Vec::new(),
            key,
        }
    }

    /// Whether partition ids have already been recorded for this topic.
    pub fn is_created(&self) -> bool {
        !self.partition_ids.is_empty()
    }
}

/// Change notification emitted by a desired-state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicNotification {
    Created { topic: String },
    Updated { topic: String },
}

impl TopicNotification {
    pub fn topic(&self) -> &str {
        match self {
            TopicNotification::Created { topic } | TopicNotification::Updated { topic } => topic,
        }
    }
}

/// What a node selector needs to know to pick a host for a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementContext {
    pub topic: String,
    pub partition_id: PartitionId,
    /// Nodes that already host the partition and must not be selected again.
    pub exclude: Vec<NodeAddress>,
}

/// Ask a node to start hosting a replica of an existing partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteReplica {
    pub topic: String,
    pub partition_id: PartitionId,
    pub replication_factor: u32,
    /// Member addresses eligible for replication traffic.
    pub members: Vec<NodeAddress>,
}

/// Ask a node to create a new partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePartition {
    pub topic: String,
    pub partition_id: PartitionId,
    pub replication_factor: u32,
}

/// Outbound requests carried by a [`Transport`](crate::traits::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    InviteReplica(InviteReplica),
    CreatePartition(CreatePartition),
}

impl ControlRequest {
    pub fn topic(&self) -> &str {
        match self {
            ControlRequest::InviteReplica(request) => &request.topic,
            ControlRequest::CreatePartition(request) => &request.topic,
        }
    }

    pub fn partition_id(&self) -> PartitionId {
        match self {
            ControlRequest::InviteReplica(request) => request.partition_id,
            ControlRequest::CreatePartition(request) => request.partition_id,
        }
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlRequest::InviteReplica(request) => write!(
                f,
                "invite replica for topic '{}' partition {}",
                request.topic, request.partition_id
            ),
            ControlRequest::CreatePartition(request) => write!(
                f,
                "create partition {} of topic '{}'",
                request.partition_id, request.topic
            ),
        }
    }
}

/// Durable record marking that all declared partitions of a topic exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub topic: String,
    pub partition_count: u32,
    pub replication_factor: u32,
    pub partition_ids: Vec<PartitionId>,
    /// RFC 3339 timestamp of when the provisioner built the record.
    pub completed_at: String,
}
