//! Cluster manifest data structures.

use crate::{
    ControlError,
    snapshot::{Member, Topology, TopologyPartition},
    types::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub management: NodeAddress,
    pub replication: NodeAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSpec {
    pub name: String,
    pub partition_count: u32,
    pub replication_factor: u32,
    /// Ids already recorded for the topic; non-empty means it is already created.
    #[serde(default)]
    pub partition_ids: Vec<PartitionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub id: PartitionId,
    pub topic: String,
    pub replication_factor: u32,
    #[serde(default)]
    pub leader: Option<NodeAddress>,
    #[serde(default)]
    pub followers: Vec<NodeAddress>,
}

/// Static description of a cluster used to seed the in-memory collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterManifest {
    #[serde(default)]
    pub members: Vec<MemberSpec>,
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
    #[serde(default)]
    pub partitions: Vec<PartitionSpec>,
}

impl ClusterManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_topic(&self, name: &str) -> Result<&TopicSpec, ControlError> {
        self.topics
            .iter()
            .find(|topic| topic.name == name)
            .ok_or(ControlError::TopicNotFound {
                topic: name.to_string(),
            })
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        let mut addresses = HashSet::new();
        for member in &self.members {
            if !addresses.insert(&member.management) {
                return Err(invalid(format!(
                    "duplicate member address {}",
                    member.management
                )));
            }
        }

        let mut names = HashSet::new();
        for topic in &self.topics {
            if !names.insert(topic.name.as_str()) {
                return Err(invalid(format!("duplicate topic '{}'", topic.name)));
            }
            if topic.partition_count == 0 {
                return Err(invalid(format!(
                    "topic '{}' must declare at least one partition",
                    topic.name
                )));
            }
            if topic.replication_factor == 0 {
                return Err(invalid(format!(
                    "topic '{}' must have a replication factor of at least 1",
                    topic.name
                )));
            }
        }

        for partition in &self.partitions {
            if !names.contains(partition.topic.as_str()) {
                return Err(invalid(format!(
                    "partition {} references undeclared topic '{}'",
                    partition.id, partition.topic
                )));
            }
            if partition.replication_factor == 0 {
                return Err(invalid(format!(
                    "partition {} must have a replication factor of at least 1",
                    partition.id
                )));
            }
        }

        Ok(())
    }

    /// The observed topology described by this manifest.
    pub fn topology(&self) -> Topology {
        Topology {
            members: self
                .members
                .iter()
                .map(|member| Member {
                    management: member.management.clone(),
                    replication: member.replication.clone(),
                })
                .collect(),
            partitions: self
                .partitions
                .iter()
                .map(|partition| TopologyPartition {
                    partition_id: partition.id,
                    topic: partition.topic.clone(),
                    replication_factor: partition.replication_factor,
                    leader: partition.leader.clone(),
                    followers: partition.followers.clone(),
                })
                .collect(),
        }
    }

    /// Highest partition id mentioned anywhere in the manifest.
    pub fn max_partition_id(&self) -> Option<PartitionId> {
        let recorded = self.topics.iter().flat_map(|topic| topic.partition_ids.iter());
        let placed = self.partitions.iter().map(|partition| &partition.id);
        recorded.chain(placed).copied().max()
    }
}

fn invalid(reason: String) -> ControlError {
    ControlError::InvalidConfig {
        context: "cluster manifest".to_string(),
        reason,
    }
}
