//! Point-in-time summary of which nodes host which partitions.
//!
//! A [`ClusterStateSnapshot`] is rebuilt from a [`Topology`] on every
//! reconciliation cycle and discarded afterwards; placements carry no identity
//! across cycles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::*;

/// A cluster member as seen by the topology provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Address used for control requests.
    pub management: NodeAddress,
    /// Address used for replication traffic.
    pub replication: NodeAddress,
}

/// One known partition in the observed topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyPartition {
    pub partition_id: PartitionId,
    pub topic: String,
    pub replication_factor: u32,
    pub leader: Option<NodeAddress>,
    #[serde(default)]
    pub followers: Vec<NodeAddress>,
}

/// Owned, read-only view of the cluster topology returned by a topology query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub members: Vec<Member>,
    pub partitions: Vec<TopologyPartition>,
}

impl Topology {
    /// Replication addresses of every known member, in member order.
    pub fn replication_addresses(&self) -> Vec<NodeAddress> {
        self.members
            .iter()
            .map(|member| member.replication.clone())
            .collect()
    }
}

/// Physical placement of one partition.
///
/// Invariant: a node appears at most once across leader and followers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlacement {
    partition_id: PartitionId,
    topic: String,
    replication_factor: u32,
    leader: Option<NodeAddress>,
    followers: Vec<NodeAddress>,
}

impl PartitionPlacement {
    pub fn new(partition_id: PartitionId, topic: impl Into<String>, replication_factor: u32) -> Self {
        Self {
            partition_id,
            topic: topic.into(),
            replication_factor,
            leader: None,
            followers: Vec::new(),
        }
    }

    pub fn from_topology(partition: &TopologyPartition) -> Self {
        let mut placement = Self::new(
            partition.partition_id,
            partition.topic.clone(),
            partition.replication_factor,
        );
        placement.set_leader(partition.leader.clone());
        for follower in &partition.followers {
            placement.add_follower(follower.clone());
        }
        placement
    }

    pub fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn replication_factor(&self) -> u32 {
        self.replication_factor
    }

    pub fn leader(&self) -> Option<&NodeAddress> {
        self.leader.as_ref()
    }

    pub fn followers(&self) -> &[NodeAddress] {
        &self.followers
    }

    /// Replace the leader. The previous leader leaves the node list before the
    /// new one is added, and the new leader is no longer counted as a follower.
    pub fn set_leader(&mut self, leader: Option<NodeAddress>) {
        self.leader = None;
        if let Some(leader) = leader {
            self.followers.retain(|follower| follower != &leader);
            self.leader = Some(leader);
        }
    }

    /// Add a follower unless the node is already part of the placement.
    pub fn add_follower(&mut self, follower: NodeAddress) {
        if self.contains(&follower) {
            return;
        }
        self.followers.push(follower);
    }

    pub fn remove_follower(&mut self, follower: &NodeAddress) {
        self.followers.retain(|existing| existing != follower);
    }

    pub fn contains(&self, node: &NodeAddress) -> bool {
        self.leader.as_ref() == Some(node) || self.followers.contains(node)
    }

    /// Leader first (if present), then followers in order.
    pub fn nodes(&self) -> Vec<NodeAddress> {
        self.leader
            .iter()
            .chain(self.followers.iter())
            .cloned()
            .collect()
    }

    pub fn node_count(&self) -> usize {
        usize::from(self.leader.is_some()) + self.followers.len()
    }

    /// `max(replication_factor - node_count, 0)`.
    pub fn missing_replicas(&self) -> u32 {
        let hosted = u32::try_from(self.node_count()).unwrap_or(u32::MAX);
        self.replication_factor.saturating_sub(hosted)
    }
}

/// Placements grouped by topic, each topic's list ordered by partition id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStateSnapshot {
    placements: HashMap<String, Vec<PartitionPlacement>>,
}

impl ClusterStateSnapshot {
    /// Fold every known partition of the topology into a snapshot.
    pub fn build(topology: &Topology) -> Self {
        let mut placements: HashMap<String, Vec<PartitionPlacement>> = HashMap::new();

        for partition in &topology.partitions {
            let topic_placements = placements.entry(partition.topic.clone()).or_default();

            // The same partition may be reported more than once; merge the views.
            match topic_placements
                .iter_mut()
                .find(|placement| placement.partition_id == partition.partition_id)
            {
                Some(existing) => {
                    if let Some(leader) = &partition.leader {
                        existing.set_leader(Some(leader.clone()));
                    }
                    for follower in &partition.followers {
                        existing.add_follower(follower.clone());
                    }
                }
                None => topic_placements.push(PartitionPlacement::from_topology(partition)),
            }
        }

        for topic_placements in placements.values_mut() {
            topic_placements.sort_by_key(|placement| placement.partition_id);
        }

        Self { placements }
    }

    /// Placements of a topic; empty if none are visible yet.
    pub fn placements_for(&self, topic: &str) -> &[PartitionPlacement] {
        self.placements
            .get(topic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn partition_ids_for(&self, topic: &str) -> Vec<PartitionId> {
        self.placements_for(topic)
            .iter()
            .map(PartitionPlacement::partition_id)
            .collect()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.placements.keys().map(String::as_str)
    }

    pub fn partition_count(&self) -> usize {
        self.placements.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
