//! In-memory topology view.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{
    ControlError,
    snapshot::{Member, Topology, TopologyPartition},
    traits::TopologyProvider,
    types::*,
};

/// Topology held in memory; cheap to clone, clones share state.
///
/// Every query returns an owned copy, so callers never observe later mutations.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTopology {
    state: Arc<RwLock<Topology>>,
}

impl InMemoryTopology {
    pub fn new(topology: Topology) -> Self {
        Self {
            state: Arc::new(RwLock::new(topology)),
        }
    }

    /// Owned copy of the current topology.
    pub fn current(&self) -> Topology {
        self.state.read().clone()
    }

    pub fn add_member(&self, member: Member) {
        let mut state = self.state.write();
        if !state.members.contains(&member) {
            state.members.push(member);
        }
    }

    pub fn remove_member(&self, management: &NodeAddress) {
        self.state
            .write()
            .members
            .retain(|member| &member.management != management);
    }

    pub fn members(&self) -> Vec<Member> {
        self.state.read().members.clone()
    }

    /// Add a partition unless one with the same id is already known.
    ///
    /// Returns whether the partition was added.
    pub fn add_partition(&self, partition: TopologyPartition) -> bool {
        let mut state = self.state.write();
        if state
            .partitions
            .iter()
            .any(|existing| existing.partition_id == partition.partition_id)
        {
            return false;
        }
        state.partitions.push(partition);
        true
    }

    pub fn partition(&self, partition_id: PartitionId) -> Option<TopologyPartition> {
        self.state
            .read()
            .partitions
            .iter()
            .find(|partition| partition.partition_id == partition_id)
            .cloned()
    }

    pub fn set_leader(
        &self,
        partition_id: PartitionId,
        leader: Option<NodeAddress>,
    ) -> Result<(), ControlError> {
        self.with_partition(partition_id, |partition| {
            if let Some(leader) = &leader {
                partition.followers.retain(|follower| follower != leader);
            }
            partition.leader = leader;
        })
    }

    /// Add a follower; a node already hosting the partition is left as is.
    pub fn add_follower(
        &self,
        partition_id: PartitionId,
        follower: NodeAddress,
    ) -> Result<(), ControlError> {
        self.with_partition(partition_id, |partition| {
            if partition.leader.as_ref() != Some(&follower) && !partition.followers.contains(&follower) {
                partition.followers.push(follower);
            }
        })
    }

    pub fn remove_follower(
        &self,
        partition_id: PartitionId,
        follower: &NodeAddress,
    ) -> Result<(), ControlError> {
        self.with_partition(partition_id, |partition| {
            partition.followers.retain(|existing| existing != follower);
        })
    }

    fn with_partition(
        &self,
        partition_id: PartitionId,
        f: impl FnOnce(&mut TopologyPartition),
    ) -> Result<(), ControlError> {
        let mut state = self.state.write();
        let partition = state
            .partitions
            .iter_mut()
            .find(|partition| partition.partition_id == partition_id)
            .ok_or(ControlError::partition_not_found(partition_id))?;
        f(partition);
        Ok(())
    }
}

#[async_trait]
impl TopologyProvider for InMemoryTopology {
    async fn query(&self) -> Result<Topology, ControlError> {
        Ok(self.current())
    }
}
