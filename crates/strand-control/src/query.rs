//! Client-facing enumeration of topics and partitions.
//!
//! Only the leader of the system partition answers. A node that is not bound
//! to a desired-state store replies exactly as a node that does not know the
//! partition at all would, so clients simply retry against another node.

use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{ControlError, traits::DesiredStateStore, types::*};

/// Metadata about the caller of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: u64,
    pub remote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    pub partition_id: PartitionId,
    pub topic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionsResponse {
    pub partitions: Vec<PartitionEntry>,
}

pub struct PartitionsQueryHandler {
    system_partition_id: PartitionId,
    desired: RwLock<Option<Arc<dyn DesiredStateStore>>>,
}

impl PartitionsQueryHandler {
    /// Create an unbound handler. Queries fail with `PartitionNotFound` until
    /// [`bind`](Self::bind) is called.
    pub fn new(system_partition_id: PartitionId) -> Self {
        Self {
            system_partition_id,
            desired: RwLock::new(None),
        }
    }

    pub fn system_partition_id(&self) -> PartitionId {
        self.system_partition_id
    }

    /// Make this node answer queries from `desired`, e.g. after becoming the
    /// system-partition leader.
    pub fn bind(&self, desired: Arc<dyn DesiredStateStore>) {
        *self.desired.write() = Some(desired);
    }

    /// Stop answering queries, e.g. after losing system-partition leadership.
    pub fn unbind(&self) {
        *self.desired.write() = None;
    }

    pub fn is_bound(&self) -> bool {
        self.desired.read().is_some()
    }

    pub async fn handle(
        &self,
        partition_id: PartitionId,
        context: &RequestContext,
    ) -> Result<PartitionsResponse, ControlError> {
        if partition_id != self.system_partition_id {
            debug!(
                "Rejecting partitions query {} addressed to partition {partition_id}",
                context.request_id
            );
            return Err(ControlError::Validation {
                message: format!(
                    "must address the system partition {}, got {partition_id}",
                    self.system_partition_id
                ),
            });
        }

        // Clone the store out so no lock guard lives across the await below
        let desired = self.desired.read().clone();
        let Some(desired) = desired else {
            return Err(ControlError::partition_not_found(partition_id));
        };

        let topics = desired
            .topics(None)
            .await
            .map_err(|e| ControlError::PartitionNotFound {
                partition_id: partition_id.as_u32(),
                reason: Some(e.to_string()),
            })?;

        let partitions = topics
            .into_iter()
            .flat_map(|topic| {
                let DesiredTopic {
                    name,
                    partition_ids,
                    ..
                } = topic;
                partition_ids.into_iter().map(move |partition_id| PartitionEntry {
                    partition_id,
                    topic: name.clone(),
                })
            })
            .collect();

        Ok(PartitionsResponse { partitions })
    }
}

impl std::fmt::Debug for PartitionsQueryHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionsQueryHandler")
            .field("system_partition_id", &self.system_partition_id)
            .field("bound", &self.is_bound())
            .finish()
    }
}
