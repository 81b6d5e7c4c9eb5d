//! Interfaces of the collaborators the reconciliation loops depend on.
//!
//! Every collaborator hands out owned values per call, so a loop never holds
//! a reference into shared state across a suspension point.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    ControlError,
    snapshot::Topology,
    types::*,
};

/// Read-only access to the observed cluster topology.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Return the topology as currently observed.
    async fn query(&self) -> Result<Topology, ControlError>;
}

/// The declared desired state of topics.
#[async_trait]
pub trait DesiredStateStore: Send + Sync {
    /// Enumerate declared topics, optionally restricted to a single topic name.
    async fn topics(&self, name_filter: Option<&str>) -> Result<Vec<DesiredTopic>, ControlError>;

    /// Register for topic-created/topic-updated notifications.
    fn subscribe(&self) -> broadcast::Receiver<TopicNotification>;
}

/// Picks the node that should host an additional replica or a new partition.
#[async_trait]
pub trait NodeSelector: Send + Sync {
    async fn next_candidate(&self, context: &PlacementContext) -> Result<NodeAddress, ControlError>;
}

/// Allocates globally unique partition identifiers.
#[async_trait]
pub trait IdGenerator: Send + Sync {
    async fn next_id(&self) -> Result<PartitionId, ControlError>;
}

/// Delivers control requests to remote nodes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, target: &NodeAddress, request: ControlRequest) -> Result<(), ControlError>;
}

/// Appends topic lifecycle records to the event log.
pub trait EventLogWriter: Send + Sync {
    /// Append a completion record under `key` and return its write position.
    /// A negative position means the append was not accepted and must be retried.
    fn append_completion(&self, key: u64, record: &CompletionRecord) -> i64;
}
