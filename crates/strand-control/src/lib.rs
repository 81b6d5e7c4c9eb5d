//! Strand control-plane reconciliation.
//!
//! Two reconciliation loops keep the observed cluster topology in line with the
//! declared topics: the [`ReplicationReviser`] recruits nodes for
//! under-replicated partitions and the [`TopicProvisioner`] creates missing
//! partitions and records when a topic is complete. The
//! [`PartitionsQueryHandler`] answers client metadata queries on the
//! system-partition leader.

pub mod client;
pub mod driver;
pub mod in_flight;
pub mod manifest;
pub mod memory;
pub mod provisioner;
pub mod query;
pub mod reviser;
pub mod server;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use strand::ControlError;

// Re-export the loop driver and the loops it runs
pub use driver::{CycleReport, Reconciler, ReconcilerHandle, spawn};
pub use provisioner::{PendingProvisionRecord, TopicProvisioner};
pub use reviser::ReplicationReviser;

pub use query::{PartitionsQueryHandler, RequestContext};
pub use snapshot::{ClusterStateSnapshot, PartitionPlacement, Topology};

// Re-export collaborator traits
pub use traits::{DesiredStateStore, EventLogWriter, IdGenerator, NodeSelector, TopologyProvider, Transport};

// Re-export gRPC adapters
pub use client::GrpcTransport;
pub use server::PartitionQueryService;

// Re-export logging macros for consistent usage across the crate
pub use log::{debug, error, info, trace, warn};
