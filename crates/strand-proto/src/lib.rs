//! Shared Protocol Buffer definitions for strand.
//!
//! Contains the control protocol used by the reconciliation loops to reach
//! remote nodes (`ReplicaControl`) and the client-facing partition query
//! service (`PartitionQuery`).

// Generated protobuf modules via `tonic_build` in build.rs
pub mod control {
    tonic::include_proto!("strand.control");
}

pub use control::*;

pub use control::partition_query_client::PartitionQueryClient;
pub use control::partition_query_server::{PartitionQuery, PartitionQueryServer};
pub use control::replica_control_client::ReplicaControlClient;
pub use control::replica_control_server::{ReplicaControl, ReplicaControlServer};
