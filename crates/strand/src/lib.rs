//! Strand core.
//!
//! Shared building blocks of the strand control plane: partition and node value
//! types, the control-plane error type, configuration loading, and telemetry setup.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{ConfigLoader, ControlConfig};
pub use error::ControlError;
pub use types::{NodeAddress, PartitionId, SYSTEM_PARTITION_ID};

// Re-export logging macros for consistent usage across the crate
pub use log::{debug, error, info, trace, warn};
