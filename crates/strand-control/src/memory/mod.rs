//! In-memory collaborators for a single-process controller and for tests.

pub mod desired;
pub mod event_log;
pub mod id_gen;
pub mod selector;
pub mod topology;

pub use desired::InMemoryDesiredState;
pub use event_log::{InMemoryEventLog, LoggedCompletion};
pub use id_gen::SequentialIdGenerator;
pub use selector::RoundRobinNodeSelector;
pub use topology::InMemoryTopology;
