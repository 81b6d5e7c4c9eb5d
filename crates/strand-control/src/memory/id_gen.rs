//! Monotonic partition id allocation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{ControlError, traits::IdGenerator, types::*};

/// Hands out ids strictly above a floor, one at a time.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU32,
}

impl SequentialIdGenerator {
    /// The first id handed out is `floor + 1`.
    pub fn new(floor: PartitionId) -> Self {
        Self {
            next: AtomicU32::new(floor.as_u32().saturating_add(1)),
        }
    }
}

#[async_trait]
impl IdGenerator for SequentialIdGenerator {
    async fn next_id(&self) -> Result<PartitionId, ControlError> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .map(PartitionId)
            .map_err(|_| ControlError::Selection {
                context: "partition id allocation".to_string(),
                reason: "partition id space exhausted".to_string(),
            })
    }
}
