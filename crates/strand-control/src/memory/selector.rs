//! Round-robin node selection.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    ControlError,
    traits::{NodeSelector, TopologyProvider},
    types::*,
};

/// Walks the topology's member list with a cursor shared by all callers.
///
/// The cursor persists across topics and cycles, so consecutive selections
/// spread over the cluster. Members already hosting the partition are skipped.
pub struct RoundRobinNodeSelector {
    topology: Arc<dyn TopologyProvider>,
    cursor: Mutex<usize>,
}

impl RoundRobinNodeSelector {
    pub fn new(topology: Arc<dyn TopologyProvider>) -> Self {
        Self {
            topology,
            cursor: Mutex::new(0),
        }
    }
}

#[async_trait]
impl NodeSelector for RoundRobinNodeSelector {
    async fn next_candidate(&self, context: &PlacementContext) -> Result<NodeAddress, ControlError> {
        let topology = self.topology.query().await.map_err(|e| ControlError::Selection {
            context: format!("partition {} of topic '{}'", context.partition_id, context.topic),
            reason: e.to_string(),
        })?;

        let members: Vec<&NodeAddress> = topology
            .members
            .iter()
            .map(|member| &member.management)
            .collect();

        let mut cursor = self.cursor.lock();
        for offset in 0..members.len() {
            let index = (*cursor + offset) % members.len();
            let candidate = members[index];
            if !context.exclude.contains(candidate) {
                *cursor = index + 1;
                return Ok(candidate.clone());
            }
        }

        Err(ControlError::Selection {
            context: format!("partition {} of topic '{}'", context.partition_id, context.topic),
            reason: format!(
                "none of the {} members is eligible to host it",
                members.len()
            ),
        })
    }
}

impl std::fmt::Debug for RoundRobinNodeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundRobinNodeSelector")
            .field("cursor", &*self.cursor.lock())
            .finish()
    }
}
