//! Replication reconciliation.
//!
//! Compares each partition's declared replication factor with the number of
//! nodes currently hosting it and invites additional nodes for the shortfall.
//! A partition that received invitations is suppressed for the invite window,
//! whatever happens to the invitations themselves, so a silently lost request
//! is retried once the window expires.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use strand::config::ReplicationConfig;

use crate::{
    ControlError,
    driver::{CycleReport, Reconciler},
    in_flight::InFlightSet,
    snapshot::{ClusterStateSnapshot, PartitionPlacement},
    traits::{DesiredStateStore, NodeSelector, TopologyProvider, Transport},
    types::*,
};

/// Result of one invitation request.
#[derive(Debug, Clone, PartialEq)]
pub enum InviteOutcome {
    Invited {
        topic: String,
        partition_id: PartitionId,
        target: NodeAddress,
    },
    SelectionFailed {
        topic: String,
        partition_id: PartitionId,
        error: ControlError,
    },
    RequestFailed {
        topic: String,
        partition_id: PartitionId,
        target: NodeAddress,
        error: ControlError,
    },
}

pub struct ReplicationReviser {
    topology: Arc<dyn TopologyProvider>,
    desired: Arc<dyn DesiredStateStore>,
    selector: Arc<dyn NodeSelector>,
    transport: Arc<dyn Transport>,
    tick_interval: Duration,
    in_flight: InFlightSet<PartitionId>,
    outstanding: JoinSet<InviteOutcome>,
}

impl ReplicationReviser {
    pub fn new(
        topology: Arc<dyn TopologyProvider>,
        desired: Arc<dyn DesiredStateStore>,
        selector: Arc<dyn NodeSelector>,
        transport: Arc<dyn Transport>,
        config: &ReplicationConfig,
    ) -> Self {
        Self {
            topology,
            desired,
            selector,
            transport,
            tick_interval: config.tick_interval(),
            in_flight: InFlightSet::new(config.invite_timeout()),
            outstanding: JoinSet::new(),
        }
    }

    /// Partitions for which invitations are currently in flight.
    pub fn in_flight(&self) -> &InFlightSet<PartitionId> {
        &self.in_flight
    }

    fn invite(&mut self, placement: &PartitionPlacement, members: &[NodeAddress]) {
        let selector = Arc::clone(&self.selector);
        let transport = Arc::clone(&self.transport);
        let context = PlacementContext {
            topic: placement.topic().to_string(),
            partition_id: placement.partition_id(),
            exclude: placement.nodes(),
        };
        let request = InviteReplica {
            topic: placement.topic().to_string(),
            partition_id: placement.partition_id(),
            replication_factor: placement.replication_factor(),
            members: members.to_vec(),
        };

        self.outstanding.spawn(async move {
            let PlacementContext {
                topic,
                partition_id,
                ..
            } = context.clone();

            let target = match selector.next_candidate(&context).await {
                Ok(target) => target,
                Err(error) => {
                    return InviteOutcome::SelectionFailed {
                        topic,
                        partition_id,
                        error,
                    };
                }
            };

            match transport
                .send(&target, ControlRequest::InviteReplica(request))
                .await
            {
                Ok(()) => InviteOutcome::Invited {
                    topic,
                    partition_id,
                    target,
                },
                Err(error) => InviteOutcome::RequestFailed {
                    topic,
                    partition_id,
                    target,
                    error,
                },
            }
        });
    }
}

#[async_trait]
impl Reconciler for ReplicationReviser {
    type Outcome = InviteOutcome;

    fn name(&self) -> &'static str {
        "replication-reviser"
    }

    fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    async fn run_cycle(&mut self, topic: Option<&str>) -> CycleReport {
        let mut report = CycleReport::default();
        let now = Instant::now();
        self.in_flight.sweep(now);

        let topology = match self.topology.query().await {
            Ok(topology) => topology,
            Err(e) => {
                warn!("Replication cycle aborted, topology query failed: {e}");
                report.failures += 1;
                return report;
            }
        };
        let snapshot = ClusterStateSnapshot::build(&topology);

        let topics = match self.desired.topics(topic).await {
            Ok(topics) => topics,
            Err(e) => {
                warn!("Replication cycle aborted, desired topics unavailable: {e}");
                report.failures += 1;
                return report;
            }
        };

        let members = topology.replication_addresses();

        for desired in &topics {
            for placement in snapshot.placements_for(&desired.name) {
                let missing = placement.missing_replicas();
                if missing == 0 {
                    // Shortfall resolved; no reason to keep suppressing the partition
                    self.in_flight.remove(&placement.partition_id());
                    continue;
                }

                if !self.in_flight.try_insert(placement.partition_id(), now) {
                    debug!(
                        "Partition {} of topic '{}' still has invitations in flight",
                        placement.partition_id(),
                        placement.topic()
                    );
                    report.suppressed += 1;
                    continue;
                }

                info!(
                    "Partition {} of topic '{}' has {} of {} replicas, inviting {missing} more",
                    placement.partition_id(),
                    placement.topic(),
                    placement.node_count(),
                    placement.replication_factor()
                );

                for _ in 0..missing {
                    self.invite(placement, &members);
                    report.requests_issued += 1;
                }
            }
        }

        report
    }

    fn outstanding(&mut self) -> &mut JoinSet<InviteOutcome> {
        &mut self.outstanding
    }

    fn on_outcome(&mut self, outcome: InviteOutcome) {
        match outcome {
            InviteOutcome::Invited {
                topic,
                partition_id,
                target,
            } => {
                debug!("Invited {target} to replicate partition {partition_id} of topic '{topic}'");
            }
            InviteOutcome::SelectionFailed {
                topic,
                partition_id,
                error,
            } => {
                warn!(
                    "No candidate node for partition {partition_id} of topic '{topic}': {error}"
                );
            }
            InviteOutcome::RequestFailed {
                topic,
                partition_id,
                target,
                error,
            } => {
                warn!(
                    "Failed to invite {target} to replicate partition {partition_id} of topic '{topic}': {error}"
                );
            }
        }
    }
}
