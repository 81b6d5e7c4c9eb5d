//! Partition provisioning.
//!
//! For every declared topic without recorded partition ids, creates the
//! partitions the topology does not show yet and, once all of them are
//! visible, appends a completion record to the event log. Topics with
//! recorded ids are never touched again.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use strand::config::ProvisioningConfig;

use crate::{
    ControlError,
    driver::{CycleReport, Reconciler},
    in_flight::InFlightSet,
    snapshot::ClusterStateSnapshot,
    traits::{DesiredStateStore, EventLogWriter, IdGenerator, NodeSelector, TopologyProvider, Transport},
    types::*,
};

/// The provisioning gap of one topic at one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProvisionRecord {
    pub topic: String,
    pub key: u64,
    pub partition_count: u32,
    pub replication_factor: u32,
    /// Partition ids of the topic visible in the snapshot.
    pub existing: Vec<PartitionId>,
}

impl PendingProvisionRecord {
    pub fn new(desired: &DesiredTopic, snapshot: &ClusterStateSnapshot) -> Self {
        Self {
            topic: desired.name.clone(),
            key: desired.key,
            partition_count: desired.partition_count,
            replication_factor: desired.replication_factor,
            existing: snapshot.partition_ids_for(&desired.name),
        }
    }

    pub fn name_bytes(&self) -> &[u8] {
        self.topic.as_bytes()
    }

    /// `max(partition_count - existing, 0)`.
    pub fn missing_partitions(&self) -> u32 {
        let existing = u32::try_from(self.existing.len()).unwrap_or(u32::MAX);
        self.partition_count.saturating_sub(existing)
    }

    pub fn completion(&self) -> CompletionRecord {
        CompletionRecord {
            topic: self.topic.clone(),
            partition_count: self.partition_count,
            replication_factor: self.replication_factor,
            partition_ids: self.existing.clone(),
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Result of one partition creation request.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created {
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

pub struct TopicProvisioner {
    topology: Arc<dyn TopologyProvider>,
    desired: Arc<dyn DesiredStateStore>,
    selector: Arc<dyn NodeSelector>,
    id_generator: Arc<dyn IdGenerator>,
    transport: Arc<dyn Transport>,
    event_log: Arc<dyn EventLogWriter>,
    tick_interval: Duration,
    creating: InFlightSet<String>,
    completing: InFlightSet<String>,
    outstanding: JoinSet<CreateOutcome>,
}

impl TopicProvisioner {
    pub fn new(
        topology: Arc<dyn TopologyProvider>,
        desired: Arc<dyn DesiredStateStore>,
        selector: Arc<dyn NodeSelector>,
        id_generator: Arc<dyn IdGenerator>,
        transport: Arc<dyn Transport>,
        event_log: Arc<dyn EventLogWriter>,
        config: &ProvisioningConfig,
    ) -> Self {
        Self {
            topology,
            desired,
            selector,
            id_generator,
            transport,
            event_log,
            tick_interval: config.tick_interval(),
            creating: InFlightSet::new(config.creation_timeout()),
            completing: InFlightSet::new(config.completion_timeout()),
            outstanding: JoinSet::new(),
        }
    }

    /// Topics with partition creations in flight.
    pub fn creating(&self) -> &InFlightSet<String> {
        &self.creating
    }

    /// Topics whose completion record was appended recently.
    pub fn completing(&self) -> &InFlightSet<String> {
        &self.completing
    }

    fn create(&mut self, pending: &PendingProvisionRecord, partition_id: PartitionId) {
        let selector = Arc::clone(&self.selector);
        let transport = Arc::clone(&self.transport);
        let context = PlacementContext {
            topic: pending.topic.clone(),
            partition_id,
            exclude: Vec::new(),
        };
        let request = CreatePartition {
            topic: pending.topic.clone(),
            partition_id,
            replication_factor: pending.replication_factor,
        };

        self.outstanding.spawn(async move {
            let topic = context.topic.clone();

            let target = match selector.next_candidate(&context).await {
                Ok(target) => target,
                Err(error) => {
                    return CreateOutcome::SelectionFailed {
                        topic,
                        partition_id,
                        error,
                    };
                }
            };

            match transport
                .send(&target, ControlRequest::CreatePartition(request))
                .await
            {
                Ok(()) => CreateOutcome::Created {
                    topic,
                    partition_id,
                    target,
                },
                Err(error) => CreateOutcome::RequestFailed {
                    topic,
                    partition_id,
                    target,
                    error,
                },
            }
        });
    }

    /// Append the completion record, yielding between rejected attempts.
    async fn append_completion(&self, pending: &PendingProvisionRecord) -> i64 {
        let record = pending.completion();
        let mut attempts = 1u64;
        loop {
            let position = self.event_log.append_completion(pending.key, &record);
            if position >= 0 {
                if attempts > 1 {
                    debug!(
                        "Completion of topic '{}' appended after {attempts} attempts",
                        pending.topic
                    );
                }
                return position;
            }
            attempts += 1;
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Reconciler for TopicProvisioner {
    type Outcome = CreateOutcome;

    fn name(&self) -> &'static str {
        "topic-provisioner"
    }

    fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    async fn run_cycle(&mut self, topic: Option<&str>) -> CycleReport {
        let mut report = CycleReport::default();
        let now = Instant::now();
        self.creating.sweep(now);
        self.completing.sweep(now);

        let snapshot = match self.topology.query().await {
            Ok(topology) => ClusterStateSnapshot::build(&topology),
            Err(e) => {
                warn!("Provisioning cycle aborted, topology query failed: {e}");
                report.failures += 1;
                return report;
            }
        };

        let topics = match self.desired.topics(topic).await {
            Ok(topics) => topics,
            Err(e) => {
                warn!("Provisioning cycle aborted, desired topics unavailable: {e}");
                report.failures += 1;
                return report;
            }
        };

        let pending: Vec<PendingProvisionRecord> = topics
            .iter()
            .filter(|desired| !desired.is_created())
            .filter(|desired| {
                if desired.partition_count == 0 {
                    warn!("Topic '{}' declares no partitions, skipping it", desired.name);
                }
                desired.partition_count > 0
            })
            .map(|desired| PendingProvisionRecord::new(desired, &snapshot))
            .collect();

        for record in &pending {
            let missing = record.missing_partitions();

            if missing > 0 {
                if !self.creating.try_insert(record.topic.clone(), now) {
                    debug!("Topic '{}' still has partition creations in flight", record.topic);
                    report.suppressed += 1;
                    continue;
                }

                info!(
                    "Topic '{}' has {} of {} partitions, creating {missing} more",
                    record.topic,
                    record.existing.len(),
                    record.partition_count
                );

                for _ in 0..missing {
                    match self.id_generator.next_id().await {
                        Ok(partition_id) => {
                            self.create(record, partition_id);
                            report.requests_issued += 1;
                        }
                        Err(e) => {
                            warn!(
                                "Could not allocate a partition id for topic '{}': {e}",
                                record.topic
                            );
                            report.failures += 1;
                        }
                    }
                }
                continue;
            }

            if self.completing.contains(&record.topic, now) {
                report.suppressed += 1;
                continue;
            }

            let position = self.append_completion(record).await;
            info!(
                "Topic '{}' fully provisioned with partitions {:?}, completion appended at {position}",
                record.topic, record.existing
            );
            self.creating.remove(&record.topic);
            self.completing.try_insert(record.topic.clone(), now);
            report.completions_appended += 1;
        }

        report
    }

    fn outstanding(&mut self) -> &mut JoinSet<CreateOutcome> {
        &mut self.outstanding
    }

    fn on_outcome(&mut self, outcome: CreateOutcome) {
        match outcome {
            CreateOutcome::Created {
                topic,
                partition_id,
                target,
            } => {
                debug!("Requested {target} to create partition {partition_id} of topic '{topic}'");
            }
            CreateOutcome::SelectionFailed {
                topic,
                partition_id,
                error,
            } => {
                warn!("No node to host partition {partition_id} of topic '{topic}': {error}");
            }
            CreateOutcome::RequestFailed {
                topic,
                partition_id,
                target,
                error,
            } => {
                warn!(
                    "Failed to create partition {partition_id} of topic '{topic}' on {target}: {error}"
                );
            }
        }
    }
}
