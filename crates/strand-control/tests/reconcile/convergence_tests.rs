//! Both loops running on their own tasks against a simulated cluster.

use std::sync::Arc;
use std::time::Duration;
use test_log::test;

use strand::ControlConfig;
use strand_control::{
    DesiredStateStore, ReplicationReviser, TopicProvisioner,
    memory::{InMemoryEventLog, RoundRobinNodeSelector, SequentialIdGenerator},
    snapshot::ClusterStateSnapshot,
    spawn,
};

use crate::test_utilities::{SimulatedTransport, TestCluster, partition, wait_for};

fn fast_config() -> ControlConfig {
    let mut config = ControlConfig::default();
    config.replication.tick_interval_ms = 10;
    config.replication.invite_timeout_ms = 200;
    config.provisioning.tick_interval_ms = 10;
    config.provisioning.creation_timeout_ms = 500;
    config.provisioning.completion_timeout_ms = 500;
    config
}

#[test(tokio::test)]
async fn test_declared_topics_converge() {
    let cluster = TestCluster::new(vec![]);
    let config = fast_config();

    let topology = Arc::new(cluster.topology.clone());
    let selector = Arc::new(RoundRobinNodeSelector::new(topology.clone()));
    let transport = Arc::new(SimulatedTransport::new(cluster.topology.clone()));
    let event_log = Arc::new(InMemoryEventLog::with_forwarding(cluster.desired.clone()));

    let reviser = spawn(
        ReplicationReviser::new(
            topology.clone(),
            cluster.desired.clone(),
            selector.clone(),
            transport.clone(),
            &config.replication,
        ),
        Some(cluster.desired.subscribe()),
        config.mailbox_capacity,
    );
    let provisioner = spawn(
        TopicProvisioner::new(
            topology,
            cluster.desired.clone(),
            selector,
            Arc::new(SequentialIdGenerator::new(config.system_partition_id)),
            transport,
            event_log.clone(),
            &config.provisioning,
        ),
        Some(cluster.desired.subscribe()),
        config.mailbox_capacity,
    );

    cluster.desired.declare("orders", 3, 2).unwrap();
    cluster.desired.declare("payments", 1, 3).unwrap();

    wait_for(|| {
        let snapshot = ClusterStateSnapshot::build(&cluster.topology.current());
        let created = ["orders", "payments"]
            .iter()
            .all(|name| cluster.desired.topic(name).is_some_and(|topic| topic.is_created()));
        created
            && snapshot.partition_count() == 4
            && snapshot
                .topics()
                .flat_map(|topic| snapshot.placements_for(topic))
                .all(|placement| placement.missing_replicas() == 0)
    })
    .await;

    reviser.shutdown().await;
    provisioner.shutdown().await;

    let snapshot = ClusterStateSnapshot::build(&cluster.topology.current());

    let orders = snapshot.placements_for("orders");
    assert_eq!(orders.len(), 3);
    assert!(orders.iter().all(|placement| placement.node_count() == 2));

    let payments = snapshot.placements_for("payments");
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].node_count(), 3);

    // Recorded ids are exactly the placed ones, and each topic completed once
    for name in ["orders", "payments"] {
        let recorded = cluster.desired.topics(Some(name)).await.unwrap()[0]
            .partition_ids
            .clone();
        assert_eq!(recorded, snapshot.partition_ids_for(name));
    }
    assert_eq!(event_log.len(), 2);
}

#[test(tokio::test)]
async fn test_trigger_runs_cycle_for_topic() {
    let cluster = TestCluster::new(vec![]);
    let mut config = ControlConfig::default();
    // Only the initial tick and the trigger run
    config.provisioning.tick_interval_ms = 3_600_000;

    let provisioner = spawn(cluster.provisioner_with_config(&config.provisioning), None, 4);

    cluster.desired.declare("orders", 2, 1).unwrap();
    provisioner.trigger("orders").await.unwrap();
    wait_for(|| cluster.transport.creations().len() == 2).await;

    provisioner.shutdown().await;
}

#[test(tokio::test)]
async fn test_shutdown_while_completion_append_keeps_failing() {
    let cluster = TestCluster::new(vec![partition(4, "orders", 1, Some("mars"), &[])]);
    cluster.desired.declare("orders", 1, 1).unwrap();
    cluster.event_log.reject_next(u32::MAX);

    let provisioner = spawn(cluster.provisioner(), None, 4);
    wait_for(|| cluster.event_log.pending_rejections() < u32::MAX).await;

    tokio::time::timeout(Duration::from_secs(2), provisioner.shutdown())
        .await
        .expect("shutdown should complete while appends are rejected");
    assert!(cluster.event_log.is_empty());
}
