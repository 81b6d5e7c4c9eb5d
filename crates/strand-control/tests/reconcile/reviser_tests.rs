//! Replication reviser cycles against scripted collaborators.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use test_log::test;
use tokio::time::Instant;

use strand::config::ReplicationConfig;
use strand_control::{
    Reconciler, ReplicationReviser,
    types::*,
};

use crate::test_utilities::{
    FailingSelector, FlakyTopology, REPLICATION_PORT, TestCluster, member, node, partition,
};

#[test(tokio::test(start_paused = true))]
async fn test_under_replicated_partition_is_invited_once_per_window() {
    let cluster = TestCluster::new(vec![partition(7, "orders", 3, Some("mars"), &[])]);
    cluster.desired.declare("orders", 1, 3).unwrap();
    let mut reviser = cluster.reviser();

    let report = reviser.run_cycle(None).await;
    reviser.settle().await;

    assert_eq!(report.requests_issued, 2);
    assert!(reviser.in_flight().contains(&PartitionId(7), Instant::now()));

    let invitations = cluster.transport.invitations();
    assert_eq!(invitations.len(), 2);
    let targets: HashSet<NodeAddress> = invitations.iter().map(|(target, _)| target.clone()).collect();
    assert_eq!(targets, HashSet::from([node("saturn"), node("venus")]));

    let (_, invite) = &invitations[0];
    assert_eq!(invite.topic, "orders");
    assert_eq!(invite.partition_id, PartitionId(7));
    assert_eq!(invite.replication_factor, 3);
    assert_eq!(invite.members.len(), 3);
    assert!(invite.members.iter().all(|member| member.port == REPLICATION_PORT));

    // Shortfall persists but the partition is suppressed
    let report = reviser.run_cycle(None).await;
    assert_eq!(report.requests_issued, 0);
    assert_eq!(report.suppressed, 1);
    assert_eq!(reviser.in_flight().len(), 1);
    assert_eq!(cluster.transport.invitations().len(), 2);
}

#[test(tokio::test(start_paused = true))]
async fn test_suppression_expires_after_invite_timeout() {
    let cluster = TestCluster::new(vec![partition(7, "orders", 3, Some("mars"), &[])]);
    cluster.desired.declare("orders", 1, 3).unwrap();
    let mut reviser = cluster.reviser();

    reviser.run_cycle(None).await;
    reviser.settle().await;

    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(reviser.run_cycle(None).await.requests_issued, 0);

    tokio::time::advance(Duration::from_secs(1)).await;
    let report = reviser.run_cycle(None).await;
    reviser.settle().await;

    assert_eq!(report.requests_issued, 2);
    assert_eq!(cluster.transport.invitations().len(), 4);
    assert_eq!(reviser.in_flight().len(), 1);
}

#[test(tokio::test(start_paused = true))]
async fn test_resolved_shortfall_clears_suppression() {
    let cluster = TestCluster::new(vec![partition(7, "orders", 2, Some("mars"), &[])]);
    cluster.desired.declare("orders", 1, 2).unwrap();
    let mut reviser = cluster.reviser();

    reviser.run_cycle(None).await;
    reviser.settle().await;
    assert!(reviser.in_flight().contains(&PartitionId(7), Instant::now()));

    cluster
        .topology
        .add_follower(PartitionId(7), node("saturn"))
        .unwrap();
    let report = reviser.run_cycle(None).await;

    assert!(report.is_idle());
    assert!(reviser.in_flight().is_empty());

    // A node lost later is invited for again without waiting out the window
    cluster
        .topology
        .remove_follower(PartitionId(7), &node("saturn"))
        .unwrap();
    assert_eq!(reviser.run_cycle(None).await.requests_issued, 1);
}

#[test(tokio::test)]
async fn test_partition_without_nodes_gets_full_factor() {
    let cluster = TestCluster::new(vec![partition(4, "orders", 2, None, &[])]);
    cluster.desired.declare("orders", 1, 2).unwrap();
    let mut reviser = cluster.reviser();

    let report = reviser.run_cycle(None).await;
    reviser.settle().await;

    assert_eq!(report.requests_issued, 2);
    assert_eq!(cluster.transport.invitations().len(), 2);
}

#[test(tokio::test)]
async fn test_fully_replicated_and_undeclared_partitions_ignored() {
    let cluster = TestCluster::new(vec![
        partition(1, "orders", 2, Some("mars"), &["saturn"]),
        partition(2, "orders", 2, Some("venus"), &["mars", "saturn"]),
        partition(3, "payments", 3, Some("mars"), &[]),
    ]);
    cluster.desired.declare("orders", 2, 2).unwrap();
    let mut reviser = cluster.reviser();

    let report = reviser.run_cycle(None).await;

    assert!(report.is_idle());
    assert!(cluster.transport.sent().is_empty());
}

#[test(tokio::test)]
async fn test_topic_filter_restricts_cycle() {
    let cluster = TestCluster::new(vec![
        partition(1, "orders", 2, Some("mars"), &[]),
        partition(2, "payments", 2, Some("mars"), &[]),
    ]);
    cluster.desired.declare("orders", 1, 2).unwrap();
    cluster.desired.declare("payments", 1, 2).unwrap();
    let mut reviser = cluster.reviser();

    reviser.run_cycle(Some("payments")).await;
    reviser.settle().await;

    let invitations = cluster.transport.invitations();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].1.topic, "payments");
}

#[test(tokio::test)]
async fn test_topology_failure_ends_cycle_without_state_change() {
    let cluster = TestCluster::new(vec![partition(7, "orders", 3, Some("mars"), &[])]);
    cluster.desired.declare("orders", 1, 3).unwrap();
    let mut reviser = ReplicationReviser::new(
        Arc::new(FlakyTopology::new(cluster.topology.clone(), 1)),
        cluster.desired.clone(),
        cluster.selector.clone(),
        cluster.transport.clone(),
        &ReplicationConfig::default(),
    );

    let report = reviser.run_cycle(None).await;
    assert_eq!(report.failures, 1);
    assert_eq!(report.requests_issued, 0);
    assert!(reviser.in_flight().is_empty());

    // The next cycle succeeds
    assert_eq!(reviser.run_cycle(None).await.requests_issued, 2);
}

#[test(tokio::test)]
async fn test_failed_requests_keep_partition_suppressed() {
    let cluster = TestCluster::new(vec![partition(7, "orders", 2, Some("mars"), &[])]);
    cluster.desired.declare("orders", 1, 2).unwrap();
    cluster.transport.make_unreachable(node("saturn"));
    let mut reviser = cluster.reviser();

    reviser.run_cycle(None).await;
    reviser.settle().await;

    assert_eq!(cluster.transport.invitations().len(), 1);
    assert_eq!(reviser.run_cycle(None).await.suppressed, 1);
}

#[test(tokio::test)]
async fn test_selection_failure_keeps_partition_suppressed() {
    let cluster = TestCluster::new(vec![partition(7, "orders", 3, Some("mars"), &[])]);
    cluster.desired.declare("orders", 1, 3).unwrap();
    let selector = Arc::new(FailingSelector::default());
    let mut reviser = ReplicationReviser::new(
        Arc::new(cluster.topology.clone()),
        cluster.desired.clone(),
        selector.clone(),
        cluster.transport.clone(),
        &ReplicationConfig::default(),
    );

    reviser.run_cycle(None).await;
    reviser.settle().await;

    assert_eq!(selector.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(cluster.transport.sent().is_empty());
    assert_eq!(reviser.run_cycle(None).await.suppressed, 1);
}

#[test(tokio::test(start_paused = true))]
async fn test_membership_changes_steer_invitations() {
    // Every member already hosts the partition
    let cluster = TestCluster::new(vec![partition(
        7,
        "orders",
        4,
        Some("mars"),
        &["saturn", "venus"],
    )]);
    cluster.desired.declare("orders", 1, 4).unwrap();
    let mut reviser = cluster.reviser();

    reviser.run_cycle(None).await;
    reviser.settle().await;
    assert!(cluster.transport.invitations().is_empty());

    cluster.topology.add_member(member("jupiter"));
    tokio::time::advance(Duration::from_secs(30)).await;
    reviser.run_cycle(None).await;
    reviser.settle().await;

    let invitations = cluster.transport.invitations();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].0, node("jupiter"));
    assert_eq!(invitations[0].1.members.len(), 4);

    // A departed member no longer appears in the member list sent with invitations
    cluster.topology.remove_member(&node("venus"));
    tokio::time::advance(Duration::from_secs(30)).await;
    reviser.run_cycle(None).await;
    reviser.settle().await;

    let invitations = cluster.transport.invitations();
    assert_eq!(invitations.len(), 2);
    assert_eq!(invitations[1].0, node("jupiter"));
    assert!(
        invitations[1]
            .1
            .members
            .iter()
            .all(|address| address.host != "venus")
    );
    assert_eq!(invitations[1].1.members.len(), 3);
}
