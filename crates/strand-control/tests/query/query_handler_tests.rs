//! Authority rules of the partitions query handler.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use test_log::test;

use strand_control::{
    ControlError, PartitionsQueryHandler, RequestContext,
    memory::InMemoryDesiredState,
    query::PartitionEntry,
    types::*,
};

use crate::test_utilities::CountingDesiredState;

fn completed_store() -> Arc<InMemoryDesiredState> {
    let desired = Arc::new(InMemoryDesiredState::new());
    for (name, ids) in [("orders", vec![4, 5]), ("payments", vec![9])] {
        desired
            .declare(name, u32::try_from(ids.len()).unwrap(), 1)
            .unwrap();
        desired
            .apply_completion(&CompletionRecord {
                topic: name.to_string(),
                partition_count: u32::try_from(ids.len()).unwrap(),
                replication_factor: 1,
                partition_ids: ids.into_iter().map(PartitionId).collect(),
                completed_at: "2024-01-01T00:00:00+00:00".to_string(),
            })
            .unwrap();
    }
    // Declared but not yet provisioned; contributes no entries
    desired.declare("audit", 2, 1).unwrap();
    desired
}

#[test(tokio::test)]
async fn test_wrong_partition_is_rejected_without_enumeration() {
    let store = Arc::new(CountingDesiredState::new(completed_store()));
    let handler = PartitionsQueryHandler::new(SYSTEM_PARTITION_ID);
    handler.bind(store.clone());

    let error = handler
        .handle(PartitionId(3), &RequestContext::default())
        .await
        .unwrap_err();

    assert!(matches!(error, ControlError::Validation { .. }));
    assert!(error.to_string().contains("system partition"));
    assert_eq!(store.enumerations.load(Ordering::SeqCst), 0);
}

#[test(tokio::test)]
async fn test_unbound_node_reports_partition_not_found() {
    let handler = PartitionsQueryHandler::new(SYSTEM_PARTITION_ID);

    let error = handler
        .handle(SYSTEM_PARTITION_ID, &RequestContext::default())
        .await
        .unwrap_err();

    assert_eq!(error, ControlError::partition_not_found(SYSTEM_PARTITION_ID));
    assert!(error.is_not_found());
}

#[test(tokio::test)]
async fn test_bound_node_lists_every_partition() {
    let handler = PartitionsQueryHandler::new(SYSTEM_PARTITION_ID);
    handler.bind(completed_store());

    let response = handler
        .handle(
            SYSTEM_PARTITION_ID,
            &RequestContext {
                request_id: 7,
                remote: Some("127.0.0.1:40000".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        response.partitions,
        vec![
            PartitionEntry {
                partition_id: PartitionId(4),
                topic: "orders".to_string(),
            },
            PartitionEntry {
                partition_id: PartitionId(5),
                topic: "orders".to_string(),
            },
            PartitionEntry {
                partition_id: PartitionId(9),
                topic: "payments".to_string(),
            },
        ]
    );
}

#[test(tokio::test)]
async fn test_enumeration_failure_reported_as_partition_not_found() {
    let handler = PartitionsQueryHandler::new(SYSTEM_PARTITION_ID);
    handler.bind(Arc::new(CountingDesiredState::failing(completed_store())));

    let error = handler
        .handle(SYSTEM_PARTITION_ID, &RequestContext::default())
        .await
        .unwrap_err();

    match error {
        ControlError::PartitionNotFound {
            partition_id,
            reason: Some(reason),
        } => {
            assert_eq!(partition_id, 0);
            assert!(reason.contains("store closed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test(tokio::test)]
async fn test_unbind_after_losing_leadership() {
    let handler = PartitionsQueryHandler::new(SYSTEM_PARTITION_ID);
    handler.bind(completed_store());
    assert!(handler.is_bound());
    assert!(
        handler
            .handle(SYSTEM_PARTITION_ID, &RequestContext::default())
            .await
            .is_ok()
    );

    handler.unbind();

    assert!(!handler.is_bound());
    let error = handler
        .handle(SYSTEM_PARTITION_ID, &RequestContext::default())
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[test(tokio::test)]
async fn test_custom_system_partition() {
    let handler = PartitionsQueryHandler::new(PartitionId(1));
    handler.bind(completed_store());

    assert!(
        handler
            .handle(SYSTEM_PARTITION_ID, &RequestContext::default())
            .await
            .is_err()
    );
    assert_eq!(
        handler
            .handle(PartitionId(1), &RequestContext::default())
            .await
            .unwrap()
            .partitions
            .len(),
        3
    );
}
