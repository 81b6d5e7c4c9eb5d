use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tonic::{Request, Response, Status};

use strand_proto::{ListPartitionsRequest, ListPartitionsResponse, PartitionQuery};

use crate::ControlError;
use crate::query::{PartitionsQueryHandler, RequestContext};
use crate::types::PartitionId;

/// Server adapter that implements the PartitionQuery service.
///
/// Converts tonic requests into [`PartitionsQueryHandler::handle`] calls.
#[derive(Debug)]
pub struct PartitionQueryService {
    handler: Arc<PartitionsQueryHandler>,
    next_request_id: AtomicU64,
}

impl PartitionQueryService {
    pub fn new(handler: Arc<PartitionsQueryHandler>) -> Self {
        Self {
            handler,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn handler(&self) -> &PartitionsQueryHandler {
        &self.handler
    }
}

#[tonic::async_trait]
impl PartitionQuery for PartitionQueryService {
    async fn list_partitions(
        &self,
        request: Request<ListPartitionsRequest>,
    ) -> Result<Response<ListPartitionsResponse>, Status> {
        let context = RequestContext {
            request_id: self.next_request_id.fetch_add(1, Ordering::Relaxed),
            remote: request.remote_addr().map(|addr| addr.to_string()),
        };
        let partition_id = PartitionId(request.into_inner().partition_id);

        let response = self
            .handler
            .handle(partition_id, &context)
            .await
            .map_err(control_error_to_status)?;

        Ok(Response::new(ListPartitionsResponse {
            partitions: response
                .partitions
                .into_iter()
                .map(|entry| strand_proto::PartitionEntry {
                    partition_id: entry.partition_id.into(),
                    topic: entry.topic,
                })
                .collect(),
        }))
    }
}

/// Convert a ControlError to a tonic Status for gRPC responses.
pub fn control_error_to_status(error: ControlError) -> Status {
    match error {
        ControlError::Validation { .. } => Status::invalid_argument(error.to_string()),
        ControlError::PartitionNotFound { .. } => Status::not_found(error.to_string()),
        ControlError::TopicNotFound { .. } => Status::not_found(error.to_string()),
        ControlError::InvalidConfig { .. } => Status::invalid_argument(error.to_string()),
        ControlError::TransientQuery { .. } => Status::unavailable(error.to_string()),
        ControlError::RemoteRequest { .. } => Status::unavailable(error.to_string()),
        ControlError::Selection { .. } => Status::internal(error.to_string()),
        ControlError::ConfigIo { .. } => Status::internal(error.to_string()),
        ControlError::Transport { .. } => Status::internal(error.to_string()),
    }
}
