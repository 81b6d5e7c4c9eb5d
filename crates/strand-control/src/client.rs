use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use strand::config::TransportConfig;
use strand_proto::ReplicaControlClient;

use crate::{ControlError, traits::Transport, types::*};

/// [`Transport`] that delivers control requests over gRPC.
///
/// Keeps one lazily connected channel per node address. A channel is dropped
/// after a failed request so the next request reconnects from scratch.
#[derive(Debug)]
pub struct GrpcTransport {
    connect_timeout: Duration,
    request_timeout: Duration,
    channels: Mutex<HashMap<NodeAddress, Channel>>,
}

impl GrpcTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached channels.
    pub fn cached_channels(&self) -> usize {
        self.channels.lock().len()
    }

    fn channel(&self, target: &NodeAddress) -> Result<Channel, ControlError> {
        let mut channels = self.channels.lock();
        if let Some(channel) = channels.get(target) {
            return Ok(channel.clone());
        }

        let endpoint = Endpoint::from_shared(target.to_uri())
            .map_err(|e| ControlError::from_transport_error(e, "Invalid endpoint"))?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout);

        let channel = endpoint.connect_lazy();
        channels.insert(target.clone(), channel.clone());
        Ok(channel)
    }

    fn forget(&self, target: &NodeAddress) {
        self.channels.lock().remove(target);
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn send(&self, target: &NodeAddress, request: ControlRequest) -> Result<(), ControlError> {
        let mut client = ReplicaControlClient::new(self.channel(target)?);
        let description = request.to_string();

        let result = match request {
            ControlRequest::InviteReplica(invite) => client
                .invite_replica(Request::new(strand_proto::InviteReplicaRequest::from(invite)))
                .await
                .map(|_| ()),
            ControlRequest::CreatePartition(create) => client
                .create_partition(Request::new(strand_proto::CreatePartitionRequest::from(create)))
                .await
                .map(|_| ()),
        };

        result.map_err(|status| {
            self.forget(target);
            status_to_control_error(status, target, &description)
        })
    }
}

fn proto_address(address: &NodeAddress) -> strand_proto::NodeAddress {
    strand_proto::NodeAddress {
        host: address.host.clone(),
        port: u32::from(address.port),
    }
}

impl From<InviteReplica> for strand_proto::InviteReplicaRequest {
    fn from(invite: InviteReplica) -> Self {
        strand_proto::InviteReplicaRequest {
            topic: invite.topic,
            partition_id: invite.partition_id.into(),
            replication_factor: invite.replication_factor,
            members: invite.members.iter().map(proto_address).collect(),
        }
    }
}

impl From<CreatePartition> for strand_proto::CreatePartitionRequest {
    fn from(create: CreatePartition) -> Self {
        strand_proto::CreatePartitionRequest {
            topic: create.topic,
            partition_id: create.partition_id.into(),
            replication_factor: create.replication_factor,
        }
    }
}

/// Convert a tonic Status to a ControlError naming the target and request.
fn status_to_control_error(status: Status, target: &NodeAddress, request: &str) -> ControlError {
    let reason = match status.code() {
        tonic::Code::Unavailable => format!("service unavailable: {}", status.message()),
        tonic::Code::DeadlineExceeded => format!("request timeout: {}", status.message()),
        tonic::Code::NotFound => format!("not found: {}", status.message()),
        tonic::Code::InvalidArgument => format!("invalid argument: {}", status.message()),
        code => format!("{code:?}: {}", status.message()),
    };

    ControlError::RemoteRequest {
        target: target.to_string(),
        context: request.to_string(),
        reason,
    }
}
