use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use strand::{ConfigLoader, ControlConfig, PartitionId};
use strand_control::{
    DesiredStateStore, GrpcTransport, PartitionQueryService, PartitionsQueryHandler,
    ReplicationReviser, TopicProvisioner,
    manifest::{ClusterManifest, ManifestLoader},
    memory::{
        InMemoryDesiredState, InMemoryEventLog, InMemoryTopology, RoundRobinNodeSelector,
        SequentialIdGenerator,
    },
};
use strand_proto::PartitionQueryServer;

#[derive(Parser, Debug)]
#[command(
    name = "strand-controller",
    version,
    author,
    about = "Strand control-plane reconciliation controller"
)]
struct Args {
    /// Bind address (IP or hostname) of the partition query service
    #[arg(long, default_value = "0.0.0.0")]
    addr: String,

    /// Port to listen on
    #[arg(long, default_value_t = 51015)]
    port: u16,

    /// Controller configuration file (JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cluster manifest file seeding topology and declared topics
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Partition ids up to and including this value are never allocated
    #[arg(long)]
    id_floor: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    strand::telemetry::init();

    let args = Args::parse();
    let addr: SocketAddr = format!("{}:{}", args.addr, args.port).parse()?;

    let config = match &args.config {
        Some(path) => ConfigLoader::from_path(path)?,
        None => ControlConfig::default(),
    };
    let manifest = match &args.manifest {
        Some(path) => ManifestLoader::from_path(path)?,
        None => ClusterManifest::new(),
    };

    // Never hand out an id the manifest already uses, nor the system partition's
    let floor = args
        .id_floor
        .map(PartitionId)
        .into_iter()
        .chain(manifest.max_partition_id())
        .chain(Some(config.system_partition_id))
        .max()
        .unwrap_or(config.system_partition_id);

    let topology = Arc::new(InMemoryTopology::new(manifest.topology()));
    let desired = InMemoryDesiredState::from_manifest(&manifest)?;
    let selector = Arc::new(RoundRobinNodeSelector::new(topology.clone()));
    let id_generator = Arc::new(SequentialIdGenerator::new(floor));
    let event_log = Arc::new(InMemoryEventLog::with_forwarding(desired.clone()));
    let transport = Arc::new(GrpcTransport::new(&config.transport));

    tracing::info!(
        members = manifest.members.len(),
        topics = manifest.topics.len(),
        partitions = manifest.partitions.len(),
        id_floor = %floor,
        "Loaded cluster manifest"
    );

    let reviser = strand_control::spawn(
        ReplicationReviser::new(
            topology.clone(),
            desired.clone(),
            selector.clone(),
            transport.clone(),
            &config.replication,
        ),
        Some(desired.subscribe()),
        config.mailbox_capacity,
    );
    let provisioner = strand_control::spawn(
        TopicProvisioner::new(
            topology.clone(),
            desired.clone(),
            selector,
            id_generator,
            transport,
            event_log,
            &config.provisioning,
        ),
        Some(desired.subscribe()),
        config.mailbox_capacity,
    );

    // This process holds the desired state, so it answers as system-partition leader
    let handler = Arc::new(PartitionsQueryHandler::new(config.system_partition_id));
    handler.bind(desired);

    tracing::info!(%addr, "Starting strand partition query server");
    let served = tonic::transport::Server::builder()
        .add_service(PartitionQueryServer::new(PartitionQueryService::new(handler)))
        .serve_with_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    tracing::info!("Shutting down reconciliation loops");
    reviser.shutdown().await;
    provisioner.shutdown().await;

    served?;
    Ok(())
}
