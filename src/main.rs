// src/main.rs
//
// Composition root: a minimal node binary that wires up the ledgermesh
// library.
//
// - File-backed storage
// - Proof-of-work consensus
// - Fixed-reward incentive
// - WebSocket peer mesh (seed peers dialed once at start)

use std::sync::Arc;

use tokio::signal;

use ledgermesh::config::NodeConfig;
use ledgermesh::consensus::PowConsensus;
use ledgermesh::incentive::FixedRewardIncentive;
use ledgermesh::peer::NodeIdentity;
use ledgermesh::storage::FileStorage;
use ledgermesh::{Blockchain, Node, PeerService};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "ledgermesh=info".to_string()))
        .init();

    if let Err(err) = run().await {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // For now, just a bare path argument or defaults. Command-line
    // configuration parsing beyond that is out of scope.
    let config = match std::env::args().nth(1) {
        Some(path) => NodeConfig::load_from_path(&path).unwrap_or_else(|err| {
            tracing::warn!(%err, %path, "failed to load config, falling back to defaults");
            NodeConfig::default()
        }),
        None => NodeConfig::default(),
    };

    let storage = FileStorage::new(config.storage_path.clone());
    let consensus = PowConsensus::new(config.consensus_config());
    let incentive = FixedRewardIncentive::new(config.fixed_reward);

    let blockchain = Arc::new(Blockchain::new(
        storage,
        consensus,
        incentive,
        config.min_entries_per_block,
    ));
    blockchain.start(&config.genesis_config()).await;

    let identity = NodeIdentity {
        id: config.id.clone(),
        label: config.label.clone(),
        ip: config.ip.clone(),
        url: config.url.clone(),
        p2p_port: config.port,
        web_service_port: config.web_service_port,
        owner_address: config.owner_address.clone(),
    };

    let peers = Arc::new(PeerService::new(identity.clone(), Arc::clone(&blockchain)));
    let node = Node::new(identity, Arc::clone(&blockchain), Arc::clone(&peers));
    node.spawn_event_wiring();

    if config.auto_start {
        let listen_peers = Arc::clone(&peers);
        let port = config.port;
        tokio::spawn(async move {
            if let Err(err) = listen_peers.listen(port).await {
                tracing::error!(%err, "peer listener exited");
            }
        });
        peers.dial_seed_peers(&config.seed_peers).await;
    }

    tracing::info!(height = blockchain.tip_index().await, "ledgermesh node started");
    shutdown_signal().await;
    tracing::info!("shutting down");
    Ok(())
}

/// Waits for Ctrl-C, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
