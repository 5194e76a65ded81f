//! WebSocket peer-to-peer mesh: handshake, gossip, dedup, and full-chain
//! reconciliation.

pub mod dedup;
pub mod error;
pub mod message;

pub use error::PeerError;
pub use message::{Envelope, Message, SenderConfig};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{info, warn};

use crate::blockchain::Blockchain;
use crate::consensus::Consensus;
use crate::incentive::Incentive;
use crate::storage::Storage;
use crate::types::{Block, Entry};
use crate::util::now_ms;

use dedup::DedupSet;

/// This node's identity, propagated in handshakes and stamped into
/// blocks it mines.
#[derive(Clone, Debug)]
pub struct NodeIdentity {
    pub id: String,
    pub label: String,
    pub ip: String,
    pub url: String,
    pub p2p_port: u16,
    pub web_service_port: u16,
    pub owner_address: String,
}

impl NodeIdentity {
    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            id: self.id.clone(),
            label: self.label.clone(),
            ip: self.ip.clone(),
            url: self.url.clone(),
            p2p_port: self.p2p_port,
            web_service_port: self.web_service_port,
        }
    }
}

struct PeerHandle {
    #[allow(dead_code)] // descriptive; not currently read back, kept for future peer-listing queries
    sender_config: SenderConfig,
    outbound: mpsc::UnboundedSender<Envelope>,
}

/// WebSocket mesh: accepts inbound connections, dials seed peers,
/// gossips entries and blocks, and serves full-chain requests.
pub struct PeerService<S, C, I> {
    identity: NodeIdentity,
    blockchain: Arc<Blockchain<S, C, I>>,
    peers: Mutex<HashMap<String, PeerHandle>>,
    dedup: Mutex<DedupSet>,
}

impl<S, C, I> PeerService<S, C, I>
where
    S: Storage + 'static,
    C: Consensus + 'static,
    I: Incentive + 'static,
{
    pub fn new(identity: NodeIdentity, blockchain: Arc<Blockchain<S, C, I>>) -> Self {
        PeerService {
            identity,
            blockchain,
            peers: Mutex::new(HashMap::new()),
            dedup: Mutex::new(DedupSet::new()),
        }
    }

    /// Binds `port` and accepts inbound peer connections until the
    /// process is shut down.
    pub async fn listen(self: &Arc<Self>, port: u16) -> Result<(), PeerError> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        info!(port, "peer service listening");
        loop {
            let (stream, addr) = listener.accept().await?;
            let this = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(err) = this.accept_inbound(stream, addr).await {
                    warn!(%err, %addr, "inbound peer connection ended");
                }
            });
        }
    }

    async fn accept_inbound(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        addr: SocketAddr,
    ) -> Result<(), PeerError> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        info!(%addr, "accepted inbound peer connection");
        self.run_connection(ws_stream).await
    }

    /// Dials every seed peer URL once, at node startup.
    pub async fn dial_seed_peers(self: &Arc<Self>, seed_peers: &[String]) {
        for url in seed_peers {
            let this = Arc::clone(self);
            let url = url.clone();
            tokio::spawn(async move {
                if let Err(err) = this.dial(&url).await {
                    warn!(%err, %url, "failed to dial seed peer");
                }
            });
        }
    }

    async fn dial(self: &Arc<Self>, url: &str) -> Result<(), PeerError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        info!(%url, "dialed seed peer");
        self.run_connection(ws_stream).await
    }

    async fn run_connection<St>(self: &Arc<Self>, ws_stream: St) -> Result<(), PeerError>
    where
        St: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Unpin + Send + 'static,
    {
        let (mut sink, mut stream) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Envelope>();

        let handshake = Message::Handshake.into_envelope(self.identity.sender_config());
        sink.send(WsMessage::Text(serde_json::to_string(&handshake)?))
            .await?;

        let write_task = tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                let Ok(text) = serde_json::to_string(&envelope) else {
                    continue;
                };
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let mut remote_id: Option<String> = None;
        while let Some(frame) = stream.next().await {
            let frame = frame?;
            let text = match frame {
                WsMessage::Text(text) => text,
                WsMessage::Close(_) => break,
                _ => continue,
            };
            let Ok(envelope) = serde_json::from_str::<Envelope>(&text) else {
                continue;
            };

            if envelope.kind == "handshake" {
                remote_id = Some(envelope.sender_config.id.clone());
                self.handle_handshake(envelope, &outbound_tx).await;
                continue;
            }

            if self
                .dedup
                .lock()
                .await
                .seen_or_record(&envelope.message_id, now_ms())
            {
                continue;
            }
            self.handle_message(envelope, &outbound_tx).await;
        }

        if let Some(id) = remote_id {
            self.peers.lock().await.remove(&id);
            info!(peer_id = %id, "peer disconnected");
        }
        write_task.abort();
        Ok(())
    }

    /// Not gossiped further: establishes the peer-table entry, replying
    /// with our own handshake if the sender was previously unknown.
    async fn handle_handshake(&self, envelope: Envelope, outbound: &mpsc::UnboundedSender<Envelope>) {
        let sender_config = envelope.sender_config;
        let mut peers = self.peers.lock().await;
        if peers.contains_key(&sender_config.id) {
            return;
        }
        peers.insert(
            sender_config.id.clone(),
            PeerHandle {
                sender_config,
                outbound: outbound.clone(),
            },
        );
        drop(peers);
        let reply = Message::Handshake.into_envelope(self.identity.sender_config());
        let _ = outbound.send(reply);
    }

    async fn handle_message(self: &Arc<Self>, envelope: Envelope, reply_to: &mpsc::UnboundedSender<Envelope>) {
        let message = match Message::try_from(envelope.clone()) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, "dropping malformed peer message");
                return;
            }
        };

        match message {
            Message::Handshake => {}
            Message::NewEntry(entry) => {
                self.blockchain.submit_peer_entry(entry).await;
                self.broadcast(&envelope).await;
            }
            Message::RequestFullChain => {
                let chain = self.blockchain.chain_snapshot().await;
                let response = Message::FullChain(chain).into_envelope(self.identity.sender_config());
                let _ = reply_to.send(response);
            }
            Message::FullChain(chain) => {
                let local_len = self.blockchain.chain_len().await;
                if chain.len() > local_len {
                    self.blockchain.replace_chain(chain).await;
                }
            }
            Message::NewBlock(block) => {
                self.handle_new_block(block, envelope).await;
            }
        }
    }

    /// Branches on whether the sender is ahead of our tip, and gossips
    /// onward even when the block is locally invalid.
    async fn handle_new_block(&self, block: Block, envelope: Envelope) {
        let tip_index = self.blockchain.tip_index().await;
        if block.index > tip_index + 1 {
            self.unicast(
                &envelope.sender_config.id,
                Message::RequestFullChain.into_envelope(self.identity.sender_config()),
            )
            .await;
            self.broadcast(&envelope).await;
            return;
        }

        if self.blockchain.validate_block(&block).await.is_ok() {
            self.blockchain.add_peer_block(block).await;
        } else {
            warn!("peer block failed local validation, dropping but still gossiping onward");
        }
        self.broadcast(&envelope).await;
    }

    /// Broadcasts an entry this node originated.
    pub async fn broadcast_entry(&self, entry: Entry) {
        let envelope = Message::NewEntry(entry).into_envelope(self.identity.sender_config());
        self.broadcast(&envelope).await;
    }

    /// Broadcasts a block this node mined.
    pub async fn broadcast_block(&self, block: Block) {
        let envelope = Message::NewBlock(block).into_envelope(self.identity.sender_config());
        self.broadcast(&envelope).await;
    }

    /// Sends to every peer except the one named in `envelope.senderConfig.id`.
    async fn broadcast(&self, envelope: &Envelope) {
        let peers = self.peers.lock().await;
        for (id, handle) in peers.iter() {
            if id == &envelope.sender_config.id {
                continue;
            }
            let _ = handle.outbound.send(envelope.clone());
        }
    }

    async fn unicast(&self, peer_id: &str, envelope: Envelope) {
        let peers = self.peers.lock().await;
        if let Some(handle) = peers.get(peer_id) {
            let _ = handle.outbound.send(envelope);
        }
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_sender_config_mirrors_fields() {
        let identity = NodeIdentity {
            id: "node-a".into(),
            label: "Node A".into(),
            ip: "127.0.0.1".into(),
            url: "ws://127.0.0.1:9000".into(),
            p2p_port: 9000,
            web_service_port: 8080,
            owner_address: "02aa".into(),
        };
        let config = identity.sender_config();
        assert_eq!(config.id, identity.id);
        assert_eq!(config.p2p_port, identity.p2p_port);
    }
}
