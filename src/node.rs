//! Composition root: wires Blockchain lifecycle events to PeerService
//! broadcasts.

use std::sync::Arc;

use tracing::warn;

use crate::blockchain::{Blockchain, Event};
use crate::consensus::Consensus;
use crate::incentive::Incentive;
use crate::peer::{NodeIdentity, PeerService};
use crate::storage::Storage;

pub struct Node<S, C, I> {
    pub identity: NodeIdentity,
    pub blockchain: Arc<Blockchain<S, C, I>>,
    pub peers: Arc<PeerService<S, C, I>>,
}

impl<S, C, I> Node<S, C, I>
where
    S: Storage + 'static,
    C: Consensus + 'static,
    I: Incentive + 'static,
{
    pub fn new(identity: NodeIdentity, blockchain: Arc<Blockchain<S, C, I>>, peers: Arc<PeerService<S, C, I>>) -> Self {
        Node {
            identity,
            blockchain,
            peers,
        }
    }

    /// Spawns the task that forwards Blockchain lifecycle events to the
    /// peer mesh: `entryAdded` → broadcastEntry, `blockCreated` →
    /// broadcastBlock. Other events are logging-only from this node's
    /// perspective.
    pub fn spawn_event_wiring(&self) {
        let mut events = self.blockchain.subscribe();
        let peers = Arc::clone(&self.peers);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(Event::EntryAdded { entry, relay: true }) => peers.broadcast_entry(entry).await,
                    Ok(Event::EntryAdded { relay: false, .. }) => {}
                    Ok(Event::BlockCreated { block }) => peers.broadcast_block(block).await,
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event wiring task lagged behind the blockchain event bus");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
