//! The Blockchain's reactive event bus.
//!
//! A `tokio::sync::broadcast` channel stands in for the source's ad-hoc
//! pub/sub: subscribers (the Node's rebroadcast wiring, logging) get an
//! owned `Event` per lifecycle step without the orchestrator needing to
//! know who, if anyone, is listening.

use tokio::sync::broadcast;

use crate::types::{Block, Entry};

/// Default broadcast channel capacity. Lagging subscribers drop the
/// oldest events rather than block the orchestrator (`broadcast::Sender`
/// never blocks on send).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub enum Event {
    ChainLoaded { height: u64 },
    GenesisCreated { hash: String },
    /// `relay` is false when the entry arrived via the peer mesh and
    /// has already been forwarded there (preserving its original
    /// message id for downstream dedup); the event wiring should only
    /// gossip entries with `relay: true`.
    EntryAdded { entry: Entry, relay: bool },
    BlockCreationStarted { index: u64 },
    BlockCreated { block: Block },
    IncentiveProcessed { entry_id: String },
    BlockCreationEnded { block: Option<Block> },
    PeerBlockAccepted { block: Block },
    PeerChainAccepted { height: u64 },
}

/// Thin wrapper around a broadcast sender so callers don't need to
/// import `tokio::sync::broadcast` directly.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes an event. Per `broadcast::Sender::send`'s contract this
    /// only errs when there are no subscribers; that's not a failure
    /// worth propagating, so it's swallowed.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
