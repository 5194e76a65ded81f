//! The chain orchestrator: owns the chain and the entry pool, mediates
//! between the pluggable Consensus/Incentive/Storage services, and
//! serializes the three concurrent sources of chain mutation (local
//! mining, peer block arrival, peer chain replacement) behind one state
//! machine.

pub mod events;
pub mod validate;

pub use events::{Event, EventBus};
pub use validate::{ChainValidationReport, ValidationIssue};

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use crate::consensus::{Consensus, ConsensusError, GenesisConfig};
use crate::incentive::Incentive;
use crate::pool::{EntryPool, SubmitOutcome};
use crate::storage::Storage;
use crate::types::{
    Block, BlockData, CancelToken, Entry, EntryLocation, EntryView, Identity, TIMESTAMP_TOLERANCE_MS,
};
use crate::util::now_ms;

/// One explicit state machine in place of a handful of independent
/// boolean flags, which would otherwise allow combinations (mining and
/// committing at once) the system never intends to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainState {
    Idle,
    MiningOwn,
    CommittingOwn,
    CommittingPeerBlock,
    ReplacingChain,
}

struct GuardedChain {
    chain: Vec<Block>,
    state: ChainState,
    /// Bumped every time own-mining starts or is preempted, so a mining
    /// attempt that returns after being overtaken by a peer event can
    /// recognize it's stale and discard its result instead of appending
    /// it.
    mining_ticket: u64,
}

impl GuardedChain {
    fn tip(&self) -> &Block {
        self.chain.last().expect("chain always has at least a genesis block")
    }
}

pub struct Blockchain<S, C, I> {
    storage: Arc<S>,
    consensus: Arc<C>,
    incentive: Arc<I>,
    guarded: Mutex<GuardedChain>,
    pool: Mutex<EntryPool>,
    events: EventBus,
    mining_cancel: Mutex<Option<CancelToken>>,
}

impl<S, C, I> Blockchain<S, C, I>
where
    S: Storage + 'static,
    C: Consensus + 'static,
    I: Incentive + 'static,
{
    pub fn new(storage: S, consensus: C, incentive: I, min_entries_per_block: usize) -> Self {
        Blockchain {
            storage: Arc::new(storage),
            consensus: Arc::new(consensus),
            incentive: Arc::new(incentive),
            guarded: Mutex::new(GuardedChain {
                chain: Vec::new(),
                state: ChainState::Idle,
                mining_ticket: 0,
            }),
            pool: Mutex::new(EntryPool::new(min_entries_per_block)),
            events: EventBus::new(),
            mining_cancel: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Loads the persisted chain, or mints a fresh genesis if none is
    /// present.
    pub async fn start(&self, genesis_config: &GenesisConfig) {
        match self.storage.load_chain().await {
            Ok(chain) => {
                let height = chain.last().map(|b| b.index).unwrap_or(0);
                let mut guard = self.guarded.lock().await;
                guard.chain = chain;
                drop(guard);
                info!(height, "chain loaded from storage");
                self.events.publish(Event::ChainLoaded { height });
            }
            Err(err) => {
                warn!(%err, "no chain in storage, creating genesis");
                let genesis = self.consensus.create_genesis(genesis_config);
                if let Err(err) = self.storage.append_block(&genesis).await {
                    error!(%err, "failed to persist genesis block");
                }
                let hash = genesis.hash.clone();
                let mut guard = self.guarded.lock().await;
                guard.chain.push(genesis);
                drop(guard);
                info!(hash = %hash, "genesis created");
                self.events.publish(Event::GenesisCreated { hash });
            }
        }
    }

    /// Forwards `entry` to the pool; on acceptance, emits `entryAdded`
    /// (marked for gossip relay) and checks whether the pool has
    /// crossed the mining threshold. Use this for entries originating
    /// locally (submitted directly, or minted internally such as
    /// incentive rewards) — entries arriving from the peer mesh should
    /// go through [`Blockchain::submit_peer_entry`] instead.
    pub async fn submit_entry(self: &Arc<Self>, entry: Entry) -> bool {
        self.submit_entry_inner(entry, true).await
    }

    /// Same as [`Blockchain::submit_entry`], but for an entry that
    /// already arrived over the peer mesh: `PeerService` forwards the
    /// original envelope itself (preserving its message id for
    /// downstream dedup), so the resulting `entryAdded` event must not
    /// trigger a second, freshly-addressed gossip broadcast.
    pub async fn submit_peer_entry(self: &Arc<Self>, entry: Entry) -> bool {
        self.submit_entry_inner(entry, false).await
    }

    async fn submit_entry_inner(self: &Arc<Self>, entry: Entry, relay: bool) -> bool {
        let now = now_ms() as i64;
        let outcome = self.pool.lock().await.submit(entry, now);
        match outcome {
            SubmitOutcome::Inserted(entry_id) => {
                if let Some(view) = self.pool.lock().await.view_by_id(&entry_id) {
                    self.events.publish(Event::EntryAdded { entry: view.entry, relay });
                }
                self.maybe_start_mining().await;
                true
            }
            SubmitOutcome::Duplicate => false,
            SubmitOutcome::Rejected(err) => {
                warn!(%err, "dropped entry failing validation");
                false
            }
        }
    }

    async fn maybe_start_mining(self: &Arc<Self>) {
        let should_mine = {
            let pool = self.pool.lock().await;
            let idle = matches!(self.guarded.lock().await.state, ChainState::Idle);
            pool.should_trigger_mining() && idle
        };
        if should_mine {
            let data = self.pool.lock().await.pending();
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.add_block(data).await;
            });
        }
    }

    /// Mines and commits a block from `data`, guarded against a second
    /// mining attempt running concurrently.
    pub async fn add_block(self: &Arc<Self>, data: Vec<Entry>) -> Option<Block> {
        let (index, previous_hash, ticket, cancel) = {
            let mut guard = self.guarded.lock().await;
            if guard.state != ChainState::Idle {
                return None;
            }
            guard.state = ChainState::MiningOwn;
            guard.mining_ticket += 1;
            let ticket = guard.mining_ticket;
            let tip = guard.tip();
            let index = tip.index + 1;
            let previous_hash = tip.hash.clone();
            let cancel = CancelToken::new();
            *self.mining_cancel.lock().await = Some(cancel.clone());
            (index, previous_hash, ticket, cancel)
        };

        self.events.publish(Event::BlockCreationStarted { index });

        let consensus = Arc::clone(&self.consensus);
        let mined = tokio::task::spawn_blocking(move || {
            consensus.create_block(index, BlockData::Entries(data), previous_hash, &cancel)
        })
        .await
        .expect("mining task does not panic");

        let mut guard = self.guarded.lock().await;
        let still_ours = guard.state == ChainState::MiningOwn && guard.mining_ticket == ticket;
        if !still_ours {
            // Preempted by a peer block/chain event while mining ran;
            // the winning nonce (if any) is discarded.
            drop(guard);
            self.events.publish(Event::BlockCreationEnded { block: None });
            return None;
        }

        let Some(block) = mined else {
            guard.state = ChainState::Idle;
            drop(guard);
            self.events.publish(Event::BlockCreationEnded { block: None });
            return None;
        };

        guard.state = ChainState::CommittingOwn;
        drop(guard);

        if let Err(err) = self.storage.append_block(&block).await {
            error!(%err, "storage append failed, discarding mined block");
            self.guarded.lock().await.state = ChainState::Idle;
            self.events.publish(Event::BlockCreationEnded { block: None });
            return None;
        }

        let height = block.index;
        let mut guard = self.guarded.lock().await;
        if guard.state != ChainState::CommittingOwn || guard.mining_ticket != ticket {
            error!("chain state changed unexpectedly while committing own block; discarding");
            drop(guard);
            self.events.publish(Event::BlockCreationEnded { block: None });
            return None;
        }
        guard.chain.push(block.clone());
        guard.state = ChainState::Idle;
        let chain_snapshot = guard.chain.clone();
        drop(guard);

        self.pool.lock().await.prune(&block);
        info!(height, hash = %block.hash, "block committed");
        self.events.publish(Event::BlockCreated { block: block.clone() });

        if let Some(reward) = self.incentive.process(&chain_snapshot, height) {
            let entry_id = reward.entry_id.clone();
            self.submit_entry(reward).await;
            self.events.publish(Event::IncentiveProcessed { entry_id });
        }

        self.events.publish(Event::BlockCreationEnded { block: Some(block.clone()) });
        Some(block)
    }

    /// Validates and, if accepted, appends a block learned from a peer.
    pub async fn add_peer_block(&self, block: Block) -> bool {
        let mut guard = self.guarded.lock().await;
        match guard.state {
            ChainState::CommittingOwn | ChainState::CommittingPeerBlock | ChainState::ReplacingChain => {
                return false;
            }
            ChainState::MiningOwn => {
                // Peer blocks may interrupt in-flight mining: cancel it
                // and bump the ticket so the stale attempt is discarded
                // when it returns.
                if let Some(cancel) = self.mining_cancel.lock().await.as_ref() {
                    cancel.cancel();
                }
                guard.mining_ticket += 1;
            }
            ChainState::Idle => {}
        }

        if self.validate_block_locked(&guard, &block).is_err() {
            return false;
        }

        guard.state = ChainState::CommittingPeerBlock;
        drop(guard);

        if let Err(err) = self.storage.append_block(&block).await {
            error!(%err, "storage append failed for peer block");
            self.guarded.lock().await.state = ChainState::Idle;
            return false;
        }

        let mut guard = self.guarded.lock().await;
        if guard.state != ChainState::CommittingPeerBlock {
            error!("chain state changed unexpectedly while committing peer block; discarding");
            drop(guard);
            return false;
        }
        guard.chain.push(block.clone());
        guard.state = ChainState::Idle;
        drop(guard);

        self.pool.lock().await.prune(&block);
        info!(height = block.index, hash = %block.hash, "peer block accepted");
        self.events.publish(Event::PeerBlockAccepted { block });
        true
    }

    /// Adopts `new_chain` wholesale if it is strictly longer and passes
    /// independent validation.
    pub async fn replace_chain(&self, new_chain: Vec<Block>) -> bool {
        let mut guard = self.guarded.lock().await;
        if !matches!(guard.state, ChainState::Idle | ChainState::MiningOwn) {
            return false;
        }
        if new_chain.len() <= guard.chain.len() {
            return false;
        }
        let report = validate::validate_chain(&new_chain, self.consensus.as_ref());
        if !report.is_valid {
            return false;
        }

        if guard.state == ChainState::MiningOwn {
            if let Some(cancel) = self.mining_cancel.lock().await.as_ref() {
                cancel.cancel();
            }
            guard.mining_ticket += 1;
        }
        guard.state = ChainState::ReplacingChain;
        drop(guard);

        if let Err(err) = self.storage.rewrite_chain(&new_chain).await {
            error!(%err, "storage rewrite failed for replacement chain");
            self.guarded.lock().await.state = ChainState::Idle;
            return false;
        }

        let height = new_chain.last().map(|b| b.index).unwrap_or(0);
        let mut guard = self.guarded.lock().await;
        if guard.state != ChainState::ReplacingChain {
            error!("chain state changed unexpectedly while replacing chain; discarding");
            drop(guard);
            return false;
        }
        self.pool.lock().await.on_new_peer_chain(&new_chain);
        guard.chain = new_chain;
        guard.state = ChainState::Idle;
        drop(guard);

        info!(height, "peer chain adopted");
        self.events.publish(Event::PeerChainAccepted { height });
        true
    }

    fn validate_block_locked(&self, guard: &GuardedChain, block: &Block) -> Result<(), ConsensusError> {
        let tip = guard.tip();
        if block.index != tip.index + 1 {
            return Err(ConsensusError::NonSequentialIndex {
                expected_prev: tip.index,
                got: block.index,
            });
        }
        if block.previous_hash != tip.hash {
            return Err(ConsensusError::PreviousHashMismatch);
        }
        let drift = tip.timestamp as i64 - block.timestamp as i64;
        if drift >= TIMESTAMP_TOLERANCE_MS {
            return Err(ConsensusError::TimestampRegression {
                tolerance_ms: TIMESTAMP_TOLERANCE_MS,
            });
        }
        if !self.consensus.validate_block_consensus(block) {
            return Err(ConsensusError::DifficultyNotSatisfied);
        }
        Ok(())
    }

    /// Validates `block` as a candidate successor to the current tip.
    pub async fn validate_block(&self, block: &Block) -> Result<(), ConsensusError> {
        let guard = self.guarded.lock().await;
        self.validate_block_locked(&guard, block)
    }

    /// Independently re-validates a chain (defaults to the local chain
    /// when `chain` is `None`) against linkage, index, hash, and
    /// timestamp invariants.
    pub async fn validate_chain(&self, chain: Option<&[Block]>) -> ChainValidationReport {
        match chain {
            Some(chain) => validate::validate_chain(chain, self.consensus.as_ref()),
            None => {
                let guard = self.guarded.lock().await;
                validate::validate_chain(&guard.chain, self.consensus.as_ref())
            }
        }
    }

    pub async fn tip_index(&self) -> u64 {
        self.guarded.lock().await.tip().index
    }

    pub async fn chain_len(&self) -> usize {
        self.guarded.lock().await.chain.len()
    }

    pub async fn chain_snapshot(&self) -> Vec<Block> {
        self.guarded.lock().await.chain.clone()
    }

    pub async fn get_block_by_index(&self, index: u64) -> Option<Block> {
        self.guarded
            .lock()
            .await
            .chain
            .get(index as usize)
            .cloned()
    }

    pub async fn get_block_by_hash(&self, hash: &str) -> Option<Block> {
        self.guarded
            .lock()
            .await
            .chain
            .iter()
            .find(|b| b.hash == hash)
            .cloned()
    }

    pub async fn latest(&self, n: usize) -> Vec<Block> {
        let guard = self.guarded.lock().await;
        let len = guard.chain.len();
        let start = len.saturating_sub(n);
        guard.chain[start..].to_vec()
    }

    pub async fn range(&self, start: usize, limit: usize) -> Vec<Block> {
        let guard = self.guarded.lock().await;
        let len = guard.chain.len();
        let end = (start + limit).min(len);
        if start >= len {
            return Vec::new();
        }
        guard.chain[start..end].to_vec()
    }

    /// Entries sent or received by `identity`, across both confirmed
    /// blocks and the pending pool.
    pub async fn entries_for(&self, identity: &Identity) -> Vec<EntryView> {
        let mut views = Vec::new();
        {
            let guard = self.guarded.lock().await;
            for block in &guard.chain {
                for entry in block.data.entries() {
                    if &entry.from == identity || &entry.to == identity {
                        views.push(EntryView {
                            entry: entry.clone(),
                            location: EntryLocation::Confirmed(block.index),
                            validity: None,
                        });
                    }
                }
            }
        }
        let pool = self.pool.lock().await;
        for entry in pool.pending() {
            if &entry.from == identity || &entry.to == identity {
                views.push(EntryView {
                    entry,
                    location: EntryLocation::Pending,
                    validity: None,
                });
            }
        }
        views
    }

    /// Looks up an entry by id, pending or confirmed.
    pub async fn entry_by_id(&self, entry_id: &str) -> Option<EntryView> {
        {
            let guard = self.guarded.lock().await;
            for block in &guard.chain {
                if let Some(entry) = block.data.entries().iter().find(|e| e.entry_id == entry_id) {
                    return Some(EntryView {
                        entry: entry.clone(),
                        location: EntryLocation::Confirmed(block.index),
                        validity: None,
                    });
                }
            }
        }
        self.pool.lock().await.view_by_id(entry_id)
    }

    /// Validates an entry on demand, stamping the result into the
    /// returned view rather than mutating the stored entry.
    pub async fn validate_entry(&self, entry_id: &str) -> Option<EntryView> {
        let mut view = self.entry_by_id(entry_id).await?;
        let valid = view.entry.validate(now_ms() as i64).is_ok();
        view.validity = Some(valid);
        Some(view)
    }

    pub async fn pool_len(&self) -> usize {
        self.pool.lock().await.len()
    }
}
