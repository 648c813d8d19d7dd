//! Lifecycle orchestrator: the single owner of the in-memory ledger.
//!
//! All transaction and block admissions are serialized through this
//! node's write lock; the periodic mining scheduler and the HTTP layer
//! never mutate the ledger concurrently. Mining is the only parallel
//! boundary, and workers only ever see value copies of a candidate
//! block.

use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::error::{ChainError, Result};
use crate::miner::WorkerPool;
use crate::peers::{PeerClient, PeerSet};
use crate::persistence::{FileStore, LedgerStore};
use crate::sync;
use crate::transaction::{Transaction, TxKind};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Node {
    reward_address: String,
    block_time: Duration,
    store: Arc<dyn LedgerStore>,
    client: PeerClient,
    pub peers: Arc<PeerSet>,
    pub blockchain: Arc<RwLock<Blockchain>>,
    workers: WorkerPool,
    is_mining: AtomicBool,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    round_waiter: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    /// Builds a node backed by the configured JSON files. Fails fast if
    /// the persisted chain is corrupt.
    pub fn new(config: &Config) -> Result<Arc<Self>> {
        let store = Arc::new(FileStore::new(config.storage.blockchain_file.clone().into()));
        let peers = Arc::new(PeerSet::load(config.storage.peers_file.clone().into())?);
        Self::with_store(config, store, peers)
    }

    /// Builds a node over an explicit store and peer registry. Used by
    /// tests with in-memory backends.
    pub fn with_store(
        config: &Config,
        store: Arc<dyn LedgerStore>,
        peers: Arc<PeerSet>,
    ) -> Result<Arc<Self>> {
        let settings = config.chain.settings()?;
        let chain = store.load(&settings)?;

        Ok(Arc::new(Node {
            reward_address: config.chain.reward_address.clone(),
            block_time: settings.block_time,
            store,
            client: PeerClient::new(&config.node.id, &config.node.name),
            peers,
            blockchain: Arc::new(RwLock::new(chain)),
            workers: WorkerPool::new(config.mining.workers),
            is_mining: AtomicBool::new(false),
            scheduler: Mutex::new(None),
            round_waiter: Mutex::new(None),
        }))
    }

    pub fn is_mining(&self) -> bool {
        self.is_mining.load(Ordering::SeqCst)
    }

    /// Saves the ledger; failures after startup are logged, not fatal.
    fn persist(&self, chain: &Blockchain) {
        if let Err(e) = self.store.save(chain) {
            warn!("failed to persist ledger: {e}");
        }
    }

    /// Admits a transaction, routing it to the pending pool when idle or
    /// the buffer while a mining round is in flight. Optionally
    /// broadcasts it to peers (suppressed for transactions that arrived
    /// from a peer). A full pending pool triggers an immediate round.
    pub async fn add_transaction(self: &Arc<Self>, tx: Transaction, broadcast: bool) -> Result<()> {
        let pending_full = {
            let mut chain = self.blockchain.write().await;
            if self.is_mining.load(Ordering::SeqCst) {
                chain.add_buffered_transaction(tx.clone())?;
                info!("transaction buffered while mining is in flight");
            } else {
                chain.add_pending_transaction(tx.clone())?;
            }
            self.persist(&chain);
            chain.pending_transactions.len() >= chain.block_size
        };

        if broadcast {
            let client = self.client.clone();
            let peers = self.peers.all();
            tokio::spawn(async move {
                client.broadcast_transaction(&peers, &tx).await;
            });
        }

        if pending_full && !self.is_mining.load(Ordering::SeqCst) {
            info!("maximum block size reached, mining a new block");
            self.start_mining_round().await;
        }

        Ok(())
    }

    /// Builds a candidate block from the pending pool plus one freshly
    /// minted reward transaction, chained onto the current head.
    pub async fn generate_mineable_block(&self, reward_address: &str) -> Block {
        let chain = self.blockchain.read().await;
        let mut transactions = chain.pending_transactions.clone();
        transactions.push(Transaction::reward(
            reward_address.to_string(),
            chain.mining_reward,
        ));
        Block::new(
            chain.latest_block().index + 1,
            chrono::Utc::now().to_rfc3339(),
            transactions,
            chain.latest_block().hash.clone(),
        )
    }

    /// Admits a block, whether mined locally or received from a peer.
    ///
    /// Every transaction in the block must be structurally valid and the
    /// block must contain exactly one reward transaction. On acceptance,
    /// up to `block_size` buffered transactions move into the pending
    /// pool (oldest first), pending transactions already included in the
    /// block are dropped, the ledger is persisted, and the mining
    /// scheduler restarts from a clean timer.
    pub async fn add_block(self: &Arc<Self>, block: Block) -> Result<()> {
        {
            let mut chain = self.blockchain.write().await;

            let mut rewards = 0usize;
            for tx in &block.transactions {
                tx.is_valid().map_err(|e| {
                    ChainError::InvalidBlock(format!("invalid transaction in block: {e}"))
                })?;
                if tx.kind == TxKind::Reward {
                    rewards += 1;
                }
            }
            if rewards != 1 {
                return Err(ChainError::InvalidBlock(format!(
                    "expected exactly one reward transaction, found {rewards}"
                )));
            }

            chain.add_block(block.clone())?;

            let take = chain.block_size.min(chain.transaction_buffer.len());
            let unbuffered: Vec<Transaction> = chain.transaction_buffer.drain(..take).collect();
            chain.pending_transactions.extend(unbuffered);

            let included: HashSet<&str> = block
                .transactions
                .iter()
                .filter(|t| !t.signature.is_empty())
                .map(|t| t.signature.as_str())
                .collect();
            chain
                .pending_transactions
                .retain(|t| !included.contains(t.signature.as_str()));

            self.persist(&chain);
            info!(index = block.index, hash = %block.hash, "block accepted");
        }

        self.restart_mining_loop();
        Ok(())
    }

    /// Starts the periodic mining scheduler. A no-op if it is already
    /// running.
    pub fn start_mining_loop(self: &Arc<Self>) {
        let mut guard = self.scheduler.lock();
        if guard.is_some() {
            info!("mining loop is already running");
            return;
        }

        let node = Arc::clone(self);
        let period = self.block_time;
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // interval fires immediately; rounds should start one period in.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if node.is_mining.load(Ordering::SeqCst) {
                    info!("mining is already in progress, skipping this round");
                    continue;
                }
                node.start_mining_round().await;
            }
        }));
        info!(period_ms = period.as_millis() as u64, "mining loop started");
    }

    /// Cancels the scheduler and terminates any in-flight mining round,
    /// discarding its eventual result. Safe to call when nothing runs.
    pub fn stop_mining_loop(&self) {
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
            info!("mining loop stopped");
        }
        if let Some(handle) = self.round_waiter.lock().take() {
            handle.abort();
        }
        self.workers.reset();
        self.is_mining.store(false, Ordering::SeqCst);
    }

    fn restart_mining_loop(self: &Arc<Self>) {
        self.stop_mining_loop();
        self.start_mining_loop();
    }

    /// Starts one mining round over the current pending pool.
    pub async fn start_mining_round(self: &Arc<Self>) {
        if self.is_mining.swap(true, Ordering::SeqCst) {
            info!("mining is already in progress, skipping round");
            return;
        }

        let candidate = self.generate_mineable_block(&self.reward_address).await;
        let difficulty = self.blockchain.read().await.difficulty;

        let Some(receiver) = self.workers.mine(candidate, difficulty) else {
            self.is_mining.store(false, Ordering::SeqCst);
            return;
        };

        let node = Arc::clone(self);
        let waiter = tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || receiver.recv()).await {
                Ok(Ok(winner)) => node.finish_mining_round(winner).await,
                _ => {
                    node.workers.reset();
                    node.is_mining.store(false, Ordering::SeqCst);
                    warn!("mining round ended without a result");
                }
            }
        });
        *self.round_waiter.lock() = Some(waiter);
    }

    /// Mining -> Idle transition: terminate the losing workers, admit the
    /// winning block through the shared admission path, and broadcast it.
    async fn finish_mining_round(self: &Arc<Self>, block: Block) {
        // Detach this waiter so the scheduler restart inside add_block
        // cannot abort the task that is running it.
        let _ = self.round_waiter.lock().take();
        self.workers.reset();
        self.is_mining.store(false, Ordering::SeqCst);
        info!(nonce = block.nonce, hash = %block.hash, "mining completed");

        match self.add_block(block.clone()).await {
            Ok(()) => {
                let client = self.client.clone();
                let peers = self.peers.all();
                tokio::spawn(async move {
                    client.broadcast_block(&peers, &block).await;
                });
            }
            Err(e) => warn!("mined block was rejected: {e}"),
        }
    }

    /// Fetches every peer's chain and adopts the longest valid one that
    /// shares local history, replacing the ledger wholesale. Returns
    /// whether a replacement occurred.
    pub async fn synchronize_with_peers(&self) -> bool {
        let candidates = self.client.fetch_all(&self.peers.all()).await;

        let mut chain = self.blockchain.write().await;
        match sync::select_candidate(&chain, candidates) {
            Some(adopted) => {
                info!(
                    size = adopted.size,
                    "found a valid longer blockchain from peers, replacing local chain"
                );
                *chain = adopted;
                self.persist(&chain);
                true
            }
            None => {
                info!("no valid longer blockchain found");
                false
            }
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.round_waiter.lock().take() {
            handle.abort();
        }
        self.workers.reset();
    }
}
