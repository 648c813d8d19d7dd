//! Proof-of-work search and the worker pool coordinator.
//!
//! The search itself is a pure, CPU-bound loop over a nonce stride. The
//! pool runs N copies of it on OS threads with disjoint residue classes
//! mod N, so no nonce is searched twice and any valid nonce is found by
//! exactly one worker. Workers never touch the live ledger: each receives
//! a value copy of the candidate block and reports back over a channel.

use crate::blockchain::Block;
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Sequential strided nonce search: starting at `start_nonce`, advance by
/// `stride` until the block's hash has `difficulty` leading zeros.
/// Deterministic and side-effect free beyond the block's own hash/nonce.
pub fn mine_block(block: &mut Block, difficulty: u32, start_nonce: u64, stride: u64) {
    let target = "0".repeat(difficulty as usize);
    block.nonce = start_nonce;
    block.hash = block.calculate_hash();
    while !block.hash.starts_with(&target) {
        block.nonce = block.nonce.wrapping_add(stride);
        block.hash = block.calculate_hash();
    }
}

/// Worker-side variant that bails out when the pool's stop flag is set.
fn mine_until_stopped(
    mut block: Block,
    difficulty: u32,
    start_nonce: u64,
    stride: u64,
    stop: &AtomicBool,
) -> Option<Block> {
    let target = "0".repeat(difficulty as usize);
    block.nonce = start_nonce;
    block.hash = block.calculate_hash();
    while !block.hash.starts_with(&target) {
        if stop.load(Ordering::Relaxed) {
            return None;
        }
        block.nonce = block.nonce.wrapping_add(stride);
        block.hash = block.calculate_hash();
    }
    Some(block)
}

/// Coordinates a pool of strided search workers.
///
/// `mine` refuses re-entry while a round is running; `reset` terminates
/// any outstanding workers and is idempotent.
pub struct WorkerPool {
    workers: usize,
    busy: AtomicBool,
    stop: Arc<AtomicBool>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        WorkerPool {
            workers: workers.max(1),
            busy: AtomicBool::new(false),
            stop: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn is_mining(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Starts a mining round over `block`. Returns the result channel the
    /// first valid block will arrive on, or `None` if a round is already
    /// in flight. The caller must `reset` the pool once it has taken a
    /// result (or decided to abandon the round).
    pub fn mine(&self, block: Block, difficulty: u32) -> Option<Receiver<Block>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            warn!("worker pool is already mining, refusing new round");
            return None;
        }
        self.stop.store(false, Ordering::SeqCst);

        info!(workers = self.workers, difficulty, "starting mining round");
        let (sender, receiver) = bounded(self.workers);
        let stride = self.workers as u64;
        let mut handles = self.handles.lock();
        for start_nonce in 0..stride {
            let candidate = block.clone();
            let stop = Arc::clone(&self.stop);
            let result_tx = sender.clone();
            handles.push(thread::spawn(move || {
                if let Some(mined) =
                    mine_until_stopped(candidate, difficulty, start_nonce, stride, &stop)
                {
                    debug!(nonce = mined.nonce, "worker found a valid nonce");
                    // The channel may already be gone if the round was reset.
                    let _ = result_tx.send(mined);
                }
            }));
        }
        Some(receiver)
    }

    /// Stops and joins every outstanding worker and clears the busy flag.
    /// Safe to call at any time, including when no round is running.
    pub fn reset(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.reset();
    }
}
