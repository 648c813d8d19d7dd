//! Chain reconciliation: the longest-valid-chain-with-common-history rule.
//!
//! The selection itself is pure; fetching candidates and swapping the
//! ledger live in the orchestrator, which owns the mutable state.

use crate::blockchain::Blockchain;

/// Picks the candidate to adopt, if any: strictly longer than the local
/// chain (and any prior candidate), internally valid, and sharing the
/// local chain's history. A diverging chain is rejected regardless of
/// length.
pub fn select_candidate(local: &Blockchain, candidates: Vec<Blockchain>) -> Option<Blockchain> {
    let mut best: Option<Blockchain> = None;
    for candidate in candidates {
        let size_to_beat = best.as_ref().map_or(local.size, |b| b.size);
        if candidate.size <= size_to_beat {
            continue;
        }
        if !candidate.is_chain_valid() {
            continue;
        }
        if !local.has_common_history(&candidate) {
            continue;
        }
        best = Some(candidate);
    }
    best
}
