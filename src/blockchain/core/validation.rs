//! Whole-chain integrity checks, used both for local self-checks and to
//! gate acceptance of candidate peer chains.

use crate::blockchain::core::chain::Blockchain;
use crate::error::{ChainError, Result};

impl Blockchain {
    /// Checks every adjacent pair of blocks: recomputed hash, hash link,
    /// and proof-of-work. Short-circuits on the first mismatch.
    pub fn is_chain_valid(&self) -> bool {
        for pair in self.chain.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if current.hash != current.calculate_hash() {
                return false;
            }
            if current.previous_hash != previous.hash {
                return false;
            }
            if !current.is_valid_proof_of_work(self.difficulty) {
                return false;
            }
        }
        true
    }

    /// True when `other` shares this chain's history: either this chain
    /// is trivially short (size <= 1), or every block hash matches up to
    /// the shorter chain's length. A diverging chain is never adopted,
    /// however long, so committed local history cannot be silently
    /// discarded in favor of an unrelated fork.
    pub fn has_common_history(&self, other: &Blockchain) -> bool {
        if self.size <= 1 {
            return true;
        }
        let shared = self.chain.len().min(other.chain.len());
        (0..shared).all(|i| self.chain[i].hash == other.chain[i].hash)
    }

    /// Post-deserialization integrity check: the recorded size must match
    /// the chain length and the chain must validate. Used by the loader,
    /// where a failure is fatal.
    pub fn check_integrity(&self) -> Result<()> {
        if self.size != self.chain.len() {
            return Err(ChainError::InvalidChain(format!(
                "recorded size {} does not match chain length {}",
                self.size,
                self.chain.len()
            )));
        }
        if !self.is_chain_valid() {
            return Err(ChainError::InvalidChain(
                "persisted chain failed validation".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::blockchain::core::chain::{Block, Blockchain, ChainSettings};
    use crate::miner::mine_block;
    use crate::transaction::{Transaction, TxKind};
    use std::time::Duration;

    fn settings() -> ChainSettings {
        ChainSettings {
            difficulty: 1,
            mining_reward: 100,
            block_size: 10,
            block_time: Duration::from_secs(30),
        }
    }

    fn reward(to: &str, amount: u64) -> Transaction {
        Transaction::new(
            None,
            to.to_string(),
            amount,
            TxKind::Reward,
            chrono::Utc::now().to_rfc3339(),
        )
    }

    fn extend(chain: &mut Blockchain, transactions: Vec<Transaction>) {
        let mut block = Block::new(
            chain.latest_block().index + 1,
            chrono::Utc::now().to_rfc3339(),
            transactions,
            chain.latest_block().hash.clone(),
        );
        mine_block(&mut block, chain.difficulty, 0, 1);
        chain.add_block(block).unwrap();
    }

    #[test]
    fn freshly_built_chain_is_valid() {
        let mut chain = Blockchain::new(&settings());
        extend(&mut chain, vec![reward("alice", 100)]);
        extend(&mut chain, vec![reward("bob", 100)]);
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn tampering_with_an_accepted_amount_invalidates_the_chain() {
        let mut chain = Blockchain::new(&settings());
        extend(&mut chain, vec![reward("alice", 100)]);
        assert!(chain.is_chain_valid());

        chain.chain[1].transactions[0].amount = 10_000;
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn broken_link_invalidates_the_chain() {
        let mut chain = Blockchain::new(&settings());
        extend(&mut chain, vec![reward("alice", 100)]);
        extend(&mut chain, vec![reward("bob", 100)]);

        chain.chain[1] = {
            let mut forged = Block::new(
                1,
                chrono::Utc::now().to_rfc3339(),
                vec![reward("mallory", 100)],
                chain.chain[0].hash.clone(),
            );
            mine_block(&mut forged, chain.difficulty, 0, 1);
            forged
        };
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn common_history_accepts_own_extension() {
        let mut local = Blockchain::new(&settings());
        extend(&mut local, vec![reward("alice", 100)]);

        let mut peer = local.clone();
        extend(&mut peer, vec![reward("bob", 100)]);

        assert!(local.has_common_history(&peer));
    }

    #[test]
    fn common_history_rejects_divergence() {
        let mut local = Blockchain::new(&settings());
        extend(&mut local, vec![reward("alice", 100)]);

        // Same genesis, different block 1.
        let mut peer = Blockchain::new(&settings());
        peer.chain = vec![local.chain[0].clone()];
        peer.size = 1;
        extend(&mut peer, vec![reward("mallory", 100)]);
        extend(&mut peer, vec![reward("mallory", 100)]);

        assert!(!local.has_common_history(&peer));
    }

    #[test]
    fn trivially_short_local_chain_accepts_anything() {
        let local = Blockchain::new(&settings());
        let mut peer = Blockchain::new(&settings());
        extend(&mut peer, vec![reward("bob", 100)]);

        assert!(local.has_common_history(&peer));
    }

    #[test]
    fn integrity_check_catches_size_mismatch() {
        let mut chain = Blockchain::new(&settings());
        chain.size = 5;
        assert!(chain.check_integrity().is_err());
    }
}
