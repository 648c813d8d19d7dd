use crate::crypto;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The ledger tunables, fixed at construction time.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub difficulty: u32,
    pub mining_reward: u64,
    pub block_size: usize,
    pub block_time: Duration,
}

impl ChainSettings {
    /// Digest of the four tunables, used to detect configuration drift
    /// between a persisted ledger and the running configuration.
    pub fn settings_hash(&self) -> String {
        crypto::sha256_hex(&format!(
            "{}{}{}{}",
            self.difficulty,
            self.mining_reward,
            self.block_size,
            self.block_time.as_millis()
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: String,
        transactions: Vec<Transaction>,
        previous_hash: String,
    ) -> Self {
        let mut block = Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            hash: String::new(),
            nonce: 0,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The chain's first block: no transactions, previous hash `"0"`,
    /// hash computed directly without any proof-of-work search.
    pub fn genesis() -> Self {
        Block::new(0, chrono::Utc::now().to_rfc3339(), Vec::new(), "0".to_string())
    }

    /// Digest over index, previous hash, timestamp, the concatenated
    /// per-transaction digests, and the nonce.
    pub fn calculate_hash(&self) -> String {
        let tx_digests: String = self
            .transactions
            .iter()
            .map(|tx| tx.calculate_hash())
            .collect();
        crypto::sha256_hex(&format!(
            "{}{}{}{}{}",
            self.index, self.previous_hash, self.timestamp, tx_digests, self.nonce
        ))
    }

    /// True iff the stored hash has `difficulty` leading zero characters
    /// and matches a recomputation of the digest. The recomputation
    /// defends against a spoofed hash independent of the nonce search.
    pub fn is_valid_proof_of_work(&self, difficulty: u32) -> bool {
        let target = "0".repeat(difficulty as usize);
        self.hash.starts_with(&target) && self.hash == self.calculate_hash()
    }
}

/// Which pool a transaction is being admitted into.
#[derive(Debug, Clone, Copy)]
enum Pool {
    Pending,
    Buffer,
}

/// The ledger: the chain of accepted blocks plus the two transaction
/// pools. Exclusively owned by the lifecycle orchestrator; every other
/// component works on copies or derived snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blockchain {
    pub chain: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
    #[serde(rename = "bufferedTransactions")]
    pub transaction_buffer: Vec<Transaction>,
    pub difficulty: u32,
    pub mining_reward: u64,
    pub block_size: usize,
    #[serde(rename = "blockTime")]
    pub block_time_ms: u64,
    pub settings_hash: String,
    pub size: usize,
}

impl Blockchain {
    pub fn new(settings: &ChainSettings) -> Self {
        Blockchain {
            chain: vec![Block::genesis()],
            pending_transactions: Vec::new(),
            transaction_buffer: Vec::new(),
            difficulty: settings.difficulty,
            mining_reward: settings.mining_reward,
            block_size: settings.block_size,
            block_time_ms: settings.block_time.as_millis() as u64,
            settings_hash: settings.settings_hash(),
            size: 1,
        }
    }

    pub fn latest_block(&self) -> &Block {
        self.chain
            .last()
            .expect("chain always contains at least the genesis block")
    }

    /// Shared admission check for both pools: the origin must be able to
    /// afford the amount against its theoretical balance, and the target
    /// pool must not already contain the same signature.
    fn verify_transaction(&self, tx: &Transaction, pool: Pool) -> Result<()> {
        if let Some(from) = &tx.from_address {
            let balance = self.theoretical_balance(from);
            if balance < tx.amount as i64 {
                return Err(ChainError::InsufficientFunds {
                    balance,
                    amount: tx.amount,
                });
            }
        }

        let (target, name) = match pool {
            Pool::Pending => (&self.pending_transactions, "pending"),
            Pool::Buffer => (&self.transaction_buffer, "buffer"),
        };
        if target.iter().any(|t| t.signature == tx.signature) {
            return Err(ChainError::DuplicateTransaction(name));
        }

        Ok(())
    }

    /// Admits a transaction to the pending pool (the next mined block).
    pub fn add_pending_transaction(&mut self, tx: Transaction) -> Result<()> {
        self.verify_transaction(&tx, Pool::Pending)?;
        self.pending_transactions.push(tx);
        Ok(())
    }

    /// Admits a transaction to the buffer, used while a mining round is
    /// in flight so the set being mined stays stable.
    pub fn add_buffered_transaction(&mut self, tx: Transaction) -> Result<()> {
        self.verify_transaction(&tx, Pool::Buffer)?;
        self.transaction_buffer.push(tx);
        Ok(())
    }

    /// Appends a block after checking its link to the current head, its
    /// index, and its proof-of-work. Validation never leaves the chain
    /// partially mutated.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        let latest = self.latest_block();

        if block.previous_hash != latest.hash {
            return Err(ChainError::InvalidBlock(format!(
                "previous hash {} does not match chain head {}",
                block.previous_hash, latest.hash
            )));
        }

        if block.index != latest.index + 1 {
            return Err(ChainError::InvalidBlock(format!(
                "expected index {}, got {}",
                latest.index + 1,
                block.index
            )));
        }

        if !block.is_valid_proof_of_work(self.difficulty) {
            return Err(ChainError::InvalidBlock(
                "proof of work does not meet the difficulty target".to_string(),
            ));
        }

        self.chain.push(block);
        self.size += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::mine_block;
    use crate::transaction::TxKind;
    use std::time::Duration;

    fn settings() -> ChainSettings {
        ChainSettings {
            difficulty: 1,
            mining_reward: 100,
            block_size: 10,
            block_time: Duration::from_secs(30),
        }
    }

    fn tx(from: Option<&str>, to: &str, amount: u64, signature: &str) -> Transaction {
        let kind = if from.is_none() {
            TxKind::Reward
        } else {
            TxKind::Regular
        };
        let mut tx = Transaction::new(
            from.map(str::to_string),
            to.to_string(),
            amount,
            kind,
            chrono::Utc::now().to_rfc3339(),
        );
        tx.signature = signature.to_string();
        tx
    }

    /// Mines a block funding `address` with `amount` on top of the chain head.
    fn funded_block(chain: &Blockchain, address: &str, amount: u64) -> Block {
        let mut block = Block::new(
            chain.latest_block().index + 1,
            chrono::Utc::now().to_rfc3339(),
            vec![tx(None, address, amount, "")],
            chain.latest_block().hash.clone(),
        );
        mine_block(&mut block, chain.difficulty, 0, 1);
        block
    }

    #[test]
    fn initializes_with_a_genesis_block() {
        let chain = Blockchain::new(&settings());
        assert_eq!(chain.chain.len(), 1);
        assert_eq!(chain.size, 1);
        let genesis = chain.latest_block();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.hash, genesis.calculate_hash());
    }

    #[test]
    fn genesis_passes_proof_of_work_at_difficulty_zero() {
        let chain = Blockchain::new(&settings());
        assert!(chain.latest_block().is_valid_proof_of_work(0));
    }

    #[test]
    fn accepts_a_mined_block_and_grows() {
        let mut chain = Blockchain::new(&settings());
        let block = funded_block(&chain, "alice", 100);
        chain.add_block(block.clone()).unwrap();

        assert_eq!(chain.size, 2);
        assert_eq!(chain.latest_block(), &block);
        assert!(chain.latest_block().is_valid_proof_of_work(chain.difficulty));
    }

    #[test]
    fn rejects_block_with_wrong_previous_hash() {
        let mut chain = Blockchain::new(&settings());
        let mut block = Block::new(
            1,
            chrono::Utc::now().to_rfc3339(),
            Vec::new(),
            "bogus".to_string(),
        );
        mine_block(&mut block, chain.difficulty, 0, 1);

        let err = chain.add_block(block).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock(_)));
        assert_eq!(chain.size, 1);
    }

    #[test]
    fn rejects_block_with_wrong_index() {
        let mut chain = Blockchain::new(&settings());
        let mut block = Block::new(
            3,
            chrono::Utc::now().to_rfc3339(),
            Vec::new(),
            chain.latest_block().hash.clone(),
        );
        mine_block(&mut block, chain.difficulty, 0, 1);

        let err = chain.add_block(block).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock(_)));
    }

    #[test]
    fn rejects_block_with_spoofed_hash() {
        let mut chain = Blockchain::new(&settings());
        let mut block = Block::new(
            1,
            chrono::Utc::now().to_rfc3339(),
            Vec::new(),
            chain.latest_block().hash.clone(),
        );
        // A hash with enough leading zeros that was never earned.
        block.hash = "0".repeat(64);

        let err = chain.add_block(block).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock(_)));
    }

    #[test]
    fn insufficient_funds_leaves_pools_unchanged() {
        let mut chain = Blockchain::new(&settings());
        chain.add_block(funded_block(&chain, "alice", 100)).unwrap();

        let err = chain
            .add_pending_transaction(tx(Some("alice"), "bob", 201, "sig-a"))
            .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds { .. }));
        assert!(chain.pending_transactions.is_empty());
        assert!(chain.transaction_buffer.is_empty());
    }

    #[test]
    fn duplicate_signature_in_same_pool_is_rejected() {
        let mut chain = Blockchain::new(&settings());
        chain.add_block(funded_block(&chain, "alice", 100)).unwrap();

        chain
            .add_pending_transaction(tx(Some("alice"), "bob", 10, "sig-a"))
            .unwrap();
        let err = chain
            .add_pending_transaction(tx(Some("alice"), "carol", 10, "sig-a"))
            .unwrap_err();
        assert!(matches!(err, ChainError::DuplicateTransaction("pending")));
        assert_eq!(chain.pending_transactions.len(), 1);

        // The same signature is still admissible to the other pool.
        chain
            .add_buffered_transaction(tx(Some("alice"), "carol", 10, "sig-a"))
            .unwrap();
        assert_eq!(chain.transaction_buffer.len(), 1);
    }

    #[test]
    fn buffered_admission_checks_funds_too() {
        let mut chain = Blockchain::new(&settings());
        let err = chain
            .add_buffered_transaction(tx(Some("alice"), "bob", 1, "sig-a"))
            .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds { .. }));
    }

    #[test]
    fn settings_hash_is_fixed_at_construction() {
        let chain = Blockchain::new(&settings());
        assert_eq!(chain.settings_hash, settings().settings_hash());

        let drifted = ChainSettings {
            difficulty: 3,
            ..settings()
        };
        assert_ne!(chain.settings_hash, drifted.settings_hash());
    }

    #[test]
    fn serde_roundtrip_preserves_wire_names() {
        let mut chain = Blockchain::new(&settings());
        chain.add_block(funded_block(&chain, "alice", 100)).unwrap();
        chain
            .add_pending_transaction(tx(Some("alice"), "bob", 10, "sig-a"))
            .unwrap();

        let json = serde_json::to_value(&chain).unwrap();
        assert!(json["pendingTransactions"].is_array());
        assert!(json["bufferedTransactions"].is_array());
        assert!(json["miningReward"].is_number());
        assert!(json["blockSize"].is_number());
        assert!(json["blockTime"].is_number());
        assert!(json["settingsHash"].is_string());
        assert_eq!(json["size"], 2);
        assert!(json["chain"][1]["previousHash"].is_string());

        let back: Blockchain = serde_json::from_value(json).unwrap();
        assert_eq!(back.size, back.chain.len());
        assert!(back.is_chain_valid());
    }
}
