//! Balance queries over the ledger.
//!
//! Balances are never cached: a reorganization replaces the chain
//! wholesale, so every query rescans the confirmed history from scratch.

use crate::blockchain::core::chain::Blockchain;

impl Blockchain {
    /// Balance of `address` considering only confirmed blocks. A reward
    /// transaction (no origin) only credits its recipient.
    pub fn validated_balance(&self, address: &str) -> i64 {
        let mut balance: i64 = 0;
        for block in &self.chain {
            for tx in &block.transactions {
                if tx.from_address.as_deref() == Some(address) {
                    balance -= tx.amount as i64;
                }
                if tx.to_address == address {
                    balance += tx.amount as i64;
                }
            }
        }
        balance
    }

    /// Validated balance adjusted by the pending pool, in pool order.
    /// Buffered transactions are excluded: they are not yet guaranteed
    /// inclusion in any block.
    pub fn theoretical_balance(&self, address: &str) -> i64 {
        let mut balance = self.validated_balance(address);
        for tx in &self.pending_transactions {
            if tx.from_address.as_deref() == Some(address) {
                balance -= tx.amount as i64;
            }
            if tx.to_address == address {
                balance += tx.amount as i64;
            }
        }
        balance
    }
}
