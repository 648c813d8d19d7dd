/// Validation logic for transactions separated from type definitions
use crate::crypto;
use crate::error::{ChainError, Result};
use crate::transaction::types::{Transaction, TxKind};

impl Transaction {
    /// Structural validity of a single transaction.
    ///
    /// A reward with no origin is always valid. Anything else must carry an
    /// origin address and a signature that verifies against it over this
    /// transaction's digest. A missing origin or signature is a typed
    /// rejection, not `false`: callers must not treat it as a boolean.
    pub fn is_valid(&self) -> Result<()> {
        if self.kind == TxKind::Reward && self.from_address.is_none() {
            return Ok(());
        }

        let from = self.from_address.as_ref().ok_or_else(|| {
            ChainError::InvalidTransaction("transaction has no origin address".to_string())
        })?;

        if self.signature.is_empty() {
            return Err(ChainError::InvalidTransaction(
                "no signature in this transaction".to_string(),
            ));
        }

        crypto::verify_digest(from, &self.calculate_hash(), &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::KeyPair;

    fn signed(keypair: &KeyPair, to: &str, amount: u64) -> Transaction {
        let mut tx = Transaction::regular(keypair.address(), to.to_string(), amount);
        keypair.sign_transaction(&mut tx).unwrap();
        tx
    }

    #[test]
    fn reward_without_origin_is_valid() {
        let tx = Transaction::reward("miner".to_string(), 100);
        assert!(tx.is_valid().is_ok());
    }

    #[test]
    fn regular_without_origin_is_rejected() {
        let tx = Transaction::new(
            None,
            "bob".to_string(),
            10,
            TxKind::Regular,
            "2026-01-01T00:00:00Z".to_string(),
        );
        let err = tx.is_valid().unwrap_err();
        assert!(err.to_string().contains("no origin address"));
    }

    #[test]
    fn unsigned_regular_is_rejected() {
        let keypair = KeyPair::generate();
        let tx = Transaction::regular(keypair.address(), "bob".to_string(), 10);
        let err = tx.is_valid().unwrap_err();
        assert!(err.to_string().contains("no signature"));
    }

    #[test]
    fn properly_signed_regular_is_valid() {
        let keypair = KeyPair::generate();
        let tx = signed(&keypair, "bob", 10);
        assert!(tx.is_valid().is_ok());
    }

    #[test]
    fn tampered_amount_invalidates_signature() {
        let keypair = KeyPair::generate();
        let mut tx = signed(&keypair, "bob", 10);
        tx.amount = 10_000;
        assert!(tx.is_valid().is_err());
    }
}
