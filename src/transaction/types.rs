/// Transaction types for stridechain
use crate::crypto::{self, Address};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxKind {
    Regular,
    Reward,
}

/// A value transfer between two addresses, or a mining reward.
///
/// `from_address` is `None` only for reward transactions, which are minted
/// rather than spent. A transaction is immutable once signed; its digest
/// deliberately excludes the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub from_address: Option<Address>,
    pub to_address: Address,
    pub amount: u64,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub timestamp: String,
    #[serde(default)]
    pub signature: String,
}

impl Transaction {
    pub fn new(
        from_address: Option<Address>,
        to_address: Address,
        amount: u64,
        kind: TxKind,
        timestamp: String,
    ) -> Self {
        Transaction {
            from_address,
            to_address,
            amount,
            kind,
            timestamp,
            signature: String::new(),
        }
    }

    /// An unsigned regular transaction stamped with the current time.
    pub fn regular(from_address: Address, to_address: Address, amount: u64) -> Self {
        Self::new(
            Some(from_address),
            to_address,
            amount,
            TxKind::Regular,
            chrono::Utc::now().to_rfc3339(),
        )
    }

    /// A freshly minted mining reward for `to_address`.
    pub fn reward(to_address: Address, amount: u64) -> Self {
        Self::new(
            None,
            to_address,
            amount,
            TxKind::Reward,
            chrono::Utc::now().to_rfc3339(),
        )
    }

    /// Digest over origin, recipient, amount and timestamp. An absent
    /// origin contributes the literal `null`.
    pub fn calculate_hash(&self) -> String {
        let from = self.from_address.as_deref().unwrap_or("null");
        crypto::sha256_hex(&format!(
            "{}{}{}{}",
            from, self.to_address, self.amount, self.timestamp
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::new(
            Some("alice".to_string()),
            "bob".to_string(),
            42,
            TxKind::Regular,
            "2026-01-01T00:00:00Z".to_string(),
        )
    }

    #[test]
    fn digest_covers_origin_recipient_amount_and_timestamp() {
        let tx = sample();
        let mut other = sample();
        assert_eq!(tx.calculate_hash(), other.calculate_hash());

        other.amount = 43;
        assert_ne!(tx.calculate_hash(), other.calculate_hash());

        let mut other = sample();
        other.timestamp = "2026-01-01T00:00:01Z".to_string();
        assert_ne!(tx.calculate_hash(), other.calculate_hash());
    }

    #[test]
    fn digest_ignores_signature() {
        let tx = sample();
        let mut signed = sample();
        signed.signature = "deadbeef".to_string();
        assert_eq!(tx.calculate_hash(), signed.calculate_hash());
    }

    #[test]
    fn reward_serializes_with_null_origin_and_uppercase_type() {
        let tx = Transaction::new(
            None,
            "miner".to_string(),
            100,
            TxKind::Reward,
            "2026-01-01T00:00:00Z".to_string(),
        );
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json["fromAddress"].is_null());
        assert_eq!(json["type"], "REWARD");
        assert_eq!(json["toAddress"], "miner");

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn deserializes_without_signature_field() {
        let json = serde_json::json!({
            "fromAddress": "alice",
            "toAddress": "bob",
            "amount": 5,
            "type": "REGULAR",
            "timestamp": "2026-01-01T00:00:00Z",
        });
        let tx: Transaction = serde_json::from_value(json).unwrap();
        assert!(tx.signature.is_empty());
    }
}
