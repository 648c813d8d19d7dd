//! Error types for stridechain

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("insufficient funds: theoretical balance {balance} is below amount {amount}")]
    InsufficientFunds { balance: i64, amount: u64 },
    #[error("duplicate transaction: signature already present in the {0} pool")]
    DuplicateTransaction(&'static str),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("invalid chain: {0}")]
    InvalidChain(String),
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("cryptographic error: {0}")]
    Crypto(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
