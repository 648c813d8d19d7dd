//! Key generation and transaction signing.
//!
//! The consensus engine never signs anything itself; it only verifies.
//! This module backs the wallet binary and the tests that need funded,
//! properly signed transactions.

use crate::crypto::{self, Address, SECP256K1_CONTEXT};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use rand::rngs::OsRng;
use secp256k1::{PublicKey, SecretKey};

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random key pair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Rebuilds a key pair from a hex-encoded secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| ChainError::Crypto(format!("invalid secret key hex: {e}")))?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| ChainError::Crypto(format!("invalid secret key: {e}")))?;
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// The ledger address of this key pair: the compressed public key, hex-encoded.
    pub fn address(&self) -> Address {
        hex::encode(self.public_key.serialize())
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Signs a transaction digest and stores the compact signature on the
    /// transaction. The transaction's origin must match this key pair.
    pub fn sign_transaction(&self, tx: &mut Transaction) -> Result<()> {
        match &tx.from_address {
            Some(from) if *from == self.address() => {}
            Some(_) => {
                return Err(ChainError::InvalidTransaction(
                    "transaction origin does not match the signing key".to_string(),
                ))
            }
            None => {
                return Err(ChainError::InvalidTransaction(
                    "transaction has no origin address to sign for".to_string(),
                ))
            }
        }
        tx.signature = crypto::sign_digest(&self.secret_key, &tx.calculate_hash())?;
        Ok(())
    }
}
