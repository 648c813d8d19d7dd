//! Cryptographic primitives for stridechain
//!
//! The ledger core only consumes two primitives from this module: a
//! sha256 hex digest and signature verification against an address.
//! Addresses are hex-encoded compressed secp256k1 public keys.

use crate::error::{ChainError, Result};
use once_cell::sync::Lazy;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized secp256k1 context shared by all
/// signing and verification calls.
pub(crate) static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Hex-encoded compressed secp256k1 public key.
pub type Address = String;

/// Sha256 digest of a string, hex-encoded.
pub fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn message_from_digest(digest_hex: &str) -> Result<Message> {
    let bytes = hex::decode(digest_hex)
        .map_err(|e| ChainError::Crypto(format!("invalid digest hex: {e}")))?;
    Message::from_digest_slice(&bytes)
        .map_err(|e| ChainError::Crypto(format!("digest is not 32 bytes: {e}")))
}

/// Verifies a compact ECDSA signature over a sha256 digest, both
/// hex-encoded, against a hex-encoded compressed public key.
pub fn verify_digest(public_key_hex: &str, digest_hex: &str, signature_hex: &str) -> Result<()> {
    let key_bytes = hex::decode(public_key_hex)
        .map_err(|e| ChainError::Crypto(format!("invalid public key hex: {e}")))?;
    if key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(ChainError::Crypto(format!(
            "public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            key_bytes.len()
        )));
    }
    let public_key = PublicKey::from_slice(&key_bytes)
        .map_err(|e| ChainError::Crypto(format!("invalid public key: {e}")))?;

    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| ChainError::Crypto(format!("invalid signature hex: {e}")))?;
    if sig_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::Crypto(format!(
            "signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            sig_bytes.len()
        )));
    }
    let signature = Signature::from_compact(&sig_bytes)
        .map_err(|e| ChainError::Crypto(format!("invalid signature: {e}")))?;

    let message = message_from_digest(digest_hex)?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ChainError::Crypto("signature verification failed".to_string()))
}

/// Signs a hex-encoded sha256 digest with a secret key, returning the
/// compact signature hex-encoded.
pub fn sign_digest(secret_key: &secp256k1::SecretKey, digest_hex: &str) -> Result<String> {
    let message = message_from_digest(digest_hex)?;
    let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, secret_key);
    Ok(hex::encode(signature.serialize_compact()))
}
