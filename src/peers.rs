//! Peer registry and the HTTP peer client.
//!
//! The registry is an ordered set of peer base URLs, persisted to a flat
//! JSON list on every mutation. The client talks the peer wire protocol
//! (HTTP+JSON); every outbound request carries this node's identity
//! headers for diagnostics. All broadcast operations are best-effort:
//! one peer failing is logged and never affects delivery to the others.

use crate::blockchain::{Block, Blockchain};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const PEER_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Ordered set of peer endpoints with idempotent add/remove.
pub struct PeerSet {
    peers: RwLock<Vec<String>>,
    path: Option<PathBuf>,
}

impl PeerSet {
    /// An in-memory registry that is never persisted. Used by tests.
    pub fn ephemeral() -> Self {
        PeerSet {
            peers: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Loads the registry from a JSON file; a missing file is an empty set.
    pub fn load(path: PathBuf) -> Result<Self> {
        let peers = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            Vec::new()
        };
        Ok(PeerSet {
            peers: RwLock::new(peers),
            path: Some(path),
        })
    }

    pub fn all(&self) -> Vec<String> {
        self.peers.read().clone()
    }

    /// Adds a peer. Returns false (and persists nothing) if it was
    /// already registered.
    pub fn add(&self, peer_url: &str) -> bool {
        let mut peers = self.peers.write();
        if peers.iter().any(|p| p == peer_url) {
            info!(peer = peer_url, "peer already registered");
            return false;
        }
        peers.push(peer_url.to_string());
        self.save(&peers);
        info!(peer = peer_url, "peer added");
        true
    }

    /// Removes a peer. Returns false if it was not registered.
    pub fn remove(&self, peer_url: &str) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|p| p != peer_url);
        if peers.len() == before {
            info!(peer = peer_url, "peer not found");
            return false;
        }
        self.save(&peers);
        info!(peer = peer_url, "peer removed");
        true
    }

    fn save(&self, peers: &[String]) {
        let Some(path) = &self.path else { return };
        let write = || -> Result<()> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, serde_json::to_string_pretty(peers)?)?;
            Ok(())
        };
        if let Err(e) = write() {
            warn!("failed to persist peer list: {e}");
        }
    }
}

/// HTTP client for the peer wire protocol.
#[derive(Clone)]
pub struct PeerClient {
    client: reqwest::Client,
}

impl PeerClient {
    /// Builds a client whose every request carries the origin node's
    /// identity headers.
    pub fn new(node_id: &str, node_name: &str) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(node_id) {
            headers.insert("origin-node-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(node_name) {
            headers.insert("origin-node-name", value);
        }
        let client = reqwest::Client::builder()
            .timeout(PEER_REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        PeerClient { client }
    }

    /// Fetches a peer's full serialized ledger.
    pub async fn fetch_blockchain(&self, peer_url: &str) -> Result<Blockchain> {
        let url = format!("{peer_url}/blockchain");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::PeerUnreachable(format!("{peer_url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ChainError::PeerUnreachable(format!(
                "{peer_url}: status {}",
                response.status()
            )));
        }
        response
            .json::<Blockchain>()
            .await
            .map_err(|e| ChainError::PeerUnreachable(format!("{peer_url}: {e}")))
    }

    /// Fetches every peer's chain; unreachable peers are logged and
    /// dropped from the result, never fatal.
    pub async fn fetch_all(&self, peers: &[String]) -> Vec<Blockchain> {
        let mut chains = Vec::new();
        for peer in peers {
            match self.fetch_blockchain(peer).await {
                Ok(chain) => chains.push(chain),
                Err(e) => warn!("skipping peer chain: {e}"),
            }
        }
        chains
    }

    pub async fn push_block(&self, peer_url: &str, block: &Block) -> Result<()> {
        let url = format!("{peer_url}/blocks");
        let response = self
            .client
            .post(&url)
            .json(block)
            .send()
            .await
            .map_err(|e| ChainError::PeerUnreachable(format!("{peer_url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ChainError::PeerUnreachable(format!(
                "{peer_url}: status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Pushes a transaction with the `isBroadcast` marker set so the
    /// receiving node does not broadcast it again.
    pub async fn push_transaction(&self, peer_url: &str, tx: &Transaction) -> Result<()> {
        let url = format!("{peer_url}/transactions");
        let mut body = serde_json::to_value(tx)?;
        if let Some(map) = body.as_object_mut() {
            map.insert("isBroadcast".to_string(), serde_json::Value::Bool(true));
        }
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::PeerUnreachable(format!("{peer_url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ChainError::PeerUnreachable(format!(
                "{peer_url}: status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Best-effort push of a new block to every known peer.
    pub async fn broadcast_block(&self, peers: &[String], block: &Block) {
        for peer in peers {
            match self.push_block(peer, block).await {
                Ok(()) => info!(peer = peer.as_str(), "broadcasted block"),
                Err(e) => warn!("block broadcast failed: {e}"),
            }
        }
    }

    /// Best-effort push of a new transaction to every known peer.
    pub async fn broadcast_transaction(&self, peers: &[String], tx: &Transaction) {
        for peer in peers {
            match self.push_transaction(peer, tx).await {
                Ok(()) => info!(peer = peer.as_str(), "broadcasted transaction"),
                Err(e) => warn!("transaction broadcast failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_are_idempotent() {
        let peers = PeerSet::ephemeral();

        assert!(peers.add("http://peer-a:3000"));
        assert!(!peers.add("http://peer-a:3000"));
        assert!(peers.add("http://peer-b:3000"));
        assert_eq!(
            peers.all(),
            vec!["http://peer-a:3000", "http://peer-b:3000"]
        );

        assert!(peers.remove("http://peer-a:3000"));
        assert!(!peers.remove("http://peer-a:3000"));
        assert_eq!(peers.all(), vec!["http://peer-b:3000"]);
    }

    #[test]
    fn registry_persists_across_loads() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("peers.json");

        let peers = PeerSet::load(path.clone()).unwrap();
        peers.add("http://peer-a:3000");
        peers.add("http://peer-b:3000");
        peers.remove("http://peer-a:3000");

        let reloaded = PeerSet::load(path).unwrap();
        assert_eq!(reloaded.all(), vec!["http://peer-b:3000"]);
    }

    #[tokio::test]
    async fn unreachable_peer_is_an_error_not_a_panic() {
        let client = PeerClient::new("test-id", "test-node");
        let result = client.fetch_blockchain("http://127.0.0.1:1").await;
        assert!(matches!(result, Err(ChainError::PeerUnreachable(_))));
    }
}
