//! Ledger persistence: the load/save contract and its backends.
//!
//! The node saves the full serialized ledger after every accepted
//! mutation. Loading a corrupt chain is fatal at startup; save failures
//! afterwards are logged by the caller and do not abort operation.

use crate::blockchain::{Blockchain, ChainSettings};
use crate::error::Result;
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::{info, warn};

/// Abstraction over ledger storage backends. `load` either restores a
/// previously saved ledger (rejecting a corrupt one) or creates and
/// persists a fresh chain from the given settings.
pub trait LedgerStore: Send + Sync {
    fn load(&self, settings: &ChainSettings) -> Result<Blockchain>;
    fn save(&self, chain: &Blockchain) -> Result<()>;
}

/// JSON-file backend: one pretty-printed document holding the whole
/// ledger, matching the peer wire format.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore { path }
    }
}

impl LedgerStore for FileStore {
    fn load(&self, settings: &ChainSettings) -> Result<Blockchain> {
        if !self.path.exists() {
            let chain = Blockchain::new(settings);
            self.save(&chain)?;
            info!(path = %self.path.display(), "created a new ledger");
            return Ok(chain);
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let chain: Blockchain = serde_json::from_str(&raw)?;
        chain.check_integrity()?;

        if chain.settings_hash != settings.settings_hash() {
            warn!(
                "persisted ledger settings differ from the running configuration, \
                 keeping the persisted tunables"
            );
        }

        info!(path = %self.path.display(), size = chain.size, "ledger loaded");
        Ok(chain)
    }

    fn save(&self, chain: &Blockchain) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(chain)?)?;
        Ok(())
    }
}

/// In-memory backend for tests.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Blockchain>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved snapshot, if any.
    pub fn snapshot(&self) -> Option<Blockchain> {
        self.slot.lock().clone()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self, settings: &ChainSettings) -> Result<Blockchain> {
        let mut slot = self.slot.lock();
        match &*slot {
            Some(chain) => {
                chain.check_integrity()?;
                Ok(chain.clone())
            }
            None => {
                let chain = Blockchain::new(settings);
                *slot = Some(chain.clone());
                Ok(chain)
            }
        }
    }

    fn save(&self, chain: &Blockchain) -> Result<()> {
        *self.slot.lock() = Some(chain.clone());
        Ok(())
    }
}
