//! Configuration management for stridechain

use crate::blockchain::ChainSettings;
use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Diagnostic identity sent on every outbound peer request.
    #[serde(default = "default_node_name")]
    pub name: String,
    #[serde(default = "default_node_id")]
    pub id: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: u64,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Scheduler period as a humantime string, e.g. "30s".
    #[serde(default = "default_block_time")]
    pub block_time: String,
    #[serde(default)]
    pub reward_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_blockchain_file")]
    pub blockchain_file: String,
    #[serde(default = "default_peers_file")]
    pub peers_file: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            name: default_node_name(),
            id: default_node_id(),
            port: default_port(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
            block_size: default_block_size(),
            block_time: default_block_time(),
            reward_address: String::new(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            workers: default_workers(),
            enabled: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            blockchain_file: default_blockchain_file(),
            peers_file: default_peers_file(),
        }
    }
}

impl ChainConfig {
    /// The ledger tunables in their parsed form.
    pub fn settings(&self) -> Result<ChainSettings> {
        let block_time = humantime::parse_duration(&self.block_time)
            .map_err(|e| ChainError::Config(format!("invalid chain.block_time: {e}")))?;
        Ok(ChainSettings {
            difficulty: self.difficulty,
            mining_reward: self.mining_reward,
            block_size: self.block_size,
            block_time,
        })
    }
}

/// Loads the configuration from a TOML file; a missing file yields the
/// defaults. Validates the values a running node cannot do without.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if raw.is_empty() {
        Config::default()
    } else {
        toml::from_str(&raw).map_err(|e| ChainError::Config(e.to_string()))?
    };

    if config.chain.block_size == 0 {
        return Err(ChainError::Config(
            "chain.block_size must be at least 1".to_string(),
        ));
    }
    if config.mining.workers == 0 {
        return Err(ChainError::Config(
            "mining.workers must be at least 1".to_string(),
        ));
    }
    if config.mining.enabled && config.chain.reward_address.is_empty() {
        return Err(ChainError::Config(
            "chain.reward_address must be set when mining is enabled".to_string(),
        ));
    }
    // Surface a bad duration at startup rather than at first use.
    let settings = config.chain.settings()?;
    if settings.block_time.is_zero() {
        return Err(ChainError::Config(
            "chain.block_time must be greater than zero".to_string(),
        ));
    }

    Ok(config)
}

fn default_node_name() -> String {
    "stridechain-node".to_string()
}

fn default_node_id() -> String {
    "local".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_difficulty() -> u32 {
    2
}

fn default_mining_reward() -> u64 {
    100
}

fn default_block_size() -> usize {
    10
}

fn default_block_time() -> String {
    "30s".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_blockchain_file() -> String {
    "data/blockchain.json".to_string()
}

fn default_peers_file() -> String {
    "data/peers.json".to_string()
}
