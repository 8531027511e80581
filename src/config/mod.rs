use config::{Config, ConfigError, File};
use serde::Deserialize;

/// Ledger fullnode configuration.
///
/// `package` is the on-chain package id whose events are indexed; every
/// tracked event-type filter is rendered against it.
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerSettings {
    pub rpc_url: String,
    pub package: String,
    /// Network label (mainnet, testnet, localnet). Informational only.
    pub network: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// PostgreSQL connection configuration.
///
/// Holds checkpoints, all domain entities, and the dead-letter log.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

/// Polling behaviour shared by every per-event-type cycle.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_page_size() -> usize {
    50
}

/// Root application configuration, loaded from `config.yaml` at startup.
/// None of it is hot-reloadable; changing anything requires a restart.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub ledger: LedgerSettings,
    pub postgres: PostgresSettings,
    pub indexer: IndexerSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
