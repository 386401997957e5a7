use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tickstore_domain::value_objects::tick::normalize_symbol;

pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_FEED_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_TABLE: &str = "price_ticks";
pub const DEFAULT_POOL_MAX_SIZE: u32 = 8;
pub const DEFAULT_DB_CONNECT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub feed: FeedConfig,
    pub db: DbConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub url: String,
    pub symbols: Vec<String>,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_feed_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    pub url: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
    #[serde(default = "default_db_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

fn default_idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

fn default_feed_connect_timeout_ms() -> u64 {
    DEFAULT_FEED_CONNECT_TIMEOUT_MS
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_pool_max_size() -> u32 {
    DEFAULT_POOL_MAX_SIZE
}

fn default_db_connect_timeout_ms() -> u64 {
    DEFAULT_DB_CONNECT_TIMEOUT_MS
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        self.feed.validate()?;
        self.db.validate()
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("feed.url must not be empty".to_string());
        }
        if self.symbols.is_empty() {
            return Err("feed.symbols must list at least one symbol".to_string());
        }
        if let Some(idx) = self.symbols.iter().position(|s| s.trim().is_empty()) {
            return Err(format!("feed.symbols[{idx}] is blank"));
        }
        if self.reconnect_delay_ms == 0 {
            return Err("feed.reconnect_delay_ms must be > 0".to_string());
        }
        if self.idle_timeout_ms == 0 {
            return Err("feed.idle_timeout_ms must be > 0".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("feed.connect_timeout_ms must be > 0".to_string());
        }
        Ok(())
    }

    /// Configured symbols in canonical form, duplicates removed, order kept.
    pub fn normalized_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.symbols.len());
        for symbol in self.symbols.iter().map(|s| normalize_symbol(s)) {
            if !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        out
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl DbConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.table.trim().is_empty() {
            return Err("db.table must not be empty".to_string());
        }
        if self.pool_max_size == 0 {
            return Err("db.pool_max_size must be > 0".to_string());
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

/// Loads, parses and validates the config, also returning the raw file contents.
pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    config
        .validate()
        .map_err(|err| format!("invalid config {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}
