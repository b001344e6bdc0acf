use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::util;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub broker: BrokerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub buffer: BufferConfig,

    /// Query API (disabled when absent)
    pub api: Option<ApiSettings>,
}

/// Broker connection parameters
///
/// `address`, `topic`, `schema_url` and `group_id` are handed to the broker
/// client untouched.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BrokerConfig {
    pub address: Option<String>,
    pub topic: Option<String>,
    pub schema_url: Option<String>,
    pub group_id: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Envelope field holding the record list (`null` for bare records)
    #[serde(default = "default_record_key")]
    pub record_key: Option<String>,

    pub source: Option<SourceConfig>,
}

impl BrokerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Which adapter feeds the pipeline
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Replay newline-delimited payloads from a file
    Replay {
        path: PathBuf,

        #[serde(default = "default_messages_per_poll")]
        messages_per_poll: usize,
    },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RoutingConfig {
    /// Prefix of every actor address
    #[serde(default = "default_base_address")]
    pub base_address: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_address: default_base_address(),
        }
    }
}

impl RoutingConfig {
    pub fn aggregation_address(&self) -> String {
        format!("{}/aggregation", self.base_address.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct BufferConfig {
    /// Drop-oldest limit; unbounded when absent
    pub max_buffered: Option<usize>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_api_bind")]
    pub bind: SocketAddr,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_record_key() -> Option<String> {
    Some(String::from("tleDataset"))
}

fn default_messages_per_poll() -> usize {
    10
}

fn default_base_address() -> String {
    String::from("warp://localhost:9001")
}

fn default_api_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9002))
}

fn default_enable_cors() -> bool {
    true
}

impl Config {
    /// Apply `SATTRACK_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(interval) = util::get_poll_interval_ms() {
            self.broker.poll_interval_ms = interval;
        }

        if let Some(bind) = util::get_api_addr() {
            match self.api.as_mut() {
                Some(api) => api.bind = bind,
                None => {
                    self.api = Some(ApiSettings {
                        bind,
                        enable_cors: default_enable_cors(),
                    })
                }
            }
        }
    }
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}
