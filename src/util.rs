use std::net::SocketAddr;

const API_ADDR: &str = "SATTRACK_API_ADDR";

pub fn get_api_addr() -> Option<SocketAddr> {
    let addr_from_env = std::env::var(API_ADDR);
    addr_from_env.ok().and_then(|res| res.parse().ok())
}

const POLL_INTERVAL: &str = "SATTRACK_POLL_INTERVAL_MS";

pub fn get_poll_interval_ms() -> Option<u64> {
    let interval_from_env = std::env::var(POLL_INTERVAL);
    interval_from_env.ok().and_then(|res| res.parse().ok())
}

const CONFIG_PATH: &str = "SATTRACK_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./sattrack.json";

pub fn get_config_path() -> String {
    std::env::var(CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
