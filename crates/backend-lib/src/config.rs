// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Bearer token TTL in seconds
    pub token_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".parse().unwrap(),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            token_ttl_secs: 60 * 60 * 24 * 7, // 7 days
        }
    }
}

impl Settings {
    /// Load settings from config files, then `CONVOY_`-prefixed env vars.
    pub fn load() -> Result<Self> {
        let settings = Figment::new()
            .merge(Toml::file("convoy.toml"))
            .merge(Yaml::file("convoy.yaml"))
            .merge(Json::file("convoy.json"))
            .merge(Env::prefixed("CONVOY_"))
            .extract()?;
        Ok(settings)
    }

    /// Load settings from an explicit TOML file plus env vars.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CONVOY_"))
            .extract()?;
        Ok(settings)
    }
}
