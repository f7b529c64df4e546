use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::playback::command::PlayerCommands;

const DEFAULT_PORT: u16 = 5002;
const DEFAULT_STOP_GRACE_MS: u64 = 2_000;

/// Shared secret accepted by RESTART and SHUTDOWN unless the config file sets
/// its own.
pub const DEFAULT_ADMIN_KEY: &str = "admin";

#[derive(Deserialize, Default, Debug)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub admin_key: Option<String>,
    pub localhost: Option<bool>,
    /// How long each termination signal gets before the next one is sent.
    pub stop_grace_ms: Option<u64>,
    #[serde(default)]
    pub players: PlayerCommands,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub roots: Vec<PathBuf>,
    pub admin_key: String,
    pub localhost: bool,
    pub stop_grace: Duration,
    pub players: PlayerCommands,
}

impl Config {
    pub fn resolve(file: Option<FileConfig>, args: &crate::cli::Args) -> Self {
        let file = file.unwrap_or_default();
        Config {
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            roots: args.paths.clone(),
            admin_key: file
                .admin_key
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN_KEY.to_string()),
            localhost: args.localhost || file.localhost.unwrap_or(false),
            stop_grace: Duration::from_millis(file.stop_grace_ms.unwrap_or(DEFAULT_STOP_GRACE_MS)),
            players: file.players,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        let ip = if self.localhost {
            Ipv4Addr::LOCALHOST
        } else {
            Ipv4Addr::UNSPECIFIED
        };
        SocketAddr::from((ip, self.port))
    }

    pub fn uses_default_admin_key(&self) -> bool {
        self.admin_key == DEFAULT_ADMIN_KEY
    }
}

pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }
    let cwd_config = PathBuf::from("mediacenter.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let xdg_config = config_dir.join("mediacenter").join("config.toml");
        if xdg_config.exists() {
            return Some(xdg_config);
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}
