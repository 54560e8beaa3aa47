//! Reader for the name-value-store node's RPC configuration.
//!
//! The node keeps `key=value` lines in `emercoin.conf`; `#` starts a comment
//! line. Only the RPC connection settings are reported.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_RPC_CONNECT: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 6662;

#[derive(Debug, Error)]
pub enum RpcConfError {
    #[error("invalid rpcport '{0}'")]
    InvalidPort(String),
}

/// RPC settings found in an existing config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcSettings {
    pub rpcuser: Option<String>,
    pub rpcpassword: Option<String>,
    pub rpcconnect: String,
    pub rpcport: u16,
    pub datadir: Option<String>,
}

/// Report for one config path. `settings` is absent when the file is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcConf {
    #[serde(flatten)]
    pub settings: Option<RpcSettings>,
    pub path: String,
}

/// Platform default location of `emercoin.conf`.
pub fn default_path() -> Option<PathBuf> {
    let base = directories::BaseDirs::new()?;
    if cfg!(windows) {
        Some(base.config_dir().join("Emercoin").join("emercoin.conf"))
    } else {
        Some(base.home_dir().join(".emercoin").join("emercoin.conf"))
    }
}

/// Parse `key=value` lines. Later keys win.
pub fn parse_lines(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Extract the RPC settings, applying the node defaults.
pub fn settings_from(content: &str) -> Result<RpcSettings, RpcConfError> {
    let mut values = parse_lines(content);
    let rpcport = match values.remove("rpcport") {
        Some(port) => port
            .parse::<u16>()
            .map_err(|_| RpcConfError::InvalidPort(port))?,
        None => DEFAULT_RPC_PORT,
    };
    Ok(RpcSettings {
        rpcuser: values.remove("rpcuser"),
        rpcpassword: values.remove("rpcpassword"),
        rpcconnect: values
            .remove("rpcconnect")
            .unwrap_or_else(|| DEFAULT_RPC_CONNECT.to_string()),
        rpcport,
        datadir: values.remove("datadir"),
    })
}

/// Read the config at `path`. A missing file is not an error.
pub fn read(path: &Path) -> anyhow::Result<RpcConf> {
    let settings = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        Some(settings_from(&content)?)
    } else {
        debug!(path = %path.display(), "rpc config not found");
        None
    };
    Ok(RpcConf {
        settings,
        path: path.display().to_string(),
    })
}
