use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::parser::{DEFAULT_MAX_BUFFER_SIZE, DEFAULT_READ_BUFFER_SIZE, RequestReader};

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "RAWHTTP_CONFIG";

/// Environment variable overriding the listen address.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Initial size of each connection's read buffer
    pub read_buffer_size: usize,
    /// Largest amount of unparsed request data a connection may buffer
    pub max_buffer_size: usize,
    /// Base URL proxied under `/httpbin`
    pub upstream_url: String,
    pub upstream_connect_timeout_secs: u64,
    pub assets_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:42069".to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            upstream_url: "http://httpbin.org".to_string(),
            upstream_connect_timeout_secs: 5,
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl Config {
    /// Loads the YAML file named by `RAWHTTP_CONFIG` (if any), then applies
    /// the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw)?;
        anyhow::ensure!(cfg.read_buffer_size > 0, "read_buffer_size must be positive");
        anyhow::ensure!(
            cfg.max_buffer_size >= cfg.read_buffer_size,
            "max_buffer_size must be at least read_buffer_size"
        );
        Ok(cfg)
    }

    pub fn request_reader(&self) -> RequestReader {
        RequestReader::new(self.read_buffer_size, self.max_buffer_size)
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_connect_timeout_secs)
    }
}
