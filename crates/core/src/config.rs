use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "pbix-audit.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upload_dir: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub max_upload_mb: u64,
    pub workers: usize,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            scratch_dir: None,
            max_upload_mb: 200,
            workers: 2,
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let config: Config =
            toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn discover() -> Option<Self> {
        let path = Path::new(CONFIG_FILE_NAME);
        if path.exists() {
            Config::load(path).ok()
        } else {
            None
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.max_upload_mb == 0 {
            anyhow::bail!("max_upload_mb must be at least 1");
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Replaces the port of `server.bind` with `port`.
    pub fn apply_port(&mut self, port: u16) {
        let host = self
            .server
            .bind
            .rsplit_once(':')
            .map(|(h, _)| h.to_string())
            .unwrap_or_else(|| self.server.bind.clone());
        self.server.bind = format!("{host}:{port}");
    }
}
