use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of consecutive failures tolerated per read (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/objstream/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjstreamConfig {
    /// Storage service base URL.
    pub endpoint: String,
    /// Upper bound on the payload of one upload segment, in bytes.
    pub max_segment_size: usize,
    /// Upload block size; segments carry an "aligned" flag relative to it.
    pub block_size: usize,
    /// Compute CRC32C for segments (false = no checksums).
    pub crc32c: bool,
    pub connect_timeout_secs: u64,
    /// Abort a transfer that stays below 1 KiB/s for this long.
    pub low_speed_time_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ObjstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://storage.googleapis.com".to_string(),
            max_segment_size: 2 * 1024 * 1024,
            block_size: 256 * 1024,
            crc32c: true,
            connect_timeout_secs: 30,
            low_speed_time_secs: 60,
            retry: None,
        }
    }
}

impl ObjstreamConfig {
    /// Reject values the segmenter and transport cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_size == 0 {
            anyhow::bail!("max_segment_size must be greater than zero");
        }
        if self.block_size == 0 {
            anyhow::bail!("block_size must be greater than zero");
        }
        if let Some(retry) = &self.retry {
            if retry.max_attempts == 0 {
                anyhow::bail!("retry.max_attempts must be at least 1");
            }
            if !(retry.base_delay_secs.is_finite() && retry.base_delay_secs >= 0.0) {
                anyhow::bail!("retry.base_delay_secs must be a non-negative number");
            }
        }
        Ok(())
    }

    /// Retry parameters in effect (configured or default).
    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("objstream")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ObjstreamConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ObjstreamConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: ObjstreamConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
