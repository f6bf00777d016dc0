use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::checksum::ChecksumAlgo;

/// Global configuration loaded from `~/.config/arcget/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcgetConfig {
    /// Base URL of the archive's record-files API; the manifest for a record
    /// lives at `<api_base>/<record_id>/files`.
    pub api_base: String,
    /// Digest algorithm assumed for bare manifest checksums.
    #[serde(default)]
    pub checksum_algo: ChecksumAlgo,
    /// Connect timeout for manifest and file requests, in seconds.
    pub connect_timeout_secs: u64,
    /// Receive buffer size hint for transfers, in bytes.
    pub chunk_size: usize,
}

impl Default for ArcgetConfig {
    fn default() -> Self {
        Self {
            api_base: "https://zenodo.org/api/deposit/depositions".to_string(),
            checksum_algo: ChecksumAlgo::Md5,
            connect_timeout_secs: 30,
            chunk_size: 64 * 1024,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("arcget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ArcgetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ArcgetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ArcgetConfig = toml::from_str(&data)?;
    Ok(cfg)
}
