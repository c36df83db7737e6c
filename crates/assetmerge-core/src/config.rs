use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/assetmerge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub dedup: DedupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

/// Tuning for a deduplication pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Grouping strategies in execution order. Earlier strategies claim
    /// records first; omitted strategies do not run.
    pub strategy_order: Vec<String>,
    /// Names (case-insensitive) never used as a name-based grouping key.
    pub ignored_names: Vec<String>,
    pub similarity_threshold: f64,
    pub max_reported_errors: usize,
    pub census_limit: usize,
    pub weights: ScoreWeights,
}

/// Completeness weights per populated field. Identity fields outrank
/// descriptive ones; the numbers are policy, not derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub serial_number: u32,
    pub asset_tag: u32,
    pub manufacturer: u32,
    pub model: u32,
    pub purchase_price: u32,
    pub current_value: u32,
    pub description: u32,
    pub purchase_date: u32,
    pub warranty_expiry: u32,
    pub notes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("assetmerge");

        Self {
            database_path: data_dir.join("assets.db").to_string_lossy().to_string(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            strategy_order: [
                "serial_number",
                "asset_tag",
                "name_manufacturer_model",
                "name_manufacturer",
                "name_only",
                "normalized_name",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ignored_names: Vec::new(),
            similarity_threshold: 0.85,
            max_reported_errors: 10,
            census_limit: 20,
            weights: ScoreWeights::default(),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            serial_number: 10,
            asset_tag: 8,
            manufacturer: 5,
            model: 5,
            purchase_price: 5,
            current_value: 3,
            description: 2,
            purchase_date: 2,
            warranty_expiry: 2,
            notes: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "assetmerge=info".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/assetmerge/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("ASSETMERGE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("assetmerge")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Path to the SQLite asset store, honoring `ASSETMERGE_DB`.
    pub fn database_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("ASSETMERGE_DB") {
            return PathBuf::from(path);
        }
        PathBuf::from(&self.storage.database_path)
    }
}
