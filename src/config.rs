use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Persisted application settings. The file is read once at startup and
/// rewritten wholesale on every save; there is no schema versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub api_model: String,
    /// Per-call timeout in milliseconds.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub auto_start: bool,
    pub enable_file_watcher: bool,
    pub sprite_scale: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            api_model: DEFAULT_MODEL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            auto_start: true,
            enable_file_watcher: true,
            sprite_scale: 1.0,
        }
    }
}

/// Shallow settings overlay: only fields present in the patch are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_model: Option<String>,
    #[serde(rename = "timeout")]
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub auto_start: Option<bool>,
    pub enable_file_watcher: Option<bool>,
    pub sprite_scale: Option<f64>,
}

impl AppConfig {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(url) = &patch.api_base_url {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(key) = &patch.api_key {
            self.api_key = key.trim().to_string();
        }
        if let Some(model) = &patch.api_model {
            self.api_model = model.trim().to_string();
        }
        if let Some(timeout) = patch.timeout_ms {
            self.timeout_ms = timeout;
        }
        if let Some(retries) = patch.max_retries {
            self.max_retries = retries;
        }
        if let Some(auto_start) = patch.auto_start {
            self.auto_start = auto_start;
        }
        if let Some(watch) = patch.enable_file_watcher {
            self.enable_file_watcher = watch;
        }
        if let Some(scale) = patch.sprite_scale {
            self.sprite_scale = scale;
        }
    }
}

/// Load settings from `path`. A missing or unreadable file degrades to
/// defaults so a broken config never blocks startup.
pub fn load(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(err) => {
                warn!("config file {} is malformed: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

pub fn save(path: &Path, config: &AppConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

pub fn default_config_path() -> Result<PathBuf, AppError> {
    let base = dirs::config_dir()
        .ok_or_else(|| AppError::Config("could not resolve config directory".to_string()))?;
    Ok(base.join("deskpet").join("config.json"))
}
