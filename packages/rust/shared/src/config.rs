//! Application configuration for LeadScout.
//!
//! User config lives at `~/.leadscout/leadscout.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials (API keys, the sweep shared secret) are referenced by
//! environment-variable *name*; the values themselves never touch disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

// ---------------------------------------------------------------------------
// Config structs (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Scheduled sweep settings.
    #[serde(default)]
    pub sweep: SweepDefaults,

    /// Search index collaborator settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Completion service collaborator settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Target region for discovery when no CLI flag is given.
    #[serde(default = "default_region")]
    pub region: String,

    /// Path to the local lead database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            db_path: default_db_path(),
        }
    }
}

fn default_region() -> String {
    "東京都".into()
}
fn default_db_path() -> String {
    "~/.leadscout/leadscout.db".into()
}

/// `[sweep]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepDefaults {
    /// Wall-clock ceiling for one sweep invocation, in seconds.
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Result cap per search query.
    #[serde(default = "default_result_count")]
    pub result_count: u32,

    /// Name of the env var holding the shared secret the scheduled trigger
    /// must present (never store the secret itself).
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for SweepDefaults {
    fn default() -> Self {
        Self {
            time_budget_secs: default_time_budget_secs(),
            result_count: default_result_count(),
            secret_env: default_secret_env(),
        }
    }
}

fn default_time_budget_secs() -> u64 {
    480
}
fn default_result_count() -> u32 {
    10
}
fn default_secret_env() -> String {
    "LEADSCOUT_SWEEP_SECRET".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the search engine id.
    #[serde(default = "default_engine_id_env")]
    pub engine_id_env: String,

    /// Search endpoint base URL (overridable for tests).
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id_env: default_engine_id_env(),
            endpoint: default_search_endpoint(),
        }
    }
}

fn default_search_key_env() -> String {
    "LEADSCOUT_SEARCH_API_KEY".into()
}
fn default_engine_id_env() -> String {
    "LEADSCOUT_SEARCH_ENGINE_ID".into()
}
fn default_search_endpoint() -> String {
    "https://customsearch.googleapis.com/customsearch/v1".into()
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the completion API key.
    #[serde(default = "default_completion_key_env")]
    pub api_key_env: String,

    /// Completion endpoint base URL (overridable for tests).
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    /// Model id used for extraction calls.
    #[serde(default = "default_model")]
    pub model: String,

    /// Max output tokens per extraction call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_completion_key_env(),
            endpoint: default_completion_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_completion_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_completion_endpoint() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    2_000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscout/leadscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the configured database path, expanding a leading `~`.
pub fn resolve_db_path(config: &AppConfig) -> Result<PathBuf> {
    let raw = &config.defaults.db_path;
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
        Ok(home.join(rest))
    } else {
        Ok(PathBuf::from(raw))
    }
}

/// Check the scheduled-trigger shared secret before any sweep stage runs.
///
/// Rejects the invocation when the env var named in config is unset or the
/// presented credential does not match. This is the only check allowed to
/// halt an entire sweep besides the wall-clock ceiling.
pub fn validate_sweep_secret(config: &AppConfig, presented: &str) -> Result<()> {
    let var_name = &config.sweep.secret_env;
    match std::env::var(var_name) {
        Ok(expected) if !expected.is_empty() && expected == presented => Ok(()),
        Ok(_) => Err(LeadScoutError::auth("sweep secret mismatch")),
        Err(_) => Err(LeadScoutError::auth(format!(
            "sweep secret not configured. Set the {var_name} environment variable."
        ))),
    }
}
