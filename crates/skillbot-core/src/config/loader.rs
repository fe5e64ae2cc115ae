//! Config loader: reads `~/.skillbot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.skillbot/config.json`
//! 3. Environment variables (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path), |key| {
        std::env::var(key).ok()
    })
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment overrides on top of a loaded config.
///
/// `lookup` resolves a variable name to its value; the real loader passes
/// `std::env::var`.
///
/// Supported overrides:
/// - `LLM_PROVIDER` → `agent.provider` (lowercased)
/// - `GOOGLE_API_KEY` / `GEMINI_API_KEY` → `providers.gemini.api_key`
/// - `GEMINI_MODEL_NAME` → `providers.gemini.model`
/// - `DEEPSEEK_API_KEY` → `providers.deepseek.api_key`
/// - `DEEPSEEK_BASE_URL` → `providers.deepseek.api_base`
/// - `DEEPSEEK_MODEL_NAME` → `providers.deepseek.model`
/// - `SKILLBOT_AGENT__SKILLS_DIR` → `agent.skills_dir`
/// - `SKILLBOT_AGENT__MAX_TOOL_ITERATIONS` → `agent.max_tool_iterations`
/// - `SKILLBOT_TOOLS__EXEC_TIMEOUT_SECS` → `tools.exec_timeout_secs`
fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("LLM_PROVIDER") {
        config.agent.provider = val.trim().to_lowercase();
    }

    // Gemini
    if let Some(val) = lookup("GOOGLE_API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
        config.providers.gemini.api_key = val;
    }
    if let Some(val) = lookup("GEMINI_MODEL_NAME") {
        config.providers.gemini.model = Some(val);
    }

    // DeepSeek
    if let Some(val) = lookup("DEEPSEEK_API_KEY") {
        config.providers.deepseek.api_key = val;
    }
    if let Some(val) = lookup("DEEPSEEK_BASE_URL") {
        config.providers.deepseek.api_base = Some(val);
    }
    if let Some(val) = lookup("DEEPSEEK_MODEL_NAME") {
        config.providers.deepseek.model = Some(val);
    }

    // Agent / tools
    if let Some(val) = lookup("SKILLBOT_AGENT__SKILLS_DIR") {
        config.agent.skills_dir = val;
    }
    if let Some(val) = lookup("SKILLBOT_AGENT__MAX_TOOL_ITERATIONS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tool_iterations = n;
        }
    }
    if let Some(val) = lookup("SKILLBOT_TOOLS__EXEC_TIMEOUT_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.tools.exec_timeout_secs = n;
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
