//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig`, `ProvidersConfig`, `ToolsConfig`,
//! `RetryConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.skillbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub providers: ProvidersConfig,
    pub tools: ToolsConfig,
    pub retry: RetryConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Agent settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Backend name: `"gemini"` (provider-managed tool loop) or
    /// `"deepseek"` (explicit tool loop).
    pub provider: String,
    /// Directory whose immediate subdirectories are skills.
    pub skills_dir: String,
    /// Maximum tool-calling loop iterations before forcing a response.
    pub max_tool_iterations: u32,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Cut the injected skill context to this many characters (0 = no cap).
    pub max_skill_context_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            skills_dir: "skills".to_string(),
            max_tool_iterations: 20,
            max_tokens: 8192,
            temperature: 0.7,
            max_skill_context_chars: 0,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single LLM provider (API key, base URL, model).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model identifier (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub gemini: ProviderConfig,
    pub deepseek: ProviderConfig,
}

impl ProvidersConfig {
    /// Get a provider config by name (e.g. `"gemini"`).
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "gemini" => Some(&self.gemini),
            "deepseek" => Some(&self.deepseek),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// Settings for the `read_file` and `execute_script` capabilities.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Hard wall-clock limit for one script run.
    pub exec_timeout_secs: u64,
    /// Plain-text reads are cut to this many characters.
    pub read_max_chars: usize,
    /// Interpreter used for `.py` scripts.
    pub python: String,
    /// Working directory for reads and script runs (default: process cwd).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            exec_timeout_secs: 60,
            read_max_chars: 20_000,
            python: "python3".to_string(),
            working_dir: None,
        }
    }
}

// ─────────────────────────────────────────────
// Retry
// ─────────────────────────────────────────────

/// Backoff settings for rate-limited provider calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first rate-limited attempt; doubles each time.
    pub initial_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.provider, "gemini");
        assert_eq!(config.agent.skills_dir, "skills");
        assert_eq!(config.agent.max_tool_iterations, 20);
        assert_eq!(config.tools.exec_timeout_secs, 60);
        assert_eq!(config.tools.read_max_chars, 20_000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_secs, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"agent": {"provider": "deepseek"}}"#).unwrap();
        assert_eq!(config.agent.provider, "deepseek");
        assert_eq!(config.agent.skills_dir, "skills");
        assert_eq!(config.tools.python, "python3");
    }

    #[test]
    fn test_get_by_name() {
        let mut providers = ProvidersConfig::default();
        providers.deepseek.api_key = "sk-ds".into();
        assert!(providers.get_by_name("deepseek").unwrap().is_configured());
        assert!(!providers.get_by_name("gemini").unwrap().is_configured());
        assert!(providers.get_by_name("openai").is_none());
    }
}
