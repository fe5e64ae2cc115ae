//! Provider registry: static specs for the supported backends.
//!
//! Each `ProviderSpec` describes how to connect to a provider and which
//! tool-loop shape it uses. [`create_backend`] turns a configured backend
//! name into a ready-to-use provider.

use std::sync::Arc;

use skillbot_core::config::ProvidersConfig;
use tracing::debug;

use crate::error::ProviderError;
use crate::gemini::GeminiProvider;
use crate::http_provider::HttpProvider;
use crate::traits::{LlmProvider, LlmRequestConfig, ManagedChatProvider};

// ─────────────────────────────────────────────
// ProviderSpec: static metadata for one provider
// ─────────────────────────────────────────────

/// Who runs the tool-calling loop for a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolLoop {
    /// The provider's runtime detects and re-invokes tool calls.
    Managed,
    /// The session executes tool calls and re-requests completions.
    Explicit,
}

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal name, as used in `agent.provider` / `LLM_PROVIDER`.
    pub name: &'static str,
    /// Human-readable name for logs.
    pub display_name: &'static str,
    /// Environment variable holding the API key.
    pub env_key: &'static str,
    /// API base URL used when none is configured.
    pub default_api_base: &'static str,
    /// Model used when none is configured.
    pub default_model: &'static str,
    /// Tool-loop shape of this backend.
    pub tool_loop: ToolLoop,
}

/// Supported providers.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: "gemini",
        display_name: "Gemini",
        env_key: "GOOGLE_API_KEY",
        default_api_base: "https://generativelanguage.googleapis.com/v1beta",
        default_model: "gemini-2.5-flash",
        tool_loop: ToolLoop::Managed,
    },
    ProviderSpec {
        name: "deepseek",
        display_name: "DeepSeek",
        env_key: "DEEPSEEK_API_KEY",
        default_api_base: "https://api.deepseek.com",
        default_model: "deepseek-chat",
        tool_loop: ToolLoop::Explicit,
    },
];

/// Find a provider spec by its internal name (case-insensitive).
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    let name = name.trim().to_lowercase();
    PROVIDERS.iter().find(|s| s.name == name)
}

// ─────────────────────────────────────────────
// Backend construction
// ─────────────────────────────────────────────

/// A constructed backend, tagged by who runs the tool loop.
pub enum Backend {
    Managed(Arc<dyn ManagedChatProvider>),
    Explicit(Arc<dyn LlmProvider>),
}

impl Backend {
    /// Display name of the underlying provider.
    pub fn display_name(&self) -> &str {
        match self {
            Backend::Managed(p) => p.display_name(),
            Backend::Explicit(p) => p.display_name(),
        }
    }
}

/// Build the backend named `name` from the provider configs.
///
/// `max_function_calls` bounds the automatic function-calling loop of
/// managed backends.
pub fn create_backend(
    name: &str,
    providers: &ProvidersConfig,
    request: &LlmRequestConfig,
    max_function_calls: usize,
) -> Result<Backend, ProviderError> {
    let spec = find_by_name(name).ok_or_else(|| {
        let known: Vec<&str> = PROVIDERS.iter().map(|s| s.name).collect();
        ProviderError::Config(format!(
            "Unknown provider '{}'. Supported providers: {}",
            name,
            known.join(", ")
        ))
    })?;

    let config = providers
        .get_by_name(spec.name)
        .filter(|c| c.is_configured())
        .ok_or_else(|| {
            ProviderError::Config(format!(
                "No API key configured for {}. Set {} or providers.{}.apiKey in the config file.",
                spec.display_name, spec.env_key, spec.name
            ))
        })?;

    debug!(
        provider = spec.display_name,
        api_base = config.api_base.as_deref().unwrap_or(spec.default_api_base),
        "Creating LLM provider"
    );

    Ok(match spec.tool_loop {
        ToolLoop::Managed => Backend::Managed(Arc::new(GeminiProvider::new(
            config,
            spec,
            request.clone(),
            max_function_calls,
        )?)),
        ToolLoop::Explicit => Backend::Explicit(Arc::new(HttpProvider::new(config, spec)?)),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
