//! Conversation sessions: one per backend tool-loop shape.
//!
//! - [`ManagedToolSession`] wraps a chat whose provider runs tool calls
//!   itself (Gemini automatic function calling).
//! - [`ExplicitToolSession`] owns the message history and drives the
//!   request → tool execution → re-request loop (DeepSeek).
//!
//! [`build_session`] picks one from `agent.provider`.

mod explicit;
mod managed;

pub use explicit::ExplicitToolSession;
pub use managed::ManagedToolSession;

use async_trait::async_trait;
use tracing::info;

use skillbot_core::config::Config;
use skillbot_providers::{create_backend, Backend, LlmRequestConfig, ToolHandler};

use crate::retry::RetryPolicy;
use crate::tools::tool_definitions;

/// A conversation with one LLM backend.
#[async_trait]
pub trait ConversationSession: Send {
    /// Begin a fresh conversation framed by `system_prompt`.
    fn start_chat(&mut self, system_prompt: &str);

    /// Send a user turn and return the final text reply.
    ///
    /// Tool calls made during the turn are executed through `tools`.
    async fn send_message(&mut self, text: &str, tools: &dyn ToolHandler) -> anyhow::Result<String>;

    /// Add out-of-band instructions (e.g. an activated skill) to the
    /// conversation.
    async fn inject_system_message(&mut self, text: &str, tools: &dyn ToolHandler);

    /// Display name of the backend.
    fn backend(&self) -> &str;
}

/// Build the session for the configured provider.
pub fn build_session(config: &Config) -> anyhow::Result<Box<dyn ConversationSession>> {
    let request = LlmRequestConfig {
        max_tokens: config.agent.max_tokens,
        temperature: config.agent.temperature,
    };
    let max_iterations = config.agent.max_tool_iterations as usize;
    let retry = RetryPolicy::from_config(&config.retry);

    let backend = create_backend(
        &config.agent.provider,
        &config.providers,
        &request,
        max_iterations,
    )?;
    info!(
        backend = backend.display_name(),
        max_iterations,
        "Conversation backend selected"
    );

    Ok(match backend {
        Backend::Managed(provider) => Box::new(ManagedToolSession::new(
            provider,
            tool_definitions(),
            retry,
        )),
        Backend::Explicit(provider) => Box::new(ExplicitToolSession::new(
            provider,
            tool_definitions(),
            request,
            retry,
            max_iterations,
        )),
    })
}
