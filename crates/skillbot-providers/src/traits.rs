//! Provider traits: the seams between sessions and concrete backends.

use async_trait::async_trait;
use skillbot_core::types::{LlmResponse, Message, ToolDefinition};

use crate::error::ProviderError;

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// A backend that returns one completion per call (explicit tool loop).
///
/// The caller owns the history and is responsible for executing any tool
/// calls in the response and sending their results back.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages`: Conversation history in OpenAI format.
    /// * `tools`: Optional list of tool definitions the LLM can call.
    /// * `model`: Model identifier (e.g. `"deepseek-chat"`).
    /// * `config`: Temperature, max_tokens, etc.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, ProviderError>;

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

/// Local executor for function calls issued by a provider-managed chat.
///
/// Implementations must never fail: errors are reported as the returned text
/// so the model can read them.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run tool `name` with JSON-encoded `arguments`.
    async fn call_tool(&self, name: &str, arguments: &str) -> String;
}

/// One open chat on a provider that runs the tool loop itself.
#[async_trait]
pub trait ManagedChat: Send + Sync {
    /// Send a user turn; function calls are resolved through `tools` until the
    /// model produces text. History is only extended when the turn completes.
    async fn send_message(&self, text: &str, tools: &dyn ToolHandler)
        -> Result<String, ProviderError>;
}

/// A backend that opens provider-managed chats.
pub trait ManagedChatProvider: Send + Sync {
    /// Open a new chat with a system instruction and the tools it may call.
    fn start_chat(&self, system_prompt: &str, tools: &[ToolDefinition]) -> Box<dyn ManagedChat>;

    /// The model used by new chats.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
