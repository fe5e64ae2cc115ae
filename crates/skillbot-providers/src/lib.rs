//! LLM provider layer for Skillbot.
//!
//! Two backend shapes are supported:
//!
//! - **Explicit tool loop**: [`traits::LlmProvider`] returns one completion at
//!   a time; the caller runs tool calls and re-requests.
//!   [`http_provider::HttpProvider`] covers any OpenAI-compatible API (DeepSeek).
//! - **Provider-managed tool loop**: [`traits::ManagedChatProvider`] opens a
//!   chat whose runtime detects function calls, runs them through a
//!   [`traits::ToolHandler`], and re-invokes the model itself.
//!   [`gemini::GeminiProvider`] implements this over the Gemini REST API.
//!
//! [`registry`] maps a configured backend name onto one of the two.

pub mod error;
pub mod gemini;
pub mod http_provider;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use http_provider::HttpProvider;
pub use registry::{create_backend, find_by_name, Backend, ProviderSpec, ToolLoop, PROVIDERS};
pub use traits::{LlmProvider, LlmRequestConfig, ManagedChat, ManagedChatProvider, ToolHandler};
