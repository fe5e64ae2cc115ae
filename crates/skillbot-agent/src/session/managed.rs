//! Session over a provider that runs the tool loop itself.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, warn};

use skillbot_core::types::ToolDefinition;
use skillbot_providers::{ManagedChat, ManagedChatProvider, ToolHandler};

use super::ConversationSession;
use crate::retry::{RetryOutcome, RetryPolicy, TIMEOUT_SENTINEL};

/// Delegates history and function calling to a [`ManagedChat`].
pub struct ManagedToolSession {
    provider: Arc<dyn ManagedChatProvider>,
    tools: Vec<ToolDefinition>,
    retry: RetryPolicy,
    chat: Option<Box<dyn ManagedChat>>,
}

impl ManagedToolSession {
    pub fn new(
        provider: Arc<dyn ManagedChatProvider>,
        tools: Vec<ToolDefinition>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            tools,
            retry,
            chat: None,
        }
    }
}

#[async_trait]
impl ConversationSession for ManagedToolSession {
    fn start_chat(&mut self, system_prompt: &str) {
        self.chat = Some(self.provider.start_chat(system_prompt, &self.tools));
    }

    async fn send_message(&mut self, text: &str, tools: &dyn ToolHandler) -> anyhow::Result<String> {
        let chat = self
            .chat
            .as_deref()
            .context("Chat not started; call start_chat first")?;

        let outcome = self
            .retry
            .run(|| chat.send_message(text, tools))
            .await
            .with_context(|| format!("{} request failed", self.provider.display_name()))?;

        match outcome {
            RetryOutcome::Completed(reply) => Ok(reply),
            RetryOutcome::Exhausted => {
                warn!(backend = self.provider.display_name(), "Retries exhausted");
                Ok(TIMEOUT_SENTINEL.to_string())
            }
        }
    }

    async fn inject_system_message(&mut self, text: &str, tools: &dyn ToolHandler) {
        let Some(chat) = self.chat.as_deref() else {
            warn!("No chat open; dropping system update");
            return;
        };
        // The model's acknowledgement is not shown to the user.
        match chat.send_message(&format!("[SYSTEM UPDATE] {text}"), tools).await {
            Ok(ack) => debug!(chars = ack.len(), "System update acknowledged"),
            Err(e) => debug!(error = %e, "System update not delivered"),
        }
    }

    fn backend(&self) -> &str {
        self.provider.display_name()
    }
}
