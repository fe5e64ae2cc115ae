//! Explicit tool loop over a one-completion-per-call provider.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use skillbot_core::types::{LlmResponse, Message, ToolDefinition};
use skillbot_core::utils::NO_RESPONSE_FALLBACK;
use skillbot_providers::{LlmProvider, LlmRequestConfig, ToolHandler};

use super::ConversationSession;
use crate::retry::{RetryOutcome, RetryPolicy, TIMEOUT_SENTINEL};

/// Owns the message history and executes tool calls itself.
pub struct ExplicitToolSession {
    provider: Arc<dyn LlmProvider>,
    model: String,
    request: LlmRequestConfig,
    retry: RetryPolicy,
    max_iterations: usize,
    tools: Vec<ToolDefinition>,
    history: Vec<Message>,
    /// History length before the turn in progress. Still set when a turn
    /// was dropped or failed midway.
    turn_start: Option<usize>,
}

impl ExplicitToolSession {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Vec<ToolDefinition>,
        request: LlmRequestConfig,
        retry: RetryPolicy,
        max_iterations: usize,
    ) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            model,
            request,
            retry,
            max_iterations,
            tools,
            history: Vec::new(),
            turn_start: None,
        }
    }

    /// The conversation so far.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Drop whatever an unfinished turn left behind.
    fn discard_partial_turn(&mut self) {
        if let Some(start) = self.turn_start.take() {
            warn!(
                dropped = self.history.len().saturating_sub(start),
                "Discarding unfinished turn"
            );
            self.history.truncate(start);
        }
    }

    fn finish_turn(&mut self, text: String) -> String {
        self.history.push(Message::assistant(text.clone()));
        self.turn_start = None;
        text
    }
}

/// Per-request usage and stop reason. Reasoning text is logged by size only
/// and never sent back to the provider.
fn log_completion(response: &LlmResponse, iteration: usize) {
    let (prompt_tokens, completion_tokens) = response
        .usage
        .as_ref()
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();
    debug!(
        iteration,
        prompt_tokens,
        completion_tokens,
        finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
        reasoning_chars = response.reasoning_content.as_ref().map_or(0, |r| r.chars().count()),
        "Completion received"
    );
}

#[async_trait]
impl ConversationSession for ExplicitToolSession {
    fn start_chat(&mut self, system_prompt: &str) {
        self.history = vec![Message::system(system_prompt)];
        self.turn_start = None;
    }

    async fn send_message(&mut self, text: &str, tools: &dyn ToolHandler) -> anyhow::Result<String> {
        self.discard_partial_turn();
        if self.history.is_empty() {
            anyhow::bail!("Chat not started; call start_chat first");
        }

        self.turn_start = Some(self.history.len());
        self.history.push(Message::user(text));

        for iteration in 1..=self.max_iterations {
            let outcome = {
                let provider = &self.provider;
                let history = &self.history;
                let defs = self.tools.as_slice();
                let model = self.model.as_str();
                let request = &self.request;
                self.retry
                    .run(|| provider.chat(history, Some(defs), model, request))
                    .await
                    .with_context(|| format!("{} request failed", provider.display_name()))?
            };

            let response = match outcome {
                RetryOutcome::Completed(r) => r,
                RetryOutcome::Exhausted => {
                    warn!(backend = self.provider.display_name(), "Retries exhausted");
                    self.turn_start = None;
                    return Ok(TIMEOUT_SENTINEL.to_string());
                }
            };

            log_completion(&response, iteration);

            if !response.has_tool_calls() {
                let reply = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string());
                debug!(iteration, "Turn finished");
                return Ok(self.finish_turn(reply));
            }

            let calls = response.tool_calls;
            info!(iteration, count = calls.len(), "Model requested tool calls");
            self.history
                .push(Message::assistant_tool_calls(response.content, calls.clone()));

            for call in &calls {
                debug!(tool = %call.function.name, id = %call.id, "Executing tool call");
                let output = tools
                    .call_tool(&call.function.name, &call.function.arguments)
                    .await;
                self.history
                    .push(Message::tool_result(&call.id, &call.function.name, output));
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            "Tool loop hit the iteration limit"
        );
        Ok(self.finish_turn(NO_RESPONSE_FALLBACK.to_string()))
    }

    async fn inject_system_message(&mut self, text: &str, _tools: &dyn ToolHandler) {
        self.discard_partial_turn();
        self.history.push(Message::system(text));
    }

    fn backend(&self) -> &str {
        self.provider.display_name()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
