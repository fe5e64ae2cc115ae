//! Gemini provider: provider-managed tool loop over the `generateContent`
//! REST API.
//!
//! A [`GeminiChat`] keeps the conversation as Gemini `Content` items. On each
//! user turn it calls the model, answers every `functionCall` part through the
//! caller's [`ToolHandler`], and re-invokes the model until it replies with
//! text (automatic function calling).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use skillbot_core::config::ProviderConfig;
use skillbot_core::types::ToolDefinition;
use skillbot_core::utils::NO_RESPONSE_FALLBACK;

use crate::error::ProviderError;
use crate::registry::ProviderSpec;
use crate::traits::{LlmRequestConfig, ManagedChat, ManagedChatProvider, ToolHandler};

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

/// One turn of a Gemini conversation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user_text(text: &str) -> Self {
        Content {
            role: Some("user".into()),
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text parts, skipping thought summaries.
    fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|p| p.extra.get("thought").and_then(Value::as_bool) != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    fn function_calls(&self) -> Vec<&GeminiFunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| p.function_call.as_ref())
            .collect()
    }
}

/// A content part. Unknown fields (e.g. `thoughtSignature`) are carried
/// through unchanged so they can be echoed back to the API.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    fn text(text: &str) -> Self {
        Part {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn function_response(name: &str, output: String) -> Self {
        Part {
            function_response: Some(FunctionResponse {
                name: name.to_string(),
                response: json!({ "result": output }),
            }),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: &'a Content,
    contents: &'a [Content],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Value],
    generation_config: GenerationConfig,
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Convert OpenAI-style tool definitions into one Gemini `tools` entry.
fn function_declarations(tools: &[ToolDefinition]) -> Vec<Value> {
    if tools.is_empty() {
        return Vec::new();
    }
    let decls: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "name": t.function.name,
                "description": t.function.description,
                "parameters": t.function.parameters,
            })
        })
        .collect();
    vec![json!({ "functionDeclarations": decls })]
}

// ─────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────

struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    request: LlmRequestConfig,
    spec: &'static ProviderSpec,
}

impl GeminiClient {
    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    /// One `generateContent` call; returns the first candidate's content.
    async fn generate(
        &self,
        system: &Content,
        contents: &[Content],
        tools: &[Value],
    ) -> Result<Content, ProviderError> {
        debug!(
            provider = self.spec.display_name,
            model = %self.model,
            contents = contents.len(),
            "Calling LLM"
        );

        let body = GenerateRequest {
            system_instruction: system,
            contents,
            tools,
            generation_config: GenerationConfig {
                max_output_tokens: self.request.max_tokens,
                temperature: self.request.temperature,
            },
        };

        let response = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = self.spec.display_name, error = %e, "HTTP request failed");
                ProviderError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = self.spec.display_name,
                status = %status,
                body = %body,
                "API error"
            );
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        debug!(
            provider = self.spec.display_name,
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );

        let mut content = candidate.content.unwrap_or_default();
        content.role = Some("model".into());
        Ok(content)
    }
}

// ─────────────────────────────────────────────
// GeminiProvider
// ─────────────────────────────────────────────

/// Opens Gemini chats that run function calls automatically.
pub struct GeminiProvider {
    client: Arc<GeminiClient>,
    max_function_calls: usize,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base", &self.client.api_base)
            .field("model", &self.client.model)
            .field("max_function_calls", &self.max_function_calls)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider. `max_function_calls` bounds how many rounds of
    /// function calls one user turn may trigger.
    pub fn new(
        config: &ProviderConfig,
        spec: &'static ProviderSpec,
        request: LlmRequestConfig,
        max_function_calls: usize,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(GeminiProvider {
            client: Arc::new(GeminiClient {
                http,
                api_base: config
                    .api_base
                    .clone()
                    .unwrap_or_else(|| spec.default_api_base.to_string()),
                api_key: config.api_key.clone(),
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| spec.default_model.to_string()),
                request,
                spec,
            }),
            max_function_calls,
        })
    }
}

impl GeminiProvider {
    fn open_chat(&self, system_prompt: &str, tools: &[ToolDefinition]) -> GeminiChat {
        GeminiChat {
            client: Arc::clone(&self.client),
            system: Content {
                role: None,
                parts: vec![Part::text(system_prompt)],
            },
            tools: function_declarations(tools),
            history: Mutex::new(Vec::new()),
            max_function_calls: self.max_function_calls,
        }
    }
}

impl ManagedChatProvider for GeminiProvider {
    fn start_chat(&self, system_prompt: &str, tools: &[ToolDefinition]) -> Box<dyn ManagedChat> {
        Box::new(self.open_chat(system_prompt, tools))
    }

    fn default_model(&self) -> &str {
        &self.client.model
    }

    fn display_name(&self) -> &str {
        self.client.spec.display_name
    }
}

// ─────────────────────────────────────────────
// GeminiChat
// ─────────────────────────────────────────────

/// One open Gemini conversation.
pub struct GeminiChat {
    client: Arc<GeminiClient>,
    system: Content,
    tools: Vec<Value>,
    history: Mutex<Vec<Content>>,
    max_function_calls: usize,
}

impl GeminiChat {
    fn snapshot(&self) -> Vec<Content> {
        match self.history.lock() {
            Ok(h) => h.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[cfg(test)]
    fn history(&self) -> Vec<Content> {
        self.snapshot()
    }

    fn commit(&self, contents: Vec<Content>) {
        match self.history.lock() {
            Ok(mut h) => *h = contents,
            Err(poisoned) => *poisoned.into_inner() = contents,
        }
    }
}

#[async_trait]
impl ManagedChat for GeminiChat {
    async fn send_message(
        &self,
        text: &str,
        tools: &dyn ToolHandler,
    ) -> Result<String, ProviderError> {
        let mut pending = self.snapshot();
        pending.push(Content::user_text(text));

        let mut rounds = 0;
        loop {
            let mut reply = self
                .client
                .generate(&self.system, &pending, &self.tools)
                .await?;

            let calls: Vec<GeminiFunctionCall> =
                reply.function_calls().into_iter().cloned().collect();

            if calls.is_empty() {
                let mut answer = reply.text();
                if answer.trim().is_empty() {
                    // A blocked or empty candidate must not enter history:
                    // Gemini rejects contents without parts.
                    warn!("Model returned no text, using fallback reply");
                    answer = NO_RESPONSE_FALLBACK.to_string();
                    reply.parts = vec![Part::text(&answer)];
                }
                pending.push(reply);
                self.commit(pending);
                return Ok(answer);
            }

            if rounds >= self.max_function_calls {
                warn!(
                    limit = self.max_function_calls,
                    "Function-call limit reached, stopping tool loop"
                );
                reply.parts.retain(|p| p.function_call.is_none());
                let mut answer = reply.text();
                if answer.trim().is_empty() {
                    answer = NO_RESPONSE_FALLBACK.to_string();
                    reply.parts = vec![Part::text(&answer)];
                }
                pending.push(reply);
                self.commit(pending);
                return Ok(answer);
            }

            pending.push(reply);
            rounds += 1;

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let args = if call.args.is_null() {
                    "{}".to_string()
                } else {
                    call.args.to_string()
                };
                debug!(tool = %call.name, round = rounds, "Executing function call");
                let output = tools.call_tool(&call.name, &args).await;
                responses.push(Part::function_response(&call.name, output));
            }
            pending.push(Content {
                role: Some("user".into()),
                parts: responses,
            });
        }
    }

}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::find_by_name;
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

    /// Records every call and answers with a fixed string.
    #[derive(Default)]
    struct RecordingTools {
        calls: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ToolHandler for RecordingTools {
        async fn call_tool(&self, name: &str, arguments: &str) -> String {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments.to_string()));
            "STDOUT:\n42\n".to_string()
        }
    }

    fn provider(base: &str, max_function_calls: usize) -> GeminiProvider {
        let config = ProviderConfig {
            api_key: "g-key".into(),
            api_base: Some(base.to_string()),
            model: None,
        };
        GeminiProvider::new(
            &config,
            find_by_name("gemini").unwrap(),
            LlmRequestConfig::default(),
            max_function_calls,
        )
        .unwrap()
    }

    fn text_reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    fn call_reply(name: &str, args: serde_json::Value) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": { "name": name, "args": args },
                        "thoughtSignature": "sig-1"
                    }]
                },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_text_reply_extends_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Hi there")))
            .mount(&server)
            .await;

        let chat = provider(&server.uri(), 10).open_chat("You are helpful.", &[]);
        let tools = RecordingTools::default();

        let reply = chat.send_message("Hello", &tools).await.unwrap();
        assert_eq!(reply, "Hi there");
        assert_eq!(chat.history().len(), 2);
        assert!(tools.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_function_call_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(call_reply(
                "execute_script",
                json!({ "script_name": "calc.py", "args": "6 7" }),
            )))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(json!({
                "contents": [
                    { "role": "user" },
                    { "role": "model", "parts": [{ "thoughtSignature": "sig-1" }] },
                    { "role": "user", "parts": [{ "functionResponse": {
                        "name": "execute_script",
                        "response": { "result": "STDOUT:\n42\n" }
                    } }] }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("The answer is 42.")))
            .mount(&server)
            .await;

        let tool = ToolDefinition::new(
            "execute_script",
            "Run a script",
            json!({ "type": "object", "properties": {} }),
        );
        let chat = provider(&server.uri(), 10).open_chat("sys", &[tool]);
        let tools = RecordingTools::default();

        let reply = chat.send_message("compute", &tools).await.unwrap();
        assert_eq!(reply, "The answer is 42.");
        assert_eq!(chat.history().len(), 4);

        let calls = tools.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "execute_script");
        let args: serde_json::Value = serde_json::from_str(&calls[0].1).unwrap();
        assert_eq!(args["script_name"], "calc.py");
    }

    #[tokio::test]
    async fn test_function_call_limit_stops_loop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(call_reply("read_file", json!({}))),
            )
            .mount(&server)
            .await;

        let chat = provider(&server.uri(), 2).open_chat("sys", &[]);
        let tools = RecordingTools::default();

        let reply = chat.send_message("loop forever", &tools).await.unwrap();
        assert_eq!(reply, NO_RESPONSE_FALLBACK);
        assert_eq!(tools.calls.lock().unwrap().len(), 2);
        // user, (model call, user response) x2, final model text
        assert_eq!(chat.history().len(), 6);
    }

    #[tokio::test]
    async fn test_rate_limit_leaves_history_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let chat = provider(&server.uri(), 10).open_chat("sys", &[]);
        let err = chat
            .send_message("Hello", &RecordingTools::default())
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(chat.history().len(), 0);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let chat = provider(&server.uri(), 10).open_chat("sys", &[]);
        let err = chat
            .send_message("Hello", &RecordingTools::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_blocked_candidate_falls_back_without_empty_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(json!({
                "contents": [
                    { "role": "user" },
                    { "role": "model", "parts": [{ "text": NO_RESPONSE_FALLBACK }] },
                    { "role": "user", "parts": [{ "text": "try again" }] }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Sure.")))
            .mount(&server)
            .await;

        let chat = provider(&server.uri(), 10).open_chat("sys", &[]);
        let tools = RecordingTools::default();

        let reply = chat.send_message("something blocked", &tools).await.unwrap();
        assert_eq!(reply, NO_RESPONSE_FALLBACK);
        let history = chat.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|c| !c.parts.is_empty()));

        // The follow-up request is accepted by the matcher above only if the
        // fallback turn was stored with a text part.
        assert_eq!(chat.send_message("try again", &tools).await.unwrap(), "Sure.");
        assert_eq!(chat.history().len(), 4);
    }

    #[test]
    fn test_function_declarations_shape() {
        let tool = ToolDefinition::new("read_file", "Read", json!({ "type": "object" }));
        let decls = function_declarations(&[tool]);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0]["functionDeclarations"][0]["name"], "read_file");
        assert!(function_declarations(&[]).is_empty());
    }

    #[test]
    fn test_part_keeps_unknown_fields() {
        let part: Part = serde_json::from_value(json!({
            "text": "hi",
            "thoughtSignature": "abc"
        }))
        .unwrap();
        let back = serde_json::to_value(&part).unwrap();
        assert_eq!(back["thoughtSignature"], "abc");
        assert_eq!(back["text"], "hi");
    }
}
