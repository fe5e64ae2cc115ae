//! Tool dispatcher: routes a named tool call to its capability.
//!
//! The LLM always gets a `String` back: unknown tools, bad arguments and
//! capability failures are all reported as `Error: ...` text.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use skillbot_core::config::ToolsConfig;
use skillbot_core::utils::expand_home;
use skillbot_providers::ToolHandler;

use super::base::{optional_string, parse_params, require_string, ToolKind};
use super::execute::run_script;
use super::extract::{BuiltinExtractor, DocumentExtractor};
use super::read::read_file;
use crate::skills::SkillRecord;

/// Accepted names for the `read_file` path parameter.
const PATH_KEYS: &[&str] = &["file_path", "path", "file"];
/// Accepted names for the `execute_script` script parameter.
const SCRIPT_KEYS: &[&str] = &["script_name", "script", "name"];
/// Accepted names for the `execute_script` arguments parameter.
const ARGUMENT_KEYS: &[&str] = &["arguments", "args"];

// ─────────────────────────────────────────────
// ToolSettings
// ─────────────────────────────────────────────

/// Runtime settings shared by the capabilities.
#[derive(Clone)]
pub struct ToolSettings {
    /// Base for relative reads and the cwd of scripts.
    pub working_dir: PathBuf,
    /// Plain-text reads are cut to this many characters.
    pub read_max_chars: usize,
    /// Hard wall-clock limit for one script run.
    pub exec_timeout: Duration,
    /// Interpreter for `.py` scripts.
    pub python: String,
    pub extractor: Arc<dyn DocumentExtractor>,
}

impl std::fmt::Debug for ToolSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSettings")
            .field("working_dir", &self.working_dir)
            .field("read_max_chars", &self.read_max_chars)
            .field("exec_timeout", &self.exec_timeout)
            .field("python", &self.python)
            .finish()
    }
}

impl ToolSettings {
    /// Build settings from the `tools` config section.
    ///
    /// Without a configured working directory the process cwd is used.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let working_dir = config
            .working_dir
            .as_deref()
            .map(expand_home)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            working_dir,
            read_max_chars: config.read_max_chars,
            exec_timeout: Duration::from_secs(config.exec_timeout_secs),
            python: config.python.clone(),
            extractor: Arc::new(BuiltinExtractor::default()),
        }
    }

    /// Replace the document extractor (builder pattern).
    pub fn with_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

// ─────────────────────────────────────────────
// ToolDispatcher
// ─────────────────────────────────────────────

/// Executes tool calls for one turn, against the skill active in that turn.
pub struct ToolDispatcher<'a> {
    settings: &'a ToolSettings,
    active: Option<&'a SkillRecord>,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(settings: &'a ToolSettings, active: Option<&'a SkillRecord>) -> Self {
        Self { settings, active }
    }

    /// Execute tool `name` with JSON-encoded `arguments`.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> String {
        let Some(kind) = ToolKind::resolve(name) else {
            warn!(tool = name, "tool not found");
            return format!(
                "Error: Tool '{name}' not found. Use 'read_file' or 'execute_script'."
            );
        };

        let params = match parse_params(arguments) {
            Ok(p) => p,
            Err(e) => {
                warn!(tool = name, error = %e, "invalid tool arguments");
                return format!("Error: Invalid arguments for {name}: {e}");
            }
        };

        info!(tool = name, capability = kind.canonical_name(), "Dispatching tool call");

        let result = match kind {
            ToolKind::Read => self.read(&params).await,
            ToolKind::Execute => self.execute(&params).await,
        };

        match result {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = name, error = %e, "tool call rejected");
                format!("Error: {e}")
            }
        }
    }

    async fn read(&self, params: &HashMap<String, Value>) -> anyhow::Result<String> {
        let path = require_string(params, PATH_KEYS)?;
        Ok(read_file(self.settings, &path).await)
    }

    async fn execute(&self, params: &HashMap<String, Value>) -> anyhow::Result<String> {
        if self.active.is_none() {
            return Ok(run_script(self.settings, None, "", "").await);
        }
        let script = require_string(params, SCRIPT_KEYS)?;
        let arguments = optional_string(params, ARGUMENT_KEYS).unwrap_or_default();
        Ok(run_script(self.settings, self.active, &script, &arguments).await)
    }
}

#[async_trait]
impl ToolHandler for ToolDispatcher<'_> {
    async fn call_tool(&self, name: &str, arguments: &str) -> String {
        self.dispatch(name, arguments).await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn settings(dir: &Path) -> ToolSettings {
        ToolSettings {
            working_dir: dir.to_path_buf(),
            ..ToolSettings::default()
        }
    }

    fn skill(root: &Path) -> SkillRecord {
        let dir = root.join("skill");
        fs::create_dir_all(dir.join("scripts")).unwrap();
        fs::write(dir.join("scripts/greet.sh"), "echo \"hello $1\"").unwrap();
        SkillRecord {
            name: "greeter".into(),
            description: None,
            instruction_body: String::new(),
            path: dir,
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let s = ToolSettings::default();
        let out = ToolDispatcher::new(&s, None)
            .dispatch("web_search", "{}")
            .await;
        assert_eq!(
            out,
            "Error: Tool 'web_search' not found. Use 'read_file' or 'execute_script'."
        );
    }

    #[tokio::test]
    async fn test_invalid_json_arguments() {
        let s = ToolSettings::default();
        let out = ToolDispatcher::new(&s, None)
            .dispatch("read_file", "{oops")
            .await;
        assert!(out.starts_with("Error: Invalid arguments for read_file:"), "{out}");
    }

    #[tokio::test]
    async fn test_missing_parameter() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let skill = skill(dir.path());

        let d = ToolDispatcher::new(&s, Some(&skill));
        assert_eq!(
            d.dispatch("read_file", "{}").await,
            "Error: Missing required parameter: file_path"
        );
        assert_eq!(
            d.dispatch("execute_script", r#"{"arguments": "x"}"#).await,
            "Error: Missing required parameter: script_name"
        );
    }

    #[tokio::test]
    async fn test_read_aliases_reach_reader() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "remember").unwrap();
        let s = settings(dir.path());
        let d = ToolDispatcher::new(&s, None);

        for (tool, args) in [
            ("read_file", r#"{"file_path": "notes.txt"}"#),
            ("view", r#"{"path": "notes.txt"}"#),
            ("open", r#"{"file": "notes.txt"}"#),
            ("read_resource", r#"{"file_path": "notes.txt"}"#),
        ] {
            assert_eq!(d.dispatch(tool, args).await, "remember", "{tool}");
        }
        assert_eq!(
            d.dispatch("view", r#"{"path": "missing.txt"}"#).await,
            "Error: File not found: missing.txt"
        );
    }

    #[tokio::test]
    async fn test_execute_aliases_reach_runner() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let skill = skill(dir.path());
        let d = ToolDispatcher::new(&s, Some(&skill));

        assert_eq!(
            d.dispatch("execute_script", r#"{"script_name": "greet.sh", "arguments": "bob"}"#)
                .await,
            "STDOUT:\nhello bob\n"
        );
        assert_eq!(
            d.dispatch("bash", r#"{"script": "greet.sh", "args": "amy"}"#)
                .await,
            "STDOUT:\nhello amy\n"
        );
    }

    #[tokio::test]
    async fn test_execute_without_skill_ignores_arguments() {
        let s = ToolSettings::default();
        let d = ToolDispatcher::new(&s, None);
        assert_eq!(d.dispatch("run_code", "{}").await, "Error: No skill active.");
        assert_eq!(
            d.dispatch("python", r#"{"script_name": "x.py"}"#).await,
            "Error: No skill active."
        );
    }

    #[tokio::test]
    async fn test_dispatcher_as_tool_handler() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "A").unwrap();
        let s = settings(dir.path());
        let d = ToolDispatcher::new(&s, None);

        let handler: &dyn ToolHandler = &d;
        assert_eq!(handler.call_tool("read_file", r#"{"file_path":"a.md"}"#).await, "A");
    }

    #[test]
    fn test_settings_from_config() {
        let config = ToolsConfig {
            exec_timeout_secs: 5,
            read_max_chars: 100,
            python: "python3.12".into(),
            working_dir: Some("/srv/work".into()),
        };
        let s = ToolSettings::from_config(&config);
        assert_eq!(s.working_dir, PathBuf::from("/srv/work"));
        assert_eq!(s.exec_timeout, Duration::from_secs(5));
        assert_eq!(s.read_max_chars, 100);
        assert_eq!(s.python, "python3.12");
    }
}
