//! Tool kinds and parameter helpers.
//!
//! The agent exposes a closed set of two capabilities. Providers and skill
//! authors call them under several names; [`ToolKind::resolve`] maps every
//! accepted name onto its capability.

use std::collections::HashMap;

use serde_json::{json, Value};

use skillbot_core::types::ToolDefinition;

// ─────────────────────────────────────────────
// ToolKind
// ─────────────────────────────────────────────

/// A local capability the model can invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    /// Read any local file (documents are converted to text).
    Read,
    /// Run a script from the active skill's `scripts/` directory.
    Execute,
}

/// Names accepted for [`ToolKind::Read`].
const READ_NAMES: &[&str] = &["read_file", "read_resource", "view", "open"];

/// Names accepted for [`ToolKind::Execute`].
const EXECUTE_NAMES: &[&str] = &[
    "execute_script",
    "run_code",
    "bash",
    "computer",
    "python",
    "repl",
];

impl ToolKind {
    /// All capabilities, in the order their schemas are advertised.
    pub const ALL: [ToolKind; 2] = [ToolKind::Execute, ToolKind::Read];

    /// Map a tool name (canonical or alias) to its capability.
    pub fn resolve(name: &str) -> Option<ToolKind> {
        if READ_NAMES.contains(&name) {
            Some(ToolKind::Read)
        } else if EXECUTE_NAMES.contains(&name) {
            Some(ToolKind::Execute)
        } else {
            None
        }
    }

    /// The name advertised to providers.
    pub fn canonical_name(self) -> &'static str {
        match self {
            ToolKind::Read => "read_file",
            ToolKind::Execute => "execute_script",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::Read => {
                "Read ANY local file content. Supports PDF, Office docs (Word, PowerPoint, Excel), \
                 CSV, code and plain text. Use this to summarize or inspect user files."
            }
            ToolKind::Execute => {
                "Execute a script from the active skill's scripts folder. Use this for specific \
                 tasks like data processing or custom logic."
            }
        }
    }

    /// JSON Schema of the parameters.
    pub fn parameters(self) -> Value {
        match self {
            ToolKind::Read => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path of the file to read (relative to the working directory or absolute)"
                    }
                },
                "required": ["file_path"]
            }),
            ToolKind::Execute => json!({
                "type": "object",
                "properties": {
                    "script_name": {
                        "type": "string",
                        "description": "File name of the script inside the skill's scripts folder"
                    },
                    "arguments": {
                        "type": "string",
                        "description": "Command-line arguments, split with shell quoting rules"
                    }
                },
                "required": ["script_name"]
            }),
        }
    }

    /// Build the `ToolDefinition` sent to the LLM.
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition::new(self.canonical_name(), self.description(), self.parameters())
    }
}

/// Definitions for every capability.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(|k| k.definition()).collect()
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Parse a JSON-encoded argument object. An empty string counts as `{}`.
pub fn parse_params(arguments: &str) -> anyhow::Result<HashMap<String, Value>> {
    if arguments.trim().is_empty() {
        return Ok(HashMap::new());
    }
    Ok(serde_json::from_str(arguments)?)
}

/// Extract a required `String` param under `keys[0]` or one of its aliases.
///
/// The error names the primary key.
pub fn require_string(params: &HashMap<String, Value>, keys: &[&str]) -> anyhow::Result<String> {
    optional_string(params, keys).ok_or_else(|| {
        anyhow::anyhow!(
            "Missing required parameter: {}",
            keys.first().copied().unwrap_or_default()
        )
    })
}

/// Extract an optional `String` param under any of `keys` (first match wins).
///
/// Numbers and booleans are accepted and rendered as text.
pub fn optional_string(params: &HashMap<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match params.get(*k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}
