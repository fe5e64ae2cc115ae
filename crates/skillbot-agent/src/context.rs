//! Context assembly: the text blobs the model sees.
//!
//! - [`build_system_prompt`] frames the whole conversation around the
//!   available skills.
//! - [`ContextAssembler`] renders one skill (instructions, knowledge files,
//!   file map, script inventory) for injection on activation.
//! - [`build_activation_message`] wraps that context in the activation notice.

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::skills::{SkillRecord, MANIFEST_FILE};

/// Extensions aggregated into the knowledge section.
const KNOWLEDGE_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

// ─────────────────────────────────────────────
// System prompt
// ─────────────────────────────────────────────

/// Build the system prompt given the skill summary.
pub fn build_system_prompt(skill_summary: &str) -> String {
    format!(
        r#"You are an advanced AI Orchestrator running in a local privileged environment.

[CORE CAPABILITIES]
1. **Universal Reader**: the `read_file` tool reads local files, including PDF, Excel, Word and PowerPoint documents.
2. **Script Executor**: the `execute_script` tool runs scripts bundled with the active skill.
3. **Permission**: you may access any local file path the user provides (e.g. "docs/paper.pdf").

[AVAILABLE SKILLS]
{skill_summary}

[PROTOCOL]
- If the user asks to summarize a document, use `read_file`.
- If the user asks for a calculation defined in a skill, use `execute_script`.
- If a skill mentions a tool that does not exist (like `run_code`), use `execute_script` instead."#
    )
}

/// The message injected into the conversation when `skill` is activated.
pub fn build_activation_message(skill: &str, context: &str) -> String {
    format!(
        "[SYSTEM: ACTIVATE SKILL '{skill}']\n\
         [REMINDER] Use `read_file` to inspect documents if no specific script exists.\n\n\
         {context}"
    )
}

// ─────────────────────────────────────────────
// ContextAssembler
// ─────────────────────────────────────────────

/// Renders the context of one skill. Sections with nothing to show are
/// left out; the rest are joined by blank lines.
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn assemble(skill: &SkillRecord) -> String {
        let mut sections = vec![format!(
            "# Active Skill Protocol: {}",
            skill.name.to_uppercase()
        )];

        if !skill.instruction_body.is_empty() {
            sections.push(format!(
                "## Primary Instructions (SOP)\n\n{}",
                skill.instruction_body
            ));
        }

        let knowledge = Self::knowledge(&skill.path);
        if !knowledge.is_empty() {
            sections.push(format!(
                "## Knowledge & References\n\n{}",
                knowledge.join("\n\n")
            ));
        }

        let tree = Self::file_tree(&skill.path);
        if !tree.is_empty() {
            sections.push(format!("## Project Structure (Map)\n\n```text\n{tree}\n```"));
        }

        let scripts = Self::scripts(&skill.scripts_dir());
        if !scripts.is_empty() {
            let list: Vec<String> = scripts.iter().map(|s| format!("- {s}")).collect();
            sections.push(format!(
                "## Available Tools (Scripts)\n\n{}",
                list.join("\n")
            ));
        }

        sections.join("\n\n")
    }

    /// `### File: <rel>` blocks for every knowledge document below `root`.
    fn knowledge(root: &Path) -> Vec<String> {
        WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name() != MANIFEST_FILE)
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| KNOWLEDGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            })
            .filter_map(|e| {
                let rel = e.path().strip_prefix(root).unwrap_or(e.path());
                match std::fs::read_to_string(e.path()) {
                    Ok(content) => Some(format!("### File: {}\n{}", rel.display(), content)),
                    Err(err) => {
                        debug!(file = %e.path().display(), error = %err, "Skipping unreadable knowledge file");
                        None
                    }
                }
            })
            .collect()
    }

    /// Indented tree of everything below `root` except manifests.
    fn file_tree(root: &Path) -> String {
        WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !(e.file_type().is_file() && e.file_name() == MANIFEST_FILE))
            .map(|e| {
                let indent = "  ".repeat(e.depth() - 1);
                let name = e.file_name().to_string_lossy();
                if e.file_type().is_dir() {
                    format!("{indent}📂 {name}/")
                } else {
                    format!("{indent}📄 {name}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// File names directly inside `scripts/`, sorted.
    fn scripts(dir: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
