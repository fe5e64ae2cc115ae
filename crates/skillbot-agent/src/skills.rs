//! Skill registry: discovers skill directories and tracks the active one.
//!
//! # Layout
//!
//! Every immediate subdirectory of the skills root is one skill:
//!
//! ```text
//! skills/
//!   pdf-report/
//!     SKILL.md          optional manifest + instructions
//!     scripts/          executables exposed through `execute_script`
//!     reference/*.md    knowledge injected on activation
//! ```
//!
//! ## SKILL.md format
//!
//! ```text
//! ---
//! name: pdf-report
//! description: "Summarize PDF documents into a report"
//! ---
//!
//! 1. Read the document with read_file.
//! 2. Run scripts/report.py with the summary.
//! ```
//!
//! A missing or malformed manifest never fails discovery: the skill is
//! registered under its directory name with a generic body.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::context::ContextAssembler;

/// Manifest file name inside a skill directory.
pub const MANIFEST_FILE: &str = "SKILL.md";

/// Instruction body used when a skill has no usable manifest.
pub const FALLBACK_BODY: &str = "This skill provides executable scripts.";

/// Shown in place of a missing description.
pub const NO_DESCRIPTION: &str = "No description.";

/// Longest description excerpt rendered by [`SkillRegistry::summarize`].
const SUMMARY_DESCRIPTION_CHARS: usize = 100;

// ─────────────────────────────────────────────
// SkillRecord
// ─────────────────────────────────────────────

/// One parsed skill directory. Immutable after discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkillRecord {
    /// Unique key in the registry. Never empty.
    pub name: String,
    /// Manifest description, if any.
    pub description: Option<String>,
    /// Operational procedure (manifest body).
    pub instruction_body: String,
    /// Absolute skill directory.
    pub path: PathBuf,
}

impl SkillRecord {
    /// Parse the skill rooted at `dir`.
    pub fn load(dir: &Path) -> Self {
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| dir.to_string_lossy().to_string());
        let path = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());

        let manifest = std::fs::read_to_string(dir.join(MANIFEST_FILE))
            .map_err(|e| e.to_string())
            .and_then(|content| parse_manifest(&content));

        match manifest {
            Ok(m) => SkillRecord {
                name: m.name.filter(|n| !n.trim().is_empty()).unwrap_or(dir_name),
                description: m.description,
                instruction_body: m.body,
                path,
            },
            Err(reason) => {
                debug!(skill = %dir_name, reason = %reason, "Using fallback skill manifest");
                SkillRecord {
                    name: dir_name,
                    description: None,
                    instruction_body: FALLBACK_BODY.to_string(),
                    path,
                }
            }
        }
    }

    /// Description, or the placeholder when absent.
    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or(NO_DESCRIPTION)
    }

    /// Directory holding the executable scripts of this skill.
    pub fn scripts_dir(&self) -> PathBuf {
        self.path.join("scripts")
    }
}

// ─────────────────────────────────────────────
// Manifest parsing
// ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct Manifest {
    name: Option<String>,
    description: Option<String>,
    body: String,
}

/// Split `---` front matter from the body and read `name`/`description`.
fn parse_manifest(content: &str) -> Result<Manifest, String> {
    if !content.starts_with("---") {
        return Err("manifest has no front matter".into());
    }

    let parts: Vec<&str> = content.splitn(3, "---").collect();
    if parts.len() < 3 {
        return Err("front matter is not closed".into());
    }

    let meta: Value = serde_yaml::from_str(parts[1]).map_err(|e| e.to_string())?;
    let map = meta
        .as_mapping()
        .ok_or_else(|| "front matter is not a mapping".to_string())?;

    Ok(Manifest {
        name: map.get("name").and_then(scalar_string),
        description: map.get("description").and_then(scalar_string),
        body: parts[2].trim().to_string(),
    })
}

/// Render a YAML scalar as text; sequences and mappings yield `None`.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ─────────────────────────────────────────────
// SkillRegistry
// ─────────────────────────────────────────────

/// Ordered set of discovered skills plus at most one active selection.
#[derive(Debug, Default)]
pub struct SkillRegistry {
    skills: Vec<SkillRecord>,
    active: Option<usize>,
}

impl SkillRegistry {
    /// Scan the immediate subdirectories of `root`, in file-name order.
    ///
    /// A missing root yields an empty registry.
    pub fn discover(root: &Path) -> Self {
        let mut registry = SkillRegistry::default();

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "Skills root not readable");
                return registry;
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            registry.insert(SkillRecord::load(&dir));
        }

        info!(root = %root.display(), count = registry.len(), "Discovered skills");
        registry
    }

    fn insert(&mut self, record: SkillRecord) {
        match self.skills.iter().position(|s| s.name == record.name) {
            Some(idx) => {
                warn!(
                    skill = %record.name,
                    replaced = %self.skills[idx].path.display(),
                    by = %record.path.display(),
                    "Duplicate skill name, later directory wins"
                );
                self.skills[idx] = record;
            }
            None => self.skills.push(record),
        }
    }

    /// Make `name` the active skill and return its assembled context.
    ///
    /// Unknown names return an empty string and leave the selection as is.
    pub fn activate(&mut self, name: &str) -> String {
        self.select(name)
            .map(ContextAssembler::assemble)
            .unwrap_or_default()
    }

    /// Mark `name` active without assembling its context.
    pub fn select(&mut self, name: &str) -> Option<&SkillRecord> {
        match self.skills.iter().position(|s| s.name == name) {
            Some(idx) => {
                self.active = Some(idx);
                info!(skill = name, "Skill activated");
                Some(&self.skills[idx])
            }
            None => {
                debug!(skill = name, "Activation of unknown skill ignored");
                None
            }
        }
    }

    /// One line per skill for the system prompt.
    pub fn summarize(&self) -> String {
        if self.skills.is_empty() {
            return "No local skills detected.".to_string();
        }

        self.skills
            .iter()
            .map(|s| {
                let desc: String = s
                    .description_or_default()
                    .replace('\n', " ")
                    .chars()
                    .take(SUMMARY_DESCRIPTION_CHARS)
                    .collect();
                format!("- **{}**: {}...", s.name, desc)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First skill (discovery order) whose name occurs in `text`,
    /// ignoring case.
    pub fn match_input(&self, text: &str) -> Option<&SkillRecord> {
        let haystack = text.to_lowercase();
        self.skills
            .iter()
            .find(|s| haystack.contains(&s.name.to_lowercase()))
    }

    pub fn get(&self, name: &str) -> Option<&SkillRecord> {
        self.skills.iter().find(|s| s.name == name)
    }

    /// The active skill, if one has been activated.
    pub fn active(&self) -> Option<&SkillRecord> {
        self.active.and_then(|idx| self.skills.get(idx))
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
