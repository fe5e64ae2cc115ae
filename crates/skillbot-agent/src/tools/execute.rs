//! `execute_script`: run a script bundled with the active skill.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use super::dispatcher::ToolSettings;
use crate::skills::SkillRecord;

/// Interpreter for a script, chosen by extension. `None` runs it directly.
fn interpreter<'a>(settings: &'a ToolSettings, script: &Path) -> Option<&'a str> {
    let ext = script.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "py" => Some(settings.python.as_str()),
        "sh" | "bash" => Some("bash"),
        "js" => Some("node"),
        _ => None,
    }
}

/// Run `script_name` from `skill`'s `scripts/` directory.
///
/// Only the base name of `script_name` is used. Every failure comes back as
/// text.
pub async fn run_script(
    settings: &ToolSettings,
    skill: Option<&SkillRecord>,
    script_name: &str,
    arguments: &str,
) -> String {
    let Some(skill) = skill else {
        return "Error: No skill active.".to_string();
    };

    let clean_name = Path::new(script_name.trim())
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| script_name.trim().to_string());
    let script_path = skill.scripts_dir().join(&clean_name);

    if clean_name.is_empty() || !script_path.is_file() {
        return format!(
            "Error: Script '{clean_name}' not found. If you want to read a file, use the 'read_file' tool instead."
        );
    }

    let args = match shell_words::split(arguments) {
        Ok(args) => args,
        Err(e) => return format!("Error: Invalid script arguments: {e}"),
    };

    info!(skill = %skill.name, script = %clean_name, args = %arguments, "Executing script");

    let mut command = match interpreter(settings, &script_path) {
        Some(program) => {
            let mut c = Command::new(program);
            c.arg(&script_path);
            c
        }
        None => Command::new(&script_path),
    };

    let child = command
        .args(&args)
        .current_dir(&settings.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(c) => c,
        Err(e) => {
            warn!(script = %clean_name, error = %e, "Failed to launch script");
            return format!("Error: Failed to launch script: {e}");
        }
    };

    // Dropping the child on timeout kills it.
    match tokio::time::timeout(settings.exec_timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);

            let mut result = format!("STDOUT:\n{stdout}");
            if !stderr.is_empty() {
                result.push_str(&format!("\nSTDERR:\n{stderr}"));
            }
            result
        }
        Ok(Err(e)) => format!("Error: Script failed: {e}"),
        Err(_) => {
            warn!(script = %clean_name, "Script timed out");
            format!(
                "Error: Script timed out after {} seconds",
                settings.exec_timeout.as_secs()
            )
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
