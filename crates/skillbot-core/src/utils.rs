//! Utility helpers: path resolution and string truncation.

use std::path::PathBuf;

/// Marker appended when file content is cut to the read cap.
pub const TRUNCATION_MARKER: &str = "\n...[TRUNCATED]";

/// Reply used when a tool loop stops without the model producing text.
pub const NO_RESPONSE_FALLBACK: &str = "I've completed processing but have no response to give.";

/// Get the Skillbot data directory (e.g. `~/.skillbot/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next().unwrap_or_else(|| PathBuf::from("."));
    home.join(".skillbot")
}

/// Get the REPL history file (e.g. `~/.skillbot/history/cli_history`).
pub fn get_history_path() -> PathBuf {
    get_data_path().join("history").join("cli_history")
}

/// Keep the first `max_chars` characters and append [`TRUNCATION_MARKER`]
/// when anything was cut.
pub fn truncate_with_marker(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], TRUNCATION_MARKER),
        None => s.to_string(),
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs_next().unwrap_or_else(|| PathBuf::from("."));
    }
    match path.strip_prefix("~/") {
        Some(rest) => dirs_next().unwrap_or_else(|| PathBuf::from(".")).join(rest),
        None => PathBuf::from(path),
    }
}

/// Helper to get home directory.
fn dirs_next() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}
