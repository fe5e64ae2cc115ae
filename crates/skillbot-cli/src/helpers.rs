//! Shared CLI helpers: path display, response printing, banner.

use std::path::Path;

use colored::Colorize;

/// Render `path` with the home directory shown as `~`.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs_next::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

/// Print an agent response to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "🧩 Skillbot".cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Announce that a skill was activated for this conversation.
pub fn print_activation(skill: &str) {
    println!("{} {}", "⚡ Activated skill:".yellow().bold(), skill);
}

/// Print the banner shown at REPL start.
pub fn print_banner(backend: &str, skills: &[&str]) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}  {}",
        "🧩 Skillbot".cyan().bold(),
        version.dimmed(),
        format!("[{backend}]").dimmed()
    );
    if skills.is_empty() {
        println!("{}", "No local skills detected.".dimmed());
    } else {
        println!("{} {}", "Skills:".bold(), skills.join(", "));
    }
    println!(
        "{}",
        "Type a message, or \"exit\" to quit. Ctrl-C interrupts a running turn.".dimmed()
    );
    println!();
}

/// Print a "thinking" spinner placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
