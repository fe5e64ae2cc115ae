//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Each turn races against Ctrl-C so a slow activation or model call can
//! be abandoned without leaving the REPL.

use std::future::Future;

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use skillbot_agent::Orchestrator;
use skillbot_core::utils::get_history_path;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["q", "exit", "quit", "/exit", "/quit", ":q"];

/// Run the interactive REPL loop.
pub async fn run(mut orchestrator: Orchestrator) -> Result<()> {
    helpers::print_banner(orchestrator.backend(), &orchestrator.registry().names());

    let mut editor = create_editor()?;

    loop {
        // rustyline blocks; no turn is in flight while it waits.
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye! 👋");
            break;
        }

        let _ = editor.add_history_entry(&input);

        debug!(input = trimmed, "processing input");
        match run_turn(&mut orchestrator, trimmed, tokio::signal::ctrl_c()).await {
            Some(Ok(reply)) => helpers::print_response(&reply),
            Some(Err(e)) => eprintln!("\n❌ Error: {e:#}\n"),
            None => println!("\nInterrupted\n"),
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// One user turn: maybe activate a skill, then talk to the model.
///
/// The whole turn races `interrupt`; `None` means it was abandoned.
async fn run_turn<I: Future>(
    orchestrator: &mut Orchestrator,
    input: &str,
    interrupt: I,
) -> Option<Result<String>> {
    let turn = async {
        if let Some(skill) = orchestrator.route(input).await {
            helpers::print_activation(&skill);
        }
        helpers::print_thinking();
        orchestrator.send(input).await
    };

    let outcome = tokio::select! {
        result = turn => Some(result),
        _ = interrupt => None,
    };
    helpers::clear_thinking();
    outcome
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = get_history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = get_history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use skillbot_agent::{ConversationSession, SkillRegistry, ToolSettings};
    use skillbot_providers::ToolHandler;

    /// Replies instantly but never finishes injecting skill context.
    struct StalledInjectSession;

    #[async_trait]
    impl ConversationSession for StalledInjectSession {
        fn start_chat(&mut self, _system_prompt: &str) {}

        async fn send_message(
            &mut self,
            text: &str,
            _tools: &dyn ToolHandler,
        ) -> anyhow::Result<String> {
            Ok(format!("echo: {text}"))
        }

        async fn inject_system_message(&mut self, _text: &str, _tools: &dyn ToolHandler) {
            std::future::pending::<()>().await;
        }

        fn backend(&self) -> &str {
            "Stalled"
        }
    }

    fn orchestrator(root: &std::path::Path) -> Orchestrator {
        std::fs::create_dir_all(root.join("pdf")).unwrap();
        std::fs::write(root.join("pdf/SKILL.md"), "---\nname: pdf\n---\nbody").unwrap();
        Orchestrator::new(
            SkillRegistry::discover(root),
            Box::new(StalledInjectSession),
            ToolSettings::default(),
        )
    }

    #[tokio::test]
    async fn turn_without_activation_replies() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(dir.path());

        let outcome = run_turn(&mut orch, "hello", std::future::pending::<()>()).await;
        assert_eq!(outcome.unwrap().unwrap(), "echo: hello");
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_abandons_stalled_activation() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(dir.path());

        let interrupt = tokio::time::sleep(Duration::from_secs(5));
        let outcome = run_turn(&mut orch, "convert this pdf", interrupt).await;
        assert!(outcome.is_none());
        assert!(orch.registry().active().is_none());

        // The REPL keeps working after the interrupt.
        let outcome = run_turn(&mut orch, "hello", std::future::pending::<()>()).await;
        assert_eq!(outcome.unwrap().unwrap(), "echo: hello");
    }

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("q"));
        assert!(is_exit_command("Q"));
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("/quit"));
        assert!(is_exit_command(":q"));
        assert!(!is_exit_command("hello"));
        assert!(!is_exit_command("quit now"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn history_path_under_data_dir() {
        let path = get_history_path();
        assert!(path.to_string_lossy().contains(".skillbot"));
        assert!(path.ends_with("history/cli_history"));
    }
}
