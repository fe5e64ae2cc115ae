//! Skillbot CLI: entry point.
//!
//! # Commands
//!
//! - `skillbot agent [-m MESSAGE] [--skills DIR] [--logs]`: chat (single-shot or REPL)
//! - `skillbot skills [--skills DIR]`: list discovered skills
//! - `skillbot status`: show configuration and provider status
//! - `skillbot init`: write the default config and create the skills directory

mod helpers;
mod init;
mod repl;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use skillbot_agent::{Orchestrator, SkillRegistry};
use skillbot_core::config::{load_config, Config};
use skillbot_core::utils::expand_home;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🧩 Skillbot: skill-driven AI assistant in Rust
#[derive(Parser)]
#[command(name = "skillbot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the AI agent (single-shot or interactive REPL)
    Agent {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Skills directory (overrides agent.skillsDir)
        #[arg(long)]
        skills: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// List the skills found in the skills directory
    Skills {
        /// Skills directory (overrides agent.skillsDir)
        #[arg(long)]
        skills: Option<PathBuf>,
    },

    /// Show configuration and provider status
    Status,

    /// Write the default config and create the skills directory
    Init,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Agent {
            message,
            skills,
            logs,
        } => {
            init_logging(logs);
            run_agent(message, load(skills.as_deref())).await
        }
        Commands::Skills { skills } => {
            init_logging(false);
            list_skills(&load(skills.as_deref()))
        }
        Commands::Status => {
            init_logging(false);
            status::run()
        }
        Commands::Init => {
            init_logging(false);
            init::run()
        }
    }
}

/// Load the config, applying a `--skills` override.
fn load(skills: Option<&std::path::Path>) -> Config {
    let mut config = load_config(None);
    if let Some(dir) = skills {
        config.agent.skills_dir = dir.display().to_string();
    }
    config
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

async fn run_agent(message: Option<String>, config: Config) -> Result<()> {
    let mut orchestrator =
        Orchestrator::from_config(&config).context("failed to start the agent")?;

    match message {
        Some(msg) => {
            // Single-shot mode
            info!(backend = orchestrator.backend(), "processing single message");
            let turn = orchestrator
                .handle(&msg)
                .await
                .context("agent processing failed")?;
            if let Some(skill) = &turn.activated {
                helpers::print_activation(skill);
            }
            helpers::print_response(&turn.reply);
        }
        None => {
            repl::run(orchestrator).await?;
        }
    }

    Ok(())
}

fn list_skills(config: &Config) -> Result<()> {
    let root = expand_home(&config.agent.skills_dir);
    let registry = SkillRegistry::discover(&root);

    println!();
    println!(
        "{} {}",
        "🧩 Skills in".cyan().bold(),
        helpers::display_path(&root)
    );
    println!();
    println!("{}", registry.summarize());
    println!();

    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("skillbot=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_agent_flags() {
        let cli = Cli::parse_from(["skillbot", "agent", "-m", "hi", "--skills", "/tmp/s", "--logs"]);
        match cli.command {
            Commands::Agent {
                message,
                skills,
                logs,
            } => {
                assert_eq!(message.as_deref(), Some("hi"));
                assert_eq!(skills, Some(PathBuf::from("/tmp/s")));
                assert!(logs);
            }
            _ => panic!("expected agent command"),
        }
    }

    #[test]
    fn parse_skills_without_override() {
        let cli = Cli::parse_from(["skillbot", "skills"]);
        assert!(matches!(cli.command, Commands::Skills { skills: None }));
    }

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["skillbot", "init"]);
        assert!(matches!(cli.command, Commands::Init));
    }

    #[test]
    fn skills_override_applies() {
        let config = load(Some(std::path::Path::new("/srv/skills")));
        assert_eq!(config.agent.skills_dir, "/srv/skills");
    }
}
