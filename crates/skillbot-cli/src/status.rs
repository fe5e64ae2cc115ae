//! `skillbot status`: show configuration, provider and skill status.

use anyhow::Result;
use colored::Colorize;

use skillbot_agent::SkillRegistry;
use skillbot_core::config::{get_config_path, load_config};
use skillbot_core::utils::expand_home;
use skillbot_providers::{find_by_name, PROVIDERS};

use crate::helpers::display_path;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "🧩 Skillbot Status".cyan().bold());
    println!();

    // Config
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        display_path(&config_path),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, run `skillbot init`)".dimmed().to_string()
        }
    );

    // Active provider
    let provider = match find_by_name(&config.agent.provider) {
        Some(spec) => {
            let model = config
                .providers
                .get_by_name(spec.name)
                .and_then(|p| p.model.clone())
                .unwrap_or_else(|| spec.default_model.to_string());
            format!("{} ({model})", spec.display_name)
        }
        None => format!("{} {}", config.agent.provider, "(unknown)".red()),
    };
    println!("  {:<18} {}", "Provider:".bold(), provider);

    println!(
        "  {:<18} {} | max_tokens: {} | max_iterations: {}",
        "Parameters:".bold(),
        format!("temp: {}", config.agent.temperature).dimmed(),
        format!("{}", config.agent.max_tokens).dimmed(),
        format!("{}", config.agent.max_tool_iterations).dimmed(),
    );

    // API keys
    println!();
    println!("  {}", "API keys:".bold());
    for spec in PROVIDERS {
        let status = match config.providers.get_by_name(spec.name) {
            Some(p) if p.is_configured() => format!("{} (key set)", "✓".green()),
            _ => format!("{} {}", "· not configured".dimmed(), spec.env_key.dimmed()),
        };
        println!("    {:<20} {}", spec.display_name, status);
    }

    // Skills
    println!();
    let skills_root = expand_home(&config.agent.skills_dir);
    let registry = SkillRegistry::discover(&skills_root);
    let skills_status = if skills_root.is_dir() {
        format!("{} skill(s)", registry.len())
    } else {
        "(not found)".red().to_string()
    };
    println!(
        "  {:<18} {} {}",
        "Skills:".bold(),
        display_path(&skills_root),
        skills_status
    );
    if !registry.is_empty() {
        println!("    {}", registry.names().join(", ").dimmed());
    }

    println!();

    Ok(())
}
