//! `skillbot init`: write the default config and create the skills directory.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use skillbot_core::config::{get_config_path, save_config, Config};
use skillbot_core::utils::expand_home;

use crate::helpers::display_path;

/// Run the init command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "🧩 Skillbot Setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    let config = init_config(&config_path)?;
    let skills_root = expand_home(&config.agent.skills_dir);
    std::fs::create_dir_all(&skills_root)
        .with_context(|| format!("failed to create {}", skills_root.display()))?;
    println!("  {} skills dir at {}", "✓".green(), display_path(&skills_root));

    println!();
    println!(
        "  Set {} (or {}) and run {}",
        "GOOGLE_API_KEY".bold(),
        "DEEPSEEK_API_KEY".bold(),
        "skillbot agent".cyan()
    );
    println!();

    Ok(())
}

/// Write a default config at `path` unless one exists; return the config in effect.
///
/// Env overrides are not applied, so no API key from the environment ends up
/// on disk.
fn init_config(path: &Path) -> Result<Config> {
    if path.exists() {
        println!("  {} config already exists at {}", "✓".green(), display_path(path));
        return Ok(skillbot_core::config::load_config(Some(path)));
    }

    let config = Config::default();
    save_config(&config, Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("  {} created config at {}", "✓".green(), display_path(path));
    Ok(config)
}
