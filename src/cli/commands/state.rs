//! Notified-facts state management commands.

use chrono::Local;
use console::style;

use crate::config::Config;
use crate::state::StateStore;

/// List notified facts.
pub fn cmd_state_show(config: &Config) -> anyhow::Result<()> {
    let store = StateStore::new(config.state_path());
    let state = store.load()?;

    println!("{}", style(format!("State: {}", store.path().display())).bold());
    println!("{}", "-".repeat(40));
    match state.last_run {
        Some(at) => println!("{:<14} {}", "Last run:", at.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
        None => println!("{:<14} {}", "Last run:", style("never").dim()),
    }
    println!("{:<14} {}", "Facts:", state.len());

    if state.is_empty() {
        return Ok(());
    }
    println!();
    for (key, fact) in &state.notified {
        println!(
            "  {} {}",
            style(fact.notified_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")).dim(),
            key
        );
    }
    Ok(())
}

/// Forget all notified facts.
pub fn cmd_state_reset(config: &Config, yes: bool) -> anyhow::Result<()> {
    let store = StateStore::new(config.state_path());
    if !yes {
        println!(
            "{} This forgets every notified fact; all current availability will be notified again.",
            style("!").yellow()
        );
        println!("  Re-run with --yes to confirm.");
        return Ok(());
    }

    store.reset()?;
    println!("{} Cleared {}", style("✓").green(), store.path().display());
    Ok(())
}

/// Drop facts about past performances.
pub fn cmd_state_prune(config: &Config) -> anyhow::Result<()> {
    let store = StateStore::new(config.state_path());
    let removed = store.prune(Local::now().date_naive())?;
    println!(
        "{} Removed {} facts about past performances",
        style("✓").green(),
        removed
    );
    Ok(())
}
