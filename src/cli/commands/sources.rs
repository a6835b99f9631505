//! Listing-only pass over the configured theaters.

use chrono::Local;
use console::style;

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::scrapers::DateWindow;
use crate::utils::{fold, format_polish_date};

use super::helpers;

pub async fn cmd_sources(config: &Config, filter: Option<&str>) -> anyhow::Result<()> {
    config.validate()?;

    let theaters: Vec<_> = match filter.map(fold) {
        Some(needle) => config
            .theaters
            .iter()
            .filter(|t| fold(&t.name).contains(&needle) || fold(&t.city).contains(&needle))
            .cloned()
            .collect(),
        None => config.theaters.clone(),
    };
    if theaters.is_empty() {
        println!("{} No theaters match", style("!").yellow());
        return Ok(());
    }

    let window = DateWindow::new(Local::now().date_naive(), config.monitor.horizon_months);
    let adapter_for = helpers::adapter_factory(config)?;
    let adapter = adapter_for(window);
    let report = Aggregator::new(adapter, &config.monitor)
        .collect_all(&theaters)
        .await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(n) => println!("{} {} ({} found)", style("✓").green(), outcome.source, n),
            Err(e) => println!("{} {}: {}", style("✗").red(), outcome.source, e),
        }
    }

    if !report.performances.is_empty() {
        println!();
    }
    for p in &report.performances {
        println!(
            "  {} {} {}  {}",
            style(format_polish_date(p.date())).bold(),
            p.starts_at.format("%H:%M"),
            p.title,
            style(format!("{} ({})", p.theater, p.city)).dim()
        );
        if let Some(url) = &p.ticket_url {
            println!("      {}", style(url).dim());
        }
    }
    Ok(())
}
