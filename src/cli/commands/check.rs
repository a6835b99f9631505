//! One-off classification of a ticket page.

use std::sync::Arc;

use chrono::Local;
use console::style;

use crate::checker::SeatChecker;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::models::{PerformanceKey, SeatStatus};

use super::helpers;

pub async fn cmd_check(config: &Config, url: &str, min_adjacent: Option<u32>) -> anyhow::Result<()> {
    let mut settings = config.monitor.clone();
    if let Some(n) = min_adjacent {
        anyhow::ensure!(n > 0, "--min-adjacent must be at least 1");
        settings.min_adjacent_seats = n;
    }

    let renderer = helpers::renderer(config);
    let checker = SeatChecker::new(renderer.clone(), &settings, Arc::new(SystemClock));
    let key = PerformanceKey::new("manual", "", url, Local::now().naive_local());
    let result = checker.check_url(key, url).await;
    renderer.close().await;

    let status = match result.status {
        SeatStatus::Available => style("AVAILABLE").green().bold(),
        SeatStatus::SoldOut => style("SOLD OUT").red().bold(),
        SeatStatus::Unknown => style("UNKNOWN").yellow().bold(),
    };
    println!("{} {}", status, url);
    if let Some(final_url) = result.final_url.as_deref().filter(|u| *u != url) {
        println!("  {:<18} {}", "Landed on:", final_url);
    }
    if let Some(n) = result.adjacent_seats {
        println!(
            "  {:<18} {} (need {})",
            "Adjacent seats:", n, settings.min_adjacent_seats
        );
    }
    if let Some(n) = result.selectable_seats {
        println!("  {:<18} {}", "Selectable seats:", n);
    }
    for detail in &result.seat_details {
        println!("  {}", detail);
    }
    if let Some(e) = &result.error {
        println!("  {:<18} {}", "Detail:", style(e).dim());
    }
    Ok(())
}
