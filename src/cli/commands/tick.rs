//! Monitoring ticks, one-shot or repeated.

use console::style;
use tracing::info;

use crate::config::Config;
use crate::pipeline::TickSummary;

use super::helpers;

/// Run one tick, or keep ticking with `daemon`.
pub async fn cmd_tick(config: &Config, daemon: bool) -> anyhow::Result<()> {
    config.validate()?;
    let (orchestrator, renderer) = helpers::orchestrator(config)?;

    if !daemon {
        let summary = orchestrator.run_tick().await?;
        print_summary(&summary);
        renderer.close().await;
        return Ok(());
    }

    let interval = config.monitor.tick_interval();
    info!("Daemon mode: one tick every {:?}", interval);
    loop {
        let summary = orchestrator.run_tick().await?;
        print_summary(&summary);

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }
    renderer.close().await;
    Ok(())
}

fn print_summary(summary: &TickSummary) {
    println!(
        "{} sources: {} ok, {} failed",
        style("→").cyan(),
        summary.sources_ok,
        summary.sources_failed
    );
    println!(
        "{} performances: {} ({} already notified)",
        style("→").cyan(),
        summary.performances,
        summary.skipped_known
    );
    println!(
        "{} checks: {} available, {} sold out, {} unknown",
        style("→").cyan(),
        style(summary.available).green(),
        summary.sold_out,
        style(summary.unknown).yellow()
    );

    if let Some(e) = &summary.notify_error {
        println!(
            "{} {} new facts not delivered, will retry: {}",
            style("✗").red(),
            summary.facts_new,
            e
        );
    } else if summary.facts_notified > 0 {
        println!(
            "{} {} new facts notified",
            style("✓").green(),
            summary.facts_notified
        );
    } else {
        println!("{} nothing new", style("✓").green());
    }

    if let Some(e) = &summary.state_error {
        println!("{} state: {}", style("!").yellow(), e);
    }
}
