//! Wiring shared by CLI commands.

use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::notify;
use crate::pipeline::{AdapterFactory, Orchestrator, SystemClock};
use crate::scrapers::{
    resolve_user_agent, BrowserRenderer, DateWindow, HttpClient, RepertoireAdapter, SourceAdapter,
    TitleMatcher,
};

/// Factory producing a repertoire adapter for each tick's date window.
pub fn adapter_factory(config: &Config) -> anyhow::Result<AdapterFactory> {
    let client = HttpClient::new(
        config.monitor.request_timeout(),
        config.user_agent.as_deref(),
    )
    .context("Failed to build HTTP client")?;
    let titles = TitleMatcher::new(&config.target_titles);
    let skip_listed_sold_out = config.monitor.skip_listed_sold_out;

    let factory: AdapterFactory = Box::new(move |window: DateWindow| {
        Arc::new(RepertoireAdapter::new(
            client.clone(),
            titles.clone(),
            window,
            skip_listed_sold_out,
        )) as Arc<dyn SourceAdapter>
    });
    Ok(factory)
}

pub fn renderer(config: &Config) -> Arc<BrowserRenderer> {
    Arc::new(BrowserRenderer::new(
        config.browser.clone(),
        resolve_user_agent(config.user_agent.as_deref()),
    ))
}

/// Orchestrator backed by the real network, browser and notifier.
pub fn orchestrator(config: &Config) -> anyhow::Result<(Orchestrator, Arc<BrowserRenderer>)> {
    let renderer = renderer(config);
    let notifier =
        notify::from_config(&config.notifier).context("Failed to set up notifier")?;
    let orchestrator = Orchestrator::new(
        config,
        adapter_factory(config)?,
        renderer.clone(),
        notifier,
        Arc::new(SystemClock),
    );
    Ok((orchestrator, renderer))
}
