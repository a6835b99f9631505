//! Concurrent collection of performances from every enabled source.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::MonitorSettings;
use crate::error::FetchError;
use crate::models::{Performance, TheaterSource};
use crate::scrapers::SourceAdapter;

/// What happened to one source during a collection pass.
#[derive(Debug)]
pub struct SourceOutcome {
    /// Theater identity, "name (city)".
    pub source: String,
    pub attempts: u32,
    /// Number of performances found, or the final error.
    pub result: Result<usize, FetchError>,
}

/// Result of one collection pass, outcomes in source order.
#[derive(Debug, Default)]
pub struct AggregateReport {
    pub outcomes: Vec<SourceOutcome>,
    pub performances: Vec<Performance>,
}

impl AggregateReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Runs the source adapter over all sources with bounded concurrency,
/// per-call timeouts and fixed-delay retries.
pub struct Aggregator {
    adapter: Arc<dyn SourceAdapter>,
    concurrency: usize,
    attempts: u32,
    retry_delay: Duration,
    source_timeout: Duration,
}

impl Aggregator {
    pub fn new(adapter: Arc<dyn SourceAdapter>, settings: &MonitorSettings) -> Self {
        Self {
            adapter,
            concurrency: settings.source_concurrency.max(1),
            attempts: settings.max_retries.max(1),
            retry_delay: settings.retry_delay(),
            source_timeout: settings.source_timeout(),
        }
    }

    /// Fetch every enabled source. A failing source never aborts the others.
    pub async fn collect_all(&self, sources: &[TheaterSource]) -> AggregateReport {
        let results: Vec<(String, u32, Result<Vec<Performance>, FetchError>)> =
            stream::iter(sources.iter().filter(|s| s.enabled).map(|source| async move {
                let (attempts, result) = self.fetch_with_retries(source).await;
                (source.identity(), attempts, result)
            }))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = AggregateReport::default();
        let mut seen = HashSet::new();
        for (source, attempts, result) in results {
            let result = match result {
                Ok(found) => {
                    info!("{}: {} performances", source, found.len());
                    let count = found.len();
                    report
                        .performances
                        .extend(found.into_iter().filter(|p| seen.insert(p.key())));
                    Ok(count)
                }
                Err(e) => {
                    warn!("{}: giving up after {} attempts: {}", source, attempts, e);
                    Err(e)
                }
            };
            report.outcomes.push(SourceOutcome {
                source,
                attempts,
                result,
            });
        }
        report
    }

    async fn fetch_with_retries(
        &self,
        source: &TheaterSource,
    ) -> (u32, Result<Vec<Performance>, FetchError>) {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.source_timeout, self.adapter.fetch(source))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: source.repertoire_url.clone(),
                    timeout: self.source_timeout,
                }),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    warn!(
                        "{}: attempt {}/{} failed: {}; retrying in {:?}",
                        source.identity(),
                        attempt,
                        self.attempts,
                        e,
                        self.retry_delay
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                other => return (attempt, other),
            }
        }
    }
}
