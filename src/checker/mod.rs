//! Seat availability checks for individual performances.

mod classify;
mod seat_map;

pub use classify::{classify, visible_text, Classification};
pub use seat_map::{Seat, SeatMap, SeatRun};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::MonitorSettings;
use crate::error::CheckError;
use crate::models::{Performance, PerformanceKey, SeatCheckResult};
use crate::scrapers::{PageRenderer, RenderedPage};

/// Renders ticket pages and turns them into availability verdicts.
pub struct SeatChecker {
    renderer: Arc<dyn PageRenderer>,
    min_adjacent: u32,
    trust_weak_signals: bool,
    attempts: u32,
    retry_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl SeatChecker {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        settings: &MonitorSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            renderer,
            min_adjacent: settings.min_adjacent_seats,
            trust_weak_signals: settings.trust_weak_signals,
            attempts: settings.check_retries.max(1),
            retry_delay: settings.check_retry_delay(),
            clock,
        }
    }

    /// Check one performance. Never fails: errors become `Unknown` results.
    pub async fn check(&self, performance: &Performance) -> SeatCheckResult {
        let key = performance.key();
        match performance.ticket_url.as_deref() {
            Some(url) => self.check_url(key, url).await,
            None => SeatCheckResult::unknown(
                key,
                self.clock.now(),
                Some(CheckError::NoTicketUrl.to_string()),
            ),
        }
    }

    /// Check an arbitrary ticket page under the given identity.
    pub async fn check_url(&self, key: PerformanceKey, url: &str) -> SeatCheckResult {
        match self.render_with_retries(url).await {
            Ok(page) => {
                let verdict = classify(&page.html);
                debug!("{} classified as {:?}", url, verdict);
                let mut result = self.interpret(key, verdict);
                result.final_url = Some(page.final_url);
                result
            }
            Err(e) => {
                warn!("Check of {} failed: {}", url, e);
                SeatCheckResult::unknown(key, self.clock.now(), Some(e.to_string()))
            }
        }
    }

    async fn render_with_retries(&self, url: &str) -> Result<RenderedPage, CheckError> {
        let mut attempt = 1;
        loop {
            match self.renderer.render(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.attempts => {
                    debug!(
                        "Render of {} failed (attempt {}/{}): {}",
                        url, attempt, self.attempts, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Map a page verdict onto a result for this performance.
    pub fn interpret(&self, key: PerformanceKey, verdict: Classification) -> SeatCheckResult {
        let now = self.clock.now();
        match verdict {
            Classification::SoldOut { reason } => {
                debug!("{}: sold out ({})", key, reason);
                SeatCheckResult::sold_out(key, now)
            }
            Classification::SeatMap {
                longest_run,
                selectable,
                details,
            } => {
                let mut result = if longest_run >= self.min_adjacent {
                    SeatCheckResult::available(key, now, Some(longest_run))
                } else {
                    SeatCheckResult {
                        adjacent_seats: Some(longest_run),
                        ..SeatCheckResult::sold_out(key, now)
                    }
                };
                result.selectable_seats = Some(selectable);
                result.seat_details = details;
                result
            }
            Classification::BuyButton if self.trust_weak_signals => {
                SeatCheckResult::available(key, now, None)
            }
            Classification::BuyButton => SeatCheckResult::unknown(
                key,
                now,
                Some("buy button found but no readable seat map".to_string()),
            ),
            Classification::DisabledBuyButton => SeatCheckResult::sold_out(key, now),
            Classification::Unrecognized => SeatCheckResult::unknown(
                key,
                now,
                Some("no seat map or availability indicator found".to_string()),
            ),
        }
    }
}
