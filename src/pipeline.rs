//! One monitoring tick: collect, check, diff, notify, commit.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::aggregator::Aggregator;
use crate::checker::SeatChecker;
pub use crate::clock::{Clock, SystemClock};
use crate::config::{Config, MonitorSettings};
use crate::error::{CheckError, ConfigError};
use crate::models::{
    FactKind, ObservedFact, Performance, PerformanceKey, SeatCheckResult, SeatStatus,
    TheaterSource,
};
use crate::notify::{NewFact, Notifier};
use crate::scrapers::{DateWindow, PageRenderer, SourceAdapter};
use crate::state::StateStore;

/// Builds the tick's source adapter for the tick's date window.
pub type AdapterFactory = Box<dyn Fn(DateWindow) -> Arc<dyn SourceAdapter> + Send + Sync>;

/// Counts reported after a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub performances: usize,
    pub available: usize,
    pub sold_out: usize,
    pub unknown: usize,
    /// Checks not run because the performance was already notified.
    pub skipped_known: usize,
    pub facts_new: usize,
    pub facts_notified: usize,
    pub notify_error: Option<String>,
    pub state_error: Option<String>,
    pub committed: bool,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sources {} ok / {} failed, {} performances, checks: {} available, {} sold out, {} unknown, \
             {} new facts, {} notified",
            self.sources_ok,
            self.sources_failed,
            self.performances,
            self.available,
            self.sold_out,
            self.unknown,
            self.facts_new,
            self.facts_notified
        )
    }
}

/// Sequences the stages of a tick. Owns the clock (lent to the checker) and
/// the only handle to the persisted state.
pub struct Orchestrator {
    theaters: Vec<TheaterSource>,
    settings: MonitorSettings,
    has_titles: bool,
    adapter_for: AdapterFactory,
    checker: SeatChecker,
    store: StateStore,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        adapter_for: AdapterFactory,
        renderer: Arc<dyn PageRenderer>,
        notifier: Box<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            theaters: config.theaters.clone(),
            settings: config.monitor.clone(),
            has_titles: config.target_titles.iter().any(|t| !t.trim().is_empty()),
            adapter_for,
            checker: SeatChecker::new(renderer, &config.monitor, clock.clone()),
            store: StateStore::new(config.state_path()),
            notifier,
            clock,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one tick. Per-source and per-check failures end up in the
    /// summary; only configuration problems abort.
    pub async fn run_tick(&self) -> Result<TickSummary, ConfigError> {
        if !self.theaters.iter().any(|t| t.enabled) {
            return Err(ConfigError::NoSources);
        }
        if !self.has_titles {
            return Err(ConfigError::NoTitles);
        }

        let started = Instant::now();
        let deadline = started + self.settings.tick_budget();
        let now = self.clock.now();
        let today = self.clock.today();
        let mut summary = TickSummary::default();

        let mut state = match self.store.load() {
            Ok(state) => Some(state),
            Err(e) => {
                error!("Cannot read state, notifications disabled this tick: {}", e);
                summary.state_error = Some(e.to_string());
                None
            }
        };
        if self.settings.prune_past_facts {
            if let Some(state) = state.as_mut() {
                let pruned = state.prune_before(today);
                if pruned > 0 {
                    info!("Pruned {} facts about past performances", pruned);
                }
            }
        }

        // Collect
        let window = DateWindow::new(today, self.settings.horizon_months);
        let aggregator = Aggregator::new((self.adapter_for)(window), &self.settings);
        let report = aggregator.collect_all(&self.theaters).await;
        summary.sources_ok = report.succeeded();
        summary.sources_failed = report.failed();
        summary.performances = report.performances.len();
        let performances = report.performances;

        // Check
        let checks = if self.settings.fact_enabled(FactKind::SeatsAvailable) {
            // Seats already reported need no browser visit.
            let to_check: Vec<&Performance> = performances
                .iter()
                .filter(|p| {
                    let fact = ObservedFact::new(p.key(), FactKind::SeatsAvailable);
                    !state.as_ref().is_some_and(|s| s.is_notified(&fact))
                })
                .collect();
            summary.skipped_known = performances.len() - to_check.len();
            self.check_all(to_check, deadline).await
        } else {
            Vec::new()
        };
        for check in &checks {
            match check.status {
                SeatStatus::Available => summary.available += 1,
                SeatStatus::SoldOut => summary.sold_out += 1,
                SeatStatus::Unknown => summary.unknown += 1,
            }
        }

        let Some(mut state) = state else {
            return Ok(Self::finish(summary, started));
        };

        // Diff
        let observations = self.observe(&performances, &checks);
        let new_facts: Vec<ObservedFact> = state.diff(&observations).into_iter().cloned().collect();
        summary.facts_new = new_facts.len();

        // Notify
        if !new_facts.is_empty() {
            let events = self.describe(&new_facts, &performances, &checks);
            if let Err(e) = self.notifier.notify(&events).await {
                warn!("Notification failed, {} facts stay pending: {}", new_facts.len(), e);
                summary.notify_error = Some(e.to_string());
                return Ok(Self::finish(summary, started));
            }
            summary.facts_notified = new_facts.len();
        }

        // Commit
        state.record(&new_facts, now);
        state.last_run = Some(now);
        match self.store.commit(&state) {
            Ok(()) => summary.committed = true,
            Err(e) => {
                error!("Failed to save state: {}", e);
                summary.state_error = Some(e.to_string());
            }
        }

        Ok(Self::finish(summary, started))
    }

    fn finish(summary: TickSummary, started: Instant) -> TickSummary {
        info!("Tick finished in {:?}: {}", started.elapsed(), summary);
        summary
    }

    async fn check_all(
        &self,
        performances: Vec<&Performance>,
        deadline: Instant,
    ) -> Vec<SeatCheckResult> {
        stream::iter(performances.into_iter().map(|performance| async move {
            if Instant::now() >= deadline {
                return SeatCheckResult::unknown(
                    performance.key(),
                    self.clock.now(),
                    Some(CheckError::BudgetExhausted.to_string()),
                );
            }
            self.checker.check(performance).await
        }))
        .buffered(self.settings.check_concurrency.max(1))
        .collect()
        .await
    }

    /// Facts this tick's observations support, for the enabled kinds.
    fn observe(
        &self,
        performances: &[Performance],
        checks: &[SeatCheckResult],
    ) -> Vec<ObservedFact> {
        let mut facts = BTreeSet::new();
        if self.settings.fact_enabled(FactKind::Listed) {
            facts.extend(
                performances
                    .iter()
                    .map(|p| ObservedFact::new(p.key(), FactKind::Listed)),
            );
        }
        if self.settings.fact_enabled(FactKind::SeatsAvailable) {
            facts.extend(
                checks
                    .iter()
                    .filter(|c| self.qualifies(c))
                    .map(|c| ObservedFact::new(c.key.clone(), FactKind::SeatsAvailable)),
            );
        }
        facts.into_iter().collect()
    }

    fn qualifies(&self, check: &SeatCheckResult) -> bool {
        check.qualifies(
            self.settings.min_adjacent_seats,
            self.settings.trust_weak_signals,
        )
    }

    fn describe(
        &self,
        facts: &[ObservedFact],
        performances: &[Performance],
        checks: &[SeatCheckResult],
    ) -> Vec<NewFact> {
        let by_key: HashMap<PerformanceKey, &Performance> =
            performances.iter().map(|p| (p.key(), p)).collect();
        let checks: HashMap<&PerformanceKey, &SeatCheckResult> =
            checks.iter().map(|c| (&c.key, c)).collect();

        facts
            .iter()
            .filter_map(|fact| {
                let performance = by_key.get(&fact.key)?;
                Some(NewFact {
                    fact: fact.clone(),
                    performance: (*performance).clone(),
                    check: match fact.kind {
                        FactKind::SeatsAvailable => checks.get(&fact.key).map(|c| (*c).clone()),
                        FactKind::Listed => None,
                    },
                })
            })
            .collect()
    }
}
