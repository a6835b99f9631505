//! End-to-end ticks against in-memory sources, pages and notifiers.
//!
//! Everything except the state file is faked; the state lives in a temp dir.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tempfile::TempDir;

use seatwatch::config::{default_theaters, Config, MonitorSettings};
use seatwatch::error::{CheckError, ConfigError, FetchError, NotifyError};
use seatwatch::models::{FactKind, Performance, TheaterSource};
use seatwatch::notify::{NewFact, Notifier};
use seatwatch::pipeline::{AdapterFactory, Clock, Orchestrator};
use seatwatch::scrapers::{DateWindow, PageRenderer, RenderedPage, SourceAdapter};
use seatwatch::state::StateStore;

const OPEN_PAGE: &str = r#"<div class="seatmap" data-row="4">
    <span class="seat" data-seat="10"></span><span class="seat" data-seat="11"></span>
    <span class="seat" data-seat="12"></span><span class="seat sold" data-seat="13"></span>
</div>"#;

const SOLD_OUT_PAGE: &str = r#"<div class="event-status sold-out">Wyprzedane</div>"#;

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

/// Serves fixed performances for the first (Warsaw) source only.
struct FakeAdapter {
    listed: Vec<Performance>,
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    async fn fetch(&self, source: &TheaterSource) -> Result<Vec<Performance>, FetchError> {
        Ok(self
            .listed
            .iter()
            .filter(|p| p.theater == source.name && p.city == source.city)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct FakeRenderer {
    pages: HashMap<String, &'static str>,
    calls: AtomicUsize,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(html) => Ok(RenderedPage {
                html: html.to_string(),
                final_url: url.to_string(),
            }),
            None => Err(CheckError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, events: &[NewFact]) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected(502));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.extend(events.iter().map(|e| e.subject()));
        Ok(())
    }
}

struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap()
    }

    fn today(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
    }
}

fn warsaw_performance(title: &str, starts_at: NaiveDateTime, url: &str) -> Performance {
    let warsaw = &default_theaters()[0];
    Performance {
        theater: warsaw.name.clone(),
        city: warsaw.city.clone(),
        title: title.to_string(),
        starts_at,
        ticket_url: Some(url.to_string()),
        raw_text: title.to_string(),
    }
}

fn config(dir: &Path) -> Config {
    Config {
        state_file: Some(dir.join("state.json").display().to_string()),
        monitor: MonitorSettings {
            retry_delay_secs: 0,
            check_retry_delay_secs: 0,
            ..MonitorSettings::default()
        },
        ..Config::default()
    }
}

struct Harness {
    orchestrator: Orchestrator,
    renderer: Arc<FakeRenderer>,
    notifier: RecordingNotifier,
}

fn harness(config: &Config, listed: Vec<Performance>, pages: &[(&str, &'static str)]) -> Harness {
    let renderer = Arc::new(FakeRenderer {
        pages: pages.iter().map(|(u, h)| (u.to_string(), *h)).collect(),
        calls: AtomicUsize::new(0),
    });
    let notifier = RecordingNotifier::default();
    let adapter: Arc<dyn SourceAdapter> = Arc::new(FakeAdapter { listed });
    let factory: AdapterFactory = Box::new(move |_window: DateWindow| adapter.clone());
    let orchestrator = Orchestrator::new(
        config,
        factory,
        renderer.clone(),
        Box::new(notifier.clone()),
        Arc::new(FixedClock),
    );
    Harness {
        orchestrator,
        renderer,
        notifier,
    }
}

fn two_performances() -> (Vec<Performance>, Vec<(&'static str, &'static str)>) {
    (
        vec![
            warsaw_performance("Halka", at(2026, 3, 1, 19), "https://bilety.example.pl/halka"),
            warsaw_performance(
                "Straszny Dwór",
                at(2026, 3, 8, 18),
                "https://bilety.example.pl/dwor",
            ),
        ],
        vec![
            ("https://bilety.example.pl/halka", OPEN_PAGE),
            ("https://bilety.example.pl/dwor", SOLD_OUT_PAGE),
        ],
    )
}

#[tokio::test]
async fn test_available_seats_notified_once() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let (listed, pages) = two_performances();
    let h = harness(&config, listed, &pages);

    let first = h.orchestrator.run_tick().await.unwrap();
    assert_eq!(first.sources_ok, 9);
    assert_eq!(first.performances, 2);
    assert_eq!(first.available, 1);
    assert_eq!(first.sold_out, 1);
    assert_eq!(first.facts_notified, 1);
    assert!(first.committed);
    {
        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Wolne miejsca: Halka"));
    }

    let second = h.orchestrator.run_tick().await.unwrap();
    assert_eq!(second.skipped_known, 1);
    assert_eq!(second.facts_new, 0);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
    // Only the sold-out performance is visited again.
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_notification_is_retried_next_tick() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let (listed, pages) = two_performances();
    let h = harness(&config, listed, &pages);

    h.notifier.failing.store(true, Ordering::SeqCst);
    let failed = h.orchestrator.run_tick().await.unwrap();
    assert_eq!(failed.facts_new, 1);
    assert_eq!(failed.facts_notified, 0);
    assert!(failed.notify_error.is_some());
    assert!(!failed.committed);
    assert!(!h.orchestrator.store().path().exists());

    h.notifier.failing.store(false, Ordering::SeqCst);
    let retried = h.orchestrator.run_tick().await.unwrap();
    assert_eq!(retried.facts_notified, 1);
    assert!(retried.committed);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);

    let state = h.orchestrator.store().load().unwrap();
    assert_eq!(state.len(), 1);
    assert!(state.last_run.is_some());
}

#[tokio::test]
async fn test_corrupt_state_is_set_aside() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = StateStore::new(config.state_path());
    std::fs::write(store.path(), "{ not json").unwrap();

    let (listed, pages) = two_performances();
    let h = harness(&config, listed, &pages);
    let summary = h.orchestrator.run_tick().await.unwrap();

    assert_eq!(summary.facts_notified, 1);
    assert!(summary.committed);
    assert!(store.corrupt_path().exists());
    assert_eq!(store.load().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreadable_state_disables_notifications() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    // A directory where the file should be cannot be read as state.
    std::fs::create_dir(config.state_path()).unwrap();

    let (listed, pages) = two_performances();
    let h = harness(&config, listed, &pages);
    let summary = h.orchestrator.run_tick().await.unwrap();

    assert!(summary.state_error.is_some());
    assert_eq!(summary.available, 1);
    assert_eq!(summary.facts_notified, 0);
    assert!(!summary.committed);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_exhausted_budget_leaves_checks_unknown() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.monitor.tick_budget_secs = 0;

    let (listed, pages) = two_performances();
    let h = harness(&config, listed, &pages);
    let summary = h.orchestrator.run_tick().await.unwrap();

    assert_eq!(summary.unknown, 2);
    assert_eq!(summary.facts_new, 0);
    assert!(summary.committed);
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_listed_facts_when_enabled() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.monitor.fact_kinds = vec![FactKind::Listed];

    let (listed, pages) = two_performances();
    let h = harness(&config, listed, &pages);
    let summary = h.orchestrator.run_tick().await.unwrap();

    assert_eq!(summary.facts_notified, 2);
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_ticket_page_is_not_notified() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let listed = vec![warsaw_performance(
        "Halka",
        at(2026, 3, 1, 19),
        "https://bilety.example.pl/gone",
    )];
    let h = harness(&config, listed, &[]);
    let summary = h.orchestrator.run_tick().await.unwrap();

    assert_eq!(summary.unknown, 1);
    assert_eq!(summary.facts_new, 0);
    // check_retries = 2
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_enabled_sources_aborts() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    for theater in &mut config.theaters {
        theater.enabled = false;
    }
    let h = harness(&config, Vec::new(), &[]);

    let err = h.orchestrator.run_tick().await.unwrap_err();
    assert!(matches!(err, ConfigError::NoSources));
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn test_summary_logged_when_tick_stops_early() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let (listed, pages) = two_performances();
    let h = harness(&config, listed, &pages);

    h.notifier.failing.store(true, Ordering::SeqCst);
    let failed = h.orchestrator.run_tick().await.unwrap();
    assert!(failed.notify_error.is_some());
    assert_eq!(logs.contents().matches("Tick finished").count(), 1);

    std::fs::create_dir(config.state_path()).unwrap();
    let unreadable = h.orchestrator.run_tick().await.unwrap();
    assert!(unreadable.state_error.is_some());
    assert_eq!(logs.contents().matches("Tick finished").count(), 2);
}
