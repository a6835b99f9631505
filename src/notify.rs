//! Delivery of newly observed facts.

use std::time::Duration;

use async_trait::async_trait;
use console::style;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::NotifierConfig;
use crate::error::NotifyError;
use crate::models::{FactKind, ObservedFact, Performance, SeatCheckResult};
use crate::utils::format_polish_date;

/// A fact seen for the first time, with what is needed to describe it.
#[derive(Debug, Clone)]
pub struct NewFact {
    pub fact: ObservedFact,
    pub performance: Performance,
    /// Present for `seats_available` facts.
    pub check: Option<SeatCheckResult>,
}

impl NewFact {
    pub fn subject(&self) -> String {
        let what = match self.fact.kind {
            FactKind::SeatsAvailable => "Wolne miejsca",
            FactKind::Listed => "Nowy termin",
        };
        format!(
            "{}: {} - {}, {}",
            what,
            self.performance.title,
            self.performance.theater,
            format_polish_date(self.performance.date())
        )
    }

    /// Multi-line human-readable description.
    pub fn render(&self) -> String {
        let p = &self.performance;
        let mut lines = vec![
            format!("{} ({})", p.theater, p.city),
            p.title.clone(),
            format!(
                "{}, godz. {}",
                format_polish_date(p.date()),
                p.starts_at.format("%H:%M")
            ),
        ];

        if let Some(check) = &self.check {
            match check.adjacent_seats {
                Some(n) => lines.push(format!("Sąsiednie wolne miejsca: {}", n)),
                None => lines.push("Sprzedaż otwarta (brak planu sali)".to_string()),
            }
            lines.extend(check.seat_details.iter().cloned());
        }

        let url = self
            .check
            .as_ref()
            .and_then(|c| c.final_url.clone())
            .or_else(|| p.ticket_url.clone());
        if let Some(url) = url {
            lines.push(url);
        }
        lines.join("\n")
    }
}

/// Receives each tick's new facts. An error keeps the batch uncommitted so
/// it is retried next tick.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, events: &[NewFact]) -> Result<(), NotifyError>;
}

/// Build the configured notifier.
pub fn from_config(config: &NotifierConfig) -> Result<Box<dyn Notifier>, NotifyError> {
    Ok(match config {
        NotifierConfig::Console => Box::new(ConsoleNotifier),
        NotifierConfig::Webhook { url, timeout_secs } => Box::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(*timeout_secs),
        )?),
    })
}

/// Prints events to stdout.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, events: &[NewFact]) -> Result<(), NotifyError> {
        for event in events {
            println!("{}", style(event.subject()).green().bold());
            for line in event.render().lines() {
                println!("  {}", line);
            }
            println!();
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookEvent<'a> {
    fact_key: String,
    kind: FactKind,
    theater: &'a str,
    city: &'a str,
    title: &'a str,
    starts_at: String,
    date_pl: String,
    adjacent_seats: Option<u32>,
    seat_details: &'a [String],
    ticket_url: Option<&'a str>,
    subject: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    events: Vec<WebhookEvent<'a>>,
}

/// POSTs events as JSON to a URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, url })
    }

    fn payload<'a>(events: &'a [NewFact]) -> WebhookPayload<'a> {
        WebhookPayload {
            events: events
                .iter()
                .map(|e| WebhookEvent {
                    fact_key: e.fact.state_key(),
                    kind: e.fact.kind,
                    theater: &e.performance.theater,
                    city: &e.performance.city,
                    title: &e.performance.title,
                    starts_at: e.performance.starts_at.format("%Y-%m-%dT%H:%M").to_string(),
                    date_pl: format_polish_date(e.performance.date()),
                    adjacent_seats: e.check.as_ref().and_then(|c| c.adjacent_seats),
                    seat_details: e
                        .check
                        .as_ref()
                        .map(|c| c.seat_details.as_slice())
                        .unwrap_or_default(),
                    ticket_url: e.performance.ticket_url.as_deref(),
                    subject: e.subject(),
                    text: e.render(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, events: &[NewFact]) -> Result<(), NotifyError> {
        info!("Posting {} events to webhook", events.len());
        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(events))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}
