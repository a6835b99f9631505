//! Repertoire scraping: fetch a theater's listing page and turn it into
//! normalized performances.

pub mod browser;
pub mod dates;
pub mod extract;
mod http_client;
pub mod markers;
pub mod titles;

pub use browser::{BrowserEngineConfig, BrowserRenderer, PageRenderer, RenderedPage};
pub use dates::DateWindow;
pub use extract::{ExtractContext, ExtractionStrategy, ListingRow};
pub use http_client::{resolve_user_agent, HttpClient, USER_AGENT};
pub use titles::TitleMatcher;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use scraper::Html;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::models::{Performance, TheaterSource};
use dates::parse_listing_datetime;
use markers::has_sold_out_marker;

/// Produces the performances a theater currently lists.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, source: &TheaterSource) -> Result<Vec<Performance>, FetchError>;
}

/// Adapter for HTML repertoire pages. The source's variant selects how rows
/// are located; everything after that is shared.
pub struct RepertoireAdapter {
    client: HttpClient,
    titles: TitleMatcher,
    window: DateWindow,
    skip_listed_sold_out: bool,
}

impl RepertoireAdapter {
    pub fn new(
        client: HttpClient,
        titles: TitleMatcher,
        window: DateWindow,
        skip_listed_sold_out: bool,
    ) -> Self {
        Self {
            client,
            titles,
            window,
            skip_listed_sold_out,
        }
    }

    /// Parse a fetched repertoire page.
    pub fn parse_listing(&self, source: &TheaterSource, html: &str) -> Vec<Performance> {
        let document = Html::parse_document(html);
        let ctx = ExtractContext {
            source,
            titles: &self.titles,
            today: self.window.today,
        };
        let rows = extract::strategy_for(source.variant).extract(&document, &ctx);

        let mut seen = HashSet::new();
        let mut performances = Vec::new();
        for row in rows {
            let Some(title) = self.titles.find(&row.text) else {
                continue;
            };
            let Some(starts_at) = self.row_datetime(&row) else {
                debug!("{}: dropping row with unparseable date: {}", source.name, row.text);
                continue;
            };
            if !self.window.contains(starts_at.date()) {
                debug!("{}: {} on {} outside horizon", source.name, title, starts_at);
                continue;
            }
            if self.skip_listed_sold_out && has_sold_out_marker(&row.text) {
                debug!("{}: {} on {} listed as sold out", source.name, title, starts_at);
                continue;
            }

            let performance = Performance {
                theater: source.name.clone(),
                city: source.city.clone(),
                title: title.to_string(),
                starts_at,
                ticket_url: resolve_ticket_url(source, row.ticket_href.as_deref()),
                raw_text: row.text,
            };
            if seen.insert(performance.key()) {
                performances.push(performance);
            }
        }
        performances
    }

    fn row_datetime(&self, row: &ListingRow) -> Option<NaiveDateTime> {
        let today = self.window.today;
        let parsed = row
            .date_sources
            .iter()
            .find_map(|s| parse_listing_datetime(s, today))?;

        // Date elements often omit the time that the row prints elsewhere.
        if parsed.time() == NaiveTime::MIN {
            if let Some(full) = parse_listing_datetime(&row.text, today) {
                if full.date() == parsed.date() {
                    return Some(full);
                }
            }
        }
        Some(parsed)
    }
}

#[async_trait]
impl SourceAdapter for RepertoireAdapter {
    async fn fetch(&self, source: &TheaterSource) -> Result<Vec<Performance>, FetchError> {
        let html = self.client.get_text(&source.repertoire_url).await?;
        let performances = self.parse_listing(source, &html);
        debug!(
            "{}: {} matching performances on {}",
            source.identity(),
            performances.len(),
            source.repertoire_url
        );
        Ok(performances)
    }
}

/// Absolute ticket URL for a row, falling back to the source's tickets page.
fn resolve_ticket_url(source: &TheaterSource, href: Option<&str>) -> Option<String> {
    let resolved = href.and_then(|href| {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        Url::parse(&source.repertoire_url)
            .or_else(|_| Url::parse(&source.base_url))
            .ok()?
            .join(href)
            .ok()
            .map(|u| u.to_string())
    });
    resolved.or_else(|| source.tickets_url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_theaters;
    use crate::models::AdapterVariant;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn adapter(today: NaiveDate) -> RepertoireAdapter {
        RepertoireAdapter::new(
            HttpClient::new(Duration::from_secs(5), None).unwrap(),
            TitleMatcher::new(["Halka", "Straszny Dwór"]),
            DateWindow::new(today, 6),
            true,
        )
    }

    fn source(variant: AdapterVariant) -> TheaterSource {
        default_theaters()
            .into_iter()
            .find(|t| t.variant == variant)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_generic_listing_with_polish_month_names() {
        let html = r#"
            <div class="repertuar">
                <div class="event">
                    <h3>Straszny Dwór</h3>
                    <p>31 grudnia 2025 środa godz. 19:00</p>
                    <a href="/bilety/straszny-dwor">Kup bilet</a>
                </div>
                <div class="event">
                    <h3>Cyganeria</h3>
                    <p>2 stycznia 2026 piątek godz. 19:00</p>
                </div>
            </div>"#;
        let today = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let mut baltic = source(AdapterVariant::Generic);
        baltic.repertoire_url = "https://operabaltycka.pl/repertuar".to_string();

        let found = adapter(today).parse_listing(&baltic, html);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Straszny Dwór");
        assert_eq!(found[0].starts_at, at(2025, 12, 31, 19, 0));
        assert_eq!(
            found[0].ticket_url.as_deref(),
            Some("https://operabaltycka.pl/bilety/straszny-dwor")
        );
    }

    #[test]
    fn test_date_element_combined_with_row_time() {
        let html = r#"<ul><li class="item">
                <span class="title">HALKA - premiera</span>
                <span class="date">15.06.2026</span><span class="hour">18:00</span>
            </li></ul>"#;
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let found = adapter(today).parse_listing(&source(AdapterVariant::Generic), html);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Halka");
        assert_eq!(found[0].starts_at, at(2026, 6, 15, 18, 0));
    }

    #[test]
    fn test_horizon_and_unparseable_rows_dropped() {
        let html = r#"
            <article>Halka 2026-01-09 19:00</article>
            <article>Halka 2026-07-11 19:00</article>
            <article>Halka wkrótce</article>
            <article>Halka 2026-02-01 19:00</article>"#;
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let found = adapter(today).parse_listing(&source(AdapterVariant::Generic), html);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].starts_at, at(2026, 2, 1, 19, 0));
    }

    #[test]
    fn test_teatr_wielki_day_wrapper_does_not_lend_titles() {
        let html = r#"<ul><li class="day">
            <span>czwartek 7 maja</span>
            <a href="/kalendarium/2025-2026/halka/termin/2026-05-07_12-00/">Halka</a>
            <a href="/kalendarium/2025-2026/carmen/termin/2026-05-07_19-00/">Carmen</a>
        </li></ul>"#;
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let found = adapter(today).parse_listing(&source(AdapterVariant::TeatrWielki), html);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Halka");
        assert_eq!(found[0].starts_at, at(2026, 5, 7, 12, 0));
    }

    #[test]
    fn test_teatr_wielki_skips_listed_sold_out_and_duplicates() {
        let html = r#"<ul>
            <li><a href="/kalendarium/2025-2026/halka/termin/2026-05-07_19-00/">Halka</a></li>
            <li><a href="/kalendarium/2025-2026/halka/termin/2026-05-07_19-00/">HALKA</a></li>
            <li><a href="/kalendarium/2025-2026/halka/termin/2026-05-09_18-00/">Halka</a> wyprzedane</li>
        </ul>"#;
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let warsaw = source(AdapterVariant::TeatrWielki);
        let found = adapter(today).parse_listing(&warsaw, html);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].starts_at, at(2026, 5, 7, 19, 0));
        assert!(found[0]
            .ticket_url
            .as_deref()
            .unwrap()
            .ends_with("/kalendarium/2025-2026/halka/termin/2026-05-07_19-00/"));
    }

    #[test]
    fn test_opera_wroclaw_rows() {
        let html = r#"
            <div class="rep-single"><span>7 maja, Cz 19:00 20260507</span><h3>Halka</h3></div>
            <div class="rep-single"><span>8 maja, Pt 19:00 20260508</span><h3>Carmen</h3></div>"#;
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let wroclaw = source(AdapterVariant::OperaWroclaw);
        let found = adapter(today).parse_listing(&wroclaw, html);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].starts_at, at(2026, 5, 7, 19, 0));
        assert_eq!(found[0].ticket_url, wroclaw.tickets_url);
    }

    #[test]
    fn test_resolve_ticket_url_ignores_placeholders() {
        let mut src = source(AdapterVariant::Generic);
        src.tickets_url = Some("https://bilety.example.pl/".to_string());
        assert_eq!(
            resolve_ticket_url(&src, Some("javascript:void(0)")),
            Some("https://bilety.example.pl/".to_string())
        );
        assert_eq!(resolve_ticket_url(&src, Some("#")), src.tickets_url);
    }
}
