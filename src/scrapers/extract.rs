//! Extraction strategies: which parts of a repertoire page form a listing row.
//!
//! Strategies only locate rows and the text a date may be read from. Title
//! matching, date parsing and horizon filtering happen once, in the adapter.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::dates::{parse_listing_datetime, parse_time};
use super::markers::TICKET_LINK_WORDS;
use super::titles::TitleMatcher;
use crate::models::{AdapterVariant, TheaterSource};
use crate::utils::{collapse_whitespace, fold};

/// One candidate performance row on a repertoire page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    /// Whitespace-collapsed text of the row.
    pub text: String,
    /// Strings to read the date from, most specific first.
    pub date_sources: Vec<String>,
    /// Ticket link as found on the page (possibly relative).
    pub ticket_href: Option<String>,
}

/// What a strategy may consult while locating rows.
pub struct ExtractContext<'a> {
    pub source: &'a TheaterSource,
    pub titles: &'a TitleMatcher,
    pub today: NaiveDate,
}

/// Site-specific row location.
pub trait ExtractionStrategy: Send + Sync {
    fn extract(&self, document: &Html, ctx: &ExtractContext<'_>) -> Vec<ListingRow>;
}

/// Pick the strategy for a source's variant.
pub fn strategy_for(variant: AdapterVariant) -> &'static dyn ExtractionStrategy {
    match variant {
        AdapterVariant::Generic => &GenericStrategy,
        AdapterVariant::TeatrWielki => &TeatrWielkiStrategy,
        AdapterVariant::OperaWroclaw => &OperaWroclawStrategy,
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css}: {e}"))
}

static CONTAINERS: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        "article, .event, .spektakl, .show, .performance, .repertuar-item, \
         .repertoire-item, .calendar-event, .event-item, .program-item, \
         [class*='event'], [class*='spektakl'], [class*='repertuar'], li, tr",
    )
});

static DATE_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| {
    selector(".date, .data, time, .event-date, .spektakl-date, [class*='date'], [class*='data']")
});

static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

static TERMIN_LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href*='/termin/']"));

static WROCLAW_ROWS: LazyLock<Selector> = LazyLock::new(|| selector(".rep-single"));

static COMPACT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b20\d{6}\b").unwrap());

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// First link in the row that looks like a ticket link.
fn ticket_link(el: &ElementRef<'_>) -> Option<String> {
    el.select(&LINKS).find_map(|a| {
        let href = a.value().attr("href")?;
        let haystack = format!("{} {}", fold(&element_text(&a)), href.to_lowercase());
        TICKET_LINK_WORDS
            .iter()
            .any(|w| haystack.contains(w))
            .then(|| href.to_string())
    })
}

/// Heuristic containers shared by most opera sites.
pub struct GenericStrategy;

impl ExtractionStrategy for GenericStrategy {
    fn extract(&self, document: &Html, ctx: &ExtractContext<'_>) -> Vec<ListingRow> {
        // Containers that mention a title and carry a readable date.
        let mut seen = HashSet::new();
        let candidates: Vec<ElementRef<'_>> = document
            .select(&CONTAINERS)
            .filter(|el| seen.insert(el.id()))
            .filter(|el| {
                let text = element_text(el);
                ctx.titles.find(&text).is_some()
                    && parse_listing_datetime(&text, ctx.today).is_some()
            })
            .collect();

        // A wrapper around several performances would borrow the wrong date;
        // keep only the innermost qualifying containers.
        let ancestors_of_candidates: HashSet<_> = candidates
            .iter()
            .flat_map(|el| el.ancestors().map(|a| a.id()))
            .collect();

        candidates
            .into_iter()
            .filter(|el| !ancestors_of_candidates.contains(&el.id()))
            .map(|el| {
                let text = element_text(&el);
                let mut date_sources: Vec<String> = el
                    .select(&DATE_ELEMENTS)
                    .flat_map(|d| {
                        let mut texts = vec![element_text(&d)];
                        if let Some(attr) = d.value().attr("datetime") {
                            texts.insert(0, attr.to_string());
                        }
                        texts
                    })
                    .filter(|t| !t.is_empty())
                    .collect();
                date_sources.push(text.clone());

                ListingRow {
                    ticket_href: ticket_link(&el),
                    date_sources,
                    text,
                }
            })
            .collect()
    }
}

/// Teatr Wielki - Opera Narodowa: each performance links to
/// `.../termin/YYYY-MM-DD_HH-MM/`, which is both its date and its ticket page.
pub struct TeatrWielkiStrategy;

impl TeatrWielkiStrategy {
    /// Innermost row-like ancestor holding this performance only. A wrapper
    /// around several `/termin/` targets (a whole day, say) would lend its
    /// text to every link inside, so the link alone is used then.
    fn row_container<'a>(link: ElementRef<'a>) -> ElementRef<'a> {
        let row = link.ancestors().filter_map(ElementRef::wrap).find(|el| {
            let v = el.value();
            matches!(v.name(), "li" | "article" | "tr")
                || v.classes().any(|c| c.contains("event") || c.contains("item"))
        });
        match row {
            Some(row) if Self::distinct_termins(&row) == 1 => row,
            _ => link,
        }
    }

    fn distinct_termins(el: &ElementRef<'_>) -> usize {
        el.select(&TERMIN_LINKS)
            .filter_map(|a| a.value().attr("href"))
            .collect::<HashSet<_>>()
            .len()
    }
}

impl ExtractionStrategy for TeatrWielkiStrategy {
    fn extract(&self, document: &Html, _ctx: &ExtractContext<'_>) -> Vec<ListingRow> {
        let mut seen = HashSet::new();
        document
            .select(&TERMIN_LINKS)
            .filter_map(|link| {
                let href = link.value().attr("href")?.to_string();
                let container = Self::row_container(link);
                if !seen.insert((container.id(), href.clone())) {
                    return None;
                }
                let ticket_href = ticket_link(&container)
                    .filter(|t| !t.contains("/termin/"))
                    .or_else(|| Some(href.clone()));
                Some(ListingRow {
                    text: element_text(&container),
                    date_sources: vec![href],
                    ticket_href,
                })
            })
            .collect()
    }
}

/// Opera Wrocławska: `.rep-single` rows carry a YYYYMMDD code. Rows without
/// it are sidebars or teasers, not performances.
pub struct OperaWroclawStrategy;

impl ExtractionStrategy for OperaWroclawStrategy {
    fn extract(&self, document: &Html, _ctx: &ExtractContext<'_>) -> Vec<ListingRow> {
        document
            .select(&WROCLAW_ROWS)
            .filter_map(|row| {
                let text = element_text(&row);
                let code = COMPACT_CODE.find(&text)?.as_str().to_string();
                let date_source = match parse_time(&text.replace(&code, " ")) {
                    Some(time) => format!("{} {}", code, time.format("%H:%M")),
                    None => code,
                };
                Some(ListingRow {
                    ticket_href: ticket_link(&row),
                    date_sources: vec![date_source],
                    text,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_theaters;

    fn ctx_for<'a>(source: &'a TheaterSource, titles: &'a TitleMatcher) -> ExtractContext<'a> {
        ExtractContext {
            source,
            titles,
            today: NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
        }
    }

    fn generic_source() -> TheaterSource {
        default_theaters()
            .into_iter()
            .find(|t| t.variant == AdapterVariant::Generic)
            .unwrap()
    }

    #[test]
    fn test_generic_keeps_innermost_rows() {
        let html = Html::parse_document(
            r#"<html><body><section class="repertuar-list">
                <article class="event">
                    <h3>Halka</h3><span class="date">15.06.2026</span>
                    <a href="/bilety/halka-1">Kup bilet</a>
                </article>
                <article class="event">
                    <h3>Straszny Dwór</h3><span class="date">2026-07-01</span>
                </article>
            </section></body></html>"#,
        );
        let source = generic_source();
        let titles = TitleMatcher::new(["Halka", "Straszny Dwór"]);
        let rows = GenericStrategy.extract(&html, &ctx_for(&source, &titles));

        assert_eq!(rows.len(), 2);
        assert!(rows[0].text.contains("Halka"));
        assert_eq!(rows[0].date_sources[0], "15.06.2026");
        assert_eq!(rows[0].ticket_href.as_deref(), Some("/bilety/halka-1"));
        assert!(rows[1].text.contains("Straszny"));
        assert_eq!(rows[1].ticket_href, None);
    }

    #[test]
    fn test_generic_prefers_time_datetime_attribute() {
        let html = Html::parse_document(
            r#"<ul><li>HALKA <time datetime="2026-03-14">sobota 14 marca</time> 18:00</li></ul>"#,
        );
        let source = generic_source();
        let titles = TitleMatcher::new(["Halka"]);
        let rows = GenericStrategy.extract(&html, &ctx_for(&source, &titles));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_sources[0], "2026-03-14");
    }

    #[test]
    fn test_teatr_wielki_reads_termin_links() {
        let html = Html::parse_document(
            r#"<ul>
                <li class="data-event">
                    <h3><a href="/kalendarium/2025-2026/halka/termin/2026-05-07_19-00/">Halka</a></h3>
                    <span>Kup bilet</span>
                </li>
            </ul>"#,
        );
        let source = default_theaters().remove(0);
        let titles = TitleMatcher::new(["Halka"]);
        let rows = TeatrWielkiStrategy.extract(&html, &ctx_for(&source, &titles));

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].date_sources,
            vec!["/kalendarium/2025-2026/halka/termin/2026-05-07_19-00/".to_string()]
        );
        assert_eq!(
            rows[0].ticket_href.as_deref(),
            Some("/kalendarium/2025-2026/halka/termin/2026-05-07_19-00/")
        );
        assert!(rows[0].text.contains("Kup bilet"));
    }

    #[test]
    fn test_opera_wroclaw_requires_row_code() {
        let html = Html::parse_document(
            r#"<div class="rep-single list">
                   <span>7 maja, Cz 19:00 20260507</span>
                   <h3 class="rep-list-title">Halka</h3>
                   <a href="https://bilety.opera.wroclaw.pl/rezerwacja/?id=123">Kup bilet</a>
               </div>
               <div class="rep-single teaser"><h3>Halka</h3><p>Informacje o spektaklu</p></div>"#,
        );
        let source = default_theaters().remove(2);
        let titles = TitleMatcher::new(["Halka"]);
        let rows = OperaWroclawStrategy.extract(&html, &ctx_for(&source, &titles));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_sources, vec!["20260507 19:00".to_string()]);
        assert_eq!(
            rows[0].ticket_href.as_deref(),
            Some("https://bilety.opera.wroclaw.pl/rezerwacja/?id=123")
        );
    }
}
