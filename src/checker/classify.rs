//! Ordered classification of a rendered ticket page.
//!
//! 1. explicit sold-out marker or status element -> sold out
//! 2. seat map present -> decided by the longest run of selectable seats
//! 3. buy/reserve button only -> weak signal
//! 4. anything else -> unknown

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use super::seat_map::SeatMap;
use crate::scrapers::markers::{has_sold_out_marker, is_cta_text};
use crate::utils::{collapse_whitespace, fold};

static SOLD_OUT_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        ".sold-out, .soldout, .sold_out, .wyprzedane, .wyprzedany, \
         [data-status='sold-out'], [data-status='soldout'], [data-status='sold_out'], \
         [data-sold-out='true'], [data-soldout='true']",
    )
    .unwrap()
});

static CTA_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("button, a, input[type='submit'], input[type='button'], [role='button']")
        .unwrap()
});

/// Verdict on a page, before it is tied to a performance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The page says so in words or with a status element.
    SoldOut { reason: String },
    /// A seat map was read.
    SeatMap {
        longest_run: u32,
        selectable: u32,
        details: Vec<String>,
    },
    /// Only an enabled buy/reserve control was found.
    BuyButton,
    /// Buy/reserve controls exist but are all disabled.
    DisabledBuyButton,
    /// Nothing recognizable.
    Unrecognized,
}

/// Classify rendered HTML.
pub fn classify(html: &str) -> Classification {
    let document = Html::parse_document(html);

    if let Some(reason) = sold_out_reason(&document) {
        return Classification::SoldOut { reason };
    }

    let seat_map = SeatMap::from_document(&document);
    if !seat_map.is_empty() {
        let runs = seat_map.runs();
        return Classification::SeatMap {
            longest_run: runs.first().map(|r| r.len()).unwrap_or(0),
            selectable: seat_map.selectable_count(),
            details: runs.iter().take(3).map(|r| r.describe()).collect(),
        };
    }

    let ctas: Vec<bool> = document
        .select(&CTA_ELEMENTS)
        .filter(|el| is_cta_text(&control_label(el)))
        .map(|el| is_enabled(&el))
        .collect();
    if ctas.iter().any(|enabled| *enabled) {
        Classification::BuyButton
    } else if !ctas.is_empty() {
        Classification::DisabledBuyButton
    } else {
        Classification::Unrecognized
    }
}

fn sold_out_reason(document: &Html) -> Option<String> {
    if let Some(el) = document.select(&SOLD_OUT_ELEMENTS).next() {
        let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
        return Some(if text.is_empty() {
            format!("sold-out status element <{}>", el.value().name())
        } else {
            text
        });
    }

    let text = visible_text(document);
    has_sold_out_marker(&text).then(|| "sold-out marker in page text".to_string())
}

/// Page text a visitor would read; script and style bodies are left out.
pub fn visible_text(document: &Html) -> String {
    let parts: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .is_some_and(|p| {
                        matches!(p.value().name(), "script" | "style" | "noscript" | "template")
                    });
                (!hidden).then_some(&**text)
            }
            _ => None,
        })
        .collect();
    collapse_whitespace(&parts.join(" "))
}

fn control_label(el: &ElementRef<'_>) -> String {
    let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
    if !text.is_empty() {
        return text;
    }
    el.value()
        .attr("value")
        .or_else(|| el.value().attr("aria-label"))
        .unwrap_or_default()
        .to_string()
}

fn is_enabled(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    if v.attr("disabled").is_some() || v.attr("aria-disabled") == Some("true") {
        return false;
    }
    let classes = fold(&v.classes().collect::<Vec<_>>().join(" "));
    !["disabled", "inactive", "unavailable"]
        .iter()
        .any(|w| classes.contains(w))
}
