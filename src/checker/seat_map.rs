//! Seat map reading: which seats can be picked one by one, and how many of
//! them sit side by side.
//!
//! Ticketing platforms draw seats as divs, buttons or SVG shapes with little
//! in common. A seat is any element we can assign a row and an in-row number
//! to, from `data-row`/`data-seat` style attributes, from ids like `r5m10` or
//! `row-5-seat-10`, or from labels like "Rząd 5, miejsce 10".

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::utils::fold;

static SEAT_CANDIDATES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "[data-seat], [data-seat-id], [data-seatid], [data-place], [data-miejsce], \
         .seat, .miejsce, [class*='seat'], [class*='Seat'], [class*='miejsce'], \
         svg circle, svg rect, svg path, svg use",
    )
    .unwrap()
});

/// Seat ids naming both row and seat, tried in order.
static SEAT_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // row-5-seat-10, rzad_5_miejsce_10, r5s10
        Regex::new(r"(?i)r(?:ow|zad)?[-_]?(\w+?)[-_]?(?:s(?:eat)?|m(?:iejsce)?)[-_]?(\d+)$").unwrap(),
        // r5m10 inside longer ids
        Regex::new(r"(?i)\br(\d+)m(\d+)\b").unwrap(),
    ]
});

/// 5-10, 5_10. Drawing tools export ids like `path835-1` too, so this only
/// applies to elements already marked as seats.
static BARE_SEAT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)[-_](\d+)$").unwrap());

/// Attributes that only seats carry.
const SEAT_MARKER_ATTRS: &[&str] = &[
    "data-seat",
    "data-seat-id",
    "data-seatid",
    "data-place",
    "data-miejsce",
    "data-row",
];

/// "Rząd 5, miejsce 10", "Row C Seat 7", "rz. 5 m. 10"
static SEAT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:rzad|row|rz\.)\s*:?\s*([0-9a-z]{1,3})\b.*?(?:miejsce|seat|m\.|nr)\s*:?\s*(\d+)")
        .unwrap()
});

const ROW_ATTRS: &[&str] = &["data-row", "data-rzad", "data-row-name", "data-row-number", "row"];
const ORDINAL_ATTRS: &[&str] = &[
    "data-seat",
    "data-seat-number",
    "data-number",
    "data-col",
    "data-miejsce",
    "data-place",
    "data-num",
];
const ID_ATTRS: &[&str] = &["data-seat-id", "data-seatid", "data-id", "id"];
const LABEL_ATTRS: &[&str] = &["aria-label", "title", "data-tooltip", "data-title"];

/// Class or status words marking a seat that cannot be picked (folded).
const UNAVAILABLE_WORDS: &[&str] = &[
    "unavailable",
    "reserved",
    "occupied",
    "sold",
    "taken",
    "booked",
    "blocked",
    "locked",
    "disabled",
    "inactive",
    "zajete",
    "zajety",
    "sprzedane",
    "niedostepne",
    "zarezerwowane",
];

/// Attributes or labels marking a group control rather than one seat.
const COMPOSITE_ATTRS: &[&str] = &["data-quantity", "data-seats", "data-count", "data-group-size"];
const COMPOSITE_WORDS: &[&str] = &[
    "best available",
    "best-available",
    "bestavailable",
    "najlepsze dostepne",
    "najlepsze miejsca",
    "quantity",
];

/// One seat as drawn on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub row: String,
    pub ordinal: u32,
    pub selectable: bool,
}

/// Longest run of side-by-side selectable seats in one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRun {
    pub row: String,
    pub first: u32,
    pub last: u32,
}

impl SeatRun {
    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn describe(&self) -> String {
        if self.first == self.last {
            format!("Rząd {}, miejsce {}", self.row, self.first)
        } else {
            format!("Rząd {}, miejsca {}-{}", self.row, self.first, self.last)
        }
    }
}

/// What a seat map showed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatMap {
    pub seats: Vec<Seat>,
}

impl SeatMap {
    /// Read every individually addressable seat from a rendered page.
    pub fn from_document(document: &Html) -> Self {
        let mut seen = BTreeSet::new();
        let seats = document
            .select(&SEAT_CANDIDATES)
            .filter(|el| !is_composite(el))
            .filter_map(|el| parse_seat(&el))
            // Nested markup (a <g> and its <circle>) may describe one seat twice.
            .filter(|seat| seen.insert((seat.row.clone(), seat.ordinal)))
            .collect();
        Self { seats }
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn selectable_count(&self) -> u32 {
        self.seats.iter().filter(|s| s.selectable).count() as u32
    }

    /// Longest run per row, longest first. Rows with no selectable seat are
    /// left out.
    pub fn runs(&self) -> Vec<SeatRun> {
        let mut rows: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();
        for seat in self.seats.iter().filter(|s| s.selectable) {
            rows.entry(seat.row.as_str()).or_default().insert(seat.ordinal);
        }

        let mut runs: Vec<SeatRun> = rows
            .into_iter()
            .filter_map(|(row, ordinals)| longest_run(row, &ordinals))
            .collect();
        runs.sort_by(|a, b| b.len().cmp(&a.len()));
        runs
    }

    pub fn longest_run(&self) -> u32 {
        self.runs().first().map(SeatRun::len).unwrap_or(0)
    }
}

fn longest_run(row: &str, ordinals: &BTreeSet<u32>) -> Option<SeatRun> {
    let mut best: Option<(u32, u32)> = None;
    let mut current: Option<(u32, u32)> = None;

    for &n in ordinals {
        current = match current {
            Some((first, last)) if last + 1 == n => Some((first, n)),
            _ => Some((n, n)),
        };
        if let Some((first, last)) = current {
            if best.map_or(true, |(bf, bl)| last - first > bl - bf) {
                best = Some((first, last));
            }
        }
    }

    best.map(|(first, last)| SeatRun {
        row: row.to_string(),
        first,
        last,
    })
}

fn is_composite(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    if COMPOSITE_ATTRS.iter().any(|a| v.attr(a).is_some()) {
        return true;
    }
    let classes = fold(&v.classes().collect::<Vec<_>>().join(" "));
    let label = fold(&el.text().collect::<String>());
    COMPOSITE_WORDS
        .iter()
        .any(|w| classes.contains(w) || label.contains(w))
}

fn parse_seat(el: &ElementRef<'_>) -> Option<Seat> {
    let (row, ordinal) = seat_position(el)?;
    Some(Seat {
        row,
        ordinal,
        selectable: is_selectable(el),
    })
}

fn seat_position(el: &ElementRef<'_>) -> Option<(String, u32)> {
    let v = el.value();

    let ordinal = ORDINAL_ATTRS
        .iter()
        .filter_map(|a| v.attr(a))
        .find_map(|s| s.trim().parse::<u32>().ok());
    if let Some(ordinal) = ordinal {
        // Row may sit on the seat or on an enclosing row group.
        let row = std::iter::once(*el)
            .chain(el.ancestors().filter_map(ElementRef::wrap))
            .find_map(|e| ROW_ATTRS.iter().find_map(|a| e.value().attr(a)))
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if let Some(row) = row {
            return Some((row, ordinal));
        }
    }

    // data-seat may hold an id rather than a number.
    let ids = ID_ATTRS
        .iter()
        .chain(std::iter::once(&"data-seat"))
        .filter_map(|a| v.attr(a));
    let marked = is_marked_seat(el);
    for id in ids {
        let id = id.trim();
        let patterns = SEAT_ID_PATTERNS
            .iter()
            .chain(marked.then_some(&*BARE_SEAT_ID));
        for pattern in patterns {
            if let Some(caps) = pattern.captures(id) {
                if let (Some(row), Some(Ok(ordinal))) =
                    (caps.get(1), caps.get(2).map(|m| m.as_str().parse::<u32>()))
                {
                    return Some((row.as_str().to_uppercase(), ordinal));
                }
            }
        }
    }

    LABEL_ATTRS.iter().filter_map(|a| v.attr(a)).find_map(|label| {
        let folded = fold(label);
        let caps = SEAT_LABEL.captures(&folded)?;
        let ordinal = caps.get(2)?.as_str().parse().ok()?;
        Some((caps.get(1)?.as_str().to_uppercase(), ordinal))
    })
}

/// Whether the element declares itself a seat by class or attribute.
fn is_marked_seat(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    SEAT_MARKER_ATTRS.iter().any(|a| v.attr(a).is_some())
        || v.classes().map(fold).any(|c| c.contains("seat") || c.contains("miejsce"))
}

fn is_selectable(el: &ElementRef<'_>) -> bool {
    let v = el.value();

    if v.attr("disabled").is_some() || v.attr("aria-disabled") == Some("true") {
        return false;
    }
    if matches!(v.attr("data-available"), Some("false" | "0")) {
        return false;
    }

    let status = ["data-status", "data-state", "data-availability"]
        .iter()
        .filter_map(|a| v.attr(a))
        .map(fold)
        .collect::<Vec<_>>()
        .join(" ");
    let classes = fold(&v.classes().collect::<Vec<_>>().join(" "));

    !UNAVAILABLE_WORDS
        .iter()
        .any(|w| classes.contains(w) || status.contains(w))
}
