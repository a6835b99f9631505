//! Parsing of Polish listing dates and the date horizon filter.
//!
//! Listings print dates in many shapes: "15.06.2026", "2026-06-15",
//! "31 grudnia 2025 środa godz. 19:00", "7 maja, Cz 19:00", links like
//! ".../termin/2026-05-07_19-00/" or compact codes "20260507". Weekday names
//! are noise and ignored. A token that does not yield a valid calendar date
//! is rejected; nothing is ever defaulted to "today".

use std::sync::LazyLock;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::utils::month_from_name;

/// Date shapes tried in order. The most explicit forms come first so that
/// a row carrying both a link-coded date and loose text prefers the link.
static DATE_PATTERNS: LazyLock<Vec<(Regex, DateShape)>> = LazyLock::new(|| {
    vec![
        // termin/2026-05-07_19-00
        (
            Regex::new(r"(\d{4})-(\d{2})-(\d{2})_(\d{2})-(\d{2})").unwrap(),
            DateShape::LinkCoded,
        ),
        // 2026-05-07, 2026-05-07T19:00
        (
            Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})(?:\b|T)").unwrap(),
            DateShape::Ymd,
        ),
        // 07.05.2026, 7/5/2026
        (
            Regex::new(r"\b(\d{1,2})[./](\d{1,2})[./](\d{4})\b").unwrap(),
            DateShape::Dmy,
        ),
        // 7 maja 2026, 7 MAJA 2026r.
        (
            Regex::new(r"(?i)\b(\d{1,2})\s+([a-ząćęłńóśźż]{3,}\.?)\s+(\d{4})").unwrap(),
            DateShape::DayMonthNameYear,
        ),
        // 20260507 (Opera Wrocławska row codes)
        (
            Regex::new(r"\b(20\d{2})(\d{2})(\d{2})\b").unwrap(),
            DateShape::Compact,
        ),
        // 7 maja (year inferred)
        (
            Regex::new(r"(?i)\b(\d{1,2})\s+([a-ząćęłńóśźż]{3,}\.?)").unwrap(),
            DateShape::DayMonthName,
        ),
    ]
});

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3])[:.]([0-5]\d)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateShape {
    LinkCoded,
    Ymd,
    Dmy,
    DayMonthNameYear,
    Compact,
    DayMonthName,
}

/// Parse the first recognizable date in `text`, combined with a time of day
/// found in the same text (00:00 when absent).
///
/// `today` anchors year inference for "7 maja"-style dates: the nearest
/// occurrence that is not in the past is chosen.
pub fn parse_listing_datetime(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    for (pattern, shape) in DATE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(dt) = parse_captures(&caps, *shape, text, today) {
                return Some(dt);
            }
        }
    }
    None
}

fn parse_captures(
    caps: &regex::Captures,
    shape: DateShape,
    text: &str,
    today: NaiveDate,
) -> Option<NaiveDateTime> {
    let num = |i: usize| -> Option<u32> { caps.get(i)?.as_str().parse().ok() };

    let date = match shape {
        DateShape::LinkCoded => {
            let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
            let time = NaiveTime::from_hms_opt(num(4)?, num(5)?, 0)?;
            return Some(date.and_time(time));
        }
        DateShape::Ymd | DateShape::Compact => NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?,
        DateShape::Dmy => NaiveDate::from_ymd_opt(num(3)? as i32, num(2)?, num(1)?)?,
        DateShape::DayMonthNameYear => {
            let month = month_from_name(caps.get(2)?.as_str())?;
            NaiveDate::from_ymd_opt(num(3)? as i32, month, num(1)?)?
        }
        DateShape::DayMonthName => {
            let month = month_from_name(caps.get(2)?.as_str())?;
            infer_year(num(1)?, month, today)?
        }
    };

    // Look for the time outside the date token so "15.06.2026" is not read as 15:06.
    let whole = caps.get(0)?;
    let rest = format!("{} {}", &text[..whole.start()], &text[whole.end()..]);
    Some(date.and_time(parse_time(&rest).unwrap_or(NaiveTime::MIN)))
}

fn infer_year(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(date) if date >= today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

/// Find a time of day ("19:00", "19.30", "godz. 18:00").
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_PATTERN.captures_iter(text).find_map(|caps| {
        let hour = caps.get(1)?.as_str().parse().ok()?;
        let minute = caps.get(2)?.as_str().parse().ok()?;
        NaiveTime::from_hms_opt(hour, minute, 0)
    })
}

/// Window of dates worth checking: from today up to the horizon, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub today: NaiveDate,
    pub last_day: NaiveDate,
}

impl DateWindow {
    pub fn new(today: NaiveDate, horizon_months: u32) -> Self {
        let last_day = today
            .checked_add_months(Months::new(horizon_months))
            .unwrap_or(NaiveDate::MAX);
        Self { today, last_day }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.today && date <= self.last_day
    }
}
