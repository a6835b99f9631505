//! Theater sources and the performances scraped from them.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::fold;

/// Extraction strategy used for a theater's repertoire page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterVariant {
    /// Container heuristics shared by most Polish opera sites.
    #[default]
    Generic,
    /// Teatr Wielki - Opera Narodowa: dates are encoded in "termin" links.
    TeatrWielki,
    /// Opera Wrocławska: rows carry a compact YYYYMMDD code.
    OperaWroclaw,
}

impl AdapterVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterVariant::Generic => "generic",
            AdapterVariant::TeatrWielki => "teatr_wielki",
            AdapterVariant::OperaWroclaw => "opera_wroclaw",
        }
    }
}

/// A theater whose repertoire is monitored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheaterSource {
    /// Display name, e.g. "Opera Bałtycka".
    pub name: String,
    /// City, part of the theater identity ("Teatr Wielki" exists in several).
    pub city: String,
    /// Site root used to resolve relative links.
    pub base_url: String,
    /// Page listing upcoming performances.
    pub repertoire_url: String,
    /// Generic tickets page used when a row has no ticket link of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_url: Option<String>,
    /// Extraction strategy.
    #[serde(default)]
    pub variant: AdapterVariant,
    /// Disabled sources are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TheaterSource {
    /// Stable identity of the theater: "name (city)".
    pub fn identity(&self) -> String {
        format!("{} ({})", self.name, self.city)
    }
}

/// A scraped candidate performance. Created fresh every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    pub theater: String,
    pub city: String,
    /// Canonical configured title (not the raw spelling on the page).
    pub title: String,
    /// Local date and time; 00:00 when the listing carried no time.
    pub starts_at: NaiveDateTime,
    pub ticket_url: Option<String>,
    /// Row text as scraped, kept for diagnostics.
    pub raw_text: String,
}

impl Performance {
    pub fn key(&self) -> PerformanceKey {
        PerformanceKey::new(&self.theater, &self.city, &self.title, self.starts_at)
    }

    pub fn date(&self) -> NaiveDate {
        self.starts_at.date()
    }
}

/// Identity of a real-world performance.
///
/// Built from folded text so that two scrapes differing only in case,
/// diacritics or whitespace produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PerformanceKey {
    theater: String,
    title: String,
    starts_at: NaiveDateTime,
}

impl PerformanceKey {
    pub fn new(theater: &str, city: &str, title: &str, starts_at: NaiveDateTime) -> Self {
        Self {
            theater: format!("{}|{}", fold(theater), fold(city)),
            title: fold(title),
            starts_at,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.starts_at
    }
}

impl fmt::Display for PerformanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.theater,
            self.title,
            self.starts_at.format("%Y-%m-%dT%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_key_ignores_trivial_text_differences() {
        let a = PerformanceKey::new("Opera Bałtycka", "Gdańsk", "Straszny Dwór", at(2026, 5, 7, 19));
        let b = PerformanceKey::new(" opera  BALTYCKA", "gdansk", "STRASZNY DWOR ", at(2026, 5, 7, 19));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "opera baltycka|gdansk|straszny dwor|2026-05-07T19:00");
    }

    #[test]
    fn test_key_distinguishes_time_and_city() {
        let base = PerformanceKey::new("Teatr Wielki", "Warszawa", "Halka", at(2026, 5, 7, 19));
        assert_ne!(
            base,
            PerformanceKey::new("Teatr Wielki", "Warszawa", "Halka", at(2026, 5, 7, 16))
        );
        assert_ne!(
            base,
            PerformanceKey::new("Teatr Wielki", "Łódź", "Halka", at(2026, 5, 7, 19))
        );
    }

    #[test]
    fn test_variant_deserializes_snake_case() {
        let v: AdapterVariant = serde_json::from_str("\"teatr_wielki\"").unwrap();
        assert_eq!(v, AdapterVariant::TeatrWielki);
        assert_eq!(AdapterVariant::default(), AdapterVariant::Generic);
    }
}
