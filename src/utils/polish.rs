//! Polish calendar vocabulary.

use chrono::{Datelike, NaiveDate};

use super::text::fold;

/// Month names in the genitive case, as used in dates ("15 stycznia").
pub const POLISH_MONTHS_GENITIVE: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

/// Month names in the nominative case, as used in calendar headers.
const POLISH_MONTHS_NOMINATIVE: [&str; 12] = [
    "styczeń",
    "luty",
    "marzec",
    "kwiecień",
    "maj",
    "czerwiec",
    "lipiec",
    "sierpień",
    "wrzesień",
    "październik",
    "listopad",
    "grudzień",
];

/// Weekday names starting from Monday.
pub const POLISH_WEEKDAYS: [&str; 7] = [
    "Poniedziałek",
    "Wtorek",
    "Środa",
    "Czwartek",
    "Piątek",
    "Sobota",
    "Niedziela",
];

/// Resolve a Polish month name (genitive, nominative or a 3-letter
/// abbreviation, with or without diacritics) to its number.
pub fn month_from_name(name: &str) -> Option<u32> {
    let folded = fold(name.trim_end_matches('.'));
    if folded.is_empty() {
        return None;
    }

    let matches = |table: &[&str; 12]| {
        table
            .iter()
            .position(|m| fold(m) == folded)
            .map(|i| i as u32 + 1)
    };

    matches(&POLISH_MONTHS_GENITIVE)
        .or_else(|| matches(&POLISH_MONTHS_NOMINATIVE))
        .or_else(|| {
            // "sty", "lut", "paź" ...; "maj" is both the name and the abbreviation
            if folded.chars().count() == 3 {
                POLISH_MONTHS_GENITIVE
                    .iter()
                    .position(|m| fold(m).starts_with(&folded))
                    .map(|i| i as u32 + 1)
            } else {
                None
            }
        })
}

/// Format a date the way Polish listings print it: "Środa 15 stycznia 2025".
pub fn format_polish_date(date: NaiveDate) -> String {
    let weekday = POLISH_WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    let month = POLISH_MONTHS_GENITIVE[date.month0() as usize];
    format!("{} {} {} {}", weekday, date.day(), month, date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_polish_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(format_polish_date(date), "Środa 15 stycznia 2025");

        let date = NaiveDate::from_ymd_opt(2025, 12, 7).unwrap();
        assert_eq!(format_polish_date(date), "Niedziela 7 grudnia 2025");
    }

    #[test]
    fn test_month_from_name_variants() {
        assert_eq!(month_from_name("września"), Some(9));
        assert_eq!(month_from_name("wrzesnia"), Some(9));
        assert_eq!(month_from_name("Październik"), Some(10));
        assert_eq!(month_from_name("maj"), Some(5));
        assert_eq!(month_from_name("maja"), Some(5));
        assert_eq!(month_from_name("gru."), Some(12));
        assert_eq!(month_from_name("halka"), None);
        assert_eq!(month_from_name(""), None);
    }
}
