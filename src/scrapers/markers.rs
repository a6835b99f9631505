//! Vocabulary shared by listing extraction and ticket-page classification.

use crate::utils::fold;

/// Phrases that state a performance cannot be bought (folded form).
pub const SOLD_OUT_MARKERS: &[&str] = &[
    "wyprzedane",
    "wyprzedany",
    "wyprzedano",
    "brak biletow",
    "brak wolnych miejsc",
    "brak miejsc",
    "bilety niedostepne",
    "sprzedaz zakonczona",
    "sold out",
];

/// Words found on buy/reserve calls to action (folded form).
pub const CTA_WORDS: &[&str] = &[
    "kup bilet",
    "kup teraz",
    "kup",
    "rezerwuj",
    "rezerwacja",
    "dodaj do koszyka",
    "buy",
    "book",
];

/// Words identifying a ticket link in a listing row (folded form).
pub const TICKET_LINK_WORDS: &[&str] = &["bilet", "ticket", "kup", "buy", "rezerw"];

/// Whether the text carries an explicit sold-out marker.
pub fn has_sold_out_marker(text: &str) -> bool {
    let folded = fold(text);
    SOLD_OUT_MARKERS.iter().any(|m| folded.contains(m))
}

/// Whether the text reads like a buy/reserve action. Phrases match whole
/// words only, so "Kupiec" is not "kup".
pub fn is_cta_text(text: &str) -> bool {
    let folded = fold(text);
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    CTA_WORDS.iter().any(|phrase| {
        let phrase: Vec<&str> = phrase.split(' ').collect();
        words.windows(phrase.len()).any(|run| run == phrase.as_slice())
    })
}
