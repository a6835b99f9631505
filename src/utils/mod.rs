//! Shared utility functions.
//!
//! - `text`: case/diacritic folding used for title matching and identity keys
//! - `polish`: Polish calendar vocabulary for parsing and formatting dates

mod polish;
mod text;

pub use polish::{format_polish_date, month_from_name, POLISH_MONTHS_GENITIVE, POLISH_WEEKDAYS};
pub use text::{collapse_whitespace, fold};
