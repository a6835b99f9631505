//! Outcome of checking one performance's ticket page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PerformanceKey;

/// Availability verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    SoldOut,
    Available,
    Unknown,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::SoldOut => "sold_out",
            SeatStatus::Available => "available",
            SeatStatus::Unknown => "unknown",
        }
    }
}

/// Result of classifying one performance during one tick.
#[derive(Debug, Clone)]
pub struct SeatCheckResult {
    pub key: PerformanceKey,
    pub status: SeatStatus,
    /// Length of the longest run of adjacent selectable seats, when a seat map
    /// was inspected.
    pub adjacent_seats: Option<u32>,
    /// Selectable seats seen on the seat map.
    pub selectable_seats: Option<u32>,
    /// Short human-readable evidence, e.g. "Rząd 5, miejsca 10-12".
    pub seat_details: Vec<String>,
    /// URL the browser ended on (after redirects).
    pub final_url: Option<String>,
    pub checked_at: DateTime<Utc>,
    /// Present when the check failed; status is then `Unknown`.
    pub error: Option<String>,
}

impl SeatCheckResult {
    pub fn sold_out(key: PerformanceKey, checked_at: DateTime<Utc>) -> Self {
        Self {
            key,
            status: SeatStatus::SoldOut,
            adjacent_seats: None,
            selectable_seats: None,
            seat_details: Vec::new(),
            final_url: None,
            checked_at,
            error: None,
        }
    }

    pub fn unknown(key: PerformanceKey, checked_at: DateTime<Utc>, error: Option<String>) -> Self {
        Self {
            status: SeatStatus::Unknown,
            error,
            ..Self::sold_out(key, checked_at)
        }
    }

    pub fn available(
        key: PerformanceKey,
        checked_at: DateTime<Utc>,
        adjacent_seats: Option<u32>,
    ) -> Self {
        Self {
            status: SeatStatus::Available,
            adjacent_seats,
            ..Self::sold_out(key, checked_at)
        }
    }

    /// Whether this result is good enough to report seats for a group of
    /// `min_adjacent`. A count-less `Available` counts only when weak
    /// signals are trusted.
    pub fn qualifies(&self, min_adjacent: u32, trust_weak_signals: bool) -> bool {
        self.status == SeatStatus::Available
            && match self.adjacent_seats {
                Some(n) => n >= min_adjacent,
                None => trust_weak_signals,
            }
    }
}
