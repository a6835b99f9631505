//! Data models for seatwatch.

mod fact;
mod performance;
mod seat_check;

pub use fact::{FactKind, ObservedFact};
pub use performance::{AdapterVariant, Performance, PerformanceKey, TheaterSource};
pub use seat_check::{SeatCheckResult, SeatStatus};
