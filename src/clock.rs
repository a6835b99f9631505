//! Source of "now" for a tick and the checks it runs.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Injected wherever a timestamp or today's date is needed.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for horizon filtering and pruning.
    fn today(&self) -> NaiveDate;
}

/// Wall clock; dates follow the machine's local time zone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
