//! Facts: the unit of at-most-once notification.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::PerformanceKey;

/// Condition a fact asserts about a performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    /// The performance appears in a repertoire listing.
    Listed,
    /// At least the configured number of adjacent seats are purchasable.
    SeatsAvailable,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Listed => "listed",
            FactKind::SeatsAvailable => "seats_available",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (performance, condition) pair observed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservedFact {
    pub key: PerformanceKey,
    pub kind: FactKind,
}

impl ObservedFact {
    pub fn new(key: PerformanceKey, kind: FactKind) -> Self {
        Self { key, kind }
    }

    /// Serialized form used in the state file.
    pub fn state_key(&self) -> String {
        format!("{}:{}", self.kind, self.key)
    }
}
