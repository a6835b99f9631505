//! Persisted record of facts already notified.
//!
//! The state is a plain value: loaded once at tick start, diffed against the
//! tick's observations without mutation, and written back (atomically, as a
//! whole) only after notifications went out.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::error::StateError;
use crate::models::ObservedFact;

/// Current state file format.
pub const STATE_VERSION: u32 = 1;

fn state_version() -> u32 {
    STATE_VERSION
}

/// When a fact was notified and which performance date it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifiedFact {
    pub performance_at: NaiveDateTime,
    pub notified_at: DateTime<Utc>,
}

/// Everything remembered between runs. Unknown fields are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorState {
    #[serde(default = "state_version")]
    pub version: u32,
    /// Fact key (`kind:theater|city|title|datetime`) to notification record.
    #[serde(default)]
    pub notified: BTreeMap<String, NotifiedFact>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            notified: BTreeMap::new(),
            last_run: None,
        }
    }
}

impl MonitorState {
    pub fn is_notified(&self, fact: &ObservedFact) -> bool {
        self.notified.contains_key(&fact.state_key())
    }

    /// Facts not notified before, in observation order, without repeats.
    pub fn diff<'a>(&self, observations: &'a [ObservedFact]) -> Vec<&'a ObservedFact> {
        let mut batch = HashSet::new();
        observations
            .iter()
            .filter(|fact| !self.is_notified(fact))
            .filter(|fact| batch.insert(fact.state_key()))
            .collect()
    }

    /// Mark facts as notified.
    pub fn record<'a>(
        &mut self,
        facts: impl IntoIterator<Item = &'a ObservedFact>,
        notified_at: DateTime<Utc>,
    ) {
        for fact in facts {
            self.notified
                .entry(fact.state_key())
                .or_insert_with(|| NotifiedFact {
                    performance_at: fact.key.starts_at(),
                    notified_at,
                });
        }
    }

    /// Drop facts about performances dated before `today`. Returns how many
    /// were removed.
    pub fn prune_before(&mut self, today: NaiveDate) -> usize {
        let before = self.notified.len();
        self.notified
            .retain(|_, fact| fact.performance_at.date() >= today);
        before - self.notified.len()
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }
}

/// JSON file holding a [`MonitorState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable state file is moved.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }

    /// Load the state. A missing file is an empty state. A file that does not
    /// parse is moved aside and also yields an empty state.
    pub fn load(&self) -> Result<MonitorState, StateError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}; starting empty", self.path.display());
                return Ok(MonitorState::default());
            }
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<MonitorState>(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                let corrupt = StateError::Corrupt {
                    path: self.path.clone(),
                    reason: e.to_string(),
                };
                error!("{}; starting with empty state", corrupt);
                let aside = self.corrupt_path();
                match std::fs::rename(&self.path, &aside) {
                    Ok(()) => info!("Moved unreadable state to {}", aside.display()),
                    Err(e) => error!("Could not move {} aside: {}", self.path.display(), e),
                }
                Ok(MonitorState::default())
            }
        }
    }

    /// Replace the state file with `state`: temp file in the same directory,
    /// fsync, rename.
    pub fn commit(&self, state: &MonitorState) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let json = serde_json::to_vec_pretty(state)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(
            "Saved state with {} facts to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Forget every notified fact.
    pub fn reset(&self) -> Result<(), StateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Load, drop facts about past performances, and save if anything changed.
    pub fn prune(&self, today: NaiveDate) -> Result<usize, StateError> {
        let mut state = self.load()?;
        let removed = state.prune_before(today);
        if removed > 0 {
            self.commit(&state)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FactKind, PerformanceKey};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn fact(day: u32, kind: FactKind) -> ObservedFact {
        let at = NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap();
        ObservedFact::new(PerformanceKey::new("Opera Nova", "Bydgoszcz", "Halka", at), kind)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_diff_is_pure_and_idempotent() {
        let state = MonitorState::default();
        let observed = vec![fact(1, FactKind::SeatsAvailable), fact(2, FactKind::SeatsAvailable)];

        let first: Vec<_> = state.diff(&observed).into_iter().cloned().collect();
        let second: Vec<_> = state.diff(&observed).into_iter().cloned().collect();

        assert_eq!(first, observed);
        assert_eq!(first, second);
        assert!(state.is_empty());
    }

    #[test]
    fn test_kinds_deduplicate_independently() {
        let mut state = MonitorState::default();
        state.record([&fact(1, FactKind::Listed)], now());

        let observed = vec![
            fact(1, FactKind::Listed),
            fact(1, FactKind::SeatsAvailable),
            fact(1, FactKind::SeatsAvailable),
        ];
        let new = state.diff(&observed);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].kind, FactKind::SeatsAvailable);
    }

    #[test]
    fn test_commit_then_load_has_no_new_facts() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested/state.json"));
        let observed = vec![fact(3, FactKind::SeatsAvailable)];

        let mut state = store.load().unwrap();
        let new: Vec<_> = state.diff(&observed).into_iter().cloned().collect();
        state.record(&new, now());
        state.last_run = Some(now());
        store.commit(&state).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, state);
        assert!(reloaded.diff(&observed).is_empty());
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = StateStore::new(&path);

        let state = store.load().unwrap();

        assert!(state.is_empty());
        assert!(!path.exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("state.json.corrupt")).unwrap(),
            "{ not json"
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "version": 1,
            "notified": {
                "seats_available:opera nova|bydgoszcz|halka|2026-03-01T19:00": {
                    "performance_at": "2026-03-01T19:00:00",
                    "notified_at": "2026-02-01T08:00:00Z",
                    "channel": "email"
                }
            },
            "last_run": null,
            "schema_hint": "v2"
        }"#;
        let state: MonitorState = serde_json::from_str(json).unwrap();
        assert!(state.is_notified(&fact(1, FactKind::SeatsAvailable)));
    }

    #[test]
    fn test_prune_keeps_today_and_future() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = MonitorState::default();
        state.record(
            [
                &fact(1, FactKind::SeatsAvailable),
                &fact(5, FactKind::SeatsAvailable),
                &fact(9, FactKind::Listed),
            ],
            now(),
        );
        store.commit(&state).unwrap();

        let removed = store.prune(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()).unwrap();

        let kept = store.load().unwrap();
        assert_eq!(removed, 1);
        assert!(kept.is_notified(&fact(5, FactKind::SeatsAvailable)));
        assert!(kept.is_notified(&fact(9, FactKind::Listed)));
        assert!(!kept.is_notified(&fact(1, FactKind::SeatsAvailable)));
    }

    #[test]
    fn test_reset_removes_file() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.commit(&MonitorState::default()).unwrap();

        store.reset().unwrap();
        store.reset().unwrap();

        assert!(!store.path().exists());
    }
}
