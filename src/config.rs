//! Configuration management for seatwatch.
//!
//! A config file (TOML, YAML or JSON by extension) supplies the theaters,
//! target titles and monitor limits. When no file is found the built-in
//! defaults cover the nine Polish opera houses.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{AdapterVariant, FactKind, TheaterSource};
use crate::scrapers::BrowserEngineConfig;

/// Config file name looked up in the working and user config directories.
pub const CONFIG_FILENAME: &str = "seatwatch.toml";

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "SEATWATCH_CONFIG";

/// Default state file name, resolved relative to the config file.
pub const DEFAULT_STATE_FILENAME: &str = "seatwatch-state.json";

/// Limits and behavior switches for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Adjacent seats required for an availability fact.
    pub min_adjacent_seats: u32,
    /// Performances further in the future than this are ignored.
    pub horizon_months: u32,
    /// Concurrent repertoire fetches.
    pub source_concurrency: usize,
    /// Concurrent browser checks. Each holds a browser page.
    pub check_concurrency: usize,
    /// Attempts per source before declaring a fetch error.
    pub max_retries: u32,
    /// Fixed delay between source attempts.
    pub retry_delay_secs: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Upper bound for each adapter attempt; retries get a fresh budget.
    pub source_timeout_secs: u64,
    /// Attempts per availability check.
    pub check_retries: u32,
    /// Fixed delay between check attempts.
    pub check_retry_delay_secs: u64,
    /// Wall-clock budget for a whole tick; unstarted checks become UNKNOWN.
    pub tick_budget_secs: u64,
    /// Delay between ticks in daemon mode.
    pub tick_interval_secs: u64,
    /// Treat an enabled buy button without a seat map as availability.
    pub trust_weak_signals: bool,
    /// Drop listing rows already marked sold out on the repertoire page.
    pub skip_listed_sold_out: bool,
    /// Fact kinds that produce notifications.
    pub fact_kinds: Vec<FactKind>,
    /// Drop facts for past performances when the state is loaded.
    pub prune_past_facts: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            min_adjacent_seats: 2,
            horizon_months: 6,
            source_concurrency: 4,
            check_concurrency: 2,
            max_retries: 3,
            retry_delay_secs: 30,
            request_timeout_secs: 30,
            source_timeout_secs: 180,
            check_retries: 2,
            check_retry_delay_secs: 5,
            tick_budget_secs: 600,
            tick_interval_secs: 15 * 60,
            trust_weak_signals: false,
            skip_listed_sold_out: true,
            fact_kinds: vec![FactKind::SeatsAvailable],
            prune_past_facts: true,
        }
    }
}

impl MonitorSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn check_retry_delay(&self) -> Duration {
        Duration::from_secs(self.check_retry_delay_secs)
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_secs(self.tick_budget_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn fact_enabled(&self, kind: FactKind) -> bool {
        self.fact_kinds.contains(&kind)
    }
}

/// Where notifications go.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Print to stdout.
    #[default]
    Console,
    /// POST a JSON payload.
    Webhook {
        url: String,
        #[serde(default = "default_webhook_timeout")]
        timeout_secs: u64,
    },
}

fn default_webhook_timeout() -> u64 {
    15
}

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Monitored theaters. A file that omits this list is rejected.
    #[serde(default)]
    pub theaters: Vec<TheaterSource>,
    /// Productions to look for. Matching ignores case and diacritics.
    #[serde(default = "default_titles")]
    pub target_titles: Vec<String>,
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// State file path; relative paths resolve against the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,
    /// User agent for listings and ticket pages; None = built-in browser UA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_titles() -> Vec<String> {
    vec!["Halka".to_string(), "Straszny Dwór".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theaters: default_theaters(),
            target_titles: default_titles(),
            monitor: MonitorSettings::default(),
            state_file: None,
            user_agent: None,
            browser: BrowserEngineConfig::default(),
            notifier: NotifierConfig::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Discover and load the configuration.
    ///
    /// Lookup order: explicit path, `SEATWATCH_CONFIG`, `./seatwatch.toml`,
    /// then `<user config dir>/seatwatch/seatwatch.toml`. Falls back to the
    /// built-in defaults when none exists.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path).await;
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                return Self::load_from_path(&candidate).await;
            }
        }

        tracing::debug!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(shellexpand::tilde(&env_path).as_ref()));
        }
        paths.push(PathBuf::from(CONFIG_FILENAME));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("seatwatch").join(CONFIG_FILENAME));
        }
        paths
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let parse_err = |reason: String| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        match ext {
            "json" => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            _ => toml::from_str(contents).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Reject configurations a tick cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.theaters.iter().any(|t| t.enabled) {
            return Err(ConfigError::NoSources);
        }
        if self.target_titles.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::NoTitles);
        }
        if self.monitor.min_adjacent_seats == 0 {
            return Err(ConfigError::Invalid(
                "monitor.min_adjacent_seats must be at least 1".to_string(),
            ));
        }
        if self.monitor.source_concurrency == 0 || self.monitor.check_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        if self.monitor.fact_kinds.is_empty() {
            return Err(ConfigError::Invalid(
                "monitor.fact_kinds must enable at least one fact kind".to_string(),
            ));
        }
        for theater in &self.theaters {
            url::Url::parse(&theater.repertoire_url).map_err(|e| {
                ConfigError::Invalid(format!(
                    "{}: bad repertoire_url {}: {}",
                    theater.identity(),
                    theater.repertoire_url,
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to the config file location
    pub fn resolve_path(&self, path_str: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    /// Location of the persisted monitor state.
    pub fn state_path(&self) -> PathBuf {
        self.resolve_path(self.state_file.as_deref().unwrap_or(DEFAULT_STATE_FILENAME))
    }
}

fn theater(
    name: &str,
    city: &str,
    base_url: &str,
    repertoire_url: &str,
    tickets_url: &str,
    variant: AdapterVariant,
) -> TheaterSource {
    TheaterSource {
        name: name.to_string(),
        city: city.to_string(),
        base_url: base_url.to_string(),
        repertoire_url: repertoire_url.to_string(),
        tickets_url: Some(tickets_url.to_string()),
        variant,
        enabled: true,
    }
}

/// The Polish opera houses monitored out of the box.
pub fn default_theaters() -> Vec<TheaterSource> {
    use AdapterVariant::*;
    vec![
        theater(
            "Teatr Wielki - Opera Narodowa",
            "Warszawa",
            "https://teatrwielki.pl",
            "https://teatrwielki.pl/kalendarium/",
            "https://teatrwielki.pl/bilety/",
            TeatrWielki,
        ),
        theater(
            "Opera Krakowska",
            "Kraków",
            "https://opera.krakow.pl",
            "https://opera.krakow.pl/pl/repertuar",
            "https://opera.krakow.pl/pl/bilety",
            Generic,
        ),
        theater(
            "Opera Wrocławska",
            "Wrocław",
            "https://www.opera.wroclaw.pl",
            "https://www.opera.wroclaw.pl/1/repertuar.php",
            "https://bilety.opera.wroclaw.pl/",
            OperaWroclaw,
        ),
        theater(
            "Opera Bałtycka",
            "Gdańsk",
            "https://operabaltycka.pl",
            "https://operabaltycka.pl/repertuar/",
            "https://operabaltycka.pl/bilety/",
            Generic,
        ),
        theater(
            "Opera Śląska",
            "Bytom",
            "https://opera-slaska.pl",
            "https://opera-slaska.pl/repertuar",
            "https://opera-slaska.pl/bilety",
            Generic,
        ),
        theater(
            "Opera Nova",
            "Bydgoszcz",
            "https://opera.bydgoszcz.pl",
            "https://opera.bydgoszcz.pl/repertuar.html",
            "https://opera.bydgoszcz.pl/bilety.html",
            Generic,
        ),
        theater(
            "Teatr Wielki",
            "Łódź",
            "https://operalodz.com",
            "https://operalodz.com/Kalendarz,234",
            "https://operalodz.com/bilety",
            Generic,
        ),
        theater(
            "Teatr Wielki im. Stanisława Moniuszki",
            "Poznań",
            "https://opera.poznan.pl",
            "https://opera.poznan.pl/pl/repertuar",
            "https://opera.poznan.pl/pl/bilety",
            Generic,
        ),
        theater(
            "Opera i Filharmonia Podlaska",
            "Białystok",
            "https://oifp.eu",
            "https://oifp.eu/repertuar/",
            "https://oifp.eu/bilety/",
            Generic,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.theaters.len(), 9);
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.min_adjacent_seats, 2);
        assert_eq!(config.monitor.horizon_months, 6);
    }

    #[test]
    fn test_file_without_theaters_is_rejected() {
        let config = Config::parse("target_titles = [\"Halka\"]\n", Path::new("c.toml")).unwrap();
        assert!(config.theaters.is_empty());
        assert!(matches!(config.validate(), Err(ConfigError::NoSources)));
    }

    #[test]
    fn test_all_disabled_theaters_is_no_sources() {
        let mut config = Config::default();
        for t in &mut config.theaters {
            t.enabled = false;
        }
        assert!(matches!(config.validate(), Err(ConfigError::NoSources)));
    }

    #[test]
    fn test_parse_toml_with_partial_monitor_section() {
        let toml = r#"
            target_titles = ["Halka"]
            state_file = "state/seen.json"

            [monitor]
            min_adjacent_seats = 3
            fact_kinds = ["listed", "seats_available"]

            [[theaters]]
            name = "Opera Nova"
            city = "Bydgoszcz"
            base_url = "https://opera.bydgoszcz.pl"
            repertoire_url = "https://opera.bydgoszcz.pl/repertuar.html"

            [notifier]
            kind = "webhook"
            url = "https://hooks.example.com/seatwatch"
        "#;
        let mut config = Config::parse(toml, Path::new("seatwatch.toml")).unwrap();
        config.source_path = Some(PathBuf::from("/etc/seatwatch/seatwatch.toml"));

        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.min_adjacent_seats, 3);
        assert_eq!(config.monitor.horizon_months, 6);
        assert!(config.monitor.fact_enabled(FactKind::Listed));
        assert_eq!(config.theaters[0].variant, AdapterVariant::Generic);
        assert!(config.theaters[0].enabled);
        assert_eq!(
            config.state_path(),
            PathBuf::from("/etc/seatwatch/state/seen.json")
        );
        assert!(matches!(config.notifier, NotifierConfig::Webhook { timeout_secs: 15, .. }));
    }

    #[test]
    fn test_parse_json_and_yaml() {
        let json = r#"{"theaters": [], "target_titles": ["Halka"]}"#;
        let config = Config::parse(json, Path::new("c.json")).unwrap();
        assert_eq!(config.target_titles, vec!["Halka".to_string()]);

        let yaml = "target_titles:\n  - Straszny Dwór\nmonitor:\n  horizon_months: 3\n";
        let config = Config::parse(yaml, Path::new("c.yaml")).unwrap();
        assert_eq!(config.monitor.horizon_months, 3);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = Config::parse("theaters = [", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_zero_threshold_is_invalid() {
        let mut config = Config::default();
        config.monitor.min_adjacent_seats = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
