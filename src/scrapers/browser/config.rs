//! Browser engine configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Headless Chromium settings for rendering ticket pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false for debugging or if headless detection is an issue.
    pub headless: bool,

    /// Explicit Chrome/Chromium executable. Searched for when absent.
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    pub remote_url: Option<String>,

    /// Navigation timeout in seconds, covering load, settle and selector wait.
    pub timeout: u64,

    /// Wait for this CSS selector before reading the page.
    pub wait_for_selector: Option<String>,

    /// Extra time for late scripts to draw the seat map, in milliseconds.
    pub settle_ms: u64,

    /// Hide common automation fingerprints.
    pub stealth: bool,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            chrome_args: Vec::new(),
            remote_url: None,
            timeout: 45,
            wait_for_selector: None,
            settle_ms: 1500,
            stealth: true,
        }
    }
}

impl BrowserEngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
