//! Headless Chromium rendering of ticket pages.
//!
//! Seat maps on Polish ticketing platforms are drawn by JavaScript, so the
//! classifier works on the rendered DOM rather than the served HTML. Uses
//! chromiumoxide (CDP) with light stealth patches.

mod config;
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
mod slot;

pub use config::BrowserEngineConfig;

use async_trait::async_trait;

use crate::error::CheckError;

/// Rendered DOM of a page and where the browser ended up.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: String,
}

/// Turns a URL into rendered HTML. One page per call, closed before return.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, CheckError>;
}

#[cfg(feature = "browser")]
pub use chromium::BrowserRenderer;

#[cfg(feature = "browser")]
mod chromium {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tracing::{debug, info, warn};

    use super::slot::Slot;
    use super::{BrowserEngineConfig, PageRenderer, RenderedPage};
    use crate::error::CheckError;

    const STEALTH_SCRIPTS: &[&str] = &[
        "Object.defineProperty(navigator, 'webdriver', { get: () => undefined })",
        "Object.defineProperty(navigator, 'languages', { get: () => ['pl-PL', 'pl', 'en'] })",
        "window.chrome = window.chrome || { runtime: {} }",
    ];

    const WAIT_FOR_LOAD: &str = r#"
        new Promise((resolve) => {
            if (document.readyState === 'complete') {
                resolve(document.readyState);
            } else {
                window.addEventListener('load', () => resolve(document.readyState));
                setTimeout(() => resolve(document.readyState), 15000);
            }
        })
    "#;

    /// Renderer backed by a lazily launched (or remote) Chromium.
    pub struct BrowserRenderer {
        config: BrowserEngineConfig,
        user_agent: String,
        browser: Slot<Browser>,
    }

    impl BrowserRenderer {
        /// Common Chrome executable paths to check.
        const CHROME_PATHS: &'static [&'static str] = &[
            // Linux
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            // macOS
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            // Common install locations
            "/opt/google/chrome/google-chrome",
        ];

        pub fn new(config: BrowserEngineConfig, user_agent: String) -> Self {
            Self {
                config,
                user_agent,
                browser: Slot::new(),
            }
        }

        /// Find Chrome executable.
        fn find_chrome(&self) -> Result<PathBuf, CheckError> {
            if let Some(path) = &self.config.chrome_path {
                return Ok(path.clone());
            }

            for path in Self::CHROME_PATHS {
                let p = std::path::Path::new(path);
                if p.exists() {
                    info!("Found Chrome at: {}", path);
                    return Ok(p.to_path_buf());
                }
            }

            // Check if in PATH via `which`
            for cmd in &[
                "google-chrome",
                "google-chrome-stable",
                "chromium",
                "chromium-browser",
            ] {
                if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                    if output.status.success() {
                        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                        if !path.is_empty() {
                            info!("Found Chrome in PATH: {}", path);
                            return Ok(PathBuf::from(path));
                        }
                    }
                }
            }

            Err(CheckError::Browser(
                "Chrome/Chromium not found; install it or set browser.chrome_path".to_string(),
            ))
        }

        /// Launch or connect to the browser if not already running.
        async fn ensure_browser(&self) -> Result<Arc<Browser>, CheckError> {
            self.browser
                .get_or_start(|| async {
                    match self.config.remote_url.as_deref() {
                        Some(remote_url) => self.connect_remote(remote_url).await,
                        None => self.launch().await,
                    }
                })
                .await
        }

        /// Open a blank tab. A browser that refuses (crashed, handler gone)
        /// is dropped and started again once.
        async fn open_page(&self) -> Result<Page, CheckError> {
            let browser = self.ensure_browser().await?;
            match browser.new_page("about:blank").await {
                Ok(page) => Ok(page),
                Err(e) => {
                    warn!("Browser stopped responding ({}), starting a new one", e);
                    self.browser.discard(&browser).await;
                    self.ensure_browser()
                        .await?
                        .new_page("about:blank")
                        .await
                        .map_err(|e| CheckError::Browser(format!("could not open page: {}", e)))
                }
            }
        }

        async fn launch(&self) -> Result<Browser, CheckError> {
            info!("Launching browser (headless={})", self.config.headless);

            let chrome_path = self.find_chrome()?;
            let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

            // with_head means NOT headless
            if !self.config.headless {
                builder = builder.with_head();
            }

            builder = builder
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-infobars")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-default-browser-check")
                .arg("--disable-background-networking")
                .arg("--disable-sync")
                .arg("--disable-translate")
                .arg("--lang=pl-PL")
                .arg("--no-sandbox") // Often needed for headless in containers
                .arg("--disable-gpu")
                .arg("--disable-software-rasterizer");

            for arg in &self.config.chrome_args {
                builder = builder.arg(arg);
            }

            let config = builder
                .build()
                .map_err(|e| CheckError::Browser(format!("invalid browser config: {}", e)))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| CheckError::Browser(format!("failed to launch browser: {}", e)))?;

            tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        }

        /// Connect to a remote Chrome instance.
        async fn connect_remote(&self, url: &str) -> Result<Browser, CheckError> {
            info!("Connecting to remote browser at {}", url);

            // Get WebSocket URL from the /json/version endpoint
            let http_url = url
                .replace("ws://", "http://")
                .replace("wss://", "https://");
            let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

            let unreachable =
                |e: reqwest::Error| CheckError::Browser(format!("remote browser unreachable: {}", e));
            let resp: serde_json::Value = reqwest::Client::new()
                .get(&version_url)
                .timeout(self.config.timeout())
                .send()
                .await
                .map_err(unreachable)?
                .json()
                .await
                .map_err(unreachable)?;

            let ws_url = resp
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    CheckError::Browser("no webSocketDebuggerUrl in /json/version".to_string())
                })?;

            debug!("Connecting to WebSocket: {}", ws_url);

            let handler_config = chromiumoxide::handler::HandlerConfig {
                request_timeout: self.config.timeout(),
                ..Default::default()
            };

            let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
                .await
                .map_err(|e| CheckError::Browser(format!("failed to connect: {}", e)))?;

            tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        }

        async fn load(&self, page: &Page, url: &str) -> Result<RenderedPage, CheckError> {
            let navigation = |e: chromiumoxide::error::CdpError| CheckError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            };

            page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
                .await
                .map_err(navigation)?;

            debug!("Navigating to {}", url);
            let nav_params = NavigateParams::builder()
                .url(url)
                .build()
                .map_err(|e| CheckError::Navigation {
                    url: url.to_string(),
                    reason: e,
                })?;
            let nav = page.execute(nav_params).await.map_err(navigation)?;
            if let Some(error_text) = nav.result.error_text.clone() {
                return Err(CheckError::Navigation {
                    url: url.to_string(),
                    reason: error_text,
                });
            }

            match page.evaluate(WAIT_FOR_LOAD.to_string()).await {
                Ok(result) => {
                    let state: String = result.into_value().unwrap_or_else(|_| "unknown".into());
                    debug!("Page ready state: {}", state);
                }
                Err(e) => debug!("Could not check ready state: {}", e),
            }

            if self.config.stealth {
                for script in STEALTH_SCRIPTS {
                    if let Err(e) = page.evaluate(script.to_string()).await {
                        debug!("Stealth script injection skipped: {}", e);
                    }
                }
            }

            // Seat maps are usually drawn after load by a separate request.
            tokio::time::sleep(self.config.settle()).await;

            if let Some(ref selector) = self.config.wait_for_selector {
                debug!("Waiting for selector: {}", selector);
                if let Err(e) = page.find_element(selector.as_str()).await {
                    warn!("Selector {} not found on {}: {}", selector, url, e);
                }
            }

            let final_url = page
                .url()
                .await
                .map_err(navigation)?
                .map(|u| u.to_string())
                .unwrap_or_else(|| url.to_string());
            let html = page.content().await.map_err(navigation)?;

            Ok(RenderedPage { html, final_url })
        }

        /// Drop the browser handle; a launched Chromium exits with it.
        pub async fn close(&self) {
            self.browser.clear().await;
        }
    }

    #[async_trait]
    impl PageRenderer for BrowserRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage, CheckError> {
            let page = self.open_page().await?;

            let timeout: Duration = self.config.timeout();
            let outcome = tokio::time::timeout(timeout, self.load(&page, url)).await;

            if let Err(e) = page.close().await {
                debug!("Closing page for {} failed: {}", url, e);
            }

            match outcome {
                Ok(result) => result,
                Err(_) => Err(CheckError::Timeout {
                    url: url.to_string(),
                    timeout,
                }),
            }
        }
    }
}

/// Stub for when browser feature is disabled.
#[cfg(not(feature = "browser"))]
pub struct BrowserRenderer;

#[cfg(not(feature = "browser"))]
impl BrowserRenderer {
    pub fn new(_config: BrowserEngineConfig, _user_agent: String) -> Self {
        Self
    }

    pub async fn close(&self) {}
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageRenderer for BrowserRenderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage, CheckError> {
        Err(CheckError::Browser(
            "browser support not compiled; rebuild with --features browser".to_string(),
        ))
    }
}
