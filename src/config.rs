use std::time::Duration;

use crate::browser::FormBrowser;
use crate::error::Result;

pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    /// Abort image, media and font requests to speed up page loads.
    pub block_heavy_resources: bool,
    /// Page navigation timeout (default: 30s).
    pub default_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 1000,
            chrome_path: None,
            block_heavy_resources: false,
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Block images, media and fonts on every page opened by this browser.
    pub fn fast(mut self, fast: bool) -> Self {
        self.config.block_heavy_resources = fast;
        self
    }

    /// Set the page navigation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<FormBrowser> {
        FormBrowser::launch(self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing knobs for filling and submitting.
#[derive(Debug, Clone)]
pub struct FillSettings {
    /// How long to wait for the form to render.
    pub ready_timeout: Duration,
    /// How long to wait for a button to become available.
    pub button_timeout: Duration,
    /// How long to wait for a consent dialog button.
    pub consent_timeout: Duration,
    /// How long to wait for a configured success selector.
    pub success_timeout: Duration,
    /// Poll interval for bounded waits.
    pub poll_interval: Duration,
    /// Pause after opening a custom dropdown.
    pub widget_pause: Duration,
    /// Pause after paging with Next.
    pub page_pause: Duration,
    /// Pause after clicking submit, before the next row.
    pub after_submit_pause: Duration,
    /// Pause before the fallback success heuristics.
    pub settle_pause: Duration,
    /// Upper bound on Next/Continue clicks while looking for Submit.
    pub max_pages: usize,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(20),
            button_timeout: Duration::from_secs(5),
            consent_timeout: Duration::from_secs(2),
            success_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            widget_pause: Duration::from_millis(500),
            page_pause: Duration::from_millis(800),
            after_submit_pause: Duration::from_millis(1500),
            settle_pause: Duration::from_secs(3),
            max_pages: 5,
        }
    }
}

impl FillSettings {
    /// Scale the waits to an overall action timeout given on the command line.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self.success_timeout = timeout;
        self.button_timeout = self.button_timeout.min(timeout);
        self
    }
}
