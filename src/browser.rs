use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::config::{BrowserBuilder, BrowserConfig};
use crate::error::{Error, Result};
use crate::page::Page;

/// Chrome flags that improve performance without affecting functionality.
const PERF_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "no-first-run",
    "disable-dev-shm-usage",
    "disable-client-side-phishing-detection",
    "disable-prompt-on-repost",
];

/// Flags that keep notification prompts and the password manager from
/// covering form controls.
const QUIET_ARGS: &[&str] = &[
    "disable-notifications",
    "disable-save-password-bubble",
    "disable-infobars",
];

/// Resource types dropped in fast mode.
const HEAVY_RESOURCES: &[ResourceType] = &[ResourceType::Image, ResourceType::Media, ResourceType::Font];

/// A launched Chromium instance.
pub struct FormBrowser {
    browser: CrBrowser,
    block_heavy_resources: bool,
    default_timeout: std::time::Duration,
    handler_task: tokio::task::JoinHandle<()>,
}

impl FormBrowser {
    /// Create a new BrowserBuilder for configuring and launching a browser.
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Launch a browser instance with the given configuration.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        // chromiumoxide adds the `--` prefix itself
        for arg in PERF_ARGS.iter().chain(QUIET_ARGS) {
            builder = builder.arg(*arg);
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        let cr_config = builder
            .build()
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        debug!(headless = config.headless, fast = config.block_heavy_resources, "browser launched");

        Ok(Self {
            browser,
            block_heavy_resources: config.block_heavy_resources,
            default_timeout: config.default_timeout,
            handler_task,
        })
    }

    /// Open a new page (tab) navigated to the given URL.
    /// In fast mode, heavy resources are blocked before navigation starts.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let cr_page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;

        if self.block_heavy_resources {
            Self::block_heavy_resources(&cr_page).await?;
        }

        let page = Page::new(cr_page, self.default_timeout);
        if url != "about:blank" {
            page.goto(url).await?;
        }
        Ok(page)
    }

    /// Intercept image, media and font requests and fail them.
    async fn block_heavy_resources(cr_page: &chromiumoxide::page::Page) -> Result<()> {
        // Subscribe BEFORE enabling the fetch domain so no paused request is missed
        let mut paused = cr_page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| Error::LaunchError(format!("Failed to listen for paused requests: {e}")))?;

        let patterns = HEAVY_RESOURCES
            .iter()
            .map(|kind| {
                RequestPattern::builder()
                    .resource_type(kind.clone())
                    .request_stage(RequestStage::Request)
                    .build()
            })
            .collect::<Vec<_>>();

        cr_page
            .execute(EnableParams::builder().patterns(patterns).build())
            .await
            .map_err(|e| Error::LaunchError(format!("Failed to enable request blocking: {e}")))?;

        let page = cr_page.clone();
        tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let params =
                    FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
                if let Err(e) = page.execute(params).await {
                    warn!("Failed to block request: {e}");
                }
            }
        });

        Ok(())
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            warn!("Browser did not exit cleanly: {e}");
        }
        self.handler_task.abort();
        Ok(())
    }
}
