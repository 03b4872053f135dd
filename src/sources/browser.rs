//! Headless page rendering
//!
//! The expensive tier of the scrape chain. A [`PageRenderer`] loads a URL in a
//! real browser engine and hands back the rendered markup, which is then run
//! through the same selector extraction as a static page.
//!
//! The Chromium implementation is compiled only with the `headless` feature.
//! Each render owns its own browser process: launched for the attempt and
//! torn down on every exit path.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Per-render settings
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Bound on the whole render, launch to capture
    pub timeout: Duration,
    /// Selector to wait for before capturing; absence is tolerated
    pub wait_for_selector: Option<String>,
    pub selector_wait: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            wait_for_selector: None,
            selector_wait: Duration::from_secs(5),
        }
    }
}

/// Renders a page and returns its final markup
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<String>;
}

#[cfg(feature = "headless")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "headless")]
mod chromium {
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::fetch::{
        ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    };
    use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
    use chromiumoxide::Page;
    use futures::StreamExt;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout, Instant};
    use tracing::{debug, warn};

    use super::{PageRenderer, RenderOptions};
    use crate::error::{IngestionError, Result};

    const SELECTOR_POLL: Duration = Duration::from_millis(250);

    fn browser_error(e: impl std::fmt::Display) -> IngestionError {
        IngestionError::Browser(e.to_string())
    }

    /// Launches a fresh headless Chromium per render
    #[derive(Debug, Clone)]
    pub struct ChromiumRenderer {
        executable: Option<PathBuf>,
        user_agent: String,
    }

    impl ChromiumRenderer {
        pub fn new(executable: Option<PathBuf>, user_agent: impl Into<String>) -> Self {
            Self {
                executable,
                user_agent: user_agent.into(),
            }
        }

        async fn launch(&self) -> Result<BrowserSession> {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .arg("--disable-dev-shm-usage")
                .arg("--disable-gpu")
                .arg(format!("--user-agent={}", self.user_agent));
            if let Some(path) = &self.executable {
                builder = builder.chrome_executable(path);
            }
            let config = builder.build().map_err(IngestionError::Browser)?;

            let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
            let driver = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(BrowserSession {
                browser,
                driver,
                interceptor: None,
            })
        }
    }

    #[async_trait]
    impl PageRenderer for ChromiumRenderer {
        async fn render(&self, url: &str, options: &RenderOptions) -> Result<String> {
            let mut session = self.launch().await?;

            let outcome = match timeout(options.timeout, session.capture(url, options)).await {
                Ok(result) => result,
                Err(_) => Err(IngestionError::Timeout(options.timeout)),
            };

            session.close().await;
            outcome
        }
    }

    /// One launched browser. Dropping it aborts the CDP driver tasks, so the
    /// process is reaped even when `close` is never reached.
    struct BrowserSession {
        browser: Browser,
        driver: JoinHandle<()>,
        interceptor: Option<JoinHandle<()>>,
    }

    impl BrowserSession {
        async fn capture(&mut self, url: &str, options: &RenderOptions) -> Result<String> {
            let page = self.browser.new_page("about:blank").await.map_err(browser_error)?;
            self.interceptor = Some(block_heavy_resources(&page).await?);

            page.goto(url).await.map_err(browser_error)?;

            if let Some(selector) = options.wait_for_selector.as_deref() {
                if !wait_for(&page, selector, options.selector_wait).await {
                    debug!(url = %url, selector = %selector, "Selector wait timed out, capturing anyway");
                }
            }

            page.content().await.map_err(browser_error)
        }

        async fn close(mut self) {
            if let Err(e) = self.browser.close().await {
                warn!(error = %e, "Browser close failed");
            }
            if let Err(e) = self.browser.wait().await {
                debug!(error = %e, "Browser process wait failed");
            }
        }
    }

    impl Drop for BrowserSession {
        fn drop(&mut self) {
            if let Some(interceptor) = self.interceptor.take() {
                interceptor.abort();
            }
            self.driver.abort();
        }
    }

    /// Fails image, font, stylesheet and media requests; continues the rest
    async fn block_heavy_resources(page: &Page) -> Result<JoinHandle<()>> {
        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(browser_error)?;
        page.execute(
            EnableParams::builder()
                .pattern(RequestPattern::builder().url_pattern("*").build())
                .build(),
        )
        .await
        .map_err(browser_error)?;

        let page = page.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let blocked = matches!(
                    event.resource_type,
                    ResourceType::Image | ResourceType::Font | ResourceType::Stylesheet | ResourceType::Media
                );
                let result = if blocked {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = result {
                    debug!(error = %e, "Request interception reply failed");
                }
            }
        }))
    }

    /// Polls for `selector` until it appears or `limit` elapses
    async fn wait_for(page: &Page, selector: &str, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            if page.find_element(selector).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(SELECTOR_POLL).await;
        }
    }
}
