// Playwright-backed driver and browser session lifecycle

use super::{NetworkLog, WidgetDriver};
use crate::config::{BrowserConfig, BrowserKind};
use crate::error::Result;
use crate::selectors::ElementProbe;
use async_trait::async_trait;
use playwright_rs::api::LaunchOptions;
use playwright_rs::protocol::{BrowserContextOptions, Viewport};
use playwright_rs::{Browser, BrowserContext, GotoOptions, Page, Playwright};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// [`WidgetDriver`] over a Playwright page.
#[derive(Clone)]
pub struct PlaywrightDriver {
    page: Page,
    navigation_timeout: Duration,
}

impl PlaywrightDriver {
    pub fn new(page: Page, navigation_timeout: Duration) -> Self {
        Self {
            page,
            navigation_timeout,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }
}

#[async_trait]
impl ElementProbe for PlaywrightDriver {
    async fn count_visible(&self, selector: &str) -> Result<usize> {
        let locator = self
            .page
            .locator(&format!("{selector} >> visible=true"))
            .await;
        Ok(locator.count().await?)
    }
}

#[async_trait]
impl WidgetDriver for PlaywrightDriver {
    async fn goto(&self, url: &str) -> Result<Option<u16>> {
        debug!("Navigating to {}", url);
        let options = GotoOptions::new().timeout(self.navigation_timeout);
        let response = self.page.goto(url, Some(options)).await?;
        Ok(response.map(|r| r.status()))
    }

    async fn reload(&self) -> Result<()> {
        self.page.reload(None).await?;
        Ok(())
    }

    async fn count_all(&self, selector: &str) -> Result<usize> {
        Ok(self.page.locator(selector).await.count().await?)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page.locator(selector).await.first().click(None).await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.page
            .locator(selector)
            .await
            .first()
            .fill(text, None)
            .await?;
        Ok(())
    }

    async fn press(&self, selector: &str, key: &str) -> Result<()> {
        self.page
            .locator(selector)
            .await
            .first()
            .press(key, None)
            .await?;
        Ok(())
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let locator = self.page.locator(selector).await;
        let count = locator.count().await?;
        let mut texts = Vec::with_capacity(count);
        for index in 0..count {
            texts.push(locator.nth(index as i32).inner_text().await?);
        }
        Ok(texts)
    }

    async fn input_value(&self, selector: &str) -> Result<String> {
        Ok(self
            .page
            .locator(selector)
            .await
            .first()
            .input_value(None)
            .await?)
    }

    async fn screenshot(&self, path: &Path) -> Result<Vec<u8>> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(self.page.screenshot_to_file(path, None).await?)
    }
}

/// A launched browser with one page and a request recorder attached.
pub struct BrowserSession {
    playwright: Playwright,
    browser: Browser,
    _context: BrowserContext,
    page: Page,
    network: NetworkLog,
    navigation_timeout: Duration,
}

impl BrowserSession {
    /// Launches Playwright and the configured browser, then opens a page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let playwright = Playwright::launch().await?;

        let browser_type = match config.kind {
            BrowserKind::Chromium => playwright.chromium(),
            BrowserKind::Firefox => playwright.firefox(),
            BrowserKind::Webkit => playwright.webkit(),
        };

        let mut launch = LaunchOptions::new().headless(config.headless);
        if let Some(ms) = config.slow_mo_ms {
            launch = launch.slow_mo(ms as f64);
        }
        let browser = browser_type.launch_with_options(launch).await?;
        info!(
            "Launched {} {} (headless: {})",
            browser.name(),
            browser.version(),
            config.headless
        );

        let mut context_options = BrowserContextOptions::builder().viewport(Viewport {
            width: config.viewport.width,
            height: config.viewport.height,
        });
        if let Some(user_agent) = &config.user_agent {
            context_options = context_options.user_agent(user_agent.clone());
        }
        let context = browser
            .new_context_with_options(context_options.build())
            .await?;
        let page = context.new_page().await?;

        let network = NetworkLog::new();
        network.attach(&page).await?;

        Ok(Self {
            playwright,
            browser,
            _context: context,
            page,
            network,
            navigation_timeout: config.navigation_timeout(),
        })
    }

    /// Driver bound to this session's page
    pub fn driver(&self) -> PlaywrightDriver {
        PlaywrightDriver::new(self.page.clone(), self.navigation_timeout)
    }

    pub fn network(&self) -> &NetworkLog {
        &self.network
    }

    /// Closes the browser and stops the Playwright server
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        self.playwright.shutdown().await?;
        Ok(())
    }
}
