// Chat widget page object
//
// Wraps a `WidgetDriver` with the widget's vocabulary: detect, open, close,
// send, wait for a reply. Element lookups go through the selector resolver
// so the same probe runs against any vendor's markup.

use crate::driver::WidgetDriver;
use crate::error::{Error, Result};
use crate::selectors::{Resolution, SelectorResolver, WidgetElement};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Operation named by the timeout when the container never shows up
pub const OPEN_OPERATION: &str = "open chat widget";
/// Operation named by the timeout when the container never hides
pub const CLOSE_OPERATION: &str = "close chat widget";

/// Timeouts used by the page object
#[derive(Debug, Clone, Copy)]
pub struct WidgetTiming {
    /// Wait for the widget to appear, open or close
    pub state_timeout: Duration,
    /// Wait for a bot reply
    pub response_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WidgetTiming {
    fn default() -> Self {
        Self {
            state_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Receipt for a submitted message, consumed by [`ChatWidget::wait_for_response`]
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub text: String,
    pub bot_count_before: usize,
    pub user_count_before: usize,
    pub sent_at: Instant,
    /// Whether the input was empty right after sending; `None` if unreadable
    pub input_cleared: Option<bool>,
}

/// A reply observed after sending a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotReply {
    /// Text of the newest bot message once it stopped changing
    pub text: String,
    /// Time from send until the reply first appeared
    #[serde(with = "crate::serde_millis")]
    pub latency: Duration,
    /// Number of bot messages added since sending
    pub new_messages: usize,
    pub typing_indicator_seen: bool,
}

/// Messages currently rendered in the widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub user: Vec<String>,
    pub bot: Vec<String>,
}

/// Page object for a third-party chat widget.
pub struct ChatWidget<D> {
    driver: D,
    resolver: SelectorResolver,
    timing: WidgetTiming,
    open: bool,
    url: String,
}

impl<D: WidgetDriver> ChatWidget<D> {
    pub fn new(driver: D, resolver: SelectorResolver, timing: WidgetTiming) -> Self {
        Self {
            driver,
            resolver,
            timing,
            open: false,
            url: String::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn resolver(&self) -> &SelectorResolver {
        &self.resolver
    }

    pub fn timing(&self) -> WidgetTiming {
        self.timing
    }

    /// Last known open/closed state
    pub fn is_marked_open(&self) -> bool {
        self.open
    }

    /// Loads the page hosting the widget.
    ///
    /// Cached selectors are dropped; the widget starts out closed.
    pub async fn navigate(&mut self, url: &str) -> Result<Option<u16>> {
        self.url = url.to_string();
        self.open = false;
        self.resolver.invalidate();

        let status = self.driver.goto(url).await?;
        if let Some(code) = status.filter(|&code| code >= 400) {
            return Err(Error::NavigationFailed {
                url: url.to_string(),
                status: code,
            });
        }
        Ok(status)
    }

    /// Reloads the page, keeping the target URL
    pub async fn reload(&mut self) -> Result<()> {
        self.open = false;
        self.resolver.invalidate();
        self.driver.reload().await
    }

    /// Waits for the launcher or the container to show up.
    pub async fn detect(&self) -> Result<Resolution> {
        let deadline = Instant::now() + self.timing.state_timeout;
        loop {
            for element in [WidgetElement::Launcher, WidgetElement::Container] {
                if let Some(found) = self.resolver.resolve_any(&self.driver, element).await? {
                    info!("Detected chat widget via {} ({})", element, found.selector);
                    return Ok(found);
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::WidgetMissing {
                    url: self.url.clone(),
                });
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    /// True if at least one element for `element` is visible right now
    pub async fn is_visible(&self, element: WidgetElement) -> Result<bool> {
        match self.resolver.cached(element) {
            Some(hit) => Ok(self.driver.count_visible(&hit.selector).await? > 0),
            None => Ok(self
                .resolver
                .resolve_any(&self.driver, element)
                .await?
                .is_some()),
        }
    }

    /// Checks the page for a visible widget container
    pub async fn is_open(&self) -> Result<bool> {
        self.is_visible(WidgetElement::Container).await
    }

    /// Opens the widget via its launcher. No-op when already open.
    pub async fn open(&mut self) -> Result<()> {
        if self.is_open().await? {
            self.open = true;
            return Ok(());
        }

        let launcher = self
            .resolver
            .resolve(&self.driver, WidgetElement::Launcher)
            .await?;
        self.driver.click(&launcher.selector).await?;

        let this = &*self;
        poll_until(this.timing, OPEN_OPERATION, || this.is_open()).await?;
        self.open = true;
        info!("Chat widget opened");
        Ok(())
    }

    /// Closes the widget. No-op when already closed.
    ///
    /// Uses the close control when one resolves, otherwise presses Escape in
    /// the message input.
    pub async fn close(&mut self) -> Result<()> {
        if !self.is_open().await? {
            self.open = false;
            return Ok(());
        }

        match self
            .resolver
            .resolve_any(&self.driver, WidgetElement::CloseButton)
            .await?
        {
            Some(close) => self.driver.click(&close.selector).await?,
            None => {
                debug!("No close control found, pressing Escape");
                let input = self
                    .resolver
                    .resolve(&self.driver, WidgetElement::MessageInput)
                    .await?;
                self.driver.press(&input.selector, "Escape").await?;
            }
        }

        let this = &*self;
        poll_until(this.timing, CLOSE_OPERATION, || async move {
            this.is_open().await.map(|open| !open)
        })
        .await?;
        self.open = false;
        info!("Chat widget closed");
        Ok(())
    }

    /// Texts of one message kind; empty when none are rendered yet
    async fn messages(&self, element: WidgetElement) -> Result<Vec<String>> {
        match self.resolver.resolve_any(&self.driver, element).await? {
            Some(found) => self.driver.texts(&found.selector).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn bot_messages(&self) -> Result<Vec<String>> {
        self.messages(WidgetElement::BotMessage).await
    }

    pub async fn user_messages(&self) -> Result<Vec<String>> {
        self.messages(WidgetElement::UserMessage).await
    }

    /// Everything currently rendered in the conversation
    pub async fn history(&self) -> Result<Transcript> {
        Ok(Transcript {
            user: self.user_messages().await?,
            bot: self.bot_messages().await?,
        })
    }

    /// Types `text` into the widget and submits it.
    ///
    /// Opens the widget first if needed. Submits with the send control when
    /// one resolves, otherwise with Enter.
    pub async fn send_message(&mut self, text: &str) -> Result<SentMessage> {
        if !self.open {
            self.open().await?;
        }

        let bot_count_before = self.bot_messages().await?.len();
        let user_count_before = self.user_messages().await?.len();

        let input = self
            .resolver
            .resolve(&self.driver, WidgetElement::MessageInput)
            .await?;
        self.driver.fill(&input.selector, text).await?;

        let sent_at = Instant::now();
        match self
            .resolver
            .resolve_any(&self.driver, WidgetElement::SendButton)
            .await?
        {
            Some(send) => self.driver.click(&send.selector).await?,
            None => self.driver.press(&input.selector, "Enter").await?,
        }

        let input_cleared = match self.driver.input_value(&input.selector).await {
            Ok(value) => Some(value.is_empty()),
            Err(e) => {
                debug!("Could not read input after send: {}", e);
                None
            }
        };

        debug!("Sent message ({} chars)", text.chars().count());
        Ok(SentMessage {
            text: text.to_string(),
            bot_count_before,
            user_count_before,
            sent_at,
            input_cleared,
        })
    }

    /// Waits until a new bot message appears and its text settles.
    ///
    /// The reply counts once its text is non-empty and identical across two
    /// consecutive polls; latency is measured to its first appearance.
    pub async fn wait_for_response(&self, sent: &SentMessage) -> Result<BotReply> {
        let deadline = sent.sent_at + self.timing.response_timeout;
        let mut first_seen: Option<Instant> = None;
        let mut last_text: Option<String> = None;
        let mut typing_seen = false;

        loop {
            let bot = self.bot_messages().await?;
            if bot.len() > sent.bot_count_before {
                let seen_at = *first_seen.get_or_insert_with(Instant::now);
                let newest = bot.last().map(|t| t.trim().to_string()).unwrap_or_default();

                if !newest.is_empty() && last_text.as_deref() == Some(newest.as_str()) {
                    let latency = seen_at.duration_since(sent.sent_at);
                    info!("Bot replied after {:?}", latency);
                    return Ok(BotReply {
                        text: newest,
                        latency,
                        new_messages: bot.len() - sent.bot_count_before,
                        typing_indicator_seen: typing_seen,
                    });
                }
                last_text = Some(newest);
            } else if !typing_seen {
                typing_seen = self.is_visible(WidgetElement::TypingIndicator).await?;
            }

            if Instant::now() >= deadline {
                // A reply that appeared but never settled is still a reply.
                if let Some(text) = last_text.filter(|t| !t.is_empty()) {
                    warn!("Bot reply still changing at timeout");
                    let latency = first_seen
                        .map(|at| at.duration_since(sent.sent_at))
                        .unwrap_or(self.timing.response_timeout);
                    return Ok(BotReply {
                        text,
                        latency,
                        new_messages: bot.len().saturating_sub(sent.bot_count_before),
                        typing_indicator_seen: typing_seen,
                    });
                }
                return Err(Error::Timeout {
                    operation: "bot reply".to_string(),
                    duration_ms: self.timing.response_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    /// Sends `text` and waits for the reply
    pub async fn ask(&mut self, text: &str) -> Result<(SentMessage, BotReply)> {
        let sent = self.send_message(text).await?;
        let reply = self.wait_for_response(&sent).await?;
        Ok((sent, reply))
    }
}

/// Polls `check` until it returns true or the state timeout elapses
async fn poll_until<F, Fut>(timing: WidgetTiming, operation: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timing.state_timeout;
    loop {
        if check().await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout {
                operation: operation.to_string(),
                duration_ms: timing.state_timeout.as_millis() as u64,
            });
        }
        tokio::time::sleep(timing.poll_interval).await;
    }
}
