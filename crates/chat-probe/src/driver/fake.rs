// In-memory chat widget for unit tests
//
// Answers only the primary `data-test-id` selectors, plus the
// `[data-chat-probe]` marker used by the markup-injection probe.

use super::WidgetDriver;
use crate::error::{Error, Result};
use crate::selectors::{ElementProbe, WidgetElement};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

type Responder = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Default)]
struct FakeState {
    open: bool,
    input: String,
    user: Vec<String>,
    bot: Vec<String>,
    pending: Vec<(Instant, String)>,
    markup_nodes: usize,
    clicks: Vec<String>,
    bot_read_errors: usize,
}

pub(crate) struct FakeWidget {
    state: Mutex<FakeState>,
    responder: Responder,
    pub present: bool,
    pub launcher_opens: bool,
    pub close_works: bool,
    pub accepts_empty: bool,
    pub renders_markup: bool,
    pub clears_input: bool,
    pub keeps_history: bool,
    pub reply_delay: Duration,
    /// Filling exactly this text fails like a detached input
    pub rejected_input: Option<String>,
}

impl FakeWidget {
    /// A well-behaved widget that echoes every message
    pub fn echo() -> Self {
        Self::with_responder(|text| Some(format!("You said: {text}")))
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(FakeState::default()),
            responder: Box::new(responder),
            present: true,
            launcher_opens: true,
            close_works: true,
            accepts_empty: false,
            renders_markup: false,
            clears_input: true,
            keeps_history: true,
            reply_delay: Duration::ZERO,
            rejected_input: None,
        }
    }

    pub fn selector(element: WidgetElement) -> String {
        format!("[data-test-id=\"{}\"]", element.test_id())
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn user_messages(&self) -> Vec<String> {
        self.state.lock().user.clone()
    }

    /// Makes the next `count` reads of rendered bot messages fail
    pub fn fail_bot_reads(&self, count: usize) {
        self.state.lock().bot_read_errors = count;
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    fn element(selector: &str) -> Option<WidgetElement> {
        WidgetElement::ALL
            .into_iter()
            .find(|&e| Self::selector(e) == selector)
    }

    fn deliver_ready(state: &mut FakeState) {
        let now = Instant::now();
        let (ready, waiting): (Vec<_>, Vec<_>) =
            state.pending.drain(..).partition(|(at, _)| *at <= now);
        state.pending = waiting;
        state.bot.extend(ready.into_iter().map(|(_, text)| text));
    }

    fn submit(&self, state: &mut FakeState) {
        let text = state.input.clone();
        if text.trim().is_empty() && !self.accepts_empty {
            return;
        }
        if self.renders_markup && text.contains("data-chat-probe") {
            state.markup_nodes += 1;
        }
        state.user.push(text.clone());
        if self.clears_input {
            state.input.clear();
        }
        if let Some(reply) = (self.responder)(&text) {
            state.pending.push((Instant::now() + self.reply_delay, reply));
        }
    }

    fn close(&self, state: &mut FakeState) {
        if self.close_works {
            state.open = false;
            if !self.keeps_history {
                state.user.clear();
                state.bot.clear();
            }
        }
    }
}

#[async_trait]
impl ElementProbe for FakeWidget {
    async fn count_visible(&self, selector: &str) -> Result<usize> {
        let mut state = self.state.lock();
        Self::deliver_ready(&mut state);

        if !self.present {
            return Ok(0);
        }
        let Some(element) = Self::element(selector) else {
            return Ok(0);
        };
        let open = usize::from(state.open);
        Ok(match element {
            WidgetElement::Launcher => usize::from(!state.open),
            WidgetElement::Container
            | WidgetElement::CloseButton
            | WidgetElement::MessageInput
            | WidgetElement::SendButton
            | WidgetElement::MessageList => open,
            WidgetElement::BotMessage => open * state.bot.len(),
            WidgetElement::UserMessage => open * state.user.len(),
            WidgetElement::TypingIndicator => open * usize::from(!state.pending.is_empty()),
        })
    }
}

#[async_trait]
impl WidgetDriver for FakeWidget {
    async fn goto(&self, _url: &str) -> Result<Option<u16>> {
        let mut state = self.state.lock();
        state.open = false;
        Ok(Some(200))
    }

    async fn reload(&self) -> Result<()> {
        self.state.lock().open = false;
        Ok(())
    }

    async fn count_all(&self, selector: &str) -> Result<usize> {
        if selector == "[data-chat-probe]" {
            return Ok(self.state.lock().markup_nodes);
        }
        self.count_visible(selector).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.clicks.push(selector.to_string());
        match Self::element(selector) {
            Some(WidgetElement::Launcher) if self.launcher_opens => state.open = true,
            Some(WidgetElement::Launcher) => {}
            Some(WidgetElement::CloseButton) => self.close(&mut state),
            Some(WidgetElement::SendButton) => self.submit(&mut state),
            _ => return Err(Error::Config(format!("fake: cannot click {selector}"))),
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        if Self::element(selector) != Some(WidgetElement::MessageInput) {
            return Err(Error::Config(format!("fake: cannot fill {selector}")));
        }
        if self.rejected_input.as_deref() == Some(text) {
            return Err(Error::Config(format!("fake: input detached while typing {text:?}")));
        }
        self.state.lock().input = text.to_string();
        Ok(())
    }

    async fn press(&self, _selector: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        match key {
            "Enter" => self.submit(&mut state),
            "Escape" => self.close(&mut state),
            _ => {}
        }
        Ok(())
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        Self::deliver_ready(&mut state);
        let element = Self::element(selector);
        if element == Some(WidgetElement::BotMessage) && state.bot_read_errors > 0 {
            state.bot_read_errors -= 1;
            return Err(Error::Config("fake: target page closed".to_string()));
        }
        Ok(match element {
            Some(WidgetElement::BotMessage) => state.bot.clone(),
            Some(WidgetElement::UserMessage) => state.user.clone(),
            _ => Vec::new(),
        })
    }

    async fn input_value(&self, _selector: &str) -> Result<String> {
        Ok(self.state.lock().input.clone())
    }

    async fn screenshot(&self, _path: &Path) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }
}
