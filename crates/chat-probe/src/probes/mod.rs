// Probe suite - Scripted checks against a live chat widget
//
// Probes run in a fixed order on one page. A failing probe records its
// signals and the suite moves on; only a missing widget skips the rest.

pub mod outcome;

pub use outcome::{FailureSignal, ProbeKind, ProbeOutcome, ProbeRun, ProbeStatus};

use crate::config::ProbeConfig;
use crate::driver::WidgetDriver;
use crate::error::{Error, Result};
use crate::widget::{BotReply, ChatWidget, WidgetTiming};
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Markup that must be shown as text; any `[data-chat-probe]` node means it was parsed
pub const MARKUP_PAYLOAD: &str =
    "<b data-chat-probe=\"1\">probe</b> & \"quotes\" 'apostrophes' ü ✓ 🙂";

/// Runs the probe list against a [`ChatWidget`]
pub struct ProbeSuite {
    config: ProbeConfig,
    error_patterns: Vec<Regex>,
    kinds: Vec<ProbeKind>,
}

/// Accumulates what one probe saw
#[derive(Default)]
struct Findings {
    notes: Vec<String>,
    replies: Vec<BotReply>,
    failures: Vec<FailureSignal>,
}

impl Findings {
    fn fail(&mut self, signal: FailureSignal) {
        warn!("{}", signal.describe());
        self.failures.push(signal);
    }

    fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

impl ProbeSuite {
    /// Creates the full suite
    pub fn new(config: ProbeConfig) -> Result<Self> {
        Self::with_kinds(config, ProbeKind::ALL.to_vec())
    }

    /// Creates a suite running only `kinds` (presence always runs first)
    pub fn with_kinds(config: ProbeConfig, mut kinds: Vec<ProbeKind>) -> Result<Self> {
        let error_patterns = config.compiled_error_patterns()?;
        kinds.retain(|k| *k != ProbeKind::WidgetPresence);
        kinds.insert(0, ProbeKind::WidgetPresence);
        kinds.dedup();
        Ok(Self {
            config,
            error_patterns,
            kinds,
        })
    }

    pub fn kinds(&self) -> &[ProbeKind] {
        &self.kinds
    }

    /// Page-object timing derived from the probe config
    pub fn timing(&self) -> WidgetTiming {
        WidgetTiming {
            state_timeout: self.config.widget_timeout(),
            response_timeout: self.config.response_timeout(),
            poll_interval: self.config.poll_interval(),
        }
    }

    /// Runs every probe against the widget hosted at `url`
    pub async fn run<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        url: &str,
    ) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(self.kinds.len());
        let mut widget_missing = false;

        for (index, &kind) in self.kinds.iter().enumerate() {
            if widget_missing {
                outcomes.push(ProbeOutcome::skipped(kind, "chat widget not found"));
                continue;
            }

            info!("Running probe: {}", kind);
            let started = Instant::now();
            let mut findings = Findings::default();

            let result = match kind {
                ProbeKind::WidgetPresence => self.widget_presence(widget, url, &mut findings).await,
                ProbeKind::OpenClose => self.open_close(widget, &mut findings).await,
                ProbeKind::MessageRoundTrip => self.round_trip(widget, &mut findings).await,
                ProbeKind::EmptyMessage => self.empty_message(widget, &mut findings).await,
                ProbeKind::LongMessage => self.long_message(widget, &mut findings).await,
                ProbeKind::SpecialCharacters => {
                    self.special_characters(widget, &mut findings).await
                }
                ProbeKind::RapidMessages => self.rapid_messages(widget, &mut findings).await,
                ProbeKind::ReopenPersistence => {
                    self.reopen_persistence(widget, &mut findings).await
                }
            };

            if let Err(e) = result {
                findings.fail(FailureSignal::from_error(&e));
            }

            let failed = !findings.failures.is_empty();
            if kind == ProbeKind::WidgetPresence && failed {
                widget_missing = true;
            }

            let screenshot = if failed && self.config.screenshot_on_failure {
                self.capture(widget, index, kind).await
            } else {
                None
            };

            let status = if failed {
                ProbeStatus::Failed
            } else {
                ProbeStatus::Passed
            };
            info!("Probe {} {:?} in {:?}", kind, status, started.elapsed());

            outcomes.push(ProbeOutcome {
                kind,
                status,
                duration: started.elapsed(),
                notes: findings.notes,
                replies: findings.replies,
                failures: findings.failures,
                screenshot,
            });
        }

        outcomes
    }

    async fn capture<D: WidgetDriver>(
        &self,
        widget: &ChatWidget<D>,
        index: usize,
        kind: ProbeKind,
    ) -> Option<PathBuf> {
        let path = PathBuf::from(&self.config.artifacts_dir)
            .join(format!("{:02}-{}.png", index + 1, kind.slug()));
        match widget.driver().screenshot(&path).await {
            Ok(_) => Some(path),
            Err(e) => {
                warn!("Screenshot for {} failed: {}", kind, e);
                None
            }
        }
    }

    async fn widget_presence<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        url: &str,
        findings: &mut Findings,
    ) -> Result<()> {
        if let Some(status) = widget.navigate(url).await? {
            findings.note(format!("page status {status}"));
        }
        let found = widget.detect().await?;
        findings.note(format!(
            "detected {} via {} selector {}",
            found.element,
            found.tier.name(),
            found.selector
        ));
        Ok(())
    }

    async fn open_close<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        findings: &mut Findings,
    ) -> Result<()> {
        if let Err(e) = widget.open().await {
            findings.fail(FailureSignal::OpenFailed {
                detail: e.to_string(),
            });
            return Ok(());
        }
        if let Err(e) = widget.close().await {
            findings.fail(FailureSignal::CloseFailed {
                detail: e.to_string(),
            });
        }
        Ok(())
    }

    /// Sends one message and checks the reply
    async fn exchange<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        text: &str,
        findings: &mut Findings,
    ) -> Result<()> {
        let sent = widget.send_message(text).await?;
        if sent.input_cleared == Some(false)
            && !findings.failures.contains(&FailureSignal::InputNotCleared)
        {
            findings.fail(FailureSignal::InputNotCleared);
        }

        let reply = widget.wait_for_response(&sent).await;

        let rendered = widget.user_messages().await?.len();
        if rendered <= sent.user_count_before {
            findings.fail(FailureSignal::MessageNotRendered {
                expected: 1,
                rendered: 0,
            });
        }

        match reply {
            Ok(reply) => {
                self.check_reply(&reply, findings);
                findings.replies.push(reply);
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                findings.fail(FailureSignal::NoResponse {
                    timeout_ms: self.config.response_timeout_ms,
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Applies the content and latency rules to one reply
    fn check_reply(&self, reply: &BotReply, findings: &mut Findings) {
        let text = reply.text.trim();
        let chars = text.chars().count();
        if chars == 0 {
            findings.fail(FailureSignal::EmptyResponse);
        } else if chars < self.config.min_response_chars {
            findings.fail(FailureSignal::ShortResponse {
                chars,
                min: self.config.min_response_chars,
            });
        }

        if let Some(pattern) = self.error_patterns.iter().find(|p| p.is_match(text)) {
            findings.fail(FailureSignal::ErrorResponse {
                pattern: pattern.as_str().to_string(),
                excerpt: excerpt(text, 80),
            });
        }

        if reply.latency > self.config.slow_response() {
            findings.fail(FailureSignal::SlowResponse {
                latency_ms: reply.latency.as_millis() as u64,
                threshold_ms: self.config.slow_response_ms,
            });
        }
    }

    async fn round_trip<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        findings: &mut Findings,
    ) -> Result<()> {
        if self.config.messages.is_empty() {
            findings.note("no messages configured");
            return Ok(());
        }
        for (n, message) in self.config.messages.iter().enumerate() {
            if let Err(e) = self.exchange(widget, message, findings).await {
                findings.note(format!(
                    "message {} ({:?}) failed: {}",
                    n + 1,
                    excerpt(message, 40),
                    e
                ));
                findings.fail(FailureSignal::from_error(&e));
            }
        }
        findings.note(format!("{} replies received", findings.replies.len()));
        Ok(())
    }

    async fn empty_message<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        findings: &mut Findings,
    ) -> Result<()> {
        let sent = widget.send_message("   ").await?;
        // Give the widget a couple of polls to (wrongly) post it
        tokio::time::sleep(self.config.poll_interval() * 2).await;

        let after = widget.user_messages().await?.len();
        if after > sent.user_count_before {
            findings.fail(FailureSignal::EmptyMessageAccepted);
        } else {
            findings.note("whitespace-only message was ignored");
        }
        Ok(())
    }

    async fn long_message<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        findings: &mut Findings,
    ) -> Result<()> {
        let text = long_text(self.config.long_message_chars);
        findings.note(format!("sent {} characters", text.chars().count()));
        self.exchange(widget, &text, findings).await
    }

    async fn special_characters<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        findings: &mut Findings,
    ) -> Result<()> {
        let sent = widget.send_message(MARKUP_PAYLOAD).await?;
        match widget.wait_for_response(&sent).await {
            Ok(reply) => findings.replies.push(reply),
            Err(e) if e.is_timeout() => findings.note("no reply to special characters"),
            Err(e) => return Err(e),
        }

        let nodes = widget.driver().count_all("[data-chat-probe]").await?;
        if nodes > 0 {
            findings.fail(FailureSignal::MarkupInjected { nodes });
        }

        let user = widget.user_messages().await?;
        if user.len() <= sent.user_count_before {
            findings.fail(FailureSignal::MessageNotRendered {
                expected: 1,
                rendered: 0,
            });
        } else if user.last().is_some_and(|t| t.contains("<b")) {
            findings.note("markup shown as text");
        }
        Ok(())
    }

    async fn rapid_messages<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        findings: &mut Findings,
    ) -> Result<()> {
        let burst = self.config.rapid_message_count.max(1);
        let mut first = None;
        for n in 1..=burst {
            let sent = widget.send_message(&format!("Burst message {n} of {burst}")).await?;
            first.get_or_insert(sent);
        }
        let Some(first) = first else {
            return Ok(());
        };

        let deadline = first.sent_at + self.config.response_timeout();
        let received = loop {
            let answered = widget
                .bot_messages()
                .await?
                .len()
                .saturating_sub(first.bot_count_before);
            if answered >= burst || Instant::now() >= deadline {
                break answered;
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        };

        let rendered = widget
            .user_messages()
            .await?
            .len()
            .saturating_sub(first.user_count_before);
        if rendered < burst {
            findings.fail(FailureSignal::MessageNotRendered {
                expected: burst,
                rendered,
            });
        }

        if received == 0 {
            findings.fail(FailureSignal::NoResponse {
                timeout_ms: self.config.response_timeout_ms,
            });
        } else if received < burst {
            findings.fail(FailureSignal::DroppedReplies {
                expected: burst,
                received,
            });
        }
        findings.note(format!("{received} replies to {burst} messages"));
        Ok(())
    }

    async fn reopen_persistence<D: WidgetDriver>(
        &self,
        widget: &mut ChatWidget<D>,
        findings: &mut Findings,
    ) -> Result<()> {
        widget.open().await?;
        let mut before = widget.history().await?;
        if before.user.is_empty() {
            let sent = widget.send_message("Checking conversation history").await?;
            match widget.wait_for_response(&sent).await {
                Ok(_) => {}
                Err(e) if e.is_timeout() => {
                    findings.note("no reply to the history check message")
                }
                Err(e) => return Err(e),
            }
            before = widget.history().await?;
        }
        let before_count = before.user.len() + before.bot.len();

        widget.close().await?;
        widget.open().await?;

        let after = widget.history().await?;
        let after_count = after.user.len() + after.bot.len();
        if after_count < before_count {
            findings.fail(FailureSignal::HistoryLost {
                before: before_count,
                after: after_count,
            });
        } else {
            findings.note(format!("{after_count} messages kept after reopening"));
        }
        Ok(())
    }
}

/// Deterministic filler text of exactly `chars` characters
fn long_text(chars: usize) -> String {
    const FILLER: &str = "This is a long customer message used to check input limits. ";
    FILLER.chars().cycle().take(chars.max(1)).collect()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

/// Maps a whole-run failure (e.g. browser launch) onto skipped outcomes
pub fn aborted_outcomes(kinds: &[ProbeKind], err: &Error) -> Vec<ProbeOutcome> {
    let signal = FailureSignal::from_error(err);
    kinds
        .iter()
        .enumerate()
        .map(|(index, &kind)| {
            if index == 0 {
                ProbeOutcome {
                    kind,
                    status: ProbeStatus::Failed,
                    duration: Duration::ZERO,
                    notes: vec![err.to_string()],
                    replies: Vec::new(),
                    failures: vec![signal.clone()],
                    screenshot: None,
                }
            } else {
                ProbeOutcome::skipped(kind, "run aborted")
            }
        })
        .collect()
}
