// Probe results and the failure signals they carry

use crate::config::BrowserKind;
use crate::driver::RecordedRequest;
use crate::error::{Error, Result};
use crate::selectors::{Resolution, SelectorTier, Vendor, WidgetElement};
use crate::widget::{BotReply, CLOSE_OPERATION, OPEN_OPERATION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Individual checks run against the widget, in suite order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    WidgetPresence,
    OpenClose,
    MessageRoundTrip,
    EmptyMessage,
    LongMessage,
    SpecialCharacters,
    RapidMessages,
    ReopenPersistence,
}

impl ProbeKind {
    /// Full suite in execution order
    pub const ALL: [ProbeKind; 8] = [
        ProbeKind::WidgetPresence,
        ProbeKind::OpenClose,
        ProbeKind::MessageRoundTrip,
        ProbeKind::EmptyMessage,
        ProbeKind::LongMessage,
        ProbeKind::SpecialCharacters,
        ProbeKind::RapidMessages,
        ProbeKind::ReopenPersistence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProbeKind::WidgetPresence => "widget presence",
            ProbeKind::OpenClose => "open and close",
            ProbeKind::MessageRoundTrip => "message round trip",
            ProbeKind::EmptyMessage => "empty message",
            ProbeKind::LongMessage => "long message",
            ProbeKind::SpecialCharacters => "special characters",
            ProbeKind::RapidMessages => "rapid messages",
            ProbeKind::ReopenPersistence => "reopen persistence",
        }
    }

    /// File-name friendly identifier
    pub fn slug(&self) -> &'static str {
        match self {
            ProbeKind::WidgetPresence => "widget-presence",
            ProbeKind::OpenClose => "open-close",
            ProbeKind::MessageRoundTrip => "message-round-trip",
            ProbeKind::EmptyMessage => "empty-message",
            ProbeKind::LongMessage => "long-message",
            ProbeKind::SpecialCharacters => "special-characters",
            ProbeKind::RapidMessages => "rapid-messages",
            ProbeKind::ReopenPersistence => "reopen-persistence",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Passed,
    Failed,
    Skipped,
}

/// Raw failure observation, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum FailureSignal {
    // Browser-side
    SelectorNotFound { element: WidgetElement, tried: usize },
    DegradedSelector {
        element: WidgetElement,
        tier: SelectorTier,
        selector: String,
    },
    WidgetMissing,
    NavigationFailed { status: u16 },
    OpenFailed { detail: String },
    CloseFailed { detail: String },
    NoResponse { timeout_ms: u64 },
    DroppedReplies { expected: usize, received: usize },
    SlowResponse { latency_ms: u64, threshold_ms: u64 },
    EmptyResponse,
    ShortResponse { chars: usize, min: usize },
    ErrorResponse { pattern: String, excerpt: String },
    MessageNotRendered { expected: usize, rendered: usize },
    InputNotCleared,
    EmptyMessageAccepted,
    MarkupInjected { nodes: usize },
    HistoryLost { before: usize, after: usize },
    BrowserError { detail: String },

    // API-side
    HighErrorRate { rate: f64, threshold: f64 },
    LatencyBreach { p95_ms: u64, threshold_ms: u64 },
    RateLimited { count: usize },
    ServerErrors { count: usize },
    RequestTimeouts { count: usize },
    ConnectionErrors { count: usize },
}

impl FailureSignal {
    /// Maps an error raised while probing onto a signal
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::ElementNotFound { element, tried } => FailureSignal::SelectorNotFound {
                element: *element,
                tried: *tried,
            },
            Error::WidgetMissing { .. } => FailureSignal::WidgetMissing,
            Error::NavigationFailed { status, .. } => {
                FailureSignal::NavigationFailed { status: *status }
            }
            Error::Timeout { operation, .. } if operation == OPEN_OPERATION => {
                FailureSignal::OpenFailed {
                    detail: err.to_string(),
                }
            }
            Error::Timeout { operation, .. } if operation == CLOSE_OPERATION => {
                FailureSignal::CloseFailed {
                    detail: err.to_string(),
                }
            }
            Error::Timeout { duration_ms, .. } => FailureSignal::NoResponse {
                timeout_ms: *duration_ms,
            },
            Error::Context(_, inner) => Self::from_error(inner),
            other => FailureSignal::BrowserError {
                detail: other.to_string(),
            },
        }
    }

    /// True for signals produced by the load run
    pub fn is_api_side(&self) -> bool {
        matches!(
            self,
            FailureSignal::HighErrorRate { .. }
                | FailureSignal::LatencyBreach { .. }
                | FailureSignal::RateLimited { .. }
                | FailureSignal::ServerErrors { .. }
                | FailureSignal::RequestTimeouts { .. }
                | FailureSignal::ConnectionErrors { .. }
        )
    }

    /// One-line human description used as issue evidence
    pub fn describe(&self) -> String {
        match self {
            FailureSignal::SelectorNotFound { element, tried } => {
                format!("No {element} found after trying {tried} selectors")
            }
            FailureSignal::DegradedSelector {
                element,
                tier,
                selector,
            } => format!(
                "{element} located only by {} selector `{selector}`",
                tier.name()
            ),
            FailureSignal::WidgetMissing => "Chat widget did not load on the page".to_string(),
            FailureSignal::NavigationFailed { status } => {
                format!("Host page returned HTTP {status}")
            }
            FailureSignal::OpenFailed { detail } => format!("Widget did not open: {detail}"),
            FailureSignal::CloseFailed { detail } => format!("Widget did not close: {detail}"),
            FailureSignal::NoResponse { timeout_ms } => {
                format!("No reply within {timeout_ms}ms")
            }
            FailureSignal::DroppedReplies { expected, received } => {
                format!("Only {received} of {expected} burst messages were answered")
            }
            FailureSignal::SlowResponse {
                latency_ms,
                threshold_ms,
            } => format!("Reply took {latency_ms}ms (limit {threshold_ms}ms)"),
            FailureSignal::EmptyResponse => "Reply was empty".to_string(),
            FailureSignal::ShortResponse { chars, min } => {
                format!("Reply had {chars} characters (minimum {min})")
            }
            FailureSignal::ErrorResponse { excerpt, .. } => {
                format!("Reply looked like an error: \"{excerpt}\"")
            }
            FailureSignal::MessageNotRendered { expected, rendered } => {
                format!("{rendered} of {expected} sent messages appeared in the conversation")
            }
            FailureSignal::InputNotCleared => {
                "Message input kept its text after sending".to_string()
            }
            FailureSignal::EmptyMessageAccepted => {
                "Whitespace-only message was posted to the conversation".to_string()
            }
            FailureSignal::MarkupInjected { nodes } => {
                format!("User-supplied markup was rendered as {nodes} DOM element(s)")
            }
            FailureSignal::HistoryLost { before, after } => {
                format!("Conversation shrank from {before} to {after} messages after reopening")
            }
            FailureSignal::BrowserError { detail } => format!("Browser error: {detail}"),
            FailureSignal::HighErrorRate { rate, threshold } => format!(
                "API error rate {:.1}% (limit {:.1}%)",
                rate * 100.0,
                threshold * 100.0
            ),
            FailureSignal::LatencyBreach {
                p95_ms,
                threshold_ms,
            } => format!("API p95 latency {p95_ms}ms (limit {threshold_ms}ms)"),
            FailureSignal::RateLimited { count } => {
                format!("{count} requests rejected with HTTP 429")
            }
            FailureSignal::ServerErrors { count } => {
                format!("{count} requests failed with HTTP 5xx")
            }
            FailureSignal::RequestTimeouts { count } => format!("{count} requests timed out"),
            FailureSignal::ConnectionErrors { count } => {
                format!("{count} requests could not connect")
            }
        }
    }
}

/// Result of one probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub kind: ProbeKind,
    pub status: ProbeStatus,
    #[serde(with = "crate::serde_millis")]
    pub duration: Duration,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub replies: Vec<BotReply>,
    #[serde(default)]
    pub failures: Vec<FailureSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

impl ProbeOutcome {
    pub fn skipped(kind: ProbeKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            status: ProbeStatus::Skipped,
            duration: Duration::ZERO,
            notes: vec![reason.into()],
            replies: Vec::new(),
            failures: Vec::new(),
            screenshot: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ProbeStatus::Passed
    }
}

/// Everything a browser probe run produced; saved as JSON between commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRun {
    pub target: String,
    pub vendor: Vendor,
    pub browser: BrowserKind,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<ProbeOutcome>,
    /// Final selector resolutions per element
    #[serde(default)]
    pub resolutions: Vec<Resolution>,
    /// Requests observed while probing
    #[serde(default)]
    pub requests: Vec<RecordedRequest>,
}

impl ProbeRun {
    pub fn count(&self, status: ProbeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Probes that ran (passed or failed)
    pub fn executed(&self) -> usize {
        self.outcomes.len() - self.count(ProbeStatus::Skipped)
    }

    pub fn pass_rate(&self) -> f64 {
        match self.executed() {
            0 => 0.0,
            n => self.count(ProbeStatus::Passed) as f64 / n as f64,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        crate::read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_unwraps_context() {
        let err = Error::ElementNotFound {
            element: WidgetElement::MessageInput,
            tried: 12,
        }
        .context("round trip");

        assert_eq!(
            FailureSignal::from_error(&err),
            FailureSignal::SelectorNotFound {
                element: WidgetElement::MessageInput,
                tried: 12
            }
        );
    }

    #[test]
    fn test_timeouts_keep_their_operation() {
        let timeout = |operation: &str| Error::Timeout {
            operation: operation.to_string(),
            duration_ms: 500,
        };

        assert!(matches!(
            FailureSignal::from_error(&timeout(OPEN_OPERATION)),
            FailureSignal::OpenFailed { .. }
        ));
        assert!(matches!(
            FailureSignal::from_error(&timeout(CLOSE_OPERATION).context("reopen")),
            FailureSignal::CloseFailed { .. }
        ));
        assert_eq!(
            FailureSignal::from_error(&timeout("bot reply")),
            FailureSignal::NoResponse { timeout_ms: 500 }
        );
    }

    #[test]
    fn test_signal_json_shape() {
        let signal = FailureSignal::SlowResponse {
            latency_ms: 6200,
            threshold_ms: 5000,
        };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["signal"], "slow_response");
        assert_eq!(json["latency_ms"], 6200);
        assert!(!signal.is_api_side());
        assert!(FailureSignal::RateLimited { count: 3 }.is_api_side());
    }
}
