// Issue catalog - Signal classification and per-category impact data

use crate::probes::FailureSignal;
use crate::selectors::WidgetElement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad an issue is for users reaching the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Most severe first
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Contribution to the priority score
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 40.0,
            Severity::High => 30.0,
            Severity::Medium => 20.0,
            Severity::Low => 10.0,
        }
    }

    /// Deduction from the health score for one issue
    pub fn penalty(&self) -> u32 {
        match self {
            Severity::Critical => 30,
            Severity::High => 15,
            Severity::Medium => 8,
            Severity::Low => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    WidgetAvailability,
    WidgetInteraction,
    MessageDelivery,
    ResponseMissing,
    ResponseQuality,
    ResponsePerformance,
    ContentSecurity,
    ConversationState,
    ApiReliability,
    ApiCapacity,
    ApiLatency,
    SelectorDrift,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 12] = [
        IssueCategory::WidgetAvailability,
        IssueCategory::WidgetInteraction,
        IssueCategory::MessageDelivery,
        IssueCategory::ResponseMissing,
        IssueCategory::ResponseQuality,
        IssueCategory::ResponsePerformance,
        IssueCategory::ContentSecurity,
        IssueCategory::ConversationState,
        IssueCategory::ApiReliability,
        IssueCategory::ApiCapacity,
        IssueCategory::ApiLatency,
        IssueCategory::SelectorDrift,
    ];

    pub fn title(&self) -> &'static str {
        self.profile().title
    }

    /// True for categories fed by the load run
    pub fn is_api_side(&self) -> bool {
        matches!(
            self,
            IssueCategory::ApiReliability | IssueCategory::ApiCapacity | IssueCategory::ApiLatency
        )
    }

    pub fn profile(&self) -> &'static CategoryProfile {
        &PROFILES[*self as usize]
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Static impact data for one category
#[derive(Debug)]
pub struct CategoryProfile {
    pub title: &'static str,
    pub severity: Severity,
    /// Share of the audience that walks the failing path
    pub exposure: f64,
    pub impact_weight: f64,
    pub business_impact: &'static str,
    pub recommendation: &'static str,
}

// Indexed by `IssueCategory as usize`
static PROFILES: [CategoryProfile; 12] = [
    CategoryProfile {
        title: "Widget availability",
        severity: Severity::Critical,
        exposure: 1.0,
        impact_weight: 40.0,
        business_impact: "Visitors cannot reach support chat at all; every chat-originated lead and support deflection is lost.",
        recommendation: "Check that the widget script loads on the page (CSP, ad blockers, consent gating, vendor outage) and that the launcher renders after page load.",
    },
    CategoryProfile {
        title: "Widget interaction",
        severity: Severity::High,
        exposure: 0.8,
        impact_weight: 30.0,
        business_impact: "Visitors who find the widget struggle to open, close or type into it and abandon the conversation.",
        recommendation: "Verify launcher and close controls respond to clicks, the input clears after sending, and blank messages are rejected client-side.",
    },
    CategoryProfile {
        title: "Message delivery",
        severity: Severity::Critical,
        exposure: 0.7,
        impact_weight: 35.0,
        business_impact: "Messages typed by visitors never appear in the conversation, so questions go unanswered without any visible error.",
        recommendation: "Trace the send path from the input to the transcript; look for dropped submits, failed optimistic renders and client-side exceptions.",
    },
    CategoryProfile {
        title: "Missing responses",
        severity: Severity::Critical,
        exposure: 0.7,
        impact_weight: 40.0,
        business_impact: "Visitors ask a question and get silence, which reads as a broken product and drives churn to other channels.",
        recommendation: "Check bot or agent routing, backend availability and queueing under concurrent messages; add a fallback reply when no answer is produced.",
    },
    CategoryProfile {
        title: "Response quality",
        severity: Severity::High,
        exposure: 0.5,
        impact_weight: 25.0,
        business_impact: "Replies are empty, truncated or expose error text, eroding trust in the brand behind the widget.",
        recommendation: "Review the bot's fallback and error handling so failures produce a helpful message instead of raw errors or blank bubbles.",
    },
    CategoryProfile {
        title: "Response performance",
        severity: Severity::Medium,
        exposure: 0.6,
        impact_weight: 20.0,
        business_impact: "Slow replies make visitors leave before the answer arrives, lowering resolution and conversion rates.",
        recommendation: "Profile the reply path end to end; cache common answers and show a typing indicator while the backend works.",
    },
    CategoryProfile {
        title: "Content security",
        severity: Severity::Critical,
        exposure: 0.05,
        impact_weight: 35.0,
        business_impact: "Visitor-supplied markup is rendered as HTML, opening the conversation to script injection against visitors and agents.",
        recommendation: "Render message text as text: escape user content before insertion and enforce a strict content security policy on the widget frame.",
    },
    CategoryProfile {
        title: "Conversation state",
        severity: Severity::Medium,
        exposure: 0.3,
        impact_weight: 15.0,
        business_impact: "Closing the widget loses the conversation, forcing visitors to repeat themselves.",
        recommendation: "Persist the transcript across open/close (session storage or server-side history) and restore it when the widget reopens.",
    },
    CategoryProfile {
        title: "API reliability",
        severity: Severity::High,
        exposure: 0.7,
        impact_weight: 30.0,
        business_impact: "The chat backend fails a share of requests, so some visitors lose messages at random.",
        recommendation: "Inspect server logs for the failing requests, add retries with backoff in the client, and alert on 5xx and connection failures.",
    },
    CategoryProfile {
        title: "API capacity",
        severity: Severity::High,
        exposure: 0.3,
        impact_weight: 20.0,
        business_impact: "Under concurrent use the backend throttles or stalls, so peak-hour visitors are the ones left without answers.",
        recommendation: "Review rate limits and worker pools against expected concurrency; scale out or queue instead of rejecting.",
    },
    CategoryProfile {
        title: "API latency",
        severity: Severity::Medium,
        exposure: 0.6,
        impact_weight: 15.0,
        business_impact: "Tail latency on the chat API makes replies feel sluggish for a noticeable share of visitors.",
        recommendation: "Find the slow tail (database, upstream model, cold starts) and set latency budgets per dependency.",
    },
    CategoryProfile {
        title: "Selector drift",
        severity: Severity::Low,
        exposure: 0.0,
        impact_weight: 10.0,
        business_impact: "Widget elements lack stable test ids, so monitoring relies on guesses that break on the next vendor update.",
        recommendation: "Add data-test-id attributes to the widget's controls or configure explicit selector overrides.",
    },
];

/// Maps every signal onto exactly one category
pub fn classify(signal: &FailureSignal) -> IssueCategory {
    match signal {
        FailureSignal::WidgetMissing | FailureSignal::NavigationFailed { .. } => {
            IssueCategory::WidgetAvailability
        }
        FailureSignal::SelectorNotFound { element, .. } => match element {
            WidgetElement::Launcher | WidgetElement::Container => IssueCategory::WidgetAvailability,
            _ => IssueCategory::WidgetInteraction,
        },
        FailureSignal::DegradedSelector { .. } => IssueCategory::SelectorDrift,
        FailureSignal::OpenFailed { .. }
        | FailureSignal::CloseFailed { .. }
        | FailureSignal::InputNotCleared
        | FailureSignal::EmptyMessageAccepted
        | FailureSignal::BrowserError { .. } => IssueCategory::WidgetInteraction,
        FailureSignal::MessageNotRendered { .. } => IssueCategory::MessageDelivery,
        FailureSignal::NoResponse { .. } | FailureSignal::DroppedReplies { .. } => {
            IssueCategory::ResponseMissing
        }
        FailureSignal::EmptyResponse
        | FailureSignal::ShortResponse { .. }
        | FailureSignal::ErrorResponse { .. } => IssueCategory::ResponseQuality,
        FailureSignal::SlowResponse { .. } => IssueCategory::ResponsePerformance,
        FailureSignal::MarkupInjected { .. } => IssueCategory::ContentSecurity,
        FailureSignal::HistoryLost { .. } => IssueCategory::ConversationState,
        FailureSignal::HighErrorRate { .. }
        | FailureSignal::ServerErrors { .. }
        | FailureSignal::ConnectionErrors { .. } => IssueCategory::ApiReliability,
        FailureSignal::RateLimited { .. } | FailureSignal::RequestTimeouts { .. } => {
            IssueCategory::ApiCapacity
        }
        FailureSignal::LatencyBreach { .. } => IssueCategory::ApiLatency,
    }
}
