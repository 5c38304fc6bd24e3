//! chat-probe: health checks for third-party chat widgets
//!
//! Drives a real browser through a page object to open and close a chat
//! widget, send messages and judge the replies, then pushes HTTP load at the
//! chat API the widget talks to. Failures from both sides are classified
//! into prioritized issues and rendered as an executive report.
//!
//! # Examples
//!
//! ## Probing a widget
//!
//! ```ignore
//! use chat_probe::{BrowserSession, ChatWidget, HarnessConfig, ProbeSuite, SelectorResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::for_page("https://shop.example.com/");
//!     let session = BrowserSession::launch(&config.browser).await?;
//!
//!     let suite = ProbeSuite::new(config.probe.clone())?;
//!     let mut widget = ChatWidget::new(
//!         session.driver(),
//!         SelectorResolver::new(config.selector_registry()),
//!         suite.timing(),
//!     );
//!     let outcomes = suite.run(&mut widget, &config.target.page_url).await;
//!     for outcome in &outcomes {
//!         println!("{}: {:?}", outcome.kind, outcome.status);
//!     }
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Load and triage
//!
//! ```ignore
//! use chat_probe::{Analyzer, LoadPlan, LoadRunner, HarnessConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::for_page("https://shop.example.com/");
//!     let plan = LoadPlan::from_config("https://api.example.com/chat", &config.load)?;
//!     let load = LoadRunner::new(&plan)?.run(&plan).await;
//!
//!     let analysis = Analyzer::new(config.analysis.clone()).analyze(None, Some(&load));
//!     println!("verdict: {:?}", analysis.verdict);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod driver;
mod error;
pub mod harness;
pub mod load;
pub mod probes;
pub mod report;
pub mod selectors;
pub mod widget;

// Re-export error types
pub use error::{Error, Result};

// Re-export configuration
pub use config::{HarnessConfig, ReportFormat};

// Re-export browser-side API
pub use driver::{BrowserSession, NetworkLog, PlaywrightDriver, RecordedRequest, WidgetDriver};
pub use probes::{FailureSignal, ProbeKind, ProbeOutcome, ProbeRun, ProbeStatus, ProbeSuite};
pub use selectors::{
    ElementProbe, Resolution, SelectorRegistry, SelectorResolver, SelectorTier, Vendor,
    WidgetElement,
};
pub use widget::{BotReply, ChatWidget, WidgetTiming};

// Re-export load, analysis and reporting
pub use analysis::{AnalysisReport, Analyzer, Issue, IssueCategory, Priority, Severity, Verdict};
pub use load::{LoadPlan, LoadRun, LoadRunner, LoadSummary};
pub use report::{ExecutiveReport, write_reports};

// Re-export end-to-end stages
pub use harness::{
    SavedRuns, aborted_run, collect_runs, executive_report, load_target, probe_target,
};

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Writes `value` as pretty JSON, creating parent directories
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)
        .map_err(|e| Error::from(e).context(format!("writing {}", path.display())))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::from(e).context(format!("reading {}", path.display())))?;
    Ok(serde_json::from_str(&text)?)
}

/// Serializes a `Duration` as whole milliseconds
pub(crate) mod serde_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
