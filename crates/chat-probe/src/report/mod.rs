//! Executive reporting
//!
//! An [`ExecutiveReport`] bundles the analysis with the runs it came from
//! and renders as Markdown, self-contained HTML or JSON.

mod html;
mod markdown;

use crate::analysis::AnalysisReport;
use crate::config::ReportFormat;
use crate::error::Result;
use crate::load::{LoadRun, LoadSummary};
use crate::probes::{FailureSignal, ProbeRun, ProbeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Load run without its raw samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOverview {
    pub endpoint: String,
    pub method: String,
    pub users: usize,
    pub iterations: usize,
    #[serde(with = "crate::serde_millis")]
    pub elapsed: Duration,
    pub summary: LoadSummary,
    pub signals: Vec<FailureSignal>,
}

impl From<&LoadRun> for LoadOverview {
    fn from(run: &LoadRun) -> Self {
        Self {
            endpoint: run.endpoint.clone(),
            method: run.method.clone(),
            users: run.users,
            iterations: run.iterations,
            elapsed: run.elapsed,
            summary: run.summary.clone(),
            signals: run.signals.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveReport {
    pub title: String,
    pub target: String,
    pub generated_at: DateTime<Utc>,
    pub analysis: AnalysisReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probes: Option<ProbeRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadOverview>,
}

impl ExecutiveReport {
    pub fn new(
        title: impl Into<String>,
        analysis: AnalysisReport,
        probes: Option<&ProbeRun>,
        load: Option<&LoadRun>,
    ) -> Self {
        let target = probes
            .map(|p| p.target.clone())
            .or_else(|| load.map(|l| l.endpoint.clone()))
            .unwrap_or_default();
        Self {
            title: title.into(),
            target,
            generated_at: Utc::now(),
            analysis,
            probes: probes.cloned(),
            load: load.map(LoadOverview::from),
        }
    }

    /// One sentence for the top of every rendering
    pub fn headline(&self) -> String {
        let a = &self.analysis;
        if a.issues.is_empty() {
            return format!(
                "{} is {}: no issues found (health {}/100).",
                display_target(&self.target),
                a.verdict.name().to_lowercase(),
                a.health_score
            );
        }
        let affected: u64 = a.issues.iter().map(|i| i.affected_users).max().unwrap_or(0);
        format!(
            "{} is {}: {} issue(s), {} critical, health {}/100, up to {} of {} monthly users affected.",
            display_target(&self.target),
            a.verdict.name().to_lowercase(),
            a.issues.len(),
            a.counts.critical,
            a.health_score,
            affected,
            a.audience
        )
    }

    pub fn to_markdown(&self) -> String {
        markdown::render(self)
    }

    pub fn to_html(&self) -> String {
        html::render(self)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Markdown => Ok(self.to_markdown()),
            ReportFormat::Html => Ok(self.to_html()),
            ReportFormat::Json => self.to_json(),
        }
    }
}

/// Label/value rows shared by the Markdown and HTML renderers
fn key_metrics(report: &ExecutiveReport) -> Vec<(&'static str, String)> {
    let a = &report.analysis;
    let mut rows = vec![
        ("Verdict", a.verdict.name().to_string()),
        ("Health score", format!("{}/100", a.health_score)),
        (
            "Issues",
            format!(
                "{} ({} critical, {} high, {} medium, {} low)",
                a.counts.total(),
                a.counts.critical,
                a.counts.high,
                a.counts.medium,
                a.counts.low
            ),
        ),
    ];
    if let Some(run) = &report.probes {
        rows.push((
            "Probes passed",
            format!(
                "{}/{} ({})",
                run.count(ProbeStatus::Passed),
                run.executed(),
                percent(run.pass_rate())
            ),
        ));
    }
    if let Some(load) = &report.load {
        rows.push(("API requests", load.summary.total.to_string()));
        rows.push(("API error rate", percent(load.summary.error_rate)));
        rows.push(("API p95 latency", format!("{} ms", load.summary.latency.p95)));
        rows.push((
            "API throughput",
            format!("{:.1} req/s", load.summary.throughput_rps),
        ));
    }
    rows
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn status_label(status: ProbeStatus) -> &'static str {
    match status {
        ProbeStatus::Passed => "PASS",
        ProbeStatus::Failed => "FAIL",
        ProbeStatus::Skipped => "SKIP",
    }
}

fn display_target(target: &str) -> &str {
    if target.is_empty() {
        "The chat widget"
    } else {
        target
    }
}

/// Writes one file per format into `dir`, creating it first
pub fn write_reports(
    report: &ExecutiveReport,
    dir: &Path,
    formats: &[ReportFormat],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = dir.join(format.file_name());
        if written.contains(&path) {
            continue;
        }
        std::fs::write(&path, report.render(*format)?)?;
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
