//! Triage of probe and load failures into prioritized issues
//!
//! Every [`FailureSignal`] is classified into an [`IssueCategory`]. Signals
//! of one category merge into a single [`Issue`] whose priority combines the
//! category's severity and impact weight with how often the failure was
//! observed. The [`AnalysisReport`] adds a health score and a verdict.

mod catalog;

pub use catalog::{CategoryProfile, IssueCategory, Severity, classify};

use crate::config::AnalysisConfig;
use crate::load::LoadRun;
use crate::probes::{FailureSignal, ProbeKind, ProbeRun};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Evidence lines kept per issue
const MAX_EVIDENCE: usize = 5;

/// Lower bound on incidence for a p95 breach: by definition at least 5% of
/// requests were slower than the threshold
const P95_BREACH_FLOOR: f64 = 0.05;

/// Priority band derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Priority::P0,
            60..=79 => Priority::P1,
            40..=59 => Priority::P2,
            _ => Priority::P3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Healthy,
    Degraded,
    Critical,
}

impl Verdict {
    pub fn name(&self) -> &'static str {
        match self {
            Verdict::Healthy => "Healthy",
            Verdict::Degraded => "Degraded",
            Verdict::Critical => "Critical",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One prioritized problem, merged from all signals of a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub category: IssueCategory,
    pub title: String,
    pub severity: Severity,
    pub priority: Priority,
    /// 0-100
    pub score: u8,
    /// Share of executed probes or requests that hit the failure
    pub incidence: f64,
    pub affected_users: u64,
    pub occurrences: usize,
    pub evidence: Vec<String>,
    #[serde(default)]
    pub probes: Vec<ProbeKind>,
    pub business_impact: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub issues: Vec<Issue>,
    /// 0-100, 100 meaning no issues
    pub health_score: u8,
    pub verdict: Verdict,
    pub counts: SeverityCounts,
    pub audience: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_pass_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_error_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_p95_ms: Option<u64>,
}

impl AnalysisReport {
    /// Issues in one priority band, already in score order
    pub fn in_band(&self, priority: Priority) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.priority == priority)
    }

    pub fn is_critical(&self) -> bool {
        self.verdict == Verdict::Critical
    }
}

#[derive(Default)]
struct Bucket {
    occurrences: usize,
    evidence: Vec<String>,
    probes: Vec<ProbeKind>,
    incidence: f64,
}

impl Bucket {
    fn observe(&mut self, signal: &FailureSignal) {
        self.occurrences += 1;
        let line = signal.describe();
        if self.evidence.len() < MAX_EVIDENCE && !self.evidence.contains(&line) {
            self.evidence.push(line);
        }
    }
}

/// Turns probe and load runs into an [`AnalysisReport`]
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, probes: Option<&ProbeRun>, load: Option<&LoadRun>) -> AnalysisReport {
        let mut buckets: BTreeMap<IssueCategory, Bucket> = BTreeMap::new();

        if let Some(run) = probes {
            collect_probe_signals(run, &mut buckets);
        }
        if let Some(load) = load {
            collect_load_signals(load, &mut buckets);
        }

        let mut issues: Vec<Issue> = buckets
            .into_iter()
            .map(|(category, bucket)| self.issue(category, bucket))
            .collect();
        issues.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(b.severity.cmp(&a.severity))
                .then(a.category.cmp(&b.category))
        });

        let mut counts = SeverityCounts::default();
        let mut penalty = 0u32;
        for issue in &issues {
            counts.bump(issue.severity);
            penalty += issue.severity.penalty();
        }
        let health_score = 100u32.saturating_sub(penalty) as u8;
        let verdict = verdict(&counts, health_score);

        info!(
            "Analysis: {} issues, health {}/100, verdict {}",
            issues.len(),
            health_score,
            verdict
        );

        AnalysisReport {
            issues,
            health_score,
            verdict,
            counts,
            audience: self.config.audience,
            probe_pass_rate: probes.filter(|r| r.executed() > 0).map(ProbeRun::pass_rate),
            api_error_rate: load.map(|l| l.summary.error_rate),
            api_p95_ms: load.map(|l| l.summary.latency.p95),
        }
    }

    fn issue(&self, category: IssueCategory, bucket: Bucket) -> Issue {
        let profile = category.profile();
        let incidence = bucket.incidence.clamp(0.0, 1.0);
        let affected_users =
            (self.config.audience as f64 * profile.exposure * incidence).round() as u64;
        let raw = profile.severity.weight() + profile.impact_weight + 20.0 * incidence;
        let score = raw.min(100.0).round() as u8;

        debug!(
            "{}: {} occurrences, incidence {:.2}, score {}",
            category, bucket.occurrences, incidence, score
        );

        Issue {
            category,
            title: profile.title.to_string(),
            severity: profile.severity,
            priority: Priority::from_score(score),
            score,
            incidence,
            affected_users,
            occurrences: bucket.occurrences,
            evidence: bucket.evidence,
            probes: bucket.probes,
            business_impact: profile.business_impact.to_string(),
            recommendation: profile.recommendation.to_string(),
        }
    }
}

fn collect_probe_signals(run: &ProbeRun, buckets: &mut BTreeMap<IssueCategory, Bucket>) {
    for outcome in &run.outcomes {
        for signal in &outcome.failures {
            let bucket = buckets.entry(classify(signal)).or_default();
            bucket.observe(signal);
            if !bucket.probes.contains(&outcome.kind) {
                bucket.probes.push(outcome.kind);
            }
        }
    }

    let executed = run.executed().max(1) as f64;
    for bucket in buckets.values_mut() {
        bucket.incidence = bucket.probes.len() as f64 / executed;
    }

    let degraded: Vec<FailureSignal> = run
        .resolutions
        .iter()
        .filter(|r| r.tier.is_degraded())
        .map(|r| FailureSignal::DegradedSelector {
            element: r.element,
            tier: r.tier,
            selector: r.selector.clone(),
        })
        .collect();
    if !degraded.is_empty() {
        let bucket = buckets.entry(IssueCategory::SelectorDrift).or_default();
        for signal in &degraded {
            bucket.observe(signal);
        }
        bucket.incidence = degraded.len() as f64 / run.resolutions.len() as f64;
    }
}

fn collect_load_signals(load: &LoadRun, buckets: &mut BTreeMap<IssueCategory, Bucket>) {
    let total = load.summary.total.max(1) as f64;
    for signal in &load.signals {
        let incidence = match signal {
            FailureSignal::HighErrorRate { rate, .. } => *rate,
            FailureSignal::LatencyBreach { threshold_ms, .. } => {
                load.slow_fraction(*threshold_ms).max(P95_BREACH_FLOOR)
            }
            FailureSignal::RateLimited { count }
            | FailureSignal::ServerErrors { count }
            | FailureSignal::RequestTimeouts { count }
            | FailureSignal::ConnectionErrors { count } => *count as f64 / total,
            _ => 0.0,
        };
        let bucket = buckets.entry(classify(signal)).or_default();
        bucket.observe(signal);
        bucket.incidence = bucket.incidence.max(incidence);
    }
}

fn verdict(counts: &SeverityCounts, health_score: u8) -> Verdict {
    if counts.critical > 0 || health_score < 40 {
        Verdict::Critical
    } else if counts.high + counts.medium > 0 || health_score < 80 {
        Verdict::Degraded
    } else {
        Verdict::Healthy
    }
}
