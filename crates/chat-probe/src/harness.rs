// Harness - Probe, load and report stages wired from one config

use crate::analysis::Analyzer;
use crate::config::HarnessConfig;
use crate::driver::BrowserSession;
use crate::error::{Error, Result};
use crate::load::{LoadPlan, LoadRun, LoadRunner, infer_endpoint};
use crate::probes::{ProbeRun, ProbeSuite, aborted_outcomes};
use crate::report::ExecutiveReport;
use crate::selectors::SelectorResolver;
use crate::widget::ChatWidget;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Launches a browser, runs the probe suite against the target page and
/// closes the browser again.
///
/// Probe failures are recorded in the returned run. Only problems that stop
/// the suite from starting (bad config, browser launch) are errors.
pub async fn probe_target(config: &HarnessConfig) -> Result<ProbeRun> {
    let url = config.target.page_url.as_str();
    if url.is_empty() {
        return Err(Error::Config("target.page_url is required for probing".to_string()));
    }
    let suite = ProbeSuite::new(config.probe.clone())?;
    let started_at = Utc::now();

    let session = BrowserSession::launch(&config.browser).await?;
    let mut widget = ChatWidget::new(
        session.driver(),
        SelectorResolver::new(config.selector_registry()),
        suite.timing(),
    );
    let outcomes = suite.run(&mut widget, url).await;
    let resolutions = widget.resolver().resolutions();
    let requests = session.network().snapshot();
    info!(
        "Probed {}: {} outcomes, {} requests observed",
        url,
        outcomes.len(),
        requests.len()
    );

    if let Err(e) = session.close().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }

    Ok(ProbeRun {
        target: url.to_string(),
        vendor: config.target.vendor,
        browser: config.browser.kind,
        started_at,
        outcomes,
        resolutions,
        requests,
    })
}

/// Probe run standing in for a suite that never started
pub fn aborted_run(config: &HarnessConfig, err: &Error) -> ProbeRun {
    let kinds = ProbeSuite::new(config.probe.clone())
        .map(|suite| suite.kinds().to_vec())
        .unwrap_or_else(|_| crate::probes::ProbeKind::ALL.to_vec());
    ProbeRun {
        target: config.target.page_url.clone(),
        vendor: config.target.vendor,
        browser: config.browser.kind,
        started_at: Utc::now(),
        outcomes: aborted_outcomes(&kinds, err),
        resolutions: Vec::new(),
        requests: Vec::new(),
    }
}

/// Picks the endpoint (explicit, or inferred from `observed` traffic) and
/// runs the configured load against it
pub async fn load_target(config: &HarnessConfig, observed: Option<&ProbeRun>) -> Result<LoadRun> {
    let requests = observed.map(|run| run.requests.as_slice()).unwrap_or(&[]);
    let endpoint = infer_endpoint(
        &config.target.page_url,
        config.target.vendor,
        requests,
        config.target.api_endpoint.as_deref(),
    )?;
    let plan = LoadPlan::from_config(&endpoint.url, &config.load)?;
    Ok(LoadRunner::new(&plan)?.run(&plan).await)
}

/// Analyzes whatever runs are available and wraps them in a report
pub fn executive_report(
    config: &HarnessConfig,
    probes: Option<&ProbeRun>,
    load: Option<&LoadRun>,
) -> ExecutiveReport {
    let analysis = Analyzer::new(config.analysis.clone()).analyze(probes, load);
    ExecutiveReport::new(config.report.title.clone(), analysis, probes, load)
}

/// Saved runs gathered for offline analysis
#[derive(Debug, Default)]
pub struct SavedRuns {
    pub probes: Option<ProbeRun>,
    pub load: Option<LoadRun>,
    pub files: Vec<PathBuf>,
}

/// Expands `patterns` and loads each matching JSON file as a probe run or
/// a load run. When several runs of one kind match, the latest start wins.
pub fn collect_runs(patterns: &[String]) -> Result<SavedRuns> {
    let mut saved = SavedRuns::default();

    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            let path = entry.map_err(|e| Error::Io(e.into()))?;
            if saved.files.contains(&path) {
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .map_err(|e| Error::from(e).context(format!("reading {}", path.display())))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| Error::from(e).context(path.display().to_string()))?;

            if value.get("outcomes").is_some() {
                let run: ProbeRun = serde_json::from_value(value)?;
                debug!("{}: probe run from {}", path.display(), run.started_at);
                if saved.probes.as_ref().is_none_or(|p| p.started_at < run.started_at) {
                    saved.probes = Some(run);
                }
            } else if value.get("summary").is_some() && value.get("endpoint").is_some() {
                let run: LoadRun = serde_json::from_value(value)?;
                debug!("{}: load run from {}", path.display(), run.started_at);
                if saved.load.as_ref().is_none_or(|l| l.started_at < run.started_at) {
                    saved.load = Some(run);
                }
            } else {
                return Err(Error::Config(format!(
                    "{} is neither a probe run nor a load run",
                    path.display()
                )));
            }
            saved.files.push(path);
        }
    }

    if saved.files.is_empty() {
        return Err(Error::Config(format!(
            "no saved runs matched {}",
            patterns.join(", ")
        )));
    }
    info!("Loaded {} saved run(s)", saved.files.len());
    Ok(saved)
}
