// Markdown rendering

use super::{ExecutiveReport, key_metrics, percent, status_label};
use std::fmt::Write;

pub(super) fn render(report: &ExecutiveReport) -> String {
    let mut md = String::new();
    let a = &report.analysis;

    let _ = writeln!(md, "# {}\n", report.title);
    let _ = writeln!(
        md,
        "_Generated {} UTC for {}_\n",
        report.generated_at.format("%Y-%m-%d %H:%M"),
        cell(super::display_target(&report.target))
    );
    let _ = writeln!(md, "## Summary\n\n{}\n", report.headline());

    let _ = writeln!(md, "## Key metrics\n\n| Metric | Value |\n| --- | --- |");
    for (label, value) in key_metrics(report) {
        let _ = writeln!(md, "| {label} | {} |", cell(&value));
    }
    md.push('\n');

    if !a.issues.is_empty() {
        let _ = writeln!(
            md,
            "## Prioritized issues\n\n| Priority | Score | Severity | Issue | Affected users | Incidence |\n| --- | --- | --- | --- | --- | --- |"
        );
        for issue in &a.issues {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                issue.priority,
                issue.score,
                issue.severity,
                cell(&issue.title),
                issue.affected_users,
                percent(issue.incidence)
            );
        }
        md.push('\n');

        let _ = writeln!(md, "## Issue details\n");
        for issue in &a.issues {
            let _ = writeln!(md, "### {} {}\n", issue.priority, issue.title);
            let _ = writeln!(
                md,
                "**Severity:** {} | **Occurrences:** {} | **Estimated affected users:** {}\n",
                issue.severity, issue.occurrences, issue.affected_users
            );
            let _ = writeln!(md, "**Business impact:** {}\n", issue.business_impact);
            if !issue.evidence.is_empty() {
                let _ = writeln!(md, "**Evidence:**\n");
                for line in &issue.evidence {
                    let _ = writeln!(md, "- {}", inline(line));
                }
                md.push('\n');
            }
            if !issue.probes.is_empty() {
                let probes: Vec<&str> = issue.probes.iter().map(|p| p.name()).collect();
                let _ = writeln!(md, "**Seen in:** {}\n", probes.join(", "));
            }
            let _ = writeln!(md, "**Recommendation:** {}\n", issue.recommendation);
        }
    }

    if let Some(load) = &report.load {
        let s = &load.summary;
        let _ = writeln!(
            md,
            "## Load test\n\n{} `{}` with {} users x {} iterations in {:.1}s\n",
            load.method,
            load.endpoint,
            load.users,
            load.iterations,
            load.elapsed.as_secs_f64()
        );
        let _ = writeln!(
            md,
            "| Requests | Succeeded | Failed | Error rate | p50 | p90 | p95 | p99 | Max |\n| --- | --- | --- | --- | --- | --- | --- | --- | --- |"
        );
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} ms | {} ms | {} ms | {} ms | {} ms |\n",
            s.total,
            s.succeeded,
            s.failed,
            percent(s.error_rate),
            s.latency.p50,
            s.latency.p90,
            s.latency.p95,
            s.latency.p99,
            s.latency.max
        );
        if !s.status_counts.is_empty() {
            let statuses: Vec<String> = s
                .status_counts
                .iter()
                .map(|(code, n)| format!("{code}: {n}"))
                .collect();
            let _ = writeln!(md, "Status codes: {}\n", statuses.join(", "));
        }
        if !s.error_counts.is_empty() {
            let errors: Vec<String> = s
                .error_counts
                .iter()
                .map(|(kind, n)| format!("{kind}: {n}"))
                .collect();
            let _ = writeln!(md, "Transport errors: {}\n", errors.join(", "));
        }
    }

    if let Some(run) = &report.probes {
        let _ = writeln!(
            md,
            "## Appendix: probe results\n\nVendor `{}`, browser `{:?}`, started {}\n",
            run.vendor.name(),
            run.browser,
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(
            md,
            "| Probe | Status | Duration | Details |\n| --- | --- | --- | --- |"
        );
        for outcome in &run.outcomes {
            let details: Vec<String> = outcome
                .failures
                .iter()
                .map(|f| f.describe())
                .chain(outcome.notes.iter().cloned())
                .collect();
            let _ = writeln!(
                md,
                "| {} | {} | {} ms | {} |",
                outcome.kind,
                status_label(outcome.status),
                outcome.duration.as_millis(),
                cell(&details.join("; "))
            );
        }
        md.push('\n');
    }

    md
}

/// Makes text safe inside a table cell
fn cell(text: &str) -> String {
    inline(text).replace('|', "\\|")
}

fn inline(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
