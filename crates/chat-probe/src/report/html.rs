// HTML rendering - Self-contained document with embedded screenshots

use super::{ExecutiveReport, key_metrics, percent, status_label};
use crate::analysis::Severity;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write;
use std::path::Path;
use tracing::warn;

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 2rem auto; max-width: 1100px; line-height: 1.5; color: #222; }
table { border-collapse: collapse; width: 100%; margin-bottom: 1.5rem; }
th, td { border: 1px solid #ddd; padding: 6px 8px; text-align: left; vertical-align: top; }
th { background-color: #f4f4f4; font-weight: 600; }
tr:nth-child(even) { background-color: #fafafa; }
.verdict { display: inline-block; padding: 4px 12px; border-radius: 4px; color: #fff; font-weight: 600; }
.healthy { background: #2e7d32; } .degraded { background: #ef6c00; } .critical { background: #c62828; }
.issue { border-left: 4px solid #999; padding: 0 1rem; margin-bottom: 1.5rem; }
.sev-critical { border-color: #c62828; } .sev-high { border-color: #ef6c00; }
.sev-medium { border-color: #f9a825; } .sev-low { border-color: #90a4ae; }
img.shot { max-width: 100%; border: 1px solid #ccc; margin-top: .5rem; }
"#;

pub(super) fn render(report: &ExecutiveReport) -> String {
    let a = &report.analysis;
    let mut body = String::new();

    let _ = writeln!(body, "<h1>{}</h1>", escape_html(&report.title));
    let _ = writeln!(
        body,
        "<p><em>Generated {} UTC for {}</em></p>",
        report.generated_at.format("%Y-%m-%d %H:%M"),
        escape_html(super::display_target(&report.target))
    );
    let _ = writeln!(
        body,
        "<p><span class=\"verdict {}\">{}</span></p>\n<p>{}</p>",
        a.verdict.name().to_lowercase(),
        a.verdict,
        escape_html(&report.headline())
    );

    body.push_str("<h2>Key metrics</h2>\n");
    let rows: Vec<Vec<String>> = key_metrics(report)
        .into_iter()
        .map(|(label, value)| vec![label.to_string(), value])
        .collect();
    body.push_str(&table(&["Metric", "Value"], &rows));

    if !a.issues.is_empty() {
        body.push_str("<h2>Prioritized issues</h2>\n");
        let rows: Vec<Vec<String>> = a
            .issues
            .iter()
            .map(|i| {
                vec![
                    i.priority.to_string(),
                    i.score.to_string(),
                    i.severity.to_string(),
                    i.title.clone(),
                    i.affected_users.to_string(),
                    percent(i.incidence),
                ]
            })
            .collect();
        body.push_str(&table(
            &["Priority", "Score", "Severity", "Issue", "Affected users", "Incidence"],
            &rows,
        ));

        body.push_str("<h2>Issue details</h2>\n");
        for issue in &a.issues {
            let _ = writeln!(
                body,
                "<div class=\"issue {}\">\n<h3>{} {}</h3>",
                severity_class(issue.severity),
                issue.priority,
                escape_html(&issue.title)
            );
            let _ = writeln!(
                body,
                "<p><strong>Severity:</strong> {} &middot; <strong>Occurrences:</strong> {} &middot; <strong>Estimated affected users:</strong> {}</p>",
                issue.severity, issue.occurrences, issue.affected_users
            );
            let _ = writeln!(
                body,
                "<p><strong>Business impact:</strong> {}</p>",
                escape_html(&issue.business_impact)
            );
            if !issue.evidence.is_empty() {
                body.push_str("<ul>\n");
                for line in &issue.evidence {
                    let _ = writeln!(body, "<li>{}</li>", escape_html(line));
                }
                body.push_str("</ul>\n");
            }
            let _ = writeln!(
                body,
                "<p><strong>Recommendation:</strong> {}</p>\n</div>",
                escape_html(&issue.recommendation)
            );
        }
    }

    if let Some(load) = &report.load {
        let s = &load.summary;
        let _ = writeln!(
            body,
            "<h2>Load test</h2>\n<p>{} <code>{}</code> with {} users x {} iterations in {:.1}s</p>",
            escape_html(&load.method),
            escape_html(&load.endpoint),
            load.users,
            load.iterations,
            load.elapsed.as_secs_f64()
        );
        let row = vec![
            s.total.to_string(),
            s.succeeded.to_string(),
            s.failed.to_string(),
            percent(s.error_rate),
            format!("{} ms", s.latency.p50),
            format!("{} ms", s.latency.p90),
            format!("{} ms", s.latency.p95),
            format!("{} ms", s.latency.p99),
            format!("{} ms", s.latency.max),
        ];
        body.push_str(&table(
            &[
                "Requests",
                "Succeeded",
                "Failed",
                "Error rate",
                "p50",
                "p90",
                "p95",
                "p99",
                "Max",
            ],
            &[row],
        ));
        if !s.status_counts.is_empty() {
            let rows: Vec<Vec<String>> = s
                .status_counts
                .iter()
                .map(|(code, n)| vec![code.to_string(), n.to_string()])
                .collect();
            body.push_str(&table(&["Status", "Responses"], &rows));
        }
    }

    if let Some(run) = &report.probes {
        body.push_str("<h2>Appendix: probe results</h2>\n");
        let rows: Vec<Vec<String>> = run
            .outcomes
            .iter()
            .map(|o| {
                let details: Vec<String> = o
                    .failures
                    .iter()
                    .map(|f| f.describe())
                    .chain(o.notes.iter().cloned())
                    .collect();
                vec![
                    o.kind.to_string(),
                    status_label(o.status).to_string(),
                    format!("{} ms", o.duration.as_millis()),
                    details.join("; "),
                ]
            })
            .collect();
        body.push_str(&table(&["Probe", "Status", "Duration", "Details"], &rows));

        let shots = run
            .outcomes
            .iter()
            .filter_map(|o| o.screenshot.as_deref().map(|path| (o.kind, path)));
        for (kind, path) in shots {
            let _ = writeln!(
                body,
                "<h3>Screenshot: {}</h3>\n{}",
                escape_html(kind.name()),
                screenshot(path)
            );
        }
    }

    document(&report.title, &body)
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(title)
    )
}

/// Table with every header and cell escaped
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table>\n<thead><tr>");
    for header in headers {
        let _ = write!(html, "<th>{}</th>", escape_html(header));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for value in row {
            let _ = write!(html, "<td>{}</td>", escape_html(value));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn screenshot(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => format!(
            "<img class=\"shot\" alt=\"{}\" src=\"data:image/png;base64,{}\">",
            escape_html(&path.display().to_string()),
            STANDARD.encode(bytes)
        ),
        Err(e) => {
            warn!("Screenshot {} not embedded: {}", path.display(), e);
            format!(
                "<p>Screenshot unavailable: <code>{}</code></p>",
                escape_html(&path.display().to_string())
            )
        }
    }
}

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "sev-critical",
        Severity::High => "sev-high",
        Severity::Medium => "sev-medium",
        Severity::Low => "sev-low",
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::LatencyStats;
    use crate::report::fixtures;

    #[test]
    fn test_html_is_escaped_and_complete() {
        let probes = fixtures::probe_run();
        let load = fixtures::load_run();
        let report = ExecutiveReport::new(
            "<Weekly> check",
            fixtures::analysis(&probes, &load),
            Some(&probes),
            Some(&load),
        );
        let html = report.to_html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>&lt;Weekly&gt; check</title>"));
        assert!(html.contains("&lt;b&gt;Error&lt;/b&gt; &amp; retry"));
        assert!(!html.contains("<b>Error</b>"));
        assert!(html.contains("<h2>Load test</h2>"));
        assert!(html.contains("class=\"verdict"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_load_table_matches_markdown_columns() {
        let probes = fixtures::probe_run();
        let mut load = fixtures::load_run();
        load.summary.latency = LatencyStats::from_millis((1..=20).map(|v| v * 100).collect());
        let report = ExecutiveReport::new(
            "t",
            fixtures::analysis(&probes, &load),
            Some(&probes),
            Some(&load),
        );

        let html = report.to_html();
        assert!(html.contains("<th>p50</th><th>p90</th><th>p95</th><th>p99</th><th>Max</th>"));
        assert!(html.contains("<td>1000 ms</td><td>1800 ms</td><td>1900 ms</td><td>2000 ms</td>"));
        assert!(report.to_markdown().contains("| p50 | p90 | p95 | p99 | Max |"));
    }

    #[test]
    fn test_screenshot_embedded_as_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01-widget-presence.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let mut probes = fixtures::probe_run();
        probes.outcomes[1].screenshot = Some(path);
        let missing = dir.path().join("gone.png");
        probes.outcomes[0].screenshot = Some(missing);

        let load = fixtures::load_run();
        let report = ExecutiveReport::new(
            "t",
            fixtures::analysis(&probes, &load),
            Some(&probes),
            None,
        );
        let html = report.to_html();
        assert!(html.contains("src=\"data:image/png;base64,iVBORw==\""));
        assert!(html.contains("Screenshot unavailable"));
    }

    #[test]
    fn test_table_escapes_cells() {
        let t = table(&["Data"], &[vec!["<b>bold</b>".to_string()]]);
        assert!(t.contains("<td>&lt;b&gt;bold&lt;/b&gt;</td>"));
        assert!(table(&["A"], &[]).contains("<tbody>\n</tbody>"));
    }
}
