// Integration tests for the load runner against a local chat API
//
// Tests cover:
// - Healthy endpoint: every request succeeds, body template renders valid JSON
// - Failure modes: 5xx, 429, client timeouts, refused connections
// - Saved load runs feeding analysis and the report writer
//
// No browser is needed; the chat API is served by the axum test server.


use chat_probe::config::LoadConfig;
use chat_probe::{
    Analyzer, FailureSignal, HarnessConfig, IssueCategory, LoadPlan, LoadRun, LoadRunner,
    ReportFormat, Verdict, collect_runs, executive_report, load_target, write_reports,
};
use test_server::{TestServer, closed_port};

mod common;

fn load_config(users: usize, iterations: usize) -> LoadConfig {
    LoadConfig {
        users,
        iterations,
        request_timeout_ms: 2_000,
        messages: vec!["Hello".to_string(), "Is \"shipping\" free?".to_string()],
        ..LoadConfig::default()
    }
}

async fn run(endpoint: &str, config: &LoadConfig) -> LoadRun {
    let plan = LoadPlan::from_config(endpoint, config).expect("Failed to build plan");
    LoadRunner::new(&plan)
        .expect("Failed to build runner")
        .run(&plan)
        .await
}

// ============================================================================
// Healthy endpoint
// ============================================================================

#[tokio::test]
async fn test_healthy_endpoint() {
    common::init_tracing();
    let server = TestServer::start().await;

    let config = LoadConfig {
        ramp_up_ms: 200,
        think_time_ms: 10,
        ..load_config(4, 5)
    };
    let load = run(&format!("{}/api/chat", server.url()), &config).await;

    assert_eq!(load.summary.total, 20);
    assert_eq!(load.summary.succeeded, 20, "{:?}", load.summary);
    assert_eq!(load.summary.status_counts.get(&200), Some(&20));
    assert!(load.signals.is_empty(), "{:?}", load.signals);
    assert!(load.summary.latency.p95 >= load.summary.latency.p50);
    assert!(load.summary.throughput_rps > 0.0);
    assert_eq!(server.api_requests(), 20);

    // Every user ran every iteration, in order
    for user in 0..4 {
        let iterations: Vec<usize> = load
            .samples
            .iter()
            .filter(|s| s.user == user)
            .map(|s| s.iteration)
            .collect();
        assert_eq!(iterations, vec![0, 1, 2, 3, 4]);
    }

    server.shutdown();
}

// ============================================================================
// Failure modes
// ============================================================================

#[tokio::test]
async fn test_server_errors_and_rate_limits() {
    common::init_tracing();
    let server = TestServer::start().await;

    let flaky = run(&format!("{}/api/flaky", server.url()), &load_config(2, 10)).await;
    assert_eq!(flaky.summary.total, 20);
    assert_eq!(flaky.summary.status_counts.get(&500), Some(&5));
    assert!(
        flaky
            .signals
            .contains(&FailureSignal::ServerErrors { count: 5 })
    );
    assert!(
        flaky
            .signals
            .iter()
            .any(|s| matches!(s, FailureSignal::HighErrorRate { .. }))
    );
    server.shutdown();

    let server = TestServer::start().await;
    let limited = run(&format!("{}/api/limited", server.url()), &load_config(1, 8)).await;
    assert_eq!(limited.summary.succeeded, 5);
    assert!(
        limited
            .signals
            .contains(&FailureSignal::RateLimited { count: 3 })
    );

    let report = Analyzer::default().analyze(None, Some(&limited));
    assert_eq!(report.issues[0].category, IssueCategory::ApiReliability);
    assert!(
        report
            .issues
            .iter()
            .any(|i| i.category == IssueCategory::ApiCapacity)
    );
    server.shutdown();
}

#[tokio::test]
async fn test_timeouts_and_refused_connections_are_samples() {
    common::init_tracing();
    let server = TestServer::start().await;

    let config = LoadConfig {
        request_timeout_ms: 100,
        ..load_config(2, 2)
    };
    let slow = run(&format!("{}/api/slow", server.url()), &config).await;
    assert_eq!(slow.summary.total, 4);
    assert_eq!(slow.summary.errors_of("timeout"), 4);
    assert!(
        slow.signals
            .contains(&FailureSignal::RequestTimeouts { count: 4 })
    );
    server.shutdown();

    let addr = closed_port().await;
    let refused = run(&format!("http://{addr}/api/chat"), &load_config(2, 2)).await;
    assert_eq!(refused.summary.total, 4);
    assert_eq!(refused.summary.succeeded, 0);
    assert!(
        refused
            .signals
            .contains(&FailureSignal::ConnectionErrors { count: 4 })
    );
    assert!(refused.samples.iter().all(|s| s.status.is_none()));
}

// ============================================================================
// Endpoint selection and offline reporting
// ============================================================================

#[tokio::test]
async fn test_saved_load_run_feeds_report() -> anyhow::Result<()> {
    common::init_tracing();
    let server = TestServer::start().await;

    let mut config = HarnessConfig::for_page(format!("{}/widget.html", server.url()));
    config.load = load_config(2, 4);
    config.report.formats = vec![ReportFormat::Markdown, ReportFormat::Html];

    // No explicit endpoint and no traffic: page origin + /api/chat
    let load = load_target(&config, None).await?;
    assert_eq!(load.endpoint, format!("{}/api/chat", server.url()));
    assert_eq!(load.summary.succeeded, 8);

    let dir = tempfile::tempdir()?;
    load.save(&dir.path().join("load-run.json"))?;

    let saved = collect_runs(&[dir.path().join("*.json").display().to_string()])?;
    assert!(saved.probes.is_none());
    let report = executive_report(&config, None, saved.load.as_ref());
    assert_eq!(report.analysis.verdict, Verdict::Healthy);

    let paths = write_reports(&report, &dir.path().join("reports"), &config.report.formats)?;
    assert_eq!(paths.len(), 2);
    let markdown = std::fs::read_to_string(&paths[0])?;
    assert!(markdown.contains("## Load test"));
    assert!(markdown.contains("/api/chat"));

    server.shutdown();
    Ok(())
}
