// Integration tests for the probe suite against real browser pages
//
// Tests cover:
// - A working widget passes every probe and its traffic drives the load stage
// - A broken widget yields markup injection, missing replies and lost history
// - A page without a widget fails presence and skips the rest
// - Page object operations (open, ask, close) on the working widget
//
// Combined into few tests to keep browser launches down.


use chat_probe::config::ProbeConfig;
use chat_probe::load::EndpointSource;
use chat_probe::{
    BrowserSession, ChatWidget, FailureSignal, HarnessConfig, IssueCategory, ProbeKind,
    ProbeStatus, ProbeSuite, SelectorResolver, SelectorTier, Verdict, WidgetElement,
    executive_report, load_target, probe_target,
};
use test_server::TestServer;

mod common;

fn fast_probe_config(artifacts: &std::path::Path) -> ProbeConfig {
    ProbeConfig {
        messages: vec!["Hello".to_string(), "Where is my order?".to_string()],
        widget_timeout_ms: 3_000,
        response_timeout_ms: 3_000,
        poll_interval_ms: 100,
        slow_response_ms: 2_500,
        long_message_chars: 500,
        artifacts_dir: artifacts.display().to_string(),
        ..ProbeConfig::default()
    }
}

// ============================================================================
// Full suite
// ============================================================================

#[tokio::test]
async fn test_working_widget_passes_suite_and_feeds_load() {
    common::init_tracing();
    let server = TestServer::start().await;
    let artifacts = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = HarnessConfig::for_page(format!("{}/widget.html", server.url()));
    config.probe = fast_probe_config(artifacts.path());
    config.load.users = 2;
    config.load.iterations = 3;

    let run = probe_target(&config).await.expect("Probe run failed");
    for outcome in &run.outcomes {
        assert_eq!(
            outcome.status,
            ProbeStatus::Passed,
            "{} failed: {:?}",
            outcome.kind,
            outcome.failures
        );
    }
    assert_eq!(run.outcomes.len(), ProbeKind::ALL.len());
    assert!(
        run.resolutions
            .iter()
            .all(|r| r.tier == SelectorTier::Primary),
        "{:?}",
        run.resolutions
    );

    // The widget's fetch calls were recorded and identify the chat API
    assert!(
        run.requests
            .iter()
            .any(|r| r.is_api_call() && r.url.ends_with("/api/chat"))
    );
    let api_calls_from_probes = server.api_requests();
    assert!(api_calls_from_probes > 0);

    let endpoint = chat_probe::load::infer_endpoint(
        &config.target.page_url,
        config.target.vendor,
        &run.requests,
        None,
    )
    .expect("Endpoint inference failed");
    assert_eq!(endpoint.source, EndpointSource::ChatTraffic);

    let load = load_target(&config, Some(&run)).await.expect("Load failed");
    assert_eq!(load.summary.total, 6);
    assert_eq!(load.summary.succeeded, 6);
    assert_eq!(server.api_requests(), api_calls_from_probes + 6);

    let report = executive_report(&config, Some(&run), Some(&load));
    assert_eq!(report.analysis.verdict, Verdict::Healthy);
    assert_eq!(report.analysis.health_score, 100);

    server.shutdown();
}

#[tokio::test]
async fn test_broken_widget_is_critical() {
    common::init_tracing();
    let server = TestServer::start().await;
    let artifacts = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = HarnessConfig::for_page(format!("{}/broken.html", server.url()));
    config.probe = fast_probe_config(artifacts.path());
    config.probe.messages = vec!["Hello".to_string()];
    config.probe.response_timeout_ms = 1_000;

    let run = probe_target(&config).await.expect("Probe run failed");
    let outcome = |kind: ProbeKind| {
        run.outcomes
            .iter()
            .find(|o| o.kind == kind)
            .expect("Missing outcome")
    };

    assert!(outcome(ProbeKind::WidgetPresence).passed());
    assert!(outcome(ProbeKind::OpenClose).passed());
    assert!(
        outcome(ProbeKind::MessageRoundTrip)
            .failures
            .iter()
            .any(|f| matches!(f, FailureSignal::NoResponse { .. }))
    );
    assert!(
        outcome(ProbeKind::SpecialCharacters)
            .failures
            .iter()
            .any(|f| matches!(f, FailureSignal::MarkupInjected { .. }))
    );
    assert!(
        outcome(ProbeKind::ReopenPersistence)
            .failures
            .iter()
            .any(|f| matches!(f, FailureSignal::HistoryLost { .. }))
    );

    // Failed probes left screenshots behind
    let failed = outcome(ProbeKind::MessageRoundTrip);
    let shot = failed.screenshot.as_ref().expect("No screenshot recorded");
    assert!(shot.exists(), "{}", shot.display());

    let report = executive_report(&config, Some(&run), None);
    assert_eq!(report.analysis.verdict, Verdict::Critical);
    let categories: Vec<IssueCategory> =
        report.analysis.issues.iter().map(|i| i.category).collect();
    assert!(categories.contains(&IssueCategory::ResponseMissing));
    assert!(categories.contains(&IssueCategory::ContentSecurity));
    assert!(categories.contains(&IssueCategory::ConversationState));

    let html = report.to_html();
    assert!(html.contains("data:image/png;base64,"));

    server.shutdown();
}

#[tokio::test]
async fn test_missing_widget_skips_suite() {
    common::init_tracing();
    let server = TestServer::start().await;
    let artifacts = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = HarnessConfig::for_page(format!("{}/no-widget.html", server.url()));
    config.probe = fast_probe_config(artifacts.path());
    config.probe.widget_timeout_ms = 1_000;
    config.probe.screenshot_on_failure = false;

    let run = probe_target(&config).await.expect("Probe run failed");
    assert_eq!(run.outcomes[0].failures, vec![FailureSignal::WidgetMissing]);
    assert_eq!(run.count(ProbeStatus::Skipped), ProbeKind::ALL.len() - 1);

    let report = executive_report(&config, Some(&run), None);
    assert_eq!(
        report.analysis.issues[0].category,
        IssueCategory::WidgetAvailability
    );
    assert_eq!(report.analysis.issues[0].affected_users, config.analysis.audience);

    // A 404 host page is reported as a navigation failure
    config.target.page_url = format!("{}/gone.html", server.url());
    let run = probe_target(&config).await.expect("Probe run failed");
    assert_eq!(
        run.outcomes[0].failures,
        vec![FailureSignal::NavigationFailed { status: 404 }]
    );

    server.shutdown();
}

// ============================================================================
// Page object
// ============================================================================

#[tokio::test]
async fn test_page_object_round_trip() {
    common::init_tracing();
    let server = TestServer::start().await;
    let artifacts = tempfile::tempdir().expect("Failed to create temp dir");

    let config = HarnessConfig::for_page(format!("{}/widget.html", server.url()));
    let suite = ProbeSuite::new(fast_probe_config(artifacts.path())).expect("Bad probe config");
    let session = BrowserSession::launch(&config.browser)
        .await
        .expect("Failed to launch browser");
    let mut widget = ChatWidget::new(
        session.driver(),
        SelectorResolver::new(config.selector_registry()),
        suite.timing(),
    );

    widget
        .navigate(&config.target.page_url)
        .await
        .expect("Failed to navigate");
    let found = widget.detect().await.expect("Widget not detected");
    assert_eq!(found.element, WidgetElement::Launcher);
    assert!(!widget.is_open().await.expect("is_open failed"));

    widget.open().await.expect("Failed to open");
    assert!(widget.is_open().await.expect("is_open failed"));

    let (sent, reply) = widget.ask("Hi there").await.expect("No reply");
    assert_eq!(sent.input_cleared, Some(true));
    assert!(reply.text.starts_with("Thanks for reaching out!"));
    assert!(reply.text.contains("8 character"));
    assert_eq!(reply.new_messages, 1);

    let history = widget.history().await.expect("history failed");
    assert_eq!(history.user, vec!["Hi there".to_string()]);
    assert_eq!(history.bot.len(), 1);

    widget.close().await.expect("Failed to close");
    assert!(!widget.is_open().await.expect("is_open failed"));

    session.close().await.expect("Failed to close session");
    server.shutdown();
}
