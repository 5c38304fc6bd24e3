// Benchmarks for run summarization and issue analysis
//
// Measures the offline stages (load summary, issue triage, report rendering)
// over synthetic runs sized like a large nightly load test.

use chat_probe::config::{AnalysisConfig, BrowserKind, LoadThresholds};
use chat_probe::load::{LoadRun, LoadSummary, RequestSample, SampleError, SampleErrorKind};
use chat_probe::{
    Analyzer, ExecutiveReport, FailureSignal, ProbeKind, ProbeOutcome, ProbeRun, ProbeStatus,
    Resolution, SelectorTier, Vendor, WidgetElement,
};
use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::time::Duration;

fn samples(count: usize) -> Vec<RequestSample> {
    (0..count)
        .map(|i| {
            let (status, error) = match i % 50 {
                0 => (None, Some(SampleErrorKind::Timeout)),
                7 => (Some(429), None),
                13 => (Some(503), None),
                _ => (Some(200), None),
            };
            RequestSample {
                user: i % 100,
                iteration: i / 100,
                status,
                latency: Duration::from_millis(80 + (i as u64 * 37) % 1_900),
                bytes: 512,
                error: error.map(|kind| SampleError {
                    kind,
                    message: "operation timed out".to_string(),
                }),
            }
        })
        .collect()
}

fn load_run(count: usize) -> LoadRun {
    let samples = samples(count);
    let elapsed = Duration::from_secs(60);
    let summary = LoadSummary::from_samples(&samples, elapsed);
    let signals = summary.evaluate(&LoadThresholds::default());
    LoadRun {
        endpoint: "https://api.example.com/chat".to_string(),
        method: "POST".to_string(),
        users: 100,
        iterations: count / 100,
        started_at: Utc::now(),
        elapsed,
        summary,
        signals,
        samples,
    }
}

fn probe_run() -> ProbeRun {
    let outcomes = ProbeKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let failures = match i % 3 {
                0 => vec![FailureSignal::NoResponse { timeout_ms: 15_000 }],
                1 => vec![FailureSignal::SlowResponse {
                    latency_ms: 7_200,
                    threshold_ms: 5_000,
                }],
                _ => Vec::new(),
            };
            ProbeOutcome {
                kind: *kind,
                status: if failures.is_empty() {
                    ProbeStatus::Passed
                } else {
                    ProbeStatus::Failed
                },
                duration: Duration::from_millis(1_500),
                notes: Vec::new(),
                replies: Vec::new(),
                failures,
                screenshot: None,
            }
        })
        .collect();

    ProbeRun {
        target: "https://shop.example.com/".to_string(),
        vendor: Vendor::Intercom,
        browser: BrowserKind::Chromium,
        started_at: Utc::now(),
        outcomes,
        resolutions: vec![
            Resolution {
                element: WidgetElement::Launcher,
                tier: SelectorTier::Framework,
                selector: ".intercom-launcher".to_string(),
                attempts: 4,
            },
            Resolution {
                element: WidgetElement::MessageInput,
                tier: SelectorTier::Primary,
                selector: "[data-test-id=\"chat-input\"]".to_string(),
                attempts: 1,
            },
        ],
        requests: Vec::new(),
    }
}

fn benchmark_load_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_summary");

    for count in [1_000usize, 10_000, 100_000] {
        let samples = samples(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &samples, |b, samples| {
            b.iter(|| {
                let summary = LoadSummary::from_samples(samples, Duration::from_secs(60));
                std::hint::black_box(summary);
            });
        });
    }

    group.finish();
}

fn benchmark_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    let analyzer = Analyzer::new(AnalysisConfig::default());
    let probes = probe_run();
    let load = load_run(10_000);

    group.bench_function("probes_only", |b| {
        b.iter(|| std::hint::black_box(analyzer.analyze(Some(&probes), None)));
    });

    group.bench_function("probes_and_load", |b| {
        b.iter(|| std::hint::black_box(analyzer.analyze(Some(&probes), Some(&load))));
    });

    group.finish();
}

fn benchmark_report_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_rendering");
    let probes = probe_run();
    let load = load_run(10_000);
    let analysis = Analyzer::default().analyze(Some(&probes), Some(&load));
    let report = ExecutiveReport::new("Nightly widget check", analysis, Some(&probes), Some(&load));

    group.bench_function("markdown", |b| {
        b.iter(|| std::hint::black_box(report.to_markdown()));
    });

    group.bench_function("html", |b| {
        b.iter(|| std::hint::black_box(report.to_html()));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_load_summary,
    benchmark_analysis,
    benchmark_report_rendering
);
criterion_main!(benches);
