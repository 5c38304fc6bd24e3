//! HTTP load against the widget's chat API
//!
//! A [`LoadPlan`] describes the request and the virtual-user shape, the
//! [`LoadRunner`] executes it and returns a [`LoadRun`]: every request
//! sample, a [`LoadSummary`] and the threshold signals derived from it.

pub mod endpoint;
mod runner;
mod summary;

pub use endpoint::{EndpointSource, InferredEndpoint, infer_endpoint};
pub use runner::{LoadPlan, LoadRunner};
pub use summary::{LatencyStats, LoadSummary, percentile};

use crate::error::Result;
use crate::probes::FailureSignal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Transport-level failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleErrorKind {
    Timeout,
    Connect,
    Other,
}

impl SampleErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            SampleErrorKind::Timeout => "timeout",
            SampleErrorKind::Connect => "connect",
            SampleErrorKind::Other => "other",
        }
    }

    pub(crate) fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            SampleErrorKind::Timeout
        } else if err.is_connect() {
            SampleErrorKind::Connect
        } else {
            SampleErrorKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleError {
    pub kind: SampleErrorKind,
    pub message: String,
}

/// One request made by one virtual user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSample {
    pub user: usize,
    pub iteration: usize,
    /// `None` when no response arrived
    pub status: Option<u16>,
    #[serde(with = "crate::serde_millis")]
    pub latency: Duration,
    pub bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SampleError>,
}

impl RequestSample {
    /// 2xx/3xx with the body fully read
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|s| (200..400).contains(&s))
    }
}

/// Result of a load run; saved as JSON between commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRun {
    pub endpoint: String,
    pub method: String,
    pub users: usize,
    pub iterations: usize,
    pub started_at: DateTime<Utc>,
    #[serde(with = "crate::serde_millis")]
    pub elapsed: Duration,
    pub summary: LoadSummary,
    #[serde(default)]
    pub signals: Vec<FailureSignal>,
    #[serde(default)]
    pub samples: Vec<RequestSample>,
}

impl LoadRun {
    /// Fraction of answered requests slower than `threshold_ms`
    pub fn slow_fraction(&self, threshold_ms: u64) -> f64 {
        let answered: Vec<&RequestSample> =
            self.samples.iter().filter(|s| s.status.is_some()).collect();
        if answered.is_empty() {
            return 0.0;
        }
        let slow = answered
            .iter()
            .filter(|s| s.latency.as_millis() as u64 > threshold_ms)
            .count();
        slow as f64 / answered.len() as f64
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        crate::read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_status_and_body() {
        let mut sample = RequestSample {
            user: 1,
            iteration: 0,
            status: Some(302),
            latency: Duration::from_millis(40),
            bytes: 0,
            error: None,
        };
        assert!(sample.is_success());

        sample.status = Some(429);
        assert!(!sample.is_success());

        sample.status = Some(200);
        sample.error = Some(SampleError {
            kind: SampleErrorKind::Other,
            message: "body cut short".to_string(),
        });
        assert!(!sample.is_success());
    }

    #[test]
    fn test_run_round_trips_through_disk() {
        let samples: Vec<RequestSample> = [100, 300, 900, 1_500]
            .into_iter()
            .enumerate()
            .map(|(i, ms)| RequestSample {
                user: i,
                iteration: 0,
                status: Some(200),
                latency: Duration::from_millis(ms),
                bytes: 12,
                error: None,
            })
            .collect();
        let elapsed = Duration::from_secs(2);
        let run = LoadRun {
            endpoint: "http://127.0.0.1:9/api/chat".to_string(),
            method: "POST".to_string(),
            users: 4,
            iterations: 1,
            started_at: Utc::now(),
            elapsed,
            summary: LoadSummary::from_samples(&samples, elapsed),
            signals: Vec::new(),
            samples,
        };
        assert!((run.slow_fraction(500) - 0.5).abs() < 1e-9);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/load.json");
        run.save(&path).unwrap();
        let back = LoadRun::load(&path).unwrap();
        assert_eq!(back.summary, run.summary);
        assert_eq!(back.samples.len(), 4);
    }
}
