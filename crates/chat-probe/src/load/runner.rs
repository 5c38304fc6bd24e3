// Load runner - Virtual users hammering the chat API

use super::{LoadRun, LoadSummary, RequestSample, SampleError, SampleErrorKind};
use crate::config::{LoadConfig, LoadThresholds};
use crate::error::{Error, Result};
use chrono::Utc;
use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// A fully validated load run description
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub endpoint: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body_template: String,
    pub messages: Vec<String>,
    pub users: usize,
    pub iterations: usize,
    pub ramp_up: Duration,
    pub think_time: Duration,
    pub timeout: Duration,
    pub thresholds: LoadThresholds,
}

impl LoadPlan {
    pub fn from_config(endpoint: &str, config: &LoadConfig) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::from(e).context(format!("load endpoint {endpoint:?}")))?;
        let method = config
            .method
            .to_ascii_uppercase()
            .parse::<Method>()
            .map_err(|_| Error::Config(format!("invalid HTTP method {:?}", config.method)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Config(format!("invalid header name {name:?}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::Config(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }

        if config.users == 0 || config.iterations == 0 {
            return Err(Error::Config(
                "load users and iterations must both be at least 1".to_string(),
            ));
        }

        let messages = if config.messages.is_empty() {
            vec!["Hello".to_string()]
        } else {
            config.messages.clone()
        };

        Ok(Self {
            endpoint,
            method,
            headers,
            body_template: config.body_template.clone(),
            messages,
            users: config.users,
            iterations: config.iterations,
            ramp_up: Duration::from_millis(config.ramp_up_ms),
            think_time: Duration::from_millis(config.think_time_ms),
            timeout: config.request_timeout(),
            thresholds: config.thresholds,
        })
    }

    /// Total requests the plan will issue
    pub fn request_count(&self) -> usize {
        self.users * self.iterations
    }

    /// Message for a given user and iteration, rotating through the list
    pub fn message_for(&self, user: usize, iteration: usize) -> &str {
        &self.messages[(user + iteration) % self.messages.len()]
    }

    /// Substitutes `{{message}}`, `{{user}}` and `{{iteration}}`.
    ///
    /// The message is JSON string escaped so it can sit inside quotes in a
    /// JSON template.
    pub fn render_body(&self, user: usize, iteration: usize) -> String {
        let message = json_escape(self.message_for(user, iteration));
        self.body_template
            .replace("{{message}}", &message)
            .replace("{{user}}", &user.to_string())
            .replace("{{iteration}}", &iteration.to_string())
    }

    /// Start offset for `user` so that starts spread evenly across the ramp-up
    pub fn start_delay(&self, user: usize) -> Duration {
        if self.users <= 1 || self.ramp_up.is_zero() {
            return Duration::ZERO;
        }
        self.ramp_up.mul_f64(user as f64 / (self.users - 1) as f64)
    }
}

fn json_escape(text: &str) -> String {
    let quoted = serde_json::Value::String(text.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Executes load plans with a shared HTTP client
#[derive(Debug, Clone)]
pub struct LoadRunner {
    client: Client,
}

impl LoadRunner {
    pub fn new(plan: &LoadPlan) -> Result<Self> {
        let client = Client::builder()
            .timeout(plan.timeout)
            .pool_max_idle_per_host(plan.users)
            .user_agent(concat!("chat-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub async fn run(&self, plan: &LoadPlan) -> LoadRun {
        info!(
            "Starting load: {} users x {} iterations against {} {}",
            plan.users, plan.iterations, plan.method, plan.endpoint
        );
        let started_at = Utc::now();
        let start = Instant::now();
        let shared = Arc::new(plan.clone());

        let users = (0..plan.users).map(|user| {
            let client = self.client.clone();
            let plan = Arc::clone(&shared);
            tokio::spawn(async move { virtual_user(client, plan, user).await })
        });

        let mut samples = Vec::with_capacity(plan.request_count());
        for (user, joined) in join_all(users).await.into_iter().enumerate() {
            match joined {
                Ok(user_samples) => samples.extend(user_samples),
                Err(e) => warn!("Virtual user {} aborted: {}", user, e),
            }
        }
        samples.sort_by_key(|s| (s.user, s.iteration));

        let elapsed = start.elapsed();
        let summary = LoadSummary::from_samples(&samples, elapsed);
        let signals = summary.evaluate(&plan.thresholds);
        info!(
            "Load finished: {} requests, {:.1}% errors, p95 {}ms, {:.1} req/s",
            summary.total,
            summary.error_rate * 100.0,
            summary.latency.p95,
            summary.throughput_rps
        );
        for signal in &signals {
            warn!("{}", signal.describe());
        }

        LoadRun {
            endpoint: plan.endpoint.to_string(),
            method: plan.method.to_string(),
            users: plan.users,
            iterations: plan.iterations,
            started_at,
            elapsed,
            summary,
            signals,
            samples,
        }
    }
}

async fn virtual_user(client: Client, plan: Arc<LoadPlan>, user: usize) -> Vec<RequestSample> {
    tokio::time::sleep(plan.start_delay(user)).await;

    let mut samples = Vec::with_capacity(plan.iterations);
    for iteration in 0..plan.iterations {
        samples.push(send_one(&client, &plan, user, iteration).await);
        if iteration + 1 < plan.iterations && !plan.think_time.is_zero() {
            tokio::time::sleep(plan.think_time).await;
        }
    }
    samples
}

async fn send_one(
    client: &Client,
    plan: &LoadPlan,
    user: usize,
    iteration: usize,
) -> RequestSample {
    let mut request = client
        .request(plan.method.clone(), plan.endpoint.clone())
        .headers(plan.headers.clone());
    if plan.method != Method::GET && plan.method != Method::HEAD {
        request = request.body(plan.render_body(user, iteration));
    }

    let start = Instant::now();
    let (status, bytes, error) = match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.bytes().await {
                Ok(body) => (Some(status), body.len(), None),
                Err(e) => (Some(status), 0, Some(sample_error(&e))),
            }
        }
        Err(e) => (None, 0, Some(sample_error(&e))),
    };
    let latency = start.elapsed();

    debug!(
        "user {} iteration {} -> {:?} in {}ms",
        user,
        iteration,
        status,
        latency.as_millis()
    );

    RequestSample {
        user,
        iteration,
        status,
        latency,
        bytes,
        error,
    }
}

fn sample_error(err: &reqwest::Error) -> SampleError {
    SampleError {
        kind: SampleErrorKind::classify(err),
        message: err.to_string(),
    }
}
