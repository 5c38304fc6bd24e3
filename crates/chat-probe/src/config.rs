// Harness configuration
//
// Loaded from YAML; every section has defaults so a config only needs the
// target page. A handful of environment variables override the file.

use crate::error::{Error, Result};
use crate::selectors::{SelectorRegistry, Vendor, WidgetElement};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

/// Overrides `target.page_url`
pub const ENV_URL: &str = "CHAT_PROBE_URL";
/// Overrides `target.api_endpoint`
pub const ENV_ENDPOINT: &str = "CHAT_PROBE_ENDPOINT";
/// Overrides `browser.headless` (`true`/`false`)
pub const ENV_HEADLESS: &str = "CHAT_PROBE_HEADLESS";

/// Top-level harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub target: TargetConfig,
    pub browser: BrowserConfig,
    /// Extra selectors tried before the built-in chains
    pub selectors: HashMap<WidgetElement, Vec<String>>,
    pub probe: ProbeConfig,
    pub load: LoadConfig,
    pub analysis: AnalysisConfig,
    pub report: ReportConfig,
}

/// Page hosting the widget and the vendor behind it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub page_url: String,
    pub vendor: Vendor,
    /// Chat API endpoint; inferred from the page when absent
    pub api_endpoint: Option<String>,
}

/// Browser engine to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

/// Viewport dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: BrowserKind,
    pub headless: bool,
    pub slow_mo_ms: Option<u64>,
    pub viewport: ViewportSize,
    pub user_agent: Option<String>,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            slow_mo_ms: None,
            viewport: ViewportSize::default(),
            user_agent: None,
            navigation_timeout_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: BrowserKind) -> Self {
        self.kind = kind;
        self
    }

    /// Run without a visible window
    pub fn headless(mut self, enabled: bool) -> Self {
        self.headless = enabled;
        self
    }

    /// Slow down every browser operation by `ms` milliseconds
    pub fn slow_mo(mut self, ms: u64) -> Self {
        self.slow_mo_ms = Some(ms);
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = ViewportSize { width, height };
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Browser probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Prompts sent during the round-trip probe
    pub messages: Vec<String>,
    /// Wait for the widget to appear, open or close
    pub widget_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Replies slower than this are reported as slow
    pub slow_response_ms: u64,
    pub min_response_chars: usize,
    /// Regexes that mark a bot reply as an error message
    pub error_patterns: Vec<String>,
    pub long_message_chars: usize,
    pub rapid_message_count: usize,
    pub screenshot_on_failure: bool,
    /// Directory for failure screenshots
    pub artifacts_dir: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            messages: vec![
                "Hello".to_string(),
                "What are your opening hours?".to_string(),
                "I need help with my order".to_string(),
            ],
            widget_timeout_ms: 10_000,
            response_timeout_ms: 15_000,
            poll_interval_ms: 250,
            slow_response_ms: 5_000,
            min_response_chars: 2,
            error_patterns: vec![
                "(?i)something went wrong".to_string(),
                "(?i)an error (has )?occurred".to_string(),
                "(?i)try again later".to_string(),
                "(?i)(service|agent)s? (is |are )?unavailable".to_string(),
            ],
            long_message_chars: 2_000,
            rapid_message_count: 3,
            screenshot_on_failure: true,
            artifacts_dir: "artifacts".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn widget_timeout(&self) -> Duration {
        Duration::from_millis(self.widget_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn slow_response(&self) -> Duration {
        Duration::from_millis(self.slow_response_ms)
    }

    /// Compiles `error_patterns`
    pub fn compiled_error_patterns(&self) -> Result<Vec<Regex>> {
        self.error_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(Error::from))
            .collect()
    }
}

/// Pass/fail limits applied to a load run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadThresholds {
    pub p95_ms: u64,
    /// Fraction of failed requests tolerated (0.0 - 1.0)
    pub max_error_rate: f64,
}

impl Default for LoadThresholds {
    fn default() -> Self {
        Self {
            p95_ms: 2_000,
            max_error_rate: 0.05,
        }
    }
}

/// HTTP load settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Concurrent virtual users
    pub users: usize,
    /// Requests per virtual user
    pub iterations: usize,
    pub ramp_up_ms: u64,
    pub think_time_ms: u64,
    pub request_timeout_ms: u64,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    /// Request body; `{{message}}`, `{{user}}` and `{{iteration}}` are substituted
    pub body_template: String,
    /// Messages rotated through the body template
    pub messages: Vec<String>,
    pub thresholds: LoadThresholds,
}

impl Default for LoadConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            users: 10,
            iterations: 10,
            ramp_up_ms: 0,
            think_time_ms: 0,
            request_timeout_ms: 10_000,
            method: "POST".to_string(),
            headers,
            body_template:
                r#"{"message":"{{message}}","visitor":"probe-{{user}}","sequence":{{iteration}}}"#
                    .to_string(),
            messages: vec!["Hello".to_string()],
            thresholds: LoadThresholds::default(),
        }
    }
}

impl LoadConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Inputs for impact estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Monthly active users reaching the page
    pub audience: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { audience: 10_000 }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Html,
    Json,
}

impl ReportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "report.md",
            ReportFormat::Html => "report.html",
            ReportFormat::Json => "report.json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: String,
    pub formats: Vec<ReportFormat>,
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: "reports".to_string(),
            formats: vec![ReportFormat::Markdown, ReportFormat::Html, ReportFormat::Json],
            title: "Chat Widget Health Report".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Creates a config with defaults for everything but the page URL
    pub fn for_page(page_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.target.page_url = page_url.into();
        config
    }

    /// Selector registry for the configured vendor and overrides
    pub fn selector_registry(&self) -> SelectorRegistry {
        SelectorRegistry::with_overrides(self.target.vendor, &self.selectors)
    }

    /// Parses YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads a YAML file and applies environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).context(format!("reading {}", path.display())))?;
        let mut config = Self::from_yaml(&text)?;
        config.apply_env();
        Ok(config)
    }

    /// Applies overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup (keys are the `ENV_*` names)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.is_empty()) {
            self.target.page_url = url;
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.is_empty()) {
            self.target.api_endpoint = Some(endpoint);
        }
        if let Some(headless) = lookup(ENV_HEADLESS) {
            match headless.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => self.browser.headless = true,
                "false" | "0" | "no" => self.browser.headless = false,
                other => tracing::warn!("Ignoring {}={}", ENV_HEADLESS, other),
            }
        }
    }

    /// Checks values that would otherwise fail mid-run
    pub fn validate(&self) -> Result<()> {
        if !self.target.page_url.is_empty() {
            url::Url::parse(&self.target.page_url)
                .map_err(|e| Error::Config(format!("target.page_url: {e}")))?;
        }
        if let Some(endpoint) = &self.target.api_endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("target.api_endpoint: {e}")))?;
        }
        if self.browser.navigation_timeout_ms == 0 {
            return Err(Error::Config("browser.navigation_timeout_ms must be > 0".into()));
        }
        if self.probe.widget_timeout_ms == 0
            || self.probe.response_timeout_ms == 0
            || self.probe.poll_interval_ms == 0
        {
            return Err(Error::Config(
                "probe timeouts and poll interval must be > 0".into(),
            ));
        }
        self.probe
            .compiled_error_patterns()
            .map_err(|e| e.context("probe.error_patterns"))?;
        if self.load.users == 0 || self.load.iterations == 0 {
            return Err(Error::Config("load.users and load.iterations must be > 0".into()));
        }
        if self.load.request_timeout_ms == 0 {
            return Err(Error::Config("load.request_timeout_ms must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.load.thresholds.max_error_rate) {
            return Err(Error::Config(
                "load.thresholds.max_error_rate must be between 0 and 1".into(),
            ));
        }
        if self.load.method.parse::<reqwest::Method>().is_err() {
            return Err(Error::Config(format!("load.method: {}", self.load.method)));
        }
        Ok(())
    }
}
