// Error types for chat-probe

use crate::selectors::WidgetElement;
use thiserror::Error;

/// Result type alias for chat-probe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while probing a chat widget
#[derive(Debug, Error)]
pub enum Error {
    /// Browser automation failed (launch, navigation, element action)
    #[error("Browser error: {0}")]
    Browser(#[from] playwright_rs::Error),

    /// No selector in the element's fallback chain matched a visible element
    ///
    /// Includes how many candidates were tried so the report can tell a
    /// renamed widget apart from a missing one.
    #[error("Element not found: {element} (tried {tried} selectors)")]
    ElementNotFound { element: WidgetElement, tried: usize },

    /// Neither the launcher nor the widget container could be located
    #[error("Chat widget not found on {url}")]
    WidgetMissing { url: String },

    /// Timeout waiting for a widget state change or a bot reply
    ///
    /// Contains the operation that timed out and the timeout duration.
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout { operation: String, duration_ms: u64 },

    /// Navigation returned a non-success status
    #[error("Navigation to '{url}' failed with status {status}")]
    NavigationFailed { url: String, status: u16 },

    /// Configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP client error outside of individual load samples
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid regular expression in configuration
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Invalid glob pattern
    #[error("Invalid glob: {0}")]
    Glob(#[from] glob::PatternError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// Returns true if this error (or the error it wraps) is a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Browser(playwright_rs::Error::Timeout(_)) => true,
            Error::Context(_, inner) => inner.is_timeout(),
            _ => false,
        }
    }
}
