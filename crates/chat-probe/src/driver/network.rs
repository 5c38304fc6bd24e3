// Network log - Records requests issued by the page
//
// Used to find the chat API the widget talks to, which then becomes the
// load-test target.

use crate::error::Result;
use parking_lot::Mutex;
use playwright_rs::protocol::{Page, Route};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A request observed while the widget was exercised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    /// Playwright resource type (`xhr`, `fetch`, `document`, `script`, ...)
    pub resource_type: String,
}

impl RecordedRequest {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            resource_type: resource_type.into(),
        }
    }

    /// True for script-initiated API calls
    pub fn is_api_call(&self) -> bool {
        matches!(self.resource_type.as_str(), "xhr" | "fetch")
    }
}

/// Shared, append-only request log
#[derive(Debug, Clone, Default)]
pub struct NetworkLog {
    entries: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl NetworkLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, request: RecordedRequest) {
        self.entries.lock().push(request);
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<RecordedRequest> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Installs a pass-through route on `page` that records every request.
    pub async fn attach(&self, page: &Page) -> Result<()> {
        let log = self.clone();
        page.route("**/*", move |route: Route| {
            let log = log.clone();
            async move {
                let request = route.request();
                log.record(RecordedRequest::new(
                    request.method(),
                    request.url(),
                    request.resource_type(),
                ));
                route.continue_(None).await
            }
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_shared_between_clones() {
        let log = NetworkLog::new();
        let handle = log.clone();
        handle.record(RecordedRequest::new("POST", "https://api.example.com/chat", "fetch"));
        handle.record(RecordedRequest::new("GET", "https://example.com/app.js", "script"));

        assert_eq!(log.len(), 2);
        let api: Vec<_> = log.snapshot().into_iter().filter(|r| r.is_api_call()).collect();
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].url, "https://api.example.com/chat");
    }
}
