// Driver - Browser seam used by the widget page object
//
// The page object only speaks selectors and text; `PlaywrightDriver` maps
// those calls onto a Playwright page, and unit tests swap in an in-memory
// widget.

pub mod browser;
pub mod network;

#[cfg(test)]
pub(crate) mod fake;

pub use browser::{BrowserSession, PlaywrightDriver};
pub use network::{NetworkLog, RecordedRequest};

use crate::error::Result;
use crate::selectors::ElementProbe;
use async_trait::async_trait;
use std::path::Path;

/// Browser operations needed to exercise a chat widget.
///
/// Actions target the first element matching the selector.
#[async_trait]
pub trait WidgetDriver: ElementProbe {
    /// Navigates to `url`, returning the main document status if known
    async fn goto(&self, url: &str) -> Result<Option<u16>>;

    /// Reloads the current page
    async fn reload(&self) -> Result<()>;

    /// Number of elements matching `selector`, visible or not
    async fn count_all(&self, selector: &str) -> Result<usize>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Replaces the element's value with `text`
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    /// Presses a key (e.g. `Enter`, `Escape`) with the element focused
    async fn press(&self, selector: &str, key: &str) -> Result<()>;

    /// Rendered text of every element matching `selector`, in DOM order
    async fn texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Current value of an input or textarea
    async fn input_value(&self, selector: &str) -> Result<String>;

    /// Captures the page to `path` and returns the PNG bytes
    async fn screenshot(&self, path: &Path) -> Result<Vec<u8>>;
}
