// Selector resolver - Walks fallback chains against a live page

use super::{SelectorRegistry, SelectorTier, WidgetElement};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Anything that can report how many visible elements match a selector.
#[async_trait]
pub trait ElementProbe: Send + Sync {
    /// Number of visible elements matching `selector`
    async fn count_visible(&self, selector: &str) -> Result<usize>;
}

/// Outcome of resolving one widget element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub element: WidgetElement,
    pub tier: SelectorTier,
    pub selector: String,
    /// Number of candidates probed, including the one that matched
    pub attempts: usize,
}

/// Resolves widget elements through their fallback chains.
///
/// Successful resolutions are cached per element until [`invalidate`] is
/// called, so repeated lookups during a probe cost a single probe call.
///
/// [`invalidate`]: SelectorResolver::invalidate
#[derive(Debug)]
pub struct SelectorResolver {
    registry: SelectorRegistry,
    cache: Mutex<HashMap<WidgetElement, Resolution>>,
}

impl SelectorResolver {
    pub fn new(registry: SelectorRegistry) -> Self {
        Self {
            registry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &SelectorRegistry {
        &self.registry
    }

    /// Returns the cached resolution for an element, if any
    pub fn cached(&self, element: WidgetElement) -> Option<Resolution> {
        self.cache.lock().get(&element).cloned()
    }

    /// All cached resolutions, ordered by element
    pub fn resolutions(&self) -> Vec<Resolution> {
        let mut all: Vec<Resolution> = self.cache.lock().values().cloned().collect();
        all.sort_by_key(|r| r.element);
        all
    }

    /// Drops cached resolutions (after navigation or reload)
    pub fn invalidate(&self) {
        self.cache.lock().clear();
    }

    /// Resolves an element, trying each candidate in chain order.
    ///
    /// A probe error on a candidate (for example a selector syntax the
    /// engine rejects) counts as no match and resolution moves on.
    pub async fn resolve<P>(&self, probe: &P, element: WidgetElement) -> Result<Resolution>
    where
        P: ElementProbe + ?Sized,
    {
        if let Some(hit) = self.cached(element) {
            debug!("Using cached selector for {}: {}", element, hit.selector);
            return Ok(hit);
        }

        let chain = self.registry.chain(element);
        for (index, candidate) in chain.candidates().iter().enumerate() {
            debug!(
                "Trying {} selector for {}: {}",
                candidate.tier.name(),
                element,
                candidate.selector
            );

            match probe.count_visible(&candidate.selector).await {
                Ok(count) if count > 0 => {
                    let resolution = Resolution {
                        element,
                        tier: candidate.tier,
                        selector: candidate.selector.clone(),
                        attempts: index + 1,
                    };

                    if candidate.tier.is_degraded() {
                        warn!(
                            "Resolved {} only via {} selector {}",
                            element,
                            candidate.tier.name(),
                            candidate.selector
                        );
                    } else {
                        info!(
                            "Resolved {} via {} selector {} ({} matches)",
                            element,
                            candidate.tier.name(),
                            candidate.selector,
                            count
                        );
                    }

                    self.cache.lock().insert(element, resolution.clone());
                    return Ok(resolution);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Selector {} failed: {}", candidate.selector, e);
                }
            }
        }

        Err(Error::ElementNotFound {
            element,
            tried: chain.len(),
        })
    }

    /// Like [`resolve`](Self::resolve) but maps "not found" to `None`.
    ///
    /// Other errors still propagate.
    pub async fn resolve_any<P>(
        &self,
        probe: &P,
        element: WidgetElement,
    ) -> Result<Option<Resolution>>
    where
        P: ElementProbe + ?Sized,
    {
        match self.resolve(probe, element).await {
            Ok(resolution) => Ok(Some(resolution)),
            Err(Error::ElementNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
