// Selector registry - Built-in candidate tables and chain assembly

use super::{SelectorTier, Vendor, WidgetElement};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One candidate selector and the tier it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub tier: SelectorTier,
    pub selector: String,
}

/// Ordered candidate selectors for a single widget element.
///
/// Candidates keep insertion order; a selector that is already present is
/// ignored, so the earliest (most specific) tier wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorChain {
    candidates: Vec<Candidate>,
}

impl SelectorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate unless the same selector is already present
    pub fn push(&mut self, tier: SelectorTier, selector: impl Into<String>) {
        let selector = selector.into();
        let selector = selector.trim();
        if selector.is_empty() || self.candidates.iter().any(|c| c.selector == selector) {
            return;
        }
        self.candidates.push(Candidate {
            tier,
            selector: selector.to_string(),
        });
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates belonging to one tier
    pub fn tier(&self, tier: SelectorTier) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(move |c| c.tier == tier)
    }
}

/// Builds fallback chains for every widget element.
#[derive(Debug, Clone)]
pub struct SelectorRegistry {
    vendor: Vendor,
    chains: HashMap<WidgetElement, SelectorChain>,
}

impl SelectorRegistry {
    /// Creates a registry with the built-in tables.
    ///
    /// `vendor` moves that vendor's framework selectors ahead of the others.
    /// `Vendor::Generic` keeps the default vendor order.
    pub fn new(vendor: Vendor) -> Self {
        Self::with_overrides(vendor, &HashMap::new())
    }

    /// Creates a registry whose chains start with the given override selectors
    pub fn with_overrides(vendor: Vendor, overrides: &HashMap<WidgetElement, Vec<String>>) -> Self {
        let chains = WidgetElement::ALL
            .iter()
            .map(|&element| {
                let extra = overrides.get(&element).map(Vec::as_slice).unwrap_or(&[]);
                (element, build_chain(element, vendor, extra))
            })
            .collect();

        Self { vendor, chains }
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Returns the chain for an element
    pub fn chain(&self, element: WidgetElement) -> &SelectorChain {
        // Every element gets a chain in `with_overrides`
        &self.chains[&element]
    }
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        Self::new(Vendor::Generic)
    }
}

fn build_chain(element: WidgetElement, vendor: Vendor, overrides: &[String]) -> SelectorChain {
    let mut chain = SelectorChain::new();

    for selector in overrides {
        chain.push(SelectorTier::Override, selector.as_str());
    }

    let test_id = element.test_id();
    chain.push(SelectorTier::Primary, format!("[data-test-id=\"{test_id}\"]"));
    chain.push(SelectorTier::Primary, format!("[data-testid=\"{test_id}\"]"));

    for selector in css_fallbacks(element) {
        chain.push(SelectorTier::CssFallback, *selector);
    }

    let mut seen = HashSet::new();
    let hinted = (vendor != Vendor::Generic).then_some(vendor);
    for v in hinted.into_iter().chain(Vendor::KNOWN) {
        if !seen.insert(v) {
            continue;
        }
        for selector in framework_selectors(v, element) {
            chain.push(SelectorTier::Framework, *selector);
        }
    }

    for selector in heuristics(element) {
        chain.push(SelectorTier::Heuristic, *selector);
    }

    chain
}

fn css_fallbacks(element: WidgetElement) -> &'static [&'static str] {
    match element {
        WidgetElement::Launcher => &[
            "#chat-launcher",
            ".chat-launcher",
            "button.chat-toggle",
            ".chat-widget-button",
        ],
        WidgetElement::Container => &[
            "#chat-widget",
            ".chat-widget",
            ".chat-window",
            ".chat-container",
        ],
        WidgetElement::CloseButton => &[".chat-close", "#chat-close", ".chat-widget .close"],
        WidgetElement::MessageInput => &[
            "#chat-input",
            ".chat-input",
            ".chat-widget textarea",
            ".chat-widget input[type=\"text\"]",
        ],
        WidgetElement::SendButton => &[
            "#chat-send",
            ".chat-send",
            ".chat-widget button[type=\"submit\"]",
        ],
        WidgetElement::MessageList => &[".chat-messages", "#chat-messages", ".message-list"],
        WidgetElement::BotMessage => &[
            ".chat-message.bot",
            ".message--bot",
            ".chat-message.agent",
            ".message.incoming",
        ],
        WidgetElement::UserMessage => &[
            ".chat-message.user",
            ".message--user",
            ".message.outgoing",
        ],
        WidgetElement::TypingIndicator => &[".typing-indicator", ".chat-typing"],
    }
}

fn framework_selectors(vendor: Vendor, element: WidgetElement) -> &'static [&'static str] {
    use WidgetElement::*;

    match (vendor, element) {
        (Vendor::Intercom, Launcher) => &[
            ".intercom-launcher",
            "[aria-label=\"Open Intercom Messenger\"]",
        ],
        (Vendor::Intercom, Container) => &[".intercom-messenger-frame", "#intercom-container"],
        (Vendor::Intercom, CloseButton) => &["[aria-label=\"Close Intercom Messenger\"]"],
        (Vendor::Intercom, MessageInput) => &[".intercom-composer textarea"],
        (Vendor::Intercom, SendButton) => &[".intercom-composer-send-button"],
        (Vendor::Intercom, MessageList) => &[".intercom-conversation-parts"],
        (Vendor::Intercom, BotMessage) => &[".intercom-comment-container-admin"],
        (Vendor::Intercom, UserMessage) => &[".intercom-comment-container-user"],
        (Vendor::Intercom, TypingIndicator) => &[".intercom-conversation-part-typing"],

        (Vendor::Drift, Launcher) => &[
            ".drift-open-chat",
            "#drift-widget-container .drift-controller-icon",
        ],
        (Vendor::Drift, Container) => &["#drift-widget", ".drift-widget-container"],
        (Vendor::Drift, CloseButton) => &[".drift-widget-close-button"],
        (Vendor::Drift, MessageInput) => &[".drift-widget-composer-input"],
        (Vendor::Drift, SendButton) => &[".drift-widget-composer-send-button"],
        (Vendor::Drift, MessageList) => &[".drift-widget-message-list"],
        (Vendor::Drift, BotMessage) => &[".drift-widget-message--from-bot"],
        (Vendor::Drift, UserMessage) => &[".drift-widget-message--from-user"],
        (Vendor::Drift, TypingIndicator) => &[".drift-widget-typing-indicator"],

        (Vendor::Zendesk, Launcher) => &["#launcher", "[data-testid=\"launcher\"]"],
        (Vendor::Zendesk, Container) => &["#webWidget", "[data-testid=\"widget\"]"],
        (Vendor::Zendesk, CloseButton) => &["[data-testid=\"Icon--close\"]"],
        (Vendor::Zendesk, MessageInput) => &["[data-garden-id=\"forms.textarea\"]"],
        (Vendor::Zendesk, SendButton) => &["[data-testid=\"Icon--send\"]"],
        (Vendor::Zendesk, MessageList) => &["[data-testid=\"message-log\"]"],
        (Vendor::Zendesk, BotMessage) => &[
            "[data-testid=\"message-bubble\"][data-is-primary=\"false\"]",
        ],
        (Vendor::Zendesk, UserMessage) => &[
            "[data-testid=\"message-bubble\"][data-is-primary=\"true\"]",
        ],
        (Vendor::Zendesk, TypingIndicator) => &["[data-testid=\"typing-indicator\"]"],

        (Vendor::LiveChat, Launcher) => &[
            "#livechat-eye-catcher",
            "[data-testid=\"bubbleButton\"]",
        ],
        (Vendor::LiveChat, Container) => &[
            "#chat-widget-container",
            "[data-testid=\"widgetWindow\"]",
        ],
        (Vendor::LiveChat, CloseButton) => &["[data-testid=\"minimize\"]"],
        (Vendor::LiveChat, MessageInput) => &[
            "#chat-widget-message-input",
            "[data-testid=\"messageInput\"]",
        ],
        (Vendor::LiveChat, SendButton) => &["[data-testid=\"sendButton\"]"],
        (Vendor::LiveChat, MessageList) => &["[data-testid=\"messageList\"]"],
        (Vendor::LiveChat, BotMessage) => &["[data-testid=\"agentMessage\"]"],
        (Vendor::LiveChat, UserMessage) => &["[data-testid=\"visitorMessage\"]"],
        (Vendor::LiveChat, TypingIndicator) => &["[data-testid=\"typingIndicator\"]"],

        (Vendor::Tidio, Launcher) => &["#tidio-chat #button-body", "#tidio-chat button"],
        (Vendor::Tidio, Container) => &["#tidio-chat .chat", "#tidio-chat-iframe"],
        (Vendor::Tidio, CloseButton) => &["#tidio-chat .exit-chat"],
        (Vendor::Tidio, MessageInput) => &["#tidio-chat textarea#new-message-textarea"],
        (Vendor::Tidio, SendButton) => &["#tidio-chat .input-group button"],
        (Vendor::Tidio, MessageList) => &["#tidio-chat .conversation-group"],
        (Vendor::Tidio, BotMessage) => &["#tidio-chat .message-operator"],
        (Vendor::Tidio, UserMessage) => &["#tidio-chat .message-visitor"],
        (Vendor::Tidio, TypingIndicator) => &["#tidio-chat .typing-indicator"],

        (Vendor::HubSpot, Launcher) => &[
            "#hubspot-messages-iframe-container .launcher",
            "[data-test-id=\"chat-widget-launcher\"]",
        ],
        (Vendor::HubSpot, Container) => &[
            "#hubspot-messages-iframe-container",
            "#hubspot-conversations-inline-parent",
        ],
        (Vendor::HubSpot, CloseButton) => &["[data-test-id=\"close-button\"]"],
        (Vendor::HubSpot, MessageInput) => &["[data-test-id=\"chat-input\"] textarea"],
        (Vendor::HubSpot, SendButton) => &["[data-test-id=\"chat-send-button\"]"],
        (Vendor::HubSpot, MessageList) => &["[data-test-id=\"thread-list\"]"],
        (Vendor::HubSpot, BotMessage) => &["[data-test-id=\"message-from-bot\"]"],
        (Vendor::HubSpot, UserMessage) => &["[data-test-id=\"message-from-visitor\"]"],
        (Vendor::HubSpot, TypingIndicator) => &["[data-test-id=\"typing-indicator\"]"],

        (Vendor::Crisp, Launcher) => &[".crisp-client [data-id=\"chat_closed\"]", "a.cc-unoo"],
        (Vendor::Crisp, Container) => &[
            ".crisp-client [data-chat-status]",
            ".crisp-client .cc-kv6t",
        ],
        (Vendor::Crisp, CloseButton) => &[".crisp-client [data-id=\"chat_opened\"]"],
        (Vendor::Crisp, MessageInput) => &[".crisp-client textarea[name=\"message\"]"],
        (Vendor::Crisp, SendButton) => &[".crisp-client [data-id=\"send_message\"]"],
        (Vendor::Crisp, MessageList) => &[".crisp-client [data-id=\"messages\"]"],
        (Vendor::Crisp, BotMessage) => &[".crisp-client [data-from=\"operator\"]"],
        (Vendor::Crisp, UserMessage) => &[".crisp-client [data-from=\"visitor\"]"],
        (Vendor::Crisp, TypingIndicator) => &[".crisp-client [data-id=\"compose_typing\"]"],

        (Vendor::Generic, _) => &[],
    }
}

fn heuristics(element: WidgetElement) -> &'static [&'static str] {
    match element {
        WidgetElement::Launcher => &[
            "button[aria-label*=\"chat\" i]",
            "[role=\"button\"][aria-label*=\"chat\" i]",
            "[class*=\"launcher\" i]",
            "button:has-text(\"Chat\")",
        ],
        WidgetElement::Container => &[
            "[role=\"dialog\"][aria-label*=\"chat\" i]",
            "[class*=\"chat\" i][class*=\"window\" i]",
            "[id*=\"chat\" i][class*=\"open\" i]",
        ],
        WidgetElement::CloseButton => &[
            "[aria-label*=\"close\" i]",
            "[aria-label*=\"minimize\" i]",
            "button:has-text(\"×\")",
        ],
        WidgetElement::MessageInput => &[
            "textarea[placeholder*=\"message\" i]",
            "input[placeholder*=\"message\" i]",
            "[contenteditable=\"true\"][role=\"textbox\"]",
        ],
        WidgetElement::SendButton => &[
            "button[aria-label*=\"send\" i]",
            "button:has-text(\"Send\")",
        ],
        WidgetElement::MessageList => &[
            "[role=\"log\"]",
            "[class*=\"messages\" i]",
        ],
        WidgetElement::BotMessage => &[
            "[class*=\"message\" i][class*=\"bot\" i]",
            "[class*=\"message\" i][class*=\"agent\" i]",
            "[role=\"log\"] [class*=\"incoming\" i]",
        ],
        WidgetElement::UserMessage => &[
            "[class*=\"message\" i][class*=\"user\" i]",
            "[class*=\"message\" i][class*=\"visitor\" i]",
            "[role=\"log\"] [class*=\"outgoing\" i]",
        ],
        WidgetElement::TypingIndicator => &[
            "[class*=\"typing\" i]",
            "[aria-label*=\"typing\" i]",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_tier_order() {
        let registry = SelectorRegistry::default();
        let chain = registry.chain(WidgetElement::Launcher);

        let tiers: Vec<SelectorTier> = chain.candidates().iter().map(|c| c.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted, "tiers must be non-decreasing");

        assert_eq!(
            chain.candidates()[0].selector,
            "[data-test-id=\"chat-launcher\"]"
        );
        assert!(chain.tier(SelectorTier::CssFallback).count() > 0);
        assert!(chain.tier(SelectorTier::Framework).count() > 0);
        assert!(chain.tier(SelectorTier::Heuristic).count() > 0);
    }

    #[test]
    fn test_vendor_hint_moves_vendor_first() {
        let registry = SelectorRegistry::new(Vendor::Crisp);
        let first_framework = registry
            .chain(WidgetElement::Launcher)
            .tier(SelectorTier::Framework)
            .next()
            .map(|c| c.selector.clone());

        assert_eq!(
            first_framework.as_deref(),
            Some(".crisp-client [data-id=\"chat_closed\"]")
        );

        let generic_first = SelectorRegistry::default()
            .chain(WidgetElement::Launcher)
            .tier(SelectorTier::Framework)
            .next()
            .map(|c| c.selector.clone());
        assert_eq!(generic_first.as_deref(), Some(".intercom-launcher"));
    }

    #[test]
    fn test_overrides_prepended_and_deduplicated() {
        let mut overrides = HashMap::new();
        overrides.insert(
            WidgetElement::SendButton,
            vec![
                "#my-send".to_string(),
                "  ".to_string(),
                "#chat-send".to_string(),
            ],
        );
        let registry = SelectorRegistry::with_overrides(Vendor::Generic, &overrides);
        let chain = registry.chain(WidgetElement::SendButton);

        assert_eq!(chain.candidates()[0].selector, "#my-send");
        assert_eq!(chain.candidates()[1].selector, "#chat-send");
        assert_eq!(chain.candidates()[1].tier, SelectorTier::Override);
        assert_eq!(
            chain
                .candidates()
                .iter()
                .filter(|c| c.selector == "#chat-send")
                .count(),
            1
        );
    }

    #[test]
    fn test_every_element_has_all_tiers() {
        let registry = SelectorRegistry::default();
        for element in WidgetElement::ALL {
            let chain = registry.chain(element);
            for tier in [
                SelectorTier::Primary,
                SelectorTier::CssFallback,
                SelectorTier::Framework,
                SelectorTier::Heuristic,
            ] {
                assert!(
                    chain.tier(tier).count() > 0,
                    "{} has no {} selectors",
                    element,
                    tier.name()
                );
            }
        }
    }
}
