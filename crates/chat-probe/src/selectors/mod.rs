// Selectors - Widget element lookup with tiered fallback
//
// A third-party widget ships an unversioned DOM, so each element is located
// through a chain of candidate selectors ordered from most to least specific:
//
// 1. Override     - selectors supplied in the harness config
// 2. Primary      - data-test-id / data-testid hooks
// 3. CssFallback  - conventional class and id names
// 4. Framework    - known vendor widget markup (Intercom, Drift, ...)
// 5. Heuristic    - generic attribute and text matching

pub mod registry;
pub mod resolver;

pub use registry::{Candidate, SelectorChain, SelectorRegistry};
pub use resolver::{ElementProbe, Resolution, SelectorResolver};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Elements of a chat widget the page object interacts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetElement {
    /// Floating bubble/button that opens the widget
    Launcher,
    /// Panel or frame holding the conversation
    Container,
    /// Control that minimizes or closes the panel
    CloseButton,
    /// Text box (input or textarea) for composing messages
    MessageInput,
    /// Button that submits the composed message
    SendButton,
    /// Scrollable list of messages
    MessageList,
    /// Individual messages authored by the bot/agent
    BotMessage,
    /// Individual messages authored by the visitor
    UserMessage,
    /// "Agent is typing" indicator
    TypingIndicator,
}

impl WidgetElement {
    /// All elements in a stable order
    pub const ALL: [WidgetElement; 9] = [
        WidgetElement::Launcher,
        WidgetElement::Container,
        WidgetElement::CloseButton,
        WidgetElement::MessageInput,
        WidgetElement::SendButton,
        WidgetElement::MessageList,
        WidgetElement::BotMessage,
        WidgetElement::UserMessage,
        WidgetElement::TypingIndicator,
    ];

    /// Value of the `data-test-id` hook for this element
    pub fn test_id(&self) -> &'static str {
        match self {
            WidgetElement::Launcher => "chat-launcher",
            WidgetElement::Container => "chat-container",
            WidgetElement::CloseButton => "chat-close",
            WidgetElement::MessageInput => "chat-input",
            WidgetElement::SendButton => "chat-send",
            WidgetElement::MessageList => "chat-messages",
            WidgetElement::BotMessage => "chat-message-bot",
            WidgetElement::UserMessage => "chat-message-user",
            WidgetElement::TypingIndicator => "chat-typing",
        }
    }
}

impl fmt::Display for WidgetElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WidgetElement::Launcher => "launcher",
            WidgetElement::Container => "container",
            WidgetElement::CloseButton => "close button",
            WidgetElement::MessageInput => "message input",
            WidgetElement::SendButton => "send button",
            WidgetElement::MessageList => "message list",
            WidgetElement::BotMessage => "bot message",
            WidgetElement::UserMessage => "user message",
            WidgetElement::TypingIndicator => "typing indicator",
        };
        f.write_str(name)
    }
}

/// Where a candidate selector came from, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorTier {
    Override,
    Primary,
    CssFallback,
    Framework,
    Heuristic,
}

impl SelectorTier {
    /// Get tier name as string
    pub fn name(&self) -> &'static str {
        match self {
            SelectorTier::Override => "override",
            SelectorTier::Primary => "primary",
            SelectorTier::CssFallback => "css-fallback",
            SelectorTier::Framework => "framework",
            SelectorTier::Heuristic => "heuristic",
        }
    }

    /// True for tiers that indicate the widget's stable hooks were missing
    pub fn is_degraded(&self) -> bool {
        matches!(self, SelectorTier::Framework | SelectorTier::Heuristic)
    }
}

/// Known chat widget vendors.
///
/// The vendor hint reorders framework selectors and picks the API path used
/// when the load endpoint has to be guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Intercom,
    Drift,
    Zendesk,
    LiveChat,
    Tidio,
    HubSpot,
    Crisp,
    #[default]
    Generic,
}

impl Vendor {
    /// Vendors with framework-specific markup, in default probing order
    pub const KNOWN: [Vendor; 7] = [
        Vendor::Intercom,
        Vendor::Drift,
        Vendor::Zendesk,
        Vendor::LiveChat,
        Vendor::Tidio,
        Vendor::HubSpot,
        Vendor::Crisp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Vendor::Intercom => "intercom",
            Vendor::Drift => "drift",
            Vendor::Zendesk => "zendesk",
            Vendor::LiveChat => "livechat",
            Vendor::Tidio => "tidio",
            Vendor::HubSpot => "hubspot",
            Vendor::Crisp => "crisp",
            Vendor::Generic => "generic",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
