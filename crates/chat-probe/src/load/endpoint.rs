// Endpoint inference - Picks the chat API to put under load

use crate::driver::RecordedRequest;
use crate::error::{Error, Result};
use crate::selectors::Vendor;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

/// How the load endpoint was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSource {
    /// Given in config or on the command line
    Explicit,
    /// Seen in the page's traffic and matching the vendor's API hosts
    VendorTraffic,
    /// Seen in the page's traffic with a chat-like path
    ChatTraffic,
    /// Vendor's public default endpoint
    VendorDefault,
    /// Page origin plus `/api/chat`
    Convention,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredEndpoint {
    pub url: String,
    pub source: EndpointSource,
}

/// URL fragments that identify each vendor's API traffic
pub fn api_hints(vendor: Vendor) -> &'static [&'static str] {
    match vendor {
        Vendor::Intercom => &["api-iam.intercom.io", "/messenger/web/"],
        Vendor::Drift => &["driftapi.com", "drift.com/conversations"],
        Vendor::Zendesk => &["zendesk.com/sc/", "zdassets.com", "zendesk.com/embeddable"],
        Vendor::LiveChat => &["api.livechatinc.com", "secure.livechatinc.com"],
        Vendor::Tidio => &["tidio.co", "tidiochat.com"],
        Vendor::HubSpot => &["api.hubspot.com/livechat", "/conversations-visitor"],
        Vendor::Crisp => &["client.crisp.chat", "client.relay.crisp.chat"],
        Vendor::Generic => &[],
    }
}

fn vendor_default(vendor: Vendor) -> Option<&'static str> {
    match vendor {
        Vendor::Intercom => Some("https://api-iam.intercom.io/messenger/web/conversations"),
        Vendor::Drift => Some("https://driftapi.com/conversations"),
        Vendor::Zendesk => Some("https://widget-mediator.zopim.com/s/W/ws"),
        Vendor::LiveChat => Some("https://api.livechatinc.com/v3.5/customer/action/send_event"),
        Vendor::Tidio => Some("https://api-v2.tidio.co/visitor/message"),
        Vendor::HubSpot => Some("https://api.hubspot.com/livechat-public/v1/message"),
        Vendor::Crisp => Some("https://client.crisp.chat/v1/website/message"),
        Vendor::Generic => None,
    }
}

const CHAT_PATH_WORDS: [&str; 3] = ["chat", "message", "conversation"];

/// Chooses the endpoint for the load run.
///
/// Precedence: explicit value, observed vendor traffic, observed chat-like
/// POST traffic, the vendor's default endpoint, then the page origin joined
/// with `/api/chat`.
pub fn infer_endpoint(
    page_url: &str,
    vendor: Vendor,
    requests: &[RecordedRequest],
    explicit: Option<&str>,
) -> Result<InferredEndpoint> {
    if let Some(url) = explicit.filter(|u| !u.trim().is_empty()) {
        Url::parse(url)?;
        return Ok(found(url, EndpointSource::Explicit));
    }

    let vendors: Vec<Vendor> = if vendor == Vendor::Generic {
        Vendor::KNOWN.to_vec()
    } else {
        vec![vendor]
    };
    let api_calls: Vec<&RecordedRequest> = requests.iter().filter(|r| r.is_api_call()).collect();

    for v in &vendors {
        let hints = api_hints(*v);
        if let Some(hit) = api_calls
            .iter()
            .find(|r| hints.iter().any(|h| r.url.contains(h)))
        {
            return Ok(found(&hit.url, EndpointSource::VendorTraffic));
        }
    }

    if let Some(hit) = api_calls.iter().find(|r| {
        r.method.eq_ignore_ascii_case("POST")
            && Url::parse(&r.url).is_ok_and(|u| {
                let path = u.path().to_ascii_lowercase();
                CHAT_PATH_WORDS.iter().any(|w| path.contains(w))
            })
    }) {
        return Ok(found(&hit.url, EndpointSource::ChatTraffic));
    }

    if let Some(url) = vendor_default(vendor) {
        return Ok(found(url, EndpointSource::VendorDefault));
    }

    if page_url.is_empty() {
        return Err(Error::Config(
            "no API endpoint configured and no page URL to infer one from".to_string(),
        ));
    }
    let url = Url::parse(page_url)?.join("/api/chat")?;
    Ok(found(url.as_str(), EndpointSource::Convention))
}

fn found(url: &str, source: EndpointSource) -> InferredEndpoint {
    info!("Load endpoint {} ({:?})", url, source);
    InferredEndpoint {
        url: url.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traffic() -> Vec<RecordedRequest> {
        vec![
            RecordedRequest::new("GET", "https://shop.example.com/", "document"),
            RecordedRequest::new("GET", "https://widget.intercom.io/widget/abc", "script"),
            RecordedRequest::new("POST", "https://shop.example.com/support/messages", "fetch"),
            RecordedRequest::new(
                "POST",
                "https://api-iam.intercom.io/messenger/web/ping",
                "xhr",
            ),
        ]
    }

    #[test]
    fn test_explicit_wins() {
        let endpoint = infer_endpoint(
            "https://shop.example.com/",
            Vendor::Intercom,
            &traffic(),
            Some("https://api.example.com/v1/chat"),
        )
        .unwrap();
        assert_eq!(endpoint.source, EndpointSource::Explicit);
        assert_eq!(endpoint.url, "https://api.example.com/v1/chat");

        assert!(infer_endpoint("", Vendor::Generic, &[], Some("nope")).is_err());
    }

    #[test]
    fn test_vendor_traffic_before_chat_traffic() {
        let endpoint =
            infer_endpoint("https://shop.example.com/", Vendor::Generic, &traffic(), None).unwrap();
        assert_eq!(endpoint.source, EndpointSource::VendorTraffic);
        assert_eq!(endpoint.url, "https://api-iam.intercom.io/messenger/web/ping");

        // A Drift hint ignores Intercom traffic and falls back to the chat-like POST
        let endpoint =
            infer_endpoint("https://shop.example.com/", Vendor::Drift, &traffic(), None).unwrap();
        assert_eq!(endpoint.source, EndpointSource::ChatTraffic);
        assert_eq!(endpoint.url, "https://shop.example.com/support/messages");
    }

    #[test]
    fn test_defaults_without_traffic() {
        let endpoint =
            infer_endpoint("https://shop.example.com/help", Vendor::Crisp, &[], None).unwrap();
        assert_eq!(endpoint.source, EndpointSource::VendorDefault);

        let endpoint =
            infer_endpoint("https://shop.example.com/help?x=1", Vendor::Generic, &[], None)
                .unwrap();
        assert_eq!(endpoint.source, EndpointSource::Convention);
        assert_eq!(endpoint.url, "https://shop.example.com/api/chat");

        assert!(matches!(
            infer_endpoint("", Vendor::Generic, &[], None),
            Err(Error::Config(_))
        ));
    }
}
