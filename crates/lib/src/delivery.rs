//! Downstream delivery API client: forwards a normalized SMS with one GET request.
//!
//! The request carries `from`, `to` and `message` as query parameters and the credential
//! in a header. Nothing is retried and nothing is deduplicated: every call to
//! [`DeliveryClient::forward`] is one downstream request. A 502 returned to the webhook
//! sender may make it redeliver, which then forwards the same message again.

use crate::sms::NormalizedInboundSms;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.smsdelivery.io/v1/messages/inbound";
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Resolved delivery settings (see `config::resolve_delivery`).
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// None when no credential is configured; forwarding then fails with `MissingCredential`.
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("delivery API key not configured")]
    MissingCredential,
    #[error("invalid delivery settings: {0}")]
    InvalidSettings(String),
    /// The wrapped error has its URL stripped: the query string carries the message.
    #[error("delivery request failed: {0}")]
    Transport(reqwest::Error),
    #[error("delivery API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl ForwardError {
    /// Operator errors (500) as opposed to downstream failures (502).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ForwardError::MissingCredential | ForwardError::InvalidSettings(_)
        )
    }
}

/// Client for the delivery API. Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct DeliveryClient {
    credential: Option<(HeaderName, HeaderValue)>,
    base_url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl DeliveryClient {
    /// Validate settings. A missing credential is allowed here and reported per request.
    pub fn new(settings: DeliverySettings) -> Result<Self, ForwardError> {
        let base_url = Url::parse(settings.base_url.trim())
            .map_err(|e| ForwardError::InvalidSettings(format!("base URL {}: {}", settings.base_url, e)))?;
        let credential = match settings.api_key {
            Some(key) => {
                let name = HeaderName::from_bytes(settings.api_key_header.as_bytes()).map_err(|_| {
                    ForwardError::InvalidSettings(format!(
                        "invalid credential header name: {}",
                        settings.api_key_header
                    ))
                })?;
                let mut value = HeaderValue::from_str(&key).map_err(|_| {
                    ForwardError::InvalidSettings("credential is not a valid header value".to_string())
                })?;
                value.set_sensitive(true);
                Some((name, value))
            }
            None => None,
        };
        Ok(Self {
            credential,
            base_url,
            timeout: settings.timeout,
            client: reqwest::Client::new(),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET <base_url>?from=..&to=..&message=.. with the credential header.
    /// The timeout covers the whole exchange; on expiry the request is dropped.
    pub async fn forward(&self, sms: &NormalizedInboundSms) -> Result<(), ForwardError> {
        let (name, value) = self
            .credential
            .as_ref()
            .ok_or(ForwardError::MissingCredential)?;
        let res = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("from", sms.from()),
                ("to", sms.to()),
                ("message", sms.message()),
            ])
            .header(name.clone(), value.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ForwardError::Transport(e.without_url()))?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ForwardError::Rejected { status, body });
        }
        log::debug!("delivery API accepted message ({})", res.status());
        Ok(())
    }
}
