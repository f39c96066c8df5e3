//! Provider registry: register and lookup parsers by provider id.

use crate::providers::{FormParser, JsonParser};
use crate::sms::{NormalizedInboundSms, ParseError};
use axum::http::{header, HeaderMap};
use std::collections::HashMap;

/// Raw webhook request as seen by a parser.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

impl<'a> InboundRequest<'a> {
    pub fn new(headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        Self { headers, body }
    }

    /// Media type of the body without parameters, lowercased (e.g. "application/json").
    /// None when the header is absent or not valid text.
    pub fn content_type(&self) -> Option<String> {
        let raw = self.headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
        let essence = raw.split(';').next().unwrap_or(raw).trim();
        if essence.is_empty() {
            None
        } else {
            Some(essence.to_ascii_lowercase())
        }
    }

    /// Fail when the body is declared as `unexpected`. A missing Content-Type is accepted,
    /// since several providers omit it.
    pub fn reject_content_type(&self, unexpected: &[&str]) -> Result<(), ParseError> {
        match self.content_type() {
            Some(ct) if unexpected.contains(&ct.as_str()) => Err(ParseError::Malformed(format!(
                "unexpected content type: {}",
                ct
            ))),
            _ => Ok(()),
        }
    }
}

/// Decoder for one provider's wire format.
pub trait ProviderParser: Send + Sync {
    /// Provider id (lowercase, e.g. "didlogic"). Used as the registry key and URL segment.
    fn id(&self) -> &str;
    /// Normalize the request into an inbound SMS. Fails when required fields are missing.
    fn parse(&self, request: &InboundRequest<'_>) -> Result<NormalizedInboundSms, ParseError>;
}

/// Registry of provider ids to parsers. Built once at startup and shared read-only.
pub struct ProviderRegistry {
    parsers: HashMap<String, Box<dyn ProviderParser>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ProviderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Registry with the built-in providers: didlogic, twilio (form) and generic (JSON).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FormParser::didlogic());
        registry.register(FormParser::twilio());
        registry.register(JsonParser::new());
        registry
    }

    /// Add a parser under its lowercased id. Replaces any parser already registered for that id.
    pub fn register(&mut self, parser: impl ProviderParser + 'static) {
        let id = parser.id().to_lowercase();
        if self.parsers.insert(id.clone(), Box::new(parser)).is_some() {
            log::debug!("provider {} re-registered, previous parser replaced", id);
        }
    }

    /// Look up a parser. Ids are stored lowercase; callers lowercase before lookup.
    pub fn get(&self, id: &str) -> Option<&dyn ProviderParser> {
        self.parsers.get(id).map(|p| p.as_ref())
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.parsers.keys().cloned().collect();
        ids.sort();
        ids
    }
}
