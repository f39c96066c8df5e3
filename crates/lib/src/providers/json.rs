//! Generic JSON provider for senders that post a flat JSON object.
//!
//! Accepts `from`/`source`, `to`/`destination`, `message`/`text` and an optional
//! `received_at`. The first name is preferred; an absent or empty value falls back
//! to the second.

use crate::providers::registry::{InboundRequest, ProviderParser};
use crate::sms::{NormalizedInboundSms, ParseError};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

/// String value of a field. Numbers are accepted (some providers send phone numbers unquoted).
fn field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    match obj.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn with_fallback(
    obj: &Map<String, Value>,
    primary: &'static str,
    fallback: &str,
) -> Result<String, ParseError> {
    field(obj, primary)
        .or_else(|| field(obj, fallback))
        .ok_or(ParseError::MissingField(primary))
}

impl ProviderParser for JsonParser {
    fn id(&self) -> &str {
        "generic"
    }

    fn parse(&self, request: &InboundRequest<'_>) -> Result<NormalizedInboundSms, ParseError> {
        request.reject_content_type(&["application/x-www-form-urlencoded", "multipart/form-data"])?;
        let value: Value = serde_json::from_slice(request.body)
            .map_err(|e| ParseError::Malformed(format!("invalid JSON: {}", e)))?;
        let obj = value
            .as_object()
            .ok_or_else(|| ParseError::Malformed("expected a JSON object".to_string()))?;
        let from = with_fallback(obj, "from", "source")?;
        let to = with_fallback(obj, "to", "destination")?;
        let message = with_fallback(obj, "message", "text")?;
        let received_at = obj
            .get("received_at")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        NormalizedInboundSms::new(from, to, message, received_at)
    }
}
