//! URL-encoded form providers (DIDLogic, Twilio). Field names differ per provider; decoding does not.

use crate::providers::registry::{InboundRequest, ProviderParser};
use crate::sms::{NormalizedInboundSms, ParseError};
use std::collections::HashMap;

/// Which form fields carry the sender, destination, body and (optionally) timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormFields {
    pub from: &'static str,
    pub to: &'static str,
    pub message: &'static str,
    pub received_at: Option<&'static str>,
}

/// Parser for `application/x-www-form-urlencoded` webhook bodies.
#[derive(Debug, Clone)]
pub struct FormParser {
    id: &'static str,
    fields: FormFields,
}

impl FormParser {
    pub fn new(id: &'static str, fields: FormFields) -> Self {
        Self { id, fields }
    }

    /// DIDLogic: `src`, `dst`, `message`, `received_at`.
    pub fn didlogic() -> Self {
        Self::new(
            "didlogic",
            FormFields {
                from: "src",
                to: "dst",
                message: "message",
                received_at: Some("received_at"),
            },
        )
    }

    /// Twilio messaging webhook: `From`, `To`, `Body`. No timestamp is sent.
    pub fn twilio() -> Self {
        Self::new(
            "twilio",
            FormFields {
                from: "From",
                to: "To",
                message: "Body",
                received_at: None,
            },
        )
    }
}

/// Decode a form body. The first occurrence of a repeated key wins.
fn decode_form(body: &[u8]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(body) {
        out.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    out
}

fn required(form: &mut HashMap<String, String>, field: &'static str) -> Result<String, ParseError> {
    form.remove(field)
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingField(field))
}

impl ProviderParser for FormParser {
    fn id(&self) -> &str {
        self.id
    }

    fn parse(&self, request: &InboundRequest<'_>) -> Result<NormalizedInboundSms, ParseError> {
        request.reject_content_type(&["application/json", "multipart/form-data"])?;
        let mut form = decode_form(request.body);
        let from = required(&mut form, self.fields.from)?;
        let to = required(&mut form, self.fields.to)?;
        let message = required(&mut form, self.fields.message)?;
        let received_at = self
            .fields
            .received_at
            .and_then(|f| form.remove(f))
            .filter(|v| !v.is_empty());
        NormalizedInboundSms::new(from, to, message, received_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap};

    fn parse(parser: &FormParser, body: &str) -> Result<NormalizedInboundSms, ParseError> {
        let headers = HeaderMap::new();
        parser.parse(&InboundRequest::new(&headers, body.as_bytes()))
    }

    #[test]
    fn didlogic_decodes_percent_encoded_fields() {
        let sms = parse(
            &FormParser::didlogic(),
            "src=%2B15551234567&dst=%2B15557654321&message=Hello&received_at=2024-01-01T00%3A00%3A00Z",
        )
        .unwrap();
        assert_eq!(sms.from(), "+15551234567");
        assert_eq!(sms.to(), "+15557654321");
        assert_eq!(sms.message(), "Hello");
        assert_eq!(sms.received_at(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn didlogic_without_message_fails() {
        let err = parse(&FormParser::didlogic(), "src=%2B1555&dst=%2B1666").unwrap_err();
        assert_eq!(err, ParseError::MissingField("message"));
    }

    #[test]
    fn didlogic_empty_src_fails() {
        let err = parse(&FormParser::didlogic(), "src=&dst=%2B1666&message=hi").unwrap_err();
        assert_eq!(err, ParseError::MissingField("src"));
    }

    #[test]
    fn didlogic_received_at_is_optional() {
        let sms = parse(&FormParser::didlogic(), "src=a&dst=b&message=hello+world").unwrap();
        assert_eq!(sms.message(), "hello world");
        assert_eq!(sms.received_at(), None);
    }

    #[test]
    fn json_content_type_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let err = FormParser::didlogic()
            .parse(&InboundRequest::new(&headers, br#"{"src":"a","dst":"b","message":"c"}"#))
            .unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));

        headers.insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded; charset=UTF-8".parse().unwrap(),
        );
        let sms = FormParser::didlogic()
            .parse(&InboundRequest::new(&headers, b"src=a&dst=b&message=c"))
            .unwrap();
        assert_eq!(sms.message(), "c");
    }

    #[test]
    fn twilio_uses_capitalized_fields() {
        let sms = parse(
            &FormParser::twilio(),
            "MessageSid=SM1&From=%2B1555&To=%2B1666&Body=Ahoy",
        )
        .unwrap();
        assert_eq!(sms.from(), "+1555");
        assert_eq!(sms.to(), "+1666");
        assert_eq!(sms.message(), "Ahoy");
        assert_eq!(sms.received_at(), None);
    }
}
