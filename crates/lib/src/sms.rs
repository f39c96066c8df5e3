//! Normalized inbound SMS: the provider-independent shape handed to the forwarder.

/// Error returned by a provider parser when a payload cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// An inbound text message as received from a provider webhook.
///
/// Only constructible through [`NormalizedInboundSms::new`], which rejects empty
/// `from`, `to`, or `message`. Fields are read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInboundSms {
    from: String,
    to: String,
    message: String,
    received_at: Option<String>,
}

impl NormalizedInboundSms {
    /// Build a message. `received_at` is kept verbatim (no timestamp parsing).
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
        received_at: Option<String>,
    ) -> Result<Self, ParseError> {
        let from = from.into();
        let to = to.into();
        let message = message.into();
        if from.is_empty() {
            return Err(ParseError::MissingField("from"));
        }
        if to.is_empty() {
            return Err(ParseError::MissingField("to"));
        }
        if message.is_empty() {
            return Err(ParseError::MissingField("message"));
        }
        Ok(Self {
            from,
            to,
            message,
            received_at,
        })
    }

    /// Sender (phone number or alphanumeric sender id).
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Receiving line.
    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn received_at(&self) -> Option<&str> {
        self.received_at.as_deref()
    }
}
