//! SMS providers (e.g. DIDLogic, Twilio, generic JSON senders).
//!
//! Each provider has a parser that turns its webhook payload into a
//! [`NormalizedInboundSms`](crate::sms::NormalizedInboundSms). The registry maps
//! provider ids to parsers; adding a provider means registering a parser, the
//! gateway handler does not change.

mod form;
mod json;
mod registry;

pub use form::{FormFields, FormParser};
pub use json::JsonParser;
pub use registry::{InboundRequest, ProviderParser, ProviderRegistry};
