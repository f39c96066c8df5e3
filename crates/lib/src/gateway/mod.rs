//! Gateway: HTTP server receiving provider webhooks.
//!
//! `POST <webhookPath>/{provider}` runs registry lookup, security gate, parser and
//! forwarder in order; any other method on that route is answered with 405.

mod error;
mod server;

pub use error::WebhookError;
pub use server::{router, run_gateway, GatewayState};
