//! smsgate core library — provider parsers, security gate, delivery forwarder, and the
//! HTTP gateway that wires them together for inbound SMS webhooks.

pub mod config;
pub mod delivery;
pub mod gateway;
pub mod providers;
pub mod security;
pub mod sms;
