//! Per-provider security gate: optional shared-secret token and optional client-IP allow-list.
//!
//! The client IP comes from a header set by the hosting edge (see
//! `GatewayConfig::client_ip_header`). It is trusted verbatim, so the edge must always
//! overwrite that header; otherwise a direct caller can claim any address.

use std::collections::HashMap;
use subtle::ConstantTimeEq;

/// Why the gate rejected a request. All variants map to 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("invalid or missing token")]
    InvalidToken,
    #[error("missing client IP")]
    MissingClientIp,
    #[error("IP not allowed: {0}")]
    IpNotAllowed(String),
}

/// Security settings for one provider. Empty token / empty list = check disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSecurity {
    token: Option<String>,
    allowed_ips: Vec<String>,
}

impl ProviderSecurity {
    pub fn new(token: Option<String>, allowed_ips: Vec<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
            allowed_ips,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn allowed_ips(&self) -> &[String] {
        &self.allowed_ips
    }

    /// Exact, case-sensitive match against the `token` query parameter, compared in constant time.
    pub fn check_token(&self, provided: Option<&str>) -> Result<(), GateError> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };
        let provided = provided.ok_or(GateError::InvalidToken)?;
        if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            Err(GateError::InvalidToken)
        }
    }

    /// Membership of the trusted client IP in the allow-list. The header value is compared
    /// verbatim; only configured entries are trimmed (at config resolution).
    pub fn check_ip(&self, client_ip: Option<&str>) -> Result<(), GateError> {
        if self.allowed_ips.is_empty() {
            return Ok(());
        }
        let ip = client_ip
            .filter(|ip| !ip.is_empty())
            .ok_or(GateError::MissingClientIp)?;
        if self.allowed_ips.iter().any(|allowed| allowed == ip) {
            Ok(())
        } else {
            Err(GateError::IpNotAllowed(ip.to_string()))
        }
    }
}

/// Security settings for all providers, resolved once at startup (see `config::resolve_security`).
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    providers: HashMap<String, ProviderSecurity>,
}

impl SecurityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider_id: impl Into<String>, security: ProviderSecurity) {
        self.providers.insert(provider_id.into(), security);
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderSecurity> {
        self.providers.get(provider_id)
    }

    /// True when at least one provider has a token or an IP list.
    pub fn any_enabled(&self) -> bool {
        self.providers
            .values()
            .any(|p| p.token.is_some() || !p.allowed_ips.is_empty())
    }

    /// Token check, then IP check. A provider without an entry is open.
    pub fn check(
        &self,
        provider_id: &str,
        token: Option<&str>,
        client_ip: Option<&str>,
    ) -> Result<(), GateError> {
        let Some(security) = self.providers.get(provider_id) else {
            return Ok(());
        };
        security.check_token(token)?;
        security.check_ip(client_ip)
    }
}
