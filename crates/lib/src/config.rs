//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.smsgate/config.json`) and environment.
//! Environment values override file values and are resolved once at startup into
//! [`SecurityPolicy`] and [`DeliverySettings`]; request handling never reads the environment.

use crate::delivery::{DeliverySettings, DEFAULT_API_KEY_HEADER, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::security::{ProviderSecurity, SecurityPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

/// Env var holding the downstream API credential.
pub const DELIVERY_API_KEY_ENV: &str = "DELIVERY_API_KEY";
/// Env var overriding the downstream API base URL.
pub const DELIVERY_API_URL_ENV: &str = "DELIVERY_API_URL";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Downstream delivery API.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Per-provider security, keyed by provider id (e.g. "didlogic").
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Gateway bind, port, and webhook routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8787).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Path prefix for webhooks; the provider id is the next segment (default "/webhooks").
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    /// Header the hosting edge sets to the real client IP. Trusted verbatim, so the edge
    /// must always overwrite it.
    #[serde(default = "default_client_ip_header")]
    pub client_ip_header: String,
}

fn default_gateway_port() -> u16 {
    8787
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_path() -> String {
    "/webhooks".to_string()
}

fn default_client_ip_header() -> String {
    "x-real-ip".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            webhook_path: default_webhook_path(),
            client_ip_header: default_client_ip_header(),
        }
    }
}

/// Downstream delivery API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfig {
    /// API credential. Overridden by DELIVERY_API_KEY env.
    pub api_key: Option<String>,

    /// Header carrying the credential (default "X-API-Key").
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Base URL. Overridden by DELIVERY_API_URL env; defaults to the public endpoint.
    pub base_url: Option<String>,

    /// Outbound request timeout in seconds (default 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_header: default_api_key_header(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Per-provider security config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Shared secret expected in the `token` query parameter. Overridden by PROVIDER_<ID>_TOKEN.
    pub token: Option<String>,

    /// Allowed client IPs. Overridden by PROVIDER_<ID>_IPS (comma-separated).
    #[serde(default)]
    pub allowed_ips: Vec<String>,
}

/// Read a variable from the process environment. Pass to the `resolve_*` functions.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Env value if set and non-empty, else the file value if non-empty.
fn env_or_file<E>(env: &E, key: &str, file: Option<&String>) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    env(key)
        .and_then(|s| non_empty(&s))
        .or_else(|| file.and_then(|s| non_empty(s)))
}

/// Split a comma-separated allow-list, trimming entries and dropping empty ones.
pub fn parse_ip_list(raw: &str) -> Vec<String> {
    raw.split(',').filter_map(non_empty).collect()
}

/// `PROVIDER_<ID_UPPERCASE>_<SUFFIX>`.
pub fn provider_env_key(provider_id: &str, suffix: &str) -> String {
    format!("PROVIDER_{}_{}", provider_id.to_uppercase(), suffix)
}

/// Resolve the downstream API credential: env DELIVERY_API_KEY overrides config.
pub fn resolve_delivery_api_key<E>(config: &Config, env: E) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    env_or_file(&env, DELIVERY_API_KEY_ENV, config.delivery.api_key.as_ref())
}

/// Resolve all delivery settings (credential, base URL, header, timeout).
pub fn resolve_delivery<E>(config: &Config, env: E) -> DeliverySettings
where
    E: Fn(&str) -> Option<String>,
{
    let base_url = env_or_file(&env, DELIVERY_API_URL_ENV, config.delivery.base_url.as_ref())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let api_key_header = non_empty(&config.delivery.api_key_header)
        .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());
    DeliverySettings {
        api_key: resolve_delivery_api_key(config, &env),
        api_key_header,
        base_url,
        timeout: Duration::from_secs(config.delivery.timeout_secs),
    }
}

/// Resolve security for every provider id in `provider_ids` and in `config.providers`.
/// Env PROVIDER_<ID>_TOKEN / PROVIDER_<ID>_IPS override the file entry for that provider.
pub fn resolve_security<E>(config: &Config, provider_ids: &[String], env: E) -> SecurityPolicy
where
    E: Fn(&str) -> Option<String>,
{
    let ids: BTreeSet<String> = provider_ids
        .iter()
        .chain(config.providers.keys())
        .map(|id| id.to_lowercase())
        .collect();
    let mut policy = SecurityPolicy::new();
    for id in ids {
        let file = config
            .providers
            .iter()
            .find(|(k, _)| k.to_lowercase() == id)
            .map(|(_, v)| v);
        let token = env_or_file(&env, &provider_env_key(&id, "TOKEN"), file.and_then(|p| p.token.as_ref()));
        let allowed_ips = match env(&provider_env_key(&id, "IPS")).and_then(|s| non_empty(&s)) {
            Some(raw) => parse_ip_list(&raw),
            None => file
                .map(|p| p.allowed_ips.iter().filter_map(|ip| non_empty(ip)).collect())
                .unwrap_or_default(),
        };
        policy.insert(id, ProviderSecurity::new(token, allowed_ips));
    }
    policy
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SMSGATE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".smsgate").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, else the default path (or SMSGATE_CONFIG_PATH).
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
