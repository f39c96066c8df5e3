//! Gateway HTTP server: webhook route, health probe, graceful shutdown.

use crate::config::{self, Config};
use crate::delivery::DeliveryClient;
use crate::gateway::error::WebhookError;
use crate::providers::{InboundRequest, ProviderRegistry};
use crate::security::SecurityPolicy;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared, read-only state for the gateway (registry, security, delivery client).
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<ProviderRegistry>,
    pub security: Arc<SecurityPolicy>,
    pub delivery: DeliveryClient,
    /// Header the hosting edge sets to the real client IP.
    pub client_ip_header: HeaderName,
}

impl GatewayState {
    /// Build state from config with the built-in providers. `env` supplies overrides
    /// (pass `config::process_env` for the real environment).
    pub fn from_config<E>(config: &Config, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        Self::with_registry(config, ProviderRegistry::with_defaults(), env)
    }

    /// Build state from config with a caller-supplied registry.
    pub fn with_registry<E>(config: &Config, registry: ProviderRegistry, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let security = config::resolve_security(config, &registry.ids(), &env);
        let delivery = DeliveryClient::new(config::resolve_delivery(config, &env))
            .context("configuring delivery client")?;
        let client_ip_header =
            HeaderName::from_bytes(config.gateway.client_ip_header.trim().as_bytes())
                .with_context(|| {
                    format!(
                        "invalid client IP header name: {}",
                        config.gateway.client_ip_header
                    )
                })?;
        Ok(Self {
            registry: Arc::new(registry),
            security: Arc::new(security),
            delivery,
            client_ip_header,
        })
    }
}

/// Router with `GET /` (health) and `<webhook_path>/:provider` (POST only).
pub fn router(state: GatewayState, webhook_path: &str) -> Router {
    let route = format!("{}/:provider", webhook_path.trim_end_matches('/'));
    Router::new()
        .route("/", get(health_http))
        .route(&route, post(receive_webhook).fallback(use_post))
        .with_state(state)
}

pub async fn run_gateway(config: Config) -> Result<()> {
    let state = GatewayState::from_config(&config, config::process_env)?;

    let bind = config.gateway.bind.trim();
    if !state.delivery.has_credential() {
        log::warn!(
            "no delivery API key configured (set delivery.apiKey or {}); webhooks will be answered with 500",
            config::DELIVERY_API_KEY_ENV
        );
    }
    if !config::is_loopback_bind(bind) && !state.security.any_enabled() {
        log::warn!(
            "gateway bound to {} with no provider token or IP allow-list; any caller can forward messages",
            bind
        );
    }
    log::info!(
        "providers: {}; forwarding to {}",
        state.registry.ids().join(", "),
        state.delivery.base_url()
    );

    let app = router(state, &config.gateway.webhook_path);
    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!(
        "gateway listening on {} (webhooks at {}/{{provider}})",
        bind_addr,
        config.gateway.webhook_path.trim_end_matches('/')
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// `token` query parameter, percent-decoded.
fn query_token(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
}

/// Registry lookup → gate → parse → forward. Each step's failure is terminal.
async fn handle_webhook(
    state: &GatewayState,
    provider: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), WebhookError> {
    let parser = state
        .registry
        .get(provider)
        .ok_or_else(|| WebhookError::UnknownProvider(provider.to_string()))?;

    let token = query_token(query);
    let client_ip = headers
        .get(&state.client_ip_header)
        .and_then(|v| v.to_str().ok());
    state.security.check(provider, token.as_deref(), client_ip)?;

    let sms = parser.parse(&InboundRequest::new(headers, body))?;
    state.delivery.forward(&sms).await?;
    Ok(())
}

/// POST <webhook_path>/:provider — normalize the provider payload and forward it once.
async fn receive_webhook(
    State(state): State<GatewayState>,
    Path(provider): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let provider = provider.to_lowercase();
    let request_id = uuid::Uuid::new_v4();
    match handle_webhook(&state, &provider, query.as_deref(), &headers, &body).await {
        Ok(()) => {
            log::info!("webhook {} ({}): forwarded", request_id, provider);
            "OK".into_response()
        }
        Err(e) => {
            log::warn!(
                "webhook {} ({}): {} -> {}",
                request_id,
                provider,
                e,
                e.status().as_u16()
            );
            e.into_response()
        }
    }
}

/// Any non-POST method on the webhook route. Providers defaulting to GET must be reconfigured.
async fn use_post() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        "Use POST",
    )
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "providers": state.registry.ids(),
    }))
}
