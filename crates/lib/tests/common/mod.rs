//! Test helpers: a fake delivery API and a gateway served on ephemeral ports.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use lib::config::Config;
use lib::gateway::{self, GatewayState};
use lib::providers::ProviderRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_KEY: &str = "test-api-key";

/// One request received by the fake delivery API.
#[derive(Debug, Clone)]
pub struct Hit {
    pub query: HashMap<String, String>,
    pub api_key: Option<String>,
}

#[derive(Clone)]
struct DownstreamState {
    hits: Arc<Mutex<Vec<Hit>>>,
    status: StatusCode,
    body: &'static str,
    delay: Duration,
}

/// Fake delivery API answering every GET with `status` and `body` after `delay`.
pub struct Downstream {
    pub url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl Downstream {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().expect("hits lock").clone()
    }
}

async fn record(
    State(state): State<DownstreamState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, &'static str) {
    {
        let api_key = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state
            .hits
            .lock()
            .expect("hits lock")
            .push(Hit { query, api_key });
    }
    tokio::time::sleep(state.delay).await;
    (state.status, state.body)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

pub async fn spawn_downstream(status: StatusCode, body: &'static str, delay: Duration) -> Downstream {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let state = DownstreamState {
        hits: hits.clone(),
        status,
        body,
        delay,
    };
    let app = Router::new().route("/send", get(record)).with_state(state);
    let base = serve(app).await;
    Downstream {
        url: format!("{}/send", base),
        hits,
    }
}

/// Config pointing at `downstream_url` with the test API key.
pub fn config_for(downstream_url: &str) -> Config {
    let mut config = Config::default();
    config.delivery.base_url = Some(downstream_url.to_string());
    config.delivery.api_key = Some(API_KEY.to_string());
    config
}

/// Serve the gateway router; returns its base URL (e.g. "http://127.0.0.1:1234").
pub async fn spawn_gateway(config: &Config) -> String {
    spawn_gateway_with(config, ProviderRegistry::with_defaults()).await
}

pub async fn spawn_gateway_with(config: &Config, registry: ProviderRegistry) -> String {
    let state = GatewayState::with_registry(config, registry, |_| None).expect("gateway state");
    serve(gateway::router(state, &config.gateway.webhook_path)).await
}
