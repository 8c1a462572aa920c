//! Gateway HTTP server: the Bot Framework messaging endpoint plus a health check.

use crate::activity::{Activity, ActivityType};
use crate::bot::RelayBot;
use crate::channels::{ActivitySender, BotConnector, ServiceUrlPolicy, TurnContext};
use crate::config::Config;
use crate::directory::GraphDirectory;
use crate::flow::LangflowClient;
use crate::http;
use crate::state::ConversationStateStore;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway (config, bot, outbound connector).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub bot: Arc<RelayBot>,
    /// Where replies go; the Bot Framework connector outside of tests.
    pub sender: Arc<dyn ActivitySender>,
}

impl GatewayState {
    /// Wire the production collaborators from config: Langflow, Graph, and the connector
    /// (unauthenticated, and also allowed to reach loopback service urls, in dev mode).
    pub fn from_config(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let client = http::build_client(config.http.verify_ssl, Some(config.http.timeout()))
            .context("building http client")?;
        let flow = LangflowClient::new(&config.flow, &config.http).context("building langflow client")?;
        let directory = GraphDirectory::new(&config.identity, &config.credentials, client.clone());
        let policy = ServiceUrlPolicy::new(&config.connector);
        let connector = if config.server.dev_mode {
            BotConnector::unauthenticated(client, policy.with_loopback())
        } else {
            BotConnector::authenticated(client, policy, &config.identity, &config.credentials)
        };
        let bot = RelayBot::new(
            config.clone(),
            Arc::new(flow),
            Arc::new(directory),
            Arc::new(ConversationStateStore::new()),
        );
        Ok(Self {
            config,
            bot: Arc::new(bot),
            sender: Arc::new(connector),
        })
    }
}

/// Routes: `POST`/`OPTIONS /api/messages` and `GET /`.
pub fn build_app(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/api/messages", post(messages).options(messages_preflight))
        .with_state(state)
}

/// Run the gateway server; binds to config.server.bind:config.server.port.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    if config.server.dev_mode {
        log::info!("gateway: development mode, inbound auth disabled and replies unauthenticated");
    } else {
        log::info!("gateway: production mode, bearer auth required");
        if !config.credentials.is_complete() {
            log::warn!("gateway: app id, password or tenant not configured; connector and graph calls will fail");
        }
    }
    if !config.http.verify_ssl {
        log::warn!("gateway: ssl certificate verification is disabled");
    }
    if config.flow.target().is_empty() {
        log::warn!("gateway: no flow id or endpoint configured");
    }

    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let state = GatewayState::from_config(config)?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

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
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("gateway: failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("gateway: failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

fn bearer_present(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false)
}

/// POST /api/messages receives one activity and runs its turn before answering.
async fn messages(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    log::info!("gateway: received api request");
    if !state.config.server.dev_mode && !bearer_present(&headers) {
        log::warn!("gateway: rejected request without bearer token");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let activity: Activity = match serde_json::from_slice(&body) {
        Ok(a) => a,
        Err(e) => {
            log::error!("gateway: error processing request: {}", e);
            let text = if state.config.server.dev_mode {
                e.to_string()
            } else {
                "internal server error".to_string()
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, text).into_response();
        }
    };

    log::info!(
        "gateway: activity type {:?}, channel {}",
        activity.typ,
        activity.channel_id.as_deref().unwrap_or("<none>")
    );
    if activity.typ == ActivityType::Message {
        let from = activity.from.as_ref();
        log::info!(
            "gateway: message from {} ({})",
            from.and_then(|f| f.name.as_deref()).unwrap_or("unknown"),
            from.map(|f| f.id.as_str()).unwrap_or("unknown")
        );
        if let Some(tenant) = activity.tenant_id() {
            log::debug!("gateway: tenant {}", tenant);
        }
    }

    let ctx = TurnContext::new(activity, state.sender.clone());
    state.bot.handle(&ctx).await;
    StatusCode::CREATED.into_response()
}

/// OPTIONS /api/messages answers CORS preflight.
async fn messages_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, OPTIONS"),
            ),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*")),
        ],
    )
}

/// GET / returns a simple health JSON.
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.server.port,
        "devMode": state.config.server.dev_mode,
    }))
}
