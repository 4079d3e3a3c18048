//! Gateway HTTP server: inbound activity endpoint plus health probes.
//!
//! Each POSTed activity is one turn: it is handled to completion inside the
//! request, and for card invokes the handler's `InvokeResult` is mirrored
//! onto the HTTP response. Turn failures never escape the handlers, so an
//! unexpected error can end a turn but never the process.

use crate::bot::DeskBot;
use crate::channels::{ConnectorAuth, ConnectorChannel, ReplyContext};
use crate::config::{self, Config};
use crate::desk::{DeskClient, TokenManager};
use crate::gateway::activity::{Activity, INVOKE_NAME_CARD_ACTION};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway (config, bot, connector auth).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub bot: Arc<DeskBot>,
    pub connector_auth: Arc<ConnectorAuth>,
}

/// Run the gateway server; binds to config.server.bind:config.server.port.
/// Configuration is validated first; a missing required setting is fatal
/// before any turn is handled. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    config::validate(&config)?;

    let tokens = Arc::new(TokenManager::new(&config.zoho, None));
    let desk = Arc::new(DeskClient::new(&config.zoho, tokens));
    let bot = Arc::new(DeskBot::new(desk, &config.teams));
    let connector_auth = Arc::new(ConnectorAuth::new(&config.bot, None));

    let state = GatewayState {
        config: Arc::new(config.clone()),
        bot,
        connector_auth,
    };

    let app = Router::new()
        .route("/", get(root_http))
        .route("/health", get(health_http))
        .route("/api/messages", post(messages_http))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.server.bind, config.server.port);
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

/// POST /api/messages — one inbound turn (message, member join, or invoke).
async fn messages_http(State(state): State<GatewayState>, body: Bytes) -> Response {
    let activity: Activity = match serde_json::from_slice(&body) {
        Ok(a) => a,
        Err(e) => {
            log::debug!("rejecting unparseable activity: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid activity" })),
            )
                .into_response();
        }
    };

    let Some(reply) = ReplyContext::from_activity(&activity) else {
        log::warn!("activity of type {} has no reply address", activity.typ);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing reply address" })),
        )
            .into_response();
    };
    let sink = ConnectorChannel::new(state.connector_auth.clone(), reply);

    match activity.typ.as_str() {
        "message" => {
            let text = activity.text.as_deref().unwrap_or_default();
            state.bot.handle_message(&sink, text).await;
            StatusCode::OK.into_response()
        }
        "invoke" => {
            if activity.name.as_deref() != Some(INVOKE_NAME_CARD_ACTION) {
                log::debug!("unsupported invoke: {:?}", activity.name);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "unsupported invoke" })),
                )
                    .into_response();
            }
            let submit = activity.value.as_ref().and_then(|v| v.action.clone());
            let result = match submit {
                Some(ref submit) => state.bot.handle_action(&sink, submit).await,
                None => crate::actions::InvokeResult::error(400, "invalid action data"),
            };
            let status =
                StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({ "status": result.status, "body": result.body })),
            )
                .into_response()
        }
        "conversationUpdate" => {
            let bot_id = activity.recipient.as_ref().map(|r| r.id.as_str());
            for member in activity.members_added.as_deref().unwrap_or_default() {
                if Some(member.id.as_str()) != bot_id {
                    state.bot.send_welcome(&sink).await;
                }
            }
            StatusCode::OK.into_response()
        }
        other => {
            log::debug!("ignoring activity of type {}", other);
            StatusCode::OK.into_response()
        }
    }
}

/// GET /health returns a liveness JSON (for probes).
async fn health_http() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET / returns service name, version, and the endpoint map.
async fn root_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "deskbot",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "port": state.config.server.port,
        "endpoints": {
            "health": "/health",
            "messages": "/api/messages",
        }
    }))
}
