//! Public HTTP/JSON surface for the intake engine.
//!
//! Endpoints:
//!   POST /intake/start
//!   POST /intake/chat              (SSE)
//!   POST /intake/pause
//!   POST /intake/resume            (SSE; first event is the session meta)
//!   POST /intake/finish
//!   GET  /intake/session/{token}
//!   GET  /healthz

pub mod rate_limit;
pub mod routes;
pub mod sse;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::EngineError;
use crate::AppContext;

pub async fn serve(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("127.0.0.1:{}", ctx.config.port).parse()?;
    let router = build_router(ctx);
    info!("intake API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/healthz", get(routes::health))
        .route("/intake/start", post(routes::start))
        .route("/intake/chat", post(routes::chat))
        .route("/intake/pause", post(routes::pause))
        .route("/intake/resume", post(routes::resume))
        .route("/intake/finish", post(routes::finish))
        .route("/intake/session/{token}", get(routes::session_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Map an engine error onto the HTTP taxonomy.
pub(crate) fn api_error(e: &EngineError) -> (StatusCode, Json<Value>) {
    let (status, tag) = match e {
        EngineError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        EngineError::Expired => (StatusCode::GONE, "expired"),
        EngineError::Conflict => (StatusCode::CONFLICT, "conflict"),
        EngineError::Gateway(_) => (StatusCode::BAD_GATEWAY, "gateway"),
        EngineError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    (status, Json(json!({ "error": tag, "detail": e.to_string() })))
}
