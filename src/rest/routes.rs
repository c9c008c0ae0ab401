//! HTTP handlers for the intake surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use super::rate_limit::Endpoint;
use super::{api_error, sse};
use crate::AppContext;

/// Admit a request against the per-address limits, or produce the 429.
async fn admit(ctx: &AppContext, addr: SocketAddr, endpoint: Endpoint) -> Result<(), Response> {
    match ctx.rate_limiter.check(addr.ip(), endpoint).await {
        Ok(()) => Ok(()),
        Err(retry_after) => {
            let secs = retry_after.num_seconds().max(1);
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, secs.to_string())],
                Json(json!({ "error": "rate_limited", "retry_after_secs": secs })),
            )
                .into_response())
        }
    }
}

// ─── Health ──────────────────────────────────────────────────────────────────

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": ctx.started_at.elapsed().as_secs(),
    }))
}

// ─── Start ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct StartRequest {
    pub patient_id: Option<String>,
    pub user_name: Option<String>,
}

pub async fn start(
    State(ctx): State<Arc<AppContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<StartRequest>,
) -> Response {
    if let Err(rejection) = admit(&ctx, addr, Endpoint::Start).await {
        return rejection;
    }
    match ctx.engine.start(body.patient_id, body.user_name).await {
        Ok((meta, opening)) => {
            // The opening turn is drained server-side so it lands in the
            // history; clients read it from the first chat response or the
            // session snapshot.
            tokio::spawn(async move {
                let mut opening = opening;
                while opening.next().await.is_some() {}
            });
            Json(json!({
                "session_token": meta.session_token,
                "current_phase": meta.current_phase,
                "status": meta.status,
                "created_at": meta.created_at,
            }))
            .into_response()
        }
        Err(e) => api_error(&e).into_response(),
    }
}

// ─── Chat ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_token: String,
    pub prompt: String,
}

pub async fn chat(
    State(ctx): State<Arc<AppContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ChatRequest>,
) -> Response {
    if let Err(rejection) = admit(&ctx, addr, Endpoint::Chat).await {
        return rejection;
    }
    match ctx.engine.chat(&body.session_token, &body.prompt).await {
        Ok(frames) => sse::frame_stream(frames).into_response(),
        Err(e) => api_error(&e).into_response(),
    }
}

// ─── Pause / resume ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PauseRequest {
    pub session_token: String,
}

pub async fn pause(
    State(ctx): State<Arc<AppContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<PauseRequest>,
) -> Response {
    if let Err(rejection) = admit(&ctx, addr, Endpoint::PauseResume).await {
        return rejection;
    }
    match ctx.engine.pause(&body.session_token).await {
        Ok(receipt) => Json(json!({
            "resume_token": receipt.resume_token,
            "expires_at": receipt.expires_at,
        }))
        .into_response(),
        Err(e) => api_error(&e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct ResumeRequest {
    pub resume_token: String,
}

pub async fn resume(
    State(ctx): State<Arc<AppContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ResumeRequest>,
) -> Response {
    if let Err(rejection) = admit(&ctx, addr, Endpoint::PauseResume).await {
        return rejection;
    }
    match ctx.engine.resume(&body.resume_token).await {
        Ok((meta, frames)) => {
            // First event carries the session meta, then the welcome stream.
            let head = stream::once(async move {
                Ok::<_, std::convert::Infallible>(
                    axum::response::sse::Event::default().data(
                        json!({
                            "session_token": meta.session_token,
                            "current_phase": meta.current_phase,
                            "status": meta.status,
                        })
                        .to_string(),
                    ),
                )
            });
            let tail = frames.map(|frame| {
                let payload = serde_json::to_string(&frame).unwrap_or_else(|_| "{}".to_string());
                Ok(axum::response::sse::Event::default().data(payload))
            });
            axum::response::sse::Sse::new(head.chain(tail)).into_response()
        }
        Err(e) => api_error(&e).into_response(),
    }
}

// ─── Finish ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FinishRequest {
    pub session_token: String,
}

pub async fn finish(
    State(ctx): State<Arc<AppContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<FinishRequest>,
) -> Response {
    if let Err(rejection) = admit(&ctx, addr, Endpoint::PauseResume).await {
        return rejection;
    }
    match ctx.engine.finish(&body.session_token).await {
        Ok(frames) => {
            // Finish is a single JSON response: the last substantive frame
            // carries the closing message and the embedded PDFs.
            let collected: Vec<_> = frames.collect().await;
            match collected.into_iter().rev().find(|f| !f.content.is_empty() || f.patient_pdf.is_some()) {
                Some(frame) => Json(frame).into_response(),
                None => api_error(&crate::error::EngineError::internal(
                    "finish produced no frames",
                ))
                .into_response(),
            }
        }
        Err(e) => api_error(&e).into_response(),
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

pub async fn session_snapshot(
    State(ctx): State<Arc<AppContext>>,
    Path(token): Path<String>,
) -> Response {
    match ctx.engine.snapshot(&token).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => api_error(&e).into_response(),
    }
}
