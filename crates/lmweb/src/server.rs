//! `POST /ask {"question"} -> {"answer"}`.
//!
//! Each request runs its own query; the orchestrator is shared read-only.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lmweb_local::ChatOrchestrator;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": msg.into() })))
}

pub fn router(orchestrator: Arc<ChatOrchestrator>) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/healthz", get(|| async { Json(serde_json::json!({ "ok": true })) }))
        .with_state(orchestrator)
}

async fn ask(
    State(orchestrator): State<Arc<ChatOrchestrator>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "question must not be empty"));
    }
    match orchestrator.answer(question).await {
        Ok(answer) => Ok(Json(AskResponse { answer })),
        Err(e) => {
            tracing::error!(error = %e, "ask failed");
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

pub async fn serve(addr: SocketAddr, orchestrator: Arc<ChatOrchestrator>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(orchestrator)).await?;
    Ok(())
}
