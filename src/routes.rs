use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info};

use crate::rate_limit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

pub fn create_routes(state: AppState) -> Router {
    let predict_routes = Router::new()
        .route("/predict", post(predict))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .merge(predict_routes)
        .route("/health", get(health_check))
        .route_service("/", ServeFile::new("static/index.html"))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

/// Chat endpoint. Validation failures and agent unavailability map to the
/// fixed envelope `{error, answer}`; a reachable agent always produces a
/// 200 with a non-empty answer.
async fn predict(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Some(agent) = state.agent.clone() else {
        error!("Chatbot not initialized");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Chatbot not initialized",
                "answer": "Service temporarily unavailable. Please check server logs."
            })),
        );
    };

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            error!("No data received in request: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "No data received",
                    "answer": "Please provide a valid query."
                })),
            );
        }
    };

    let message = request.message.trim();
    if message.is_empty() {
        error!("Empty message received");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Empty message",
                "answer": "Please provide a question or message."
            })),
        );
    }

    info!("Processing query: {message}");

    match agent.chat(message).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "answer": result.answer,
                "sources": result.sources,
            })),
        ),
        Err(e) => {
            error!("Error in predict endpoint: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "answer": "An error occurred while processing your request. Please try again."
                })),
            )
        }
    }
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.agent.as_ref() {
        Some(agent) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "vertex_ai_initialized": true,
                "project_id": agent.project_id(),
                "agent_id": agent.agent_id(),
            })),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "unhealthy",
                "vertex_ai_initialized": false,
                "error": state
                    .init_error
                    .clone()
                    .unwrap_or_else(|| "Vertex AI not initialized".to_string()),
            })),
        ),
    }
}
