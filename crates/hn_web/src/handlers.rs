use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use hn_inference::SourceRef;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    let question = request.question.trim();
    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "question must not be empty"})),
        )
            .into_response();
    }

    match state.engine.answer(question).await {
        Ok(answer) => Json(QueryResponse {
            answer: answer.answer,
            sources: answer.sources,
        })
        .into_response(),
        Err(err) => {
            error!("❌ Query failed: {}", err);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.storage.count().await {
        Ok(documents) => Json(json!({"documents": documents})).into_response(),
        Err(err) => {
            error!("❌ Stats failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}
