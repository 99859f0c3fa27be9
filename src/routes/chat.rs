use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use tracing::{info, warn};
use uuid::Uuid;

use crate::charts::{self, ChartRequest};
use crate::models::{AppState, ChatRequest, ChatResponse, Message, MessageView};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", get(list_messages))
        .route("/api/messages/{id}/chart.png", get(chart_png))
        .route("/api/chat", post(post_chat))
        .route("/api/session/clear", post(clear_session))
        .with_state(state)
}

/// Render a chart request on the blocking pool, folding the request text into the error
async fn render_chart(request: ChartRequest) -> AppResult<Vec<u8>> {
    let source = request.source_text();
    let rendered = tokio::task::spawn_blocking(move || charts::render_request(&request))
        .await
        .map_err(|e| AppError::Internal(format!("chart task failed: {}", e)))?;

    rendered
        .map(|chart| chart.png)
        .map_err(|e| AppError::Chart(format!("{}\n\nRequest:\n{}", e, source)))
}

async fn view(message: Message) -> MessageView {
    let (chart_png, chart_error) = match message.chart().cloned() {
        Some(request) => match render_chart(request).await {
            Ok(png) => (Some(base64::engine::general_purpose::STANDARD.encode(png)), None),
            Err(e) => {
                warn!(message_id = %message.id(), error = %e, "Chart render failed");
                (None, Some(e.to_string()))
            }
        },
        None => (None, None),
    };

    MessageView {
        message,
        chart_png,
        chart_error,
    }
}

async fn list_messages(State(state): State<AppState>) -> Json<Vec<MessageView>> {
    // Snapshot, so charts render without holding the session
    let messages = state.session.lock().await.messages().to_vec();

    let mut views = Vec::with_capacity(messages.len());
    for message in messages {
        views.push(view(message).await);
    }
    Json(views)
}

pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::InvalidRequest("message is empty".to_string()));
    }

    info!(message_len = message.len(), "Received chat request");

    let reply = {
        let mut session = state.session.lock().await;
        session.submit(&state.pipeline, message).await?.clone()
    };

    info!(message_id = %reply.id(), "Chat response sent");

    Ok(Json(ChatResponse {
        subquestions: reply.subquestions().to_vec(),
        message: view(reply).await,
    }))
}

async fn clear_session(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.session.lock().await.clear();
    Json(serde_json::json!({ "status": "cleared" }))
}

async fn chart_png(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let request = {
        let session = state.session.lock().await;
        let message = session
            .message(id)
            .ok_or_else(|| AppError::NotFound(format!("message {}", id)))?;
        message
            .chart()
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("chart for message {}", id)))?
    };

    let png = render_chart(request).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
