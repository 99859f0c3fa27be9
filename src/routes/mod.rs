//! API Routes
//!
//! HTTP endpoints of the web chat:
//! - `/` - Chat page
//! - `/api/messages` - Message log of the session, chart image per message
//! - `/api/chat` - Run one turn
//! - `/api/session/clear` - Start a new chat
//! - `/api/health` - Health check

pub mod chat;
pub mod health;
pub mod ui;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::models::AppState;
use crate::types::AppError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    Router::new()
        .merge(ui::router())
        .merge(chat::router(state.clone()))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::LLMApi(_) => StatusCode::BAD_GATEWAY,
            AppError::Chart(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
