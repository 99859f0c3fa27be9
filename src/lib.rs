// Alternative History of Russia - a research agent for counterfactual scenarios

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod charts;    // Declarative charts and the restricted plotting-script reader
pub mod llm;
pub mod search;    // Web search (Serper)
pub mod session;
pub mod routes;
pub mod utils;
pub mod tui;       // Terminal User Interface

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
