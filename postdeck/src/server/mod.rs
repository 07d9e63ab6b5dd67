pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Configuration;
pub use error::ServerError;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use services::{CaptionRewriter, OAuthManager, ScheduleGenerator};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<OAuthManager>,
    pub scheduler: Arc<ScheduleGenerator>,
    /// Absent when no AI provider key is configured
    pub rewriter: Option<Arc<CaptionRewriter>>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/oauth/connect", post(handlers::connect))
        .route("/oauth/demo", get(handlers::demo_approval))
        .route("/oauth/callback", get(handlers::oauth_callback))
        .route("/oauth/exchange", post(handlers::exchange))
        .route("/oauth/complete", post(handlers::complete))
        .route("/oauth/refresh", post(handlers::refresh))
        .route("/oauth/disconnect", post(handlers::disconnect))
        .route("/oauth/connections/{client_id}", get(handlers::connections))
        .route("/content/schedule", post(handlers::generate_schedule))
        .route("/content/posts/{client_id}", get(handlers::list_posts))
        .route(
            "/content/posts/{post_id}/status",
            patch(handlers::update_post_status),
        )
        .route("/content/ai-rewrite", post(handlers::rewrite_captions))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
