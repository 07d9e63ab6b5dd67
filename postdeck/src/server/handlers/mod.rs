mod callback;
mod content;
mod oauth;

pub use callback::{demo_approval, oauth_callback};
pub use content::{generate_schedule, list_posts, rewrite_captions, update_post_status};
pub use oauth::{complete, connect, connections, disconnect, exchange, refresh};

use crate::server::models::HealthResponse;
use axum::Json;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
