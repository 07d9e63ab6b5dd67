use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::common::{Platform, UnknownPlatform};
use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Missing required parameters: {0}")]
    MissingParameters(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("{platform} is not connected for client {client_id}")]
    NotConnected { client_id: String, platform: Platform },

    #[error("{0} token cannot be refreshed, reconnect the account")]
    NoRefreshCapability(Platform),

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::MissingParameters(_)
            | ServerError::InvalidRequest(_)
            | ServerError::InvalidState(_)
            | ServerError::UnsupportedPlatform(_)
            | ServerError::NoRefreshCapability(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_)
            | ServerError::ClientNotFound(_)
            | ServerError::NotConnected { .. } => StatusCode::NOT_FOUND,
            ServerError::ExchangeFailed(_)
            | ServerError::RefreshFailed(_)
            | ServerError::Provider(_)
            | ServerError::Configuration(_)
            | ServerError::Store(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<UnknownPlatform> for ServerError {
    fn from(err: UnknownPlatform) -> Self {
        ServerError::UnsupportedPlatform(err.0)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidRequest(rejection.body_text())
    }
}

impl From<config::ConfigError> for ServerError {
    fn from(err: config::ConfigError) -> Self {
        ServerError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("I/O error: {}", err))
    }
}
