use serde::{Deserialize, Serialize};
use tower_api_client::{Error as ApiError, StatusCode};

#[derive(Debug)]
pub enum TextGenError {
    Api(StatusCode, ErrorDetail),
    Internal(ApiError),
    EmptyCompletion,
}

impl From<ApiError> for TextGenError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::ClientError(status, detail) | ApiError::ServerError(status, detail) => {
                let detail = serde_json::from_str::<ErrorResponse>(&detail)
                    .map(|response| response.error)
                    .unwrap_or_else(|_| ErrorDetail {
                        message: detail.to_string(),
                        kind: None,
                        code: None,
                    });
                TextGenError::Api(status, detail)
            }
            e => TextGenError::Internal(e),
        }
    }
}

impl std::fmt::Display for TextGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextGenError::Internal(e) => write!(f, "Internal error: {}", e),
            TextGenError::Api(status, detail) => write!(f, "({}) {}", status, detail.message),
            TextGenError::EmptyCompletion => f.write_str("Completion contained no choices"),
        }
    }
}

impl std::error::Error for TextGenError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
