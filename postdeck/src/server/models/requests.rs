use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{Platform, SocialToken};
use crate::server::error::ServerError;
use crate::server::services::{Authorization, RewriteBatch, RewriteOutcome};
use crate::server::services::rewriter::RewriteError;

// POST /oauth/connect
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub platform: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub auth_url: String,
    pub state: String,
    pub demo: bool,
}

impl From<Authorization> for ConnectResponse {
    fn from(authorization: Authorization) -> Self {
        Self {
            auth_url: authorization.auth_url,
            state: authorization.state,
            demo: authorization.demo,
        }
    }
}

// POST /oauth/exchange
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub code: Option<String>,
    pub state: Option<String>,
    pub client_id: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub success: bool,
    pub platform: Platform,
}

// POST /oauth/complete
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub client_id: Option<String>,
    pub platform: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

// POST /oauth/refresh, POST /oauth/disconnect
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub client_id: Option<String>,
    pub platform: Option<String>,
}

impl ConnectionRequest {
    pub fn target(&self) -> Result<(String, Platform), ServerError> {
        match (self.client_id.as_deref(), self.platform.as_deref()) {
            (Some(client_id), Some(platform))
                if !client_id.trim().is_empty() && !platform.trim().is_empty() =>
            {
                Ok((client_id.trim().to_string(), platform.parse()?))
            }
            _ => Err(ServerError::MissingParameters(
                "clientId and platform".to_string(),
            )),
        }
    }
}

/// Stored connection with its secrets left out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub client_id: String,
    pub platform: Platform,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Vec<String>,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub has_refresh_token: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SocialToken> for TokenRecord {
    fn from(token: SocialToken) -> Self {
        Self {
            has_refresh_token: token.is_refreshable(),
            client_id: token.client_id,
            platform: token.platform,
            expires_at: token.expires_at,
            scope: token.scope,
            account_id: token.account_id,
            account_name: token.account_name,
            created_at: token.created_at,
            updated_at: token.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// GET /oauth/callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// GET /oauth/demo
#[derive(Debug, Deserialize)]
pub struct DemoParams {
    pub client_id: String,
    pub platform: String,
    pub state: String,
}

// PATCH /content/posts/{post_id}/status
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

// POST /content/ai-rewrite
#[derive(Debug, Default, Deserialize)]
pub struct RewriteRequest {
    #[serde(default)]
    pub captions: Vec<String>,
    pub tone: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResponse {
    pub rewritten_captions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RewriteError>,
    pub results: Vec<RewriteOutcome>,
}

impl From<RewriteBatch> for RewriteResponse {
    fn from(batch: RewriteBatch) -> Self {
        Self {
            rewritten_captions: batch.rewritten_captions(),
            errors: batch.errors(),
            results: batch.outcomes,
        }
    }
}

// Health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
