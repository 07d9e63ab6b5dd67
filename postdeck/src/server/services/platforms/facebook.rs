use async_trait::async_trait;
use oauth2::{basic::BasicClient, AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};

use super::PlatformExchanger;
use crate::common::{Platform, SocialToken, TokenGrant};
use crate::server::config::FacebookConfiguration;
use crate::server::error::ServerError;

const FACEBOOK_SCOPES: &[&str] = &[
    "public_profile",
    "pages_show_list",
    "pages_read_engagement",
    "pages_manage_posts",
];

const INSTAGRAM_SCOPES: &[&str] = &[
    "instagram_basic",
    "instagram_content_publish",
    "pages_show_list",
    "pages_read_engagement",
];

#[derive(Debug, Deserialize)]
struct GraphToken {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GraphProfile {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

/// Facebook Login for Facebook pages and Instagram business accounts.
///
/// Facebook has no refresh-token grant. A code is exchanged for a short-lived
/// token which is immediately traded for a long-lived one, and "refreshing"
/// repeats that trade with the current token.
pub struct FacebookExchanger {
    platform: Platform,
    client_id: String,
    client_secret: SecretString,
    graph_url: String,
    auth_url: AuthUrl,
    redirect_uri: String,
    redirect_url: RedirectUrl,
    http: reqwest::Client,
}

impl FacebookExchanger {
    pub fn new(
        platform: Platform,
        config: &FacebookConfiguration,
        redirect_uri: &str,
    ) -> Result<Self, ServerError> {
        if !platform.is_facebook_family() {
            return Err(ServerError::Configuration(format!(
                "{} is not authorized through Facebook Login",
                platform
            )));
        }

        let auth_url = AuthUrl::new(config.dialog_url.clone())
            .map_err(|e| ServerError::Configuration(format!("Invalid dialog URL: {}", e)))?;

        let redirect_url = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| ServerError::Configuration(format!("Invalid redirect URI: {}", e)))?;

        Ok(Self {
            platform,
            client_id: config.client_id.clone(),
            client_secret: SecretString::from(config.client_secret.clone()),
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            auth_url,
            redirect_uri: redirect_uri.to_string(),
            redirect_url,
            http: reqwest::Client::new(),
        })
    }

    fn scopes(&self) -> &'static [&'static str] {
        match self.platform {
            Platform::Instagram => INSTAGRAM_SCOPES,
            _ => FACEBOOK_SCOPES,
        }
    }

    async fn graph_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ServerError> {
        let response = self
            .http
            .get(format!("{}{}", self.graph_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| ServerError::Provider(format!("Graph API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GraphErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            return Err(ServerError::Provider(format!("({}) {}", status, message)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServerError::Provider(format!("Unexpected Graph API response: {}", e)))
    }

    async fn short_lived_token(&self, code: &str) -> Result<GraphToken, ServerError> {
        self.graph_get(
            "/oauth/access_token",
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
            ],
        )
        .await
    }

    async fn long_lived_token(&self, access_token: &str) -> Result<GraphToken, ServerError> {
        self.graph_get(
            "/oauth/access_token",
            &[
                ("grant_type", "fb_exchange_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("fb_exchange_token", access_token),
            ],
        )
        .await
    }

    async fn profile(&self, access_token: &str) -> Result<GraphProfile, ServerError> {
        self.graph_get("/me", &[("fields", "id,name"), ("access_token", access_token)])
            .await
    }

    fn scope_list(&self) -> Vec<String> {
        self.scopes().iter().map(|s| s.to_string()).collect()
    }
}

#[async_trait]
impl PlatformExchanger for FacebookExchanger {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn build_auth_url(&self, state: &str) -> Result<String, ServerError> {
        let csrf_token = CsrfToken::new(state.to_string());
        let (auth_url, _) = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
            .authorize_url(|| csrf_token)
            .add_scopes(self.scopes().iter().map(|s| Scope::new(s.to_string())))
            .url();
        Ok(auth_url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ServerError> {
        let short_lived = self.short_lived_token(code).await?;

        // A failed upgrade keeps the short-lived token, which cannot be renewed
        let (token, refresh_token) = match self.long_lived_token(&short_lived.access_token).await {
            Ok(long_lived) => {
                let refresh_token = Some(long_lived.access_token.clone());
                (long_lived, refresh_token)
            }
            Err(e) => {
                tracing::warn!(
                    platform = %self.platform,
                    error = %e,
                    "Long-lived token exchange failed, keeping short-lived token"
                );
                (short_lived, None)
            }
        };

        let (account_id, account_name) = match self.profile(&token.access_token).await {
            Ok(profile) => (Some(profile.id), profile.name),
            Err(e) => {
                tracing::warn!(platform = %self.platform, error = %e, "Profile lookup failed");
                (None, None)
            }
        };

        tracing::debug!(
            platform = %self.platform,
            expires_in = ?token.expires_in,
            "Exchanged code for Graph API token"
        );

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token,
            expires_in: token.expires_in,
            scope: self.scope_list(),
            account_id,
            account_name,
        })
    }

    async fn refresh(&self, token: &SocialToken) -> Result<TokenGrant, ServerError> {
        let renewed = self.long_lived_token(&token.access_token).await?;

        tracing::debug!(platform = %self.platform, "Renewed long-lived Graph API token");

        Ok(TokenGrant {
            refresh_token: Some(renewed.access_token.clone()),
            access_token: renewed.access_token,
            expires_in: renewed.expires_in,
            scope: token.scope.clone(),
            account_id: token.account_id.clone(),
            account_name: token.account_name.clone(),
        })
    }
}
