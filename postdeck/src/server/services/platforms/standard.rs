use async_trait::async_trait;
use oauth2::{
    basic::{BasicClient, BasicTokenResponse},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    HttpRequest, HttpResponse, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};

use super::PlatformExchanger;
use crate::common::{Platform, SocialToken, TokenGrant};
use crate::server::config::ProviderConfiguration;
use crate::server::error::ServerError;

// Simple async HTTP client for OAuth2
async fn http_client(request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
    let client = reqwest::Client::new();
    let mut builder = client
        .request(request.method().clone(), request.uri().to_string())
        .body(request.body().clone());

    for (name, value) in request.headers() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    let mut http_response = HttpResponse::new(body);
    *http_response.status_mut() = status;

    Ok(http_response)
}

/// RFC 6749 authorization-code provider with a refresh-token grant
/// (LinkedIn, YouTube, TikTok and similar).
pub struct StandardOAuthExchanger {
    platform: Platform,
    client_id: String,
    client_secret: SecretString,
    scopes: Vec<String>,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
}

impl StandardOAuthExchanger {
    pub fn new(
        platform: Platform,
        config: &ProviderConfiguration,
        redirect_uri: &str,
    ) -> Result<Self, ServerError> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| ServerError::Configuration(format!("Invalid auth URL: {}", e)))?;

        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| ServerError::Configuration(format!("Invalid token URL: {}", e)))?;

        let redirect_url = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| ServerError::Configuration(format!("Invalid redirect URI: {}", e)))?;

        Ok(Self {
            platform,
            client_id: config.client_id.clone(),
            client_secret: SecretString::from(config.client_secret.clone()),
            scopes: config.scopes.clone(),
            auth_url,
            token_url,
            redirect_url,
        })
    }

    fn grant_from(&self, token_result: &BasicTokenResponse) -> TokenGrant {
        let scope = token_result
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| self.scopes.clone());

        TokenGrant {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|token| token.secret().to_string()),
            expires_in: token_result
                .expires_in()
                .map(|duration| duration.as_secs() as i64),
            scope,
            account_id: None,
            account_name: None,
        }
    }
}

#[async_trait]
impl PlatformExchanger for StandardOAuthExchanger {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn build_auth_url(&self, state: &str) -> Result<String, ServerError> {
        let csrf_token = CsrfToken::new(state.to_string());
        let (auth_url, _) = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
            .authorize_url(|| csrf_token)
            .add_scopes(self.scopes.iter().map(|s| Scope::new(s.clone())))
            .url();
        Ok(auth_url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ServerError> {
        let token_result = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| ServerError::Provider(format!("Token request failed: {}", e)))?;

        let grant = self.grant_from(&token_result);

        tracing::debug!(
            platform = %self.platform,
            expires_in = ?grant.expires_in,
            "Successfully exchanged code for tokens"
        );

        Ok(grant)
    }

    async fn refresh(&self, token: &SocialToken) -> Result<TokenGrant, ServerError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(ServerError::NoRefreshCapability(self.platform))?;

        let token_result = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| ServerError::Provider(format!("Token request failed: {}", e)))?;

        let grant = self.grant_from(&token_result);

        tracing::debug!(platform = %self.platform, "Successfully refreshed tokens");

        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REDIRECT: &str = "http://localhost:3000/oauth/callback";

    async fn setup() -> (MockServer, StandardOAuthExchanger) {
        let server = MockServer::start().await;
        let config = ProviderConfiguration {
            client_id: "li-id".to_string(),
            client_secret: "li-secret".to_string(),
            auth_url: format!("{}/authorize", server.uri()),
            token_url: format!("{}/token", server.uri()),
            scopes: vec!["w_member_social".to_string(), "openid".to_string()],
        };
        let exchanger = StandardOAuthExchanger::new(Platform::Linkedin, &config, REDIRECT).unwrap();
        (server, exchanger)
    }

    #[tokio::test]
    async fn auth_url_lists_configured_scopes() {
        let (server, exchanger) = setup().await;
        let url = exchanger.build_auth_url("state-1").unwrap();

        assert!(url.starts_with(&format!("{}/authorize?", server.uri())));
        assert!(url.contains("state=state-1"));
        assert!(url.contains("scope=w_member_social+openid"));
    }

    #[tokio::test]
    async fn exchange_code_maps_token_response() {
        let (server, exchanger) = setup().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "li-access",
                "token_type": "bearer",
                "expires_in": 5184000,
                "refresh_token": "li-refresh"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = exchanger.exchange_code("auth-code").await.unwrap();
        assert_eq!(grant.access_token, "li-access");
        assert_eq!(grant.refresh_token.as_deref(), Some("li-refresh"));
        assert_eq!(grant.expires_in, Some(5184000));
        assert_eq!(grant.scope, vec!["w_member_social", "openid"]);
    }

    #[tokio::test]
    async fn refresh_uses_refresh_token_grant() {
        let (server, exchanger) = setup().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=li-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "li-access-2",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stored = SocialToken::from_grant(
            "42",
            Platform::Linkedin,
            TokenGrant {
                access_token: "li-access".to_string(),
                refresh_token: Some("li-refresh".to_string()),
                ..TokenGrant::default()
            },
            Utc::now(),
        );

        let grant = exchanger.refresh(&stored).await.unwrap();
        assert_eq!(grant.access_token, "li-access-2");
        assert_eq!(grant.refresh_token, None);
    }

    #[tokio::test]
    async fn provider_rejection_is_reported() {
        let (server, exchanger) = setup().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "authorization code expired"
            })))
            .mount(&server)
            .await;

        let err = exchanger.exchange_code("stale").await.unwrap_err();
        assert!(matches!(err, ServerError::Provider(_)));
    }
}
