use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use super::platforms::PlatformRegistry;
use super::state_store::{generate_nonce, StateStore};
use crate::common::{ConnectionStatus, Platform, SocialToken, TokenGrant};
use crate::db::TokenRepository;
use crate::server::error::ServerError;

/// Where the caller should send the user to approve a connection.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub auth_url: String,
    pub state: String,
    /// True when the platform has no live integration and the local
    /// approval screen is used instead
    pub demo: bool,
}

/// Non-secret view of a stored connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub client_id: String,
    pub platform: Platform,
    pub status: ConnectionStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub refreshable: bool,
    pub scope: Vec<String>,
    pub account_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionSummary {
    pub fn new(token: &SocialToken, now: DateTime<Utc>) -> Self {
        Self {
            client_id: token.client_id.clone(),
            platform: token.platform,
            status: token.status(now),
            expires_at: token.expires_at,
            refreshable: token.is_refreshable(),
            scope: token.scope.clone(),
            account_name: token.account_name.clone(),
            updated_at: token.updated_at,
        }
    }
}

/// Drives a client's platform credential through
/// connect → exchange → refresh → disconnect.
pub struct OAuthManager {
    registry: PlatformRegistry,
    tokens: Arc<dyn TokenRepository>,
    states: StateStore,
    demo_url: String,
}

fn require(value: Option<&str>, name: &str) -> Result<String, ServerError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ServerError::MissingParameters(name.to_string())),
    }
}

impl OAuthManager {
    pub fn new(
        registry: PlatformRegistry,
        tokens: Arc<dyn TokenRepository>,
        states: StateStore,
        public_url: &str,
    ) -> Self {
        Self {
            registry,
            tokens,
            states,
            demo_url: format!("{}/oauth/demo", public_url.trim_end_matches('/')),
        }
    }

    /// Start a connection for a client.
    pub fn connect(
        &self,
        client_id: Option<&str>,
        platform: Option<&str>,
    ) -> Result<Authorization, ServerError> {
        let (client_id, platform) = match (client_id, platform) {
            (Some(c), Some(p)) if !c.trim().is_empty() && !p.trim().is_empty() => {
                (c.trim(), p.parse::<Platform>()?)
            }
            _ => {
                return Err(ServerError::InvalidRequest(
                    "platform and clientId are required".to_string(),
                ))
            }
        };

        let state = self.states.issue(client_id, platform)?;

        let authorization = match self.registry.get(platform) {
            Some(exchanger) => Authorization {
                auth_url: exchanger.build_auth_url(&state)?,
                state,
                demo: false,
            },
            None => {
                let auth_url = Url::parse_with_params(
                    &self.demo_url,
                    &[
                        ("client_id", client_id),
                        ("platform", platform.as_str()),
                        ("state", state.as_str()),
                    ],
                )
                .map_err(|e| ServerError::Configuration(format!("Invalid public URL: {}", e)))?;
                Authorization {
                    auth_url: auth_url.to_string(),
                    state,
                    demo: true,
                }
            }
        };

        tracing::info!(
            client_id = %client_id,
            platform = %platform,
            demo = authorization.demo,
            "Started OAuth connection"
        );

        Ok(authorization)
    }

    /// Verify a state token without consuming it, e.g. to learn which
    /// connection a provider callback belongs to.
    pub fn inspect_state(&self, state: &str) -> Result<(String, Platform), ServerError> {
        let claims = self.states.inspect(state)?;
        Ok((claims.client_id, claims.platform))
    }

    /// Accept a demo approval, returning the platform and a locally minted
    /// access token for the approval screen to submit.
    pub fn approve_demo(
        &self,
        state: &str,
        client_id: &str,
        platform: &str,
    ) -> Result<(Platform, String), ServerError> {
        let platform: Platform = platform.parse()?;
        self.states.consume(state, client_id, platform)?;
        Ok((platform, format!("demo_{}", generate_nonce())))
    }

    /// Complete a provider authorization by trading the code for tokens.
    pub async fn exchange(
        &self,
        code: Option<&str>,
        state: Option<&str>,
        client_id: Option<&str>,
        platform: Option<&str>,
    ) -> Result<SocialToken, ServerError> {
        let missing: Vec<&str> = [
            ("code", code),
            ("state", state),
            ("clientId", client_id),
            ("platform", platform),
        ]
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(ServerError::MissingParameters(missing.join(", ")));
        }

        let code = require(code, "code")?;
        let state = require(state, "state")?;
        let client_id = require(client_id, "clientId")?;
        let platform: Platform = require(platform, "platform")?.parse()?;

        let exchanger = self
            .registry
            .get(platform)
            .ok_or_else(|| ServerError::UnsupportedPlatform(platform.to_string()))?;

        self.states.consume(&state, &client_id, platform)?;

        let grant = exchanger
            .exchange_code(&code)
            .await
            .map_err(|e| match e {
                ServerError::Provider(detail) => ServerError::ExchangeFailed(detail),
                other => other,
            })?;

        let token = self.store_grant(&client_id, platform, grant).await?;

        tracing::info!(client_id = %client_id, platform = %platform, "OAuth exchange complete");
        Ok(token)
    }

    /// Persist a token obtained outside the code exchange (the demo flow).
    pub async fn complete(
        &self,
        client_id: Option<&str>,
        platform: Option<&str>,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        expires_in: Option<i64>,
    ) -> Result<SocialToken, ServerError> {
        let client_id = require(client_id, "clientId")?;
        let platform: Platform = require(platform, "platform")?.parse()?;
        let access_token = require(access_token, "accessToken")?;

        let grant = TokenGrant {
            access_token,
            refresh_token: refresh_token
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            expires_in,
            ..TokenGrant::default()
        };

        let token = self.store_grant(&client_id, platform, grant).await?;

        tracing::info!(client_id = %client_id, platform = %platform, "Stored connection token");
        Ok(token)
    }

    /// Renew the stored access token for a connection.
    pub async fn refresh(
        &self,
        client_id: &str,
        platform: Platform,
    ) -> Result<SocialToken, ServerError> {
        let mut token = self
            .tokens
            .get_token(client_id, platform)
            .await?
            .ok_or_else(|| ServerError::NotConnected {
                client_id: client_id.to_string(),
                platform,
            })?;

        if !token.is_refreshable() {
            tracing::info!(
                client_id = %client_id,
                platform = %platform,
                "Token has no refresh capability, reconnect required"
            );
            return Err(ServerError::NoRefreshCapability(platform));
        }

        let exchanger = self
            .registry
            .get(platform)
            .ok_or_else(|| ServerError::UnsupportedPlatform(platform.to_string()))?;

        let grant = exchanger.refresh(&token).await.map_err(|e| match e {
            ServerError::Provider(detail) => ServerError::RefreshFailed(detail),
            other => other,
        })?;

        token.apply_refresh(grant, Utc::now());
        self.tokens.upsert_token(&token).await?;

        tracing::info!(client_id = %client_id, platform = %platform, "Token refreshed");
        Ok(token)
    }

    /// Remove a connection. Removing a missing connection succeeds.
    pub async fn disconnect(&self, client_id: &str, platform: Platform) -> Result<(), ServerError> {
        let existed = self.tokens.delete_token(client_id, platform).await?;
        tracing::info!(
            client_id = %client_id,
            platform = %platform,
            existed,
            "Disconnected platform"
        );
        Ok(())
    }

    pub async fn get_token(
        &self,
        client_id: &str,
        platform: Platform,
    ) -> Result<Option<SocialToken>, ServerError> {
        Ok(self.tokens.get_token(client_id, platform).await?)
    }

    pub async fn connections(&self, client_id: &str) -> Result<Vec<ConnectionSummary>, ServerError> {
        let now = Utc::now();
        Ok(self
            .tokens
            .list_tokens(client_id)
            .await?
            .iter()
            .map(|token| ConnectionSummary::new(token, now))
            .collect())
    }

    async fn store_grant(
        &self,
        client_id: &str,
        platform: Platform,
        grant: TokenGrant,
    ) -> Result<SocialToken, ServerError> {
        let now = Utc::now();
        let mut token = SocialToken::from_grant(client_id, platform, grant, now);

        if let Some(existing) = self.tokens.get_token(client_id, platform).await? {
            token.created_at = existing.created_at;
        }

        self.tokens.upsert_token(&token).await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use crate::server::services::platforms::PlatformExchanger;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Issues `access-N` tokens and fails codes starting with `bad`.
    struct FakeExchanger {
        platform: Platform,
        issued: AtomicUsize,
        with_refresh: bool,
    }

    impl FakeExchanger {
        fn new(platform: Platform, with_refresh: bool) -> Self {
            Self {
                platform,
                issued: AtomicUsize::new(0),
                with_refresh,
            }
        }

        fn next_token(&self) -> String {
            format!("access-{}", self.issued.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[async_trait]
    impl PlatformExchanger for FakeExchanger {
        fn platform(&self) -> Platform {
            self.platform
        }

        fn build_auth_url(&self, state: &str) -> Result<String, ServerError> {
            Ok(format!("https://provider.test/authorize?state={}", state))
        }

        async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ServerError> {
            if code.starts_with("bad") {
                return Err(ServerError::Provider("invalid_grant".to_string()));
            }
            Ok(TokenGrant {
                access_token: self.next_token(),
                refresh_token: self.with_refresh.then(|| "refresh-1".to_string()),
                expires_in: Some(3600),
                scope: vec!["publish".to_string()],
                account_id: Some("1001".to_string()),
                account_name: Some("Beat Studio".to_string()),
            })
        }

        async fn refresh(&self, token: &SocialToken) -> Result<TokenGrant, ServerError> {
            if token.refresh_token.as_deref() == Some("revoked") {
                return Err(ServerError::Provider("token revoked by user".to_string()));
            }
            Ok(TokenGrant {
                access_token: self.next_token(),
                expires_in: Some(7200),
                ..TokenGrant::default()
            })
        }
    }

    fn manager_with(repo: Arc<InMemoryRepository>, with_refresh: bool) -> OAuthManager {
        let registry = PlatformRegistry::new()
            .with(Arc::new(FakeExchanger::new(Platform::Facebook, with_refresh)));
        OAuthManager::new(
            registry,
            repo,
            StateStore::new("secret", 600),
            "http://localhost:8080/",
        )
    }

    async fn connect_and_exchange(manager: &OAuthManager, code: &str) -> SocialToken {
        let authorization = manager.connect(Some("42"), Some("facebook")).unwrap();
        manager
            .exchange(
                Some(code),
                Some(&authorization.state),
                Some("42"),
                Some("facebook"),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn connect_uses_provider_url_when_integrated() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let authorization = manager.connect(Some("42"), Some("Facebook")).unwrap();

        assert!(!authorization.demo);
        assert!(authorization.auth_url.starts_with("https://provider.test/authorize"));
        assert!(authorization.auth_url.contains(&authorization.state));
    }

    #[tokio::test]
    async fn connect_falls_back_to_demo_url() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let authorization = manager.connect(Some("42"), Some("tiktok")).unwrap();

        assert!(authorization.demo);
        let url = Url::parse(&authorization.auth_url).unwrap();
        assert_eq!(url.path(), "/oauth/demo");
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["client_id"], "42");
        assert_eq!(query["platform"], "tiktok");
        assert_eq!(query["state"], authorization.state);
    }

    #[tokio::test]
    async fn connect_requires_both_parameters() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        assert!(matches!(
            manager.connect(None, Some("facebook")),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(
            manager.connect(Some("42"), Some("  ")),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(
            manager.connect(Some("42"), Some("myspace")),
            Err(ServerError::UnsupportedPlatform(_))
        ));
    }

    #[tokio::test]
    async fn repeated_exchange_keeps_single_record() {
        let repo = Arc::new(InMemoryRepository::new());
        let manager = manager_with(repo.clone(), true);

        let first = connect_and_exchange(&manager, "code-1").await;
        let second = connect_and_exchange(&manager, "code-2").await;

        assert_eq!(repo.token_count(), 1);
        let stored = manager.get_token("42", Platform::Facebook).await.unwrap().unwrap();
        assert_eq!(stored.access_token, second.access_token);
        assert_ne!(first.access_token, second.access_token);
        assert_eq!(stored.created_at, first.created_at);
        assert!(stored.expires_at.is_some());
    }

    #[tokio::test]
    async fn exchange_reports_missing_parameters() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let err = manager
            .exchange(Some("code"), None, Some(""), Some("facebook"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::MissingParameters(msg) if msg == "state, clientId"));
    }

    #[tokio::test]
    async fn exchange_rejects_platform_without_integration() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let authorization = manager.connect(Some("42"), Some("youtube")).unwrap();
        let err = manager
            .exchange(
                Some("code"),
                Some(&authorization.state),
                Some("42"),
                Some("youtube"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::UnsupportedPlatform(_)));
    }

    #[tokio::test]
    async fn exchange_rejects_foreign_or_reused_state() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let authorization = manager.connect(Some("42"), Some("facebook")).unwrap();

        let err = manager
            .exchange(
                Some("code"),
                Some(&authorization.state),
                Some("7"),
                Some("facebook"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidState(_)));

        manager
            .exchange(
                Some("code"),
                Some(&authorization.state),
                Some("42"),
                Some("facebook"),
            )
            .await
            .unwrap();
        let reused = manager
            .exchange(
                Some("code"),
                Some(&authorization.state),
                Some("42"),
                Some("facebook"),
            )
            .await
            .unwrap_err();
        assert!(matches!(reused, ServerError::InvalidState(_)));
    }

    #[tokio::test]
    async fn provider_failure_becomes_exchange_failed() {
        let repo = Arc::new(InMemoryRepository::new());
        let manager = manager_with(repo.clone(), true);
        let authorization = manager.connect(Some("42"), Some("facebook")).unwrap();

        let err = manager
            .exchange(
                Some("bad-code"),
                Some(&authorization.state),
                Some("42"),
                Some("facebook"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::ExchangeFailed(msg) if msg == "invalid_grant"));
        assert_eq!(repo.token_count(), 0);
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_leaves_record_untouched() {
        let repo = Arc::new(InMemoryRepository::new());
        let manager = manager_with(repo, false);
        let original = connect_and_exchange(&manager, "code-1").await;

        let err = manager.refresh("42", Platform::Facebook).await.unwrap_err();
        assert!(matches!(err, ServerError::NoRefreshCapability(Platform::Facebook)));

        let stored = manager.get_token("42", Platform::Facebook).await.unwrap().unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn refresh_requires_connection() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let err = manager.refresh("42", Platform::Facebook).await.unwrap_err();
        assert!(matches!(err, ServerError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn refresh_provider_error_is_propagated() {
        let repo = Arc::new(InMemoryRepository::new());
        let manager = manager_with(repo.clone(), true);
        let mut token = connect_and_exchange(&manager, "code-1").await;
        token.refresh_token = Some("revoked".to_string());
        repo.upsert_token(&token).await.unwrap();

        let err = manager.refresh("42", Platform::Facebook).await.unwrap_err();
        assert!(matches!(err, ServerError::RefreshFailed(msg) if msg.contains("revoked")));
    }

    #[tokio::test]
    async fn demo_tokens_cannot_refresh_without_integration() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        manager
            .complete(Some("42"), Some("tiktok"), Some("demo"), Some("demo-refresh"), None)
            .await
            .unwrap();

        let err = manager.refresh("42", Platform::Tiktok).await.unwrap_err();
        assert!(matches!(err, ServerError::UnsupportedPlatform(_)));
    }

    #[tokio::test]
    async fn demo_approval_consumes_state() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let authorization = manager.connect(Some("42"), Some("tiktok")).unwrap();

        let (platform, token) = manager
            .approve_demo(&authorization.state, "42", "tiktok")
            .unwrap();
        assert_eq!(platform, Platform::Tiktok);
        assert!(token.starts_with("demo_"));

        assert!(matches!(
            manager.approve_demo(&authorization.state, "42", "tiktok"),
            Err(ServerError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn complete_validates_and_stores() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);
        let err = manager
            .complete(Some("42"), Some("tiktok"), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::MissingParameters(msg) if msg == "accessToken"));

        let token = manager
            .complete(Some("42"), Some("TikTok"), Some("demo-token"), Some(""), Some(60))
            .await
            .unwrap();
        assert_eq!(token.platform, Platform::Tiktok);
        assert_eq!(token.refresh_token, None);
        assert!(token.expires_at.is_some());
    }

    #[tokio::test]
    async fn lifecycle_round_trip() {
        let manager = manager_with(Arc::new(InMemoryRepository::new()), true);

        let connected = connect_and_exchange(&manager, "code-1").await;
        assert!(!connected.access_token.is_empty());

        let refreshed = manager.refresh("42", Platform::Facebook).await.unwrap();
        assert_ne!(refreshed.access_token, connected.access_token);
        assert_eq!(refreshed.client_id, "42");
        assert_eq!(refreshed.platform, Platform::Facebook);
        assert_eq!(refreshed.account_name, connected.account_name);

        let summaries = manager.connections("42").await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, ConnectionStatus::Connected);
        assert!(summaries[0].refreshable);

        manager.disconnect("42", Platform::Facebook).await.unwrap();
        assert!(manager.get_token("42", Platform::Facebook).await.unwrap().is_none());

        // Disconnect is idempotent
        manager.disconnect("42", Platform::Facebook).await.unwrap();
        assert!(manager.connections("42").await.unwrap().is_empty());
    }
}
