//! Per-platform OAuth integrations.
//!
//! Each social network that has real developer credentials configured gets a
//! [`PlatformExchanger`] in the [`PlatformRegistry`]. Platforms without one
//! fall back to the demo approval flow.

mod facebook;
mod standard;

pub use facebook::FacebookExchanger;
pub use standard::StandardOAuthExchanger;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{Platform, SocialToken, TokenGrant};
use crate::server::config::OAuthConfiguration;
use crate::server::error::ServerError;

/// Provider calls needed to move a connection through its lifecycle.
///
/// Failures are reported as [`ServerError::Provider`] carrying the upstream
/// message; the connection manager decides how to classify them.
#[async_trait]
pub trait PlatformExchanger: Send + Sync {
    fn platform(&self) -> Platform;

    fn build_auth_url(&self, state: &str) -> Result<String, ServerError>;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ServerError>;

    async fn refresh(&self, token: &SocialToken) -> Result<TokenGrant, ServerError>;
}

#[derive(Clone, Default)]
pub struct PlatformRegistry {
    exchangers: HashMap<Platform, Arc<dyn PlatformExchanger>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, exchanger: Arc<dyn PlatformExchanger>) {
        let platform = exchanger.platform();
        if self.exchangers.insert(platform, exchanger).is_some() {
            tracing::warn!(platform = %platform, "Replaced existing platform integration");
        }
    }

    pub fn with(mut self, exchanger: Arc<dyn PlatformExchanger>) -> Self {
        self.register(exchanger);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformExchanger>> {
        self.exchangers.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.exchangers.keys().copied().collect();
        platforms.sort();
        platforms
    }

    pub fn from_config(config: &OAuthConfiguration) -> Result<Self, ServerError> {
        let mut registry = Self::new();

        if let Some(facebook) = &config.facebook {
            for platform in [Platform::Facebook, Platform::Instagram] {
                registry.register(Arc::new(FacebookExchanger::new(
                    platform,
                    facebook,
                    &config.redirect_uri,
                )?));
            }
        }

        for (name, provider) in &config.providers {
            let platform: Platform = name.parse().map_err(|_| {
                ServerError::Configuration(format!("Unknown platform in oauth.providers: {}", name))
            })?;
            registry.register(Arc::new(StandardOAuthExchanger::new(
                platform,
                provider,
                &config.redirect_uri,
            )?));
        }

        tracing::info!(platforms = ?registry.platforms(), "Platform integrations registered");
        Ok(registry)
    }
}
