use base64::Engine;
use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use super::state_token::{StateClaims, StateSigner};
use crate::common::Platform;
use crate::server::error::ServerError;

/// Issues signed OAuth state tokens and accepts each one exactly once.
pub struct StateStore {
    signer: StateSigner,
    pending: Arc<DashMap<String, StateClaims>>,
    ttl: Duration,
}

impl StateStore {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        let store = Self {
            signer: StateSigner::new(secret),
            pending: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
        };

        // Spawn background cleanup task
        let pending_clone = store.pending.clone();
        let ttl_clone = store.ttl;
        tokio::spawn(async move {
            cleanup_expired_states(pending_clone, ttl_clone).await;
        });

        tracing::info!(
            "State store initialized with TTL of {} seconds",
            ttl_seconds
        );
        store
    }

    /// Issue a state token bound to a client and platform
    pub fn issue(&self, client_id: &str, platform: Platform) -> Result<String, ServerError> {
        let claims = StateClaims {
            client_id: client_id.to_string(),
            platform,
            issued_at: Utc::now(),
            nonce: generate_nonce(),
        };
        let token = self.signer.sign(&claims)?;
        self.pending.insert(claims.nonce.clone(), claims);
        tracing::debug!(client_id = %client_id, platform = %platform, "Issued state token");
        Ok(token)
    }

    /// Verify signature and age without consuming the token
    pub fn inspect(&self, token: &str) -> Result<StateClaims, ServerError> {
        let claims = self.signer.verify(token)?;
        if is_expired(&claims, self.ttl) {
            return Err(ServerError::InvalidState("state expired".to_string()));
        }
        Ok(claims)
    }

    /// Verify a token against the expected pair and mark it used
    pub fn consume(
        &self,
        token: &str,
        client_id: &str,
        platform: Platform,
    ) -> Result<StateClaims, ServerError> {
        let claims = self.inspect(token)?;

        if claims.client_id != client_id || claims.platform != platform {
            tracing::warn!(
                client_id = %client_id,
                platform = %platform,
                "State token issued for a different connection"
            );
            return Err(ServerError::InvalidState(
                "state was issued for a different client or platform".to_string(),
            ));
        }

        self.pending
            .remove(&claims.nonce)
            .map(|(_, claims)| claims)
            .ok_or_else(|| ServerError::InvalidState("state already used".to_string()))
    }

    /// Get pending state count (for monitoring)
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn is_expired(claims: &StateClaims, ttl: Duration) -> bool {
    let age = Utc::now()
        .signed_duration_since(claims.issued_at)
        .to_std()
        .unwrap_or(Duration::ZERO);
    age >= ttl
}

/// Random 32-byte nonce, URL-safe base64
pub fn generate_nonce() -> String {
    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.random()).collect();
    base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(&random_bytes)
}

/// Background task that periodically drops states that were never used
async fn cleanup_expired_states(pending: Arc<DashMap<String, StateClaims>>, ttl: Duration) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let initial_count = pending.len();

        pending.retain(|_, claims| !is_expired(claims, ttl));

        let cleaned = initial_count.saturating_sub(pending.len());
        if cleaned > 0 {
            tracing::info!(
                "Cleaned up {} expired states, {} remaining",
                cleaned,
                pending.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_is_single_use() {
        let store = StateStore::new("secret", 600);
        let state = store.issue("42", Platform::Facebook).unwrap();
        assert_eq!(store.pending_count(), 1);

        let claims = store.consume(&state, "42", Platform::Facebook).unwrap();
        assert_eq!(claims.client_id, "42");
        assert_eq!(store.pending_count(), 0);

        let err = store.consume(&state, "42", Platform::Facebook).unwrap_err();
        assert!(matches!(err, ServerError::InvalidState(msg) if msg == "state already used"));
    }

    #[tokio::test]
    async fn state_is_bound_to_pair() {
        let store = StateStore::new("secret", 600);
        let state = store.issue("42", Platform::Facebook).unwrap();

        assert!(store.consume(&state, "43", Platform::Facebook).is_err());
        assert!(store.consume(&state, "42", Platform::Instagram).is_err());
        // A mismatched attempt does not burn the token
        assert!(store.consume(&state, "42", Platform::Facebook).is_ok());
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let store = StateStore::new("secret", 0);
        let state = store.issue("42", Platform::Facebook).unwrap();

        let err = store.inspect(&state).unwrap_err();
        assert!(matches!(err, ServerError::InvalidState(msg) if msg == "state expired"));
    }

    #[tokio::test]
    async fn inspect_does_not_consume() {
        let store = StateStore::new("secret", 600);
        let state = store.issue("client-with-dashes", Platform::Tiktok).unwrap();

        let claims = store.inspect(&state).unwrap();
        assert_eq!(claims.client_id, "client-with-dashes");
        assert_eq!(claims.platform, Platform::Tiktok);
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn nonces_are_unique() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
