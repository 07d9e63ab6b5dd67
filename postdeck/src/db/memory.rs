use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::repository::{ClientRepository, PostRepository, TokenRepository};
use super::Result;
use crate::common::{Client, Platform, PostStatus, ScheduledPost, SocialToken};

/// Process-local store backed by concurrent maps.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    clients: Arc<DashMap<String, Client>>,
    tokens: Arc<DashMap<(String, Platform), SocialToken>>,
    posts: Arc<DashMap<Uuid, ScheduledPost>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }
}

#[async_trait]
impl ClientRepository for InMemoryRepository {
    async fn upsert_client(&self, client: &Client) -> Result<()> {
        self.clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, id: &str) -> Result<Option<Client>> {
        Ok(self.clients.get(id).map(|c| c.clone()))
    }
}

#[async_trait]
impl TokenRepository for InMemoryRepository {
    async fn upsert_token(&self, token: &SocialToken) -> Result<()> {
        self.tokens
            .entry((token.client_id.clone(), token.platform))
            .and_modify(|existing| {
                let created_at = existing.created_at;
                *existing = token.clone();
                existing.created_at = created_at;
            })
            .or_insert_with(|| token.clone());
        Ok(())
    }

    async fn get_token(&self, client_id: &str, platform: Platform) -> Result<Option<SocialToken>> {
        Ok(self
            .tokens
            .get(&(client_id.to_string(), platform))
            .map(|t| t.clone()))
    }

    async fn list_tokens(&self, client_id: &str) -> Result<Vec<SocialToken>> {
        let mut tokens: Vec<SocialToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.key().0 == client_id)
            .map(|entry| entry.value().clone())
            .collect();
        tokens.sort_by(|a, b| a.platform.as_str().cmp(b.platform.as_str()));
        Ok(tokens)
    }

    async fn delete_token(&self, client_id: &str, platform: Platform) -> Result<bool> {
        Ok(self
            .tokens
            .remove(&(client_id.to_string(), platform))
            .is_some())
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn create_post(&self, post: &ScheduledPost) -> Result<()> {
        self.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<ScheduledPost>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn list_posts(&self, client_id: &str) -> Result<Vec<ScheduledPost>> {
        let mut posts: Vec<ScheduledPost> = self
            .posts
            .iter()
            .filter(|entry| entry.client_id == client_id)
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by(|a, b| {
            a.scheduled_time
                .cmp(&b.scheduled_time)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.platform.as_str().cmp(b.platform.as_str()))
        });
        Ok(posts)
    }

    async fn update_post_status(
        &self,
        id: Uuid,
        status: PostStatus,
    ) -> Result<Option<ScheduledPost>> {
        Ok(self.posts.get_mut(&id).map(|mut post| {
            post.status = status;
            post.updated_at = Utc::now();
            post.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TokenGrant;

    fn token(client_id: &str, platform: Platform, access: &str) -> SocialToken {
        SocialToken::from_grant(
            client_id,
            platform,
            TokenGrant {
                access_token: access.to_string(),
                ..TokenGrant::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn upsert_keeps_one_record_per_pair() {
        let repo = InMemoryRepository::new();
        let first = token("42", Platform::Facebook, "a");
        repo.upsert_token(&first).await.unwrap();
        repo.upsert_token(&token("42", Platform::Facebook, "b"))
            .await
            .unwrap();
        repo.upsert_token(&token("42", Platform::Instagram, "c"))
            .await
            .unwrap();

        assert_eq!(repo.token_count(), 2);
        let stored = repo
            .get_token("42", Platform::Facebook)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token, "b");
        assert_eq!(stored.created_at, first.created_at);
    }

    #[tokio::test]
    async fn list_is_scoped_to_client() {
        let repo = InMemoryRepository::new();
        repo.upsert_token(&token("42", Platform::Tiktok, "a"))
            .await
            .unwrap();
        repo.upsert_token(&token("42", Platform::Facebook, "b"))
            .await
            .unwrap();
        repo.upsert_token(&token("7", Platform::Facebook, "c"))
            .await
            .unwrap();

        let platforms: Vec<Platform> = repo
            .list_tokens("42")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.platform)
            .collect();
        assert_eq!(platforms, vec![Platform::Facebook, Platform::Tiktok]);
    }
}
