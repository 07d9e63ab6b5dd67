use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::common::{Client, Platform, PostStatus, ScheduledPost, SocialToken};

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn upsert_client(&self, client: &Client) -> Result<()>;
    async fn get_client(&self, id: &str) -> Result<Option<Client>>;
}

/// One credential per (client, platform) pair.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert or replace the record for the token's pair.
    async fn upsert_token(&self, token: &SocialToken) -> Result<()>;
    async fn get_token(&self, client_id: &str, platform: Platform) -> Result<Option<SocialToken>>;
    async fn list_tokens(&self, client_id: &str) -> Result<Vec<SocialToken>>;
    /// Returns whether a record existed.
    async fn delete_token(&self, client_id: &str, platform: Platform) -> Result<bool>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: &ScheduledPost) -> Result<()>;
    async fn get_post(&self, id: Uuid) -> Result<Option<ScheduledPost>>;
    /// Posts for a client ordered by scheduled time.
    async fn list_posts(&self, client_id: &str) -> Result<Vec<ScheduledPost>>;
    async fn update_post_status(&self, id: Uuid, status: PostStatus)
        -> Result<Option<ScheduledPost>>;
}
