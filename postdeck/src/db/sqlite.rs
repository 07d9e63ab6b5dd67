use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::repository::{ClientRepository, PostRepository, TokenRepository};
use super::{Result, StoreError};
use crate::common::{Client, Platform, PostStatus, ScheduledPost, SocialToken};

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// -- Column helpers --

fn parse_datetime(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn parse_platform(value: &str) -> Result<Platform> {
    value
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("platform: {e}")))
}

fn parse_string_list(column: &str, value: &str) -> Result<Vec<String>> {
    serde_json::from_str(value).map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn encode_string_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn row_to_token(row: &SqliteRow) -> Result<SocialToken> {
    let scope: String = row.get("scope");
    let expires_at: Option<String> = row.get("expires_at");
    Ok(SocialToken {
        client_id: row.get("client_id"),
        platform: parse_platform(row.get("platform"))?,
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
        expires_at: expires_at
            .as_deref()
            .map(|v| parse_datetime("expires_at", v))
            .transpose()?,
        scope: scope.split_whitespace().map(str::to_string).collect(),
        account_id: row.get("account_id"),
        account_name: row.get("account_name"),
        created_at: parse_datetime("created_at", row.get("created_at"))?,
        updated_at: parse_datetime("updated_at", row.get("updated_at"))?,
    })
}

fn row_to_post(row: &SqliteRow) -> Result<ScheduledPost> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    Ok(ScheduledPost {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(format!("id: {e}")))?,
        client_id: row.get("client_id"),
        campaign_id: row.get("campaign_id"),
        platform: parse_platform(row.get("platform"))?,
        content: row.get("content"),
        media_urls: parse_string_list("media_urls", row.get("media_urls"))?,
        hashtags: parse_string_list("hashtags", row.get("hashtags"))?,
        scheduled_time: parse_datetime("scheduled_time", row.get("scheduled_time"))?,
        status: PostStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("status: {status}")))?,
        created_at: parse_datetime("created_at", row.get("created_at"))?,
        updated_at: parse_datetime("updated_at", row.get("updated_at"))?,
    })
}

#[async_trait]
impl ClientRepository for SqliteRepository {
    async fn upsert_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            "INSERT INTO clients (id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(client.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_client(&self, id: &str) -> Result<Option<Client>> {
        let row = sqlx::query("SELECT id, name, created_at FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(Client {
                id: r.get("id"),
                name: r.get("name"),
                created_at: parse_datetime("created_at", r.get("created_at"))?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TokenRepository for SqliteRepository {
    async fn upsert_token(&self, token: &SocialToken) -> Result<()> {
        sqlx::query(
            "INSERT INTO social_tokens (client_id, platform, access_token, refresh_token,
                expires_at, scope, account_id, account_name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(client_id, platform) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                scope = excluded.scope,
                account_id = excluded.account_id,
                account_name = excluded.account_name,
                updated_at = excluded.updated_at",
        )
        .bind(&token.client_id)
        .bind(token.platform.as_str())
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expires_at.map(|dt| dt.to_rfc3339()))
        .bind(token.scope.join(" "))
        .bind(&token.account_id)
        .bind(&token.account_name)
        .bind(token.created_at.to_rfc3339())
        .bind(token.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_token(&self, client_id: &str, platform: Platform) -> Result<Option<SocialToken>> {
        let row = sqlx::query("SELECT * FROM social_tokens WHERE client_id = ? AND platform = ?")
            .bind(client_id)
            .bind(platform.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_token).transpose()
    }

    async fn list_tokens(&self, client_id: &str) -> Result<Vec<SocialToken>> {
        let rows = sqlx::query("SELECT * FROM social_tokens WHERE client_id = ? ORDER BY platform")
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_token).collect()
    }

    async fn delete_token(&self, client_id: &str, platform: Platform) -> Result<bool> {
        let result = sqlx::query("DELETE FROM social_tokens WHERE client_id = ? AND platform = ?")
            .bind(client_id)
            .bind(platform.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostRepository for SqliteRepository {
    async fn create_post(&self, post: &ScheduledPost) -> Result<()> {
        sqlx::query(
            "INSERT INTO scheduled_posts (id, client_id, campaign_id, platform, content,
                media_urls, hashtags, scheduled_time, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(post.id.to_string())
        .bind(&post.client_id)
        .bind(&post.campaign_id)
        .bind(post.platform.as_str())
        .bind(&post.content)
        .bind(encode_string_list(&post.media_urls))
        .bind(encode_string_list(&post.hashtags))
        .bind(post.scheduled_time.to_rfc3339())
        .bind(post.status.as_str())
        .bind(post.created_at.to_rfc3339())
        .bind(post.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<ScheduledPost>> {
        let row = sqlx::query("SELECT * FROM scheduled_posts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn list_posts(&self, client_id: &str) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(
            "SELECT * FROM scheduled_posts WHERE client_id = ?
             ORDER BY scheduled_time, created_at, platform",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_post).collect()
    }

    async fn update_post_status(
        &self,
        id: Uuid,
        status: PostStatus,
    ) -> Result<Option<ScheduledPost>> {
        let result =
            sqlx::query("UPDATE scheduled_posts SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(Utc::now().to_rfc3339())
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_post(id).await
    }
}
