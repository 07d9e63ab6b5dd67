use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::common::{extract_hashtags, Platform, PostStatus, ScheduledPost};
use crate::db::{ClientRepository, PostRepository};
use crate::server::error::ServerError;

pub const MAX_CAPTIONS: usize = 30;
const PLACEHOLDER_MEDIA: &str = "placeholder.jpg";
const CSV_HEADER: [&str; 6] = ["Date", "Platform", "Type", "Caption", "Media_File", "Status"];

/// Spacing between consecutive captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    EveryOtherDay,
    /// Unrecognised values keep every post on the start date
    Unspaced,
}

impl Frequency {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("daily") => Frequency::Daily,
            Some("every-other-day") => Frequency::EveryOtherDay,
            Some(_) => Frequency::Unspaced,
        }
    }

    pub fn offset(&self, index: usize) -> Duration {
        let days = match self {
            Frequency::Daily => index as i64,
            Frequency::EveryOtherDay => 2 * index as i64,
            Frequency::Unspaced => 0,
        };
        Duration::days(days)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSchedule {
    #[serde(default)]
    pub captions: Vec<String>,
    pub client_id: Option<String>,
    pub campaign_id: Option<String>,
    pub start_date: Option<String>,
    pub platforms: Option<Vec<String>>,
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSchedule {
    pub schedule: Vec<ScheduledPost>,
    pub csv_path: PathBuf,
    pub dropped_captions: usize,
}

pub struct ScheduleGenerator {
    clients: Arc<dyn ClientRepository>,
    posts: Arc<dyn PostRepository>,
    output_dir: PathBuf,
}

/// Accepts `YYYY-MM-DD` (taken as UTC midnight) or RFC 3339.
pub fn parse_start_date(value: &str) -> Result<DateTime<Utc>, ServerError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ServerError::InvalidRequest(format!("Invalid startDate: {}", value)))
}

fn today() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

impl ScheduleGenerator {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        posts: Arc<dyn PostRepository>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clients,
            posts,
            output_dir: output_dir.into(),
        }
    }

    pub async fn generate(&self, request: GenerateSchedule) -> Result<GeneratedSchedule, ServerError> {
        let client_id = request
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let client_id = match client_id {
            Some(id) if !request.captions.is_empty() => id.to_string(),
            _ => {
                return Err(ServerError::MissingParameters(
                    "captions and clientId are required".to_string(),
                ))
            }
        };

        if self.clients.get_client(&client_id).await?.is_none() {
            return Err(ServerError::ClientNotFound(client_id));
        }

        let platforms = match request.platforms.as_deref() {
            None | Some([]) => vec![Platform::Instagram],
            Some(names) => names
                .iter()
                .map(|name| name.parse::<Platform>())
                .collect::<Result<Vec<_>, _>>()?,
        };
        let start = match request.start_date.as_deref() {
            Some(value) if !value.trim().is_empty() => parse_start_date(value)?,
            _ => today(),
        };
        let frequency = Frequency::parse(request.frequency.as_deref());

        let dropped_captions = request.captions.len().saturating_sub(MAX_CAPTIONS);
        if dropped_captions > 0 {
            tracing::warn!(
                client_id = %client_id,
                dropped = dropped_captions,
                "Caption batch exceeds {} entries, extra captions ignored",
                MAX_CAPTIONS
            );
        }

        let captions = &request.captions[..request.captions.len() - dropped_captions];
        let times = (0..captions.len())
            .map(|i| {
                start.checked_add_signed(frequency.offset(i)).ok_or_else(|| {
                    ServerError::InvalidRequest(format!(
                        "startDate is too far in the future for {} captions",
                        captions.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut schedule = Vec::new();
        for (caption, scheduled_time) in captions.iter().zip(times) {
            let hashtags = extract_hashtags(caption);

            for platform in &platforms {
                let now = Utc::now();
                let post = ScheduledPost {
                    id: Uuid::new_v4(),
                    client_id: client_id.clone(),
                    campaign_id: request.campaign_id.clone(),
                    platform: *platform,
                    content: caption.clone(),
                    media_urls: vec![PLACEHOLDER_MEDIA.to_string()],
                    hashtags: hashtags.clone(),
                    scheduled_time,
                    status: PostStatus::Draft,
                    created_at: now,
                    updated_at: now,
                };
                self.posts.create_post(&post).await?;
                schedule.push(post);
            }
        }

        let csv_path = self.write_csv(&client_id, &schedule).await?;

        tracing::info!(
            client_id = %client_id,
            posts = schedule.len(),
            path = %csv_path.display(),
            "Generated content schedule"
        );

        Ok(GeneratedSchedule {
            schedule,
            csv_path,
            dropped_captions,
        })
    }

    pub async fn list_posts(&self, client_id: &str) -> Result<Vec<ScheduledPost>, ServerError> {
        Ok(self.posts.list_posts(client_id).await?)
    }

    pub async fn update_status(
        &self,
        post_id: &str,
        status: &str,
    ) -> Result<ScheduledPost, ServerError> {
        let id = Uuid::parse_str(post_id)
            .map_err(|_| ServerError::NotFound(format!("post {}", post_id)))?;
        let status = PostStatus::parse(status)
            .ok_or_else(|| ServerError::InvalidRequest(format!("Unknown post status: {}", status)))?;

        self.posts
            .update_post_status(id, status)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("post {}", post_id)))
    }

    async fn write_csv(&self, client_id: &str, posts: &[ScheduledPost]) -> Result<PathBuf, ServerError> {
        let dir = self.output_dir.join(client_id);
        tokio::fs::create_dir_all(&dir).await?;

        let suffix = Uuid::new_v4().simple().to_string();
        let path = dir.join(format!(
            "schedule-{}-{}.csv",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ));
        tokio::fs::write(&path, render_csv(posts)?).await?;
        Ok(path)
    }
}

/// Quotes and doubles embedded quotes where a field needs it.
pub fn render_csv(posts: &[ScheduledPost]) -> Result<Vec<u8>, ServerError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |e: csv::Error| ServerError::Internal(format!("Failed to render CSV: {}", e));

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for post in posts {
        let date = post.scheduled_time.format("%Y-%m-%d").to_string();
        let media = post.media_urls.first().map(String::as_str).unwrap_or_default();
        writer
            .write_record([
                date.as_str(),
                post.platform.as_str(),
                "post",
                post.content.as_str(),
                media,
                post.status.as_str(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ServerError::Internal(format!("Failed to render CSV: {}", e)))
}
