use axum::{
    extract::{Path, State},
    Json,
};
use tracing::Instrument;

use crate::common::ScheduledPost;
use crate::server::{
    error::ServerError,
    extract::JsonBody,
    models::{RewriteRequest, RewriteResponse, StatusUpdateRequest},
    services::{GenerateSchedule, GeneratedSchedule},
    AppState,
};

pub async fn generate_schedule(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GenerateSchedule>,
) -> Result<Json<GeneratedSchedule>, ServerError> {
    let span = tracing::info_span!(
        "generate_schedule",
        client_id = req.client_id.as_deref().unwrap_or_default(),
        captions = req.captions.len()
    );

    let schedule = state.scheduler.generate(req).instrument(span).await?;
    Ok(Json(schedule))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<ScheduledPost>>, ServerError> {
    Ok(Json(state.scheduler.list_posts(&client_id).await?))
}

pub async fn update_post_status(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    JsonBody(req): JsonBody<StatusUpdateRequest>,
) -> Result<Json<ScheduledPost>, ServerError> {
    let span = tracing::info_span!("update_post_status", post_id = %post_id, status = %req.status);

    let post = state
        .scheduler
        .update_status(&post_id, &req.status)
        .instrument(span)
        .await?;
    Ok(Json(post))
}

pub async fn rewrite_captions(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RewriteRequest>,
) -> Result<Json<RewriteResponse>, ServerError> {
    if req.captions.is_empty() {
        return Err(ServerError::InvalidRequest(
            "captions must be a non-empty array".to_string(),
        ));
    }

    let rewriter = state.rewriter.as_ref().ok_or_else(|| {
        ServerError::Configuration("AI rewriting is not configured".to_string())
    })?;

    let span = tracing::info_span!("rewrite_captions", captions = req.captions.len());

    let batch = rewriter
        .rewrite_all(req.captions, req.tone.as_deref(), req.platform.as_deref())
        .instrument(span)
        .await?;

    Ok(Json(batch.into()))
}
