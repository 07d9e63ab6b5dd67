use axum::{
    extract::{Path, State},
    Json,
};
use tracing::Instrument;

use crate::server::{
    error::ServerError,
    extract::JsonBody,
    models::{
        CompleteRequest, ConnectRequest, ConnectResponse, ConnectionRequest, ExchangeRequest,
        ExchangeResponse, SuccessResponse, TokenRecord,
    },
    services::ConnectionSummary,
    AppState,
};

pub async fn connect(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ConnectRequest>,
) -> Result<Json<ConnectResponse>, ServerError> {
    let span = tracing::info_span!(
        "oauth_connect",
        client_id = req.client_id.as_deref().unwrap_or_default(),
        platform = req.platform.as_deref().unwrap_or_default()
    );
    let _enter = span.enter();

    let authorization = state
        .oauth
        .connect(req.client_id.as_deref(), req.platform.as_deref())?;

    Ok(Json(authorization.into()))
}

pub async fn exchange(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>, ServerError> {
    let span = tracing::info_span!(
        "oauth_exchange",
        client_id = req.client_id.as_deref().unwrap_or_default(),
        platform = req.platform.as_deref().unwrap_or_default()
    );

    let token = state
        .oauth
        .exchange(
            req.code.as_deref(),
            req.state.as_deref(),
            req.client_id.as_deref(),
            req.platform.as_deref(),
        )
        .instrument(span)
        .await?;

    Ok(Json(ExchangeResponse {
        success: true,
        platform: token.platform,
    }))
}

pub async fn complete(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CompleteRequest>,
) -> Result<Json<TokenRecord>, ServerError> {
    let span = tracing::info_span!(
        "oauth_complete",
        client_id = req.client_id.as_deref().unwrap_or_default(),
        platform = req.platform.as_deref().unwrap_or_default()
    );

    let token = state
        .oauth
        .complete(
            req.client_id.as_deref(),
            req.platform.as_deref(),
            req.access_token.as_deref(),
            req.refresh_token.as_deref(),
            req.expires_in,
        )
        .instrument(span)
        .await?;

    Ok(Json(token.into()))
}

pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ConnectionRequest>,
) -> Result<Json<TokenRecord>, ServerError> {
    let (client_id, platform) = req.target()?;
    let span = tracing::info_span!("oauth_refresh", client_id = %client_id, platform = %platform);

    tracing::debug!(parent: &span, "Token refresh requested");
    let token = state
        .oauth
        .refresh(&client_id, platform)
        .instrument(span)
        .await?;

    Ok(Json(token.into()))
}

pub async fn disconnect(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ConnectionRequest>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let (client_id, platform) = req.target()?;
    let span = tracing::info_span!("oauth_disconnect", client_id = %client_id, platform = %platform);

    state
        .oauth
        .disconnect(&client_id, platform)
        .instrument(span)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn connections(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<ConnectionSummary>>, ServerError> {
    let summaries = state.oauth.connections(&client_id).await?;
    Ok(Json(summaries))
}
