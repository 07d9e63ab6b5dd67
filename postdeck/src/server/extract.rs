use axum::extract::FromRequest;

use crate::server::error::ServerError;

/// JSON request body whose rejections render as `{"error": ...}` with 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct JsonBody<T>(pub T);
