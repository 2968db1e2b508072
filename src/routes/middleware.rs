//! Request middleware: access logging and object id validation.

use crate::errors::AppError;
use axum::{
    extract::{Path, Request},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, info};

/// Longest accepted object id, in characters.
pub const MAX_OBJECT_ID_LEN: usize = 32;

/// Log method, path and host of every inbound request.
pub async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    info!(%method, %path, %host, "received http request");

    let response = next.run(request).await;
    debug!(%method, %path, status = response.status().as_u16(), "sent http response");
    response
}

/// Reject ids outside 1..=[`MAX_OBJECT_ID_LEN`] characters before routing.
pub async fn validate_object_id(
    Path(id): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let len = id.chars().count();
    if len == 0 || len > MAX_OBJECT_ID_LEN {
        return Err(AppError::bad_request(format!(
            "object id must be between 1-{} characters long, but received invalid value: {}",
            MAX_OBJECT_ID_LEN, id
        )));
    }
    Ok(next.run(request).await)
}
