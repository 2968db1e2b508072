//! HTTP handlers for `/object/{id}`.
//! Bytes are routed to the owning node by the [`Gateway`]; these handlers only
//! deal with the form upload, content-type sniffing and response headers.

use crate::{
    errors::AppError,
    models::object::ObjectInfo,
    services::{
        content_type::{detect_content_type, extension_for},
        gateway::{Gateway, GatewayError},
    },
};
use axum::{
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error};

/// Multipart field carrying the uploaded file.
pub const FORM_FILE_KEY: &str = "file";

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Download object `{id}` from whichever node owns it.
pub async fn get_object(
    State(gateway): State<Arc<Gateway>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (data, meta) = gateway
        .get_object(&id)
        .await
        .map_err(|err| request_failed("could not get object", &id, err))?;

    let length = data.len();
    let mut response = Response::new(Body::from(data));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &id, &meta, length);
    Ok(response)
}

/// Create or replace object `{id}` from the `file` field of a multipart form.
pub async fn put_object(
    State(gateway): State<Arc<Gateway>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        AppError::new(
            rejection.status(),
            format!("malformed form: {}", rejection.body_text()),
        )
    })?;
    let data = read_form_file(&mut multipart).await?;
    let content_type = detect_content_type(&data);

    let upload = gateway
        .put_object(&id, data, Some(&content_type))
        .await
        .map_err(|err| request_failed("could not create or update object", &id, err))?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    if let Some(etag) = upload.etag.as_deref()
        && let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag))
    {
        response.headers_mut().insert(header::ETAG, value);
    }
    Ok(response)
}

/// Pull the bytes of the [`FORM_FILE_KEY`] field out of the form.
async fn read_form_file(multipart: &mut Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        AppError::new(err.status(), format!("could not read form: {}", err.body_text()))
    })? {
        if field.name() == Some(FORM_FILE_KEY) {
            return field.bytes().await.map_err(|err| {
                AppError::new(err.status(), format!("could not read file: {}", err.body_text()))
            });
        }
    }
    Err(AppError::bad_request(format!(
        "could not get file from form with key {}",
        FORM_FILE_KEY
    )))
}

/// Log a failed request with its object id and translate it for the client.
fn request_failed(action: &str, id: &str, err: GatewayError) -> AppError {
    match &err {
        GatewayError::ObjectNotFound(_) => debug!(id, "object not found"),
        other => error!(id, error = %other, "{}", action),
    }
    match err {
        GatewayError::ObjectNotFound(_) => AppError::from(err),
        _ => AppError::internal(format!("{} with id {}", action, id)),
    }
}

fn set_object_headers(headers: &mut HeaderMap, id: &str, meta: &ObjectInfo, length: usize) {
    let content_type = meta.content_type_or_default();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    let filename = match extension_for(content_type) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename={}", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    if let Some(etag) = meta.etag.as_ref()
        && let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag))
    {
        headers.insert(header::ETAG, value);
    }

    if let Some(last_modified) = meta.last_modified
        && let Ok(value) =
            HeaderValue::from_str(&last_modified.format(HTTP_DATE_FORMAT).to_string())
    {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
