//! Defines the gateway's HTTP routes.
//!
//! ## Structure
//! - `GET /object/{id}`: download object from its owning node
//! - `PUT /object/{id}`: upload object (multipart field `file`)
//! - `GET /healthz`, `GET /readyz`: probes
//!
//! Object routes validate the id length before reaching a handler. Every
//! request is logged, and a panicking handler yields a 500 instead of
//! tearing down the connection.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{get_object, put_object},
    },
    routes::middleware::{log_request, validate_object_id},
    services::gateway::Gateway,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

/// Build the router carrying the shared [`Gateway`] as state.
///
/// `max_upload_bytes` caps the request body accepted by uploads.
pub fn routes(max_upload_bytes: usize) -> Router<Arc<Gateway>> {
    let object_routes = Router::new()
        .route("/object/{id}", get(get_object).put(put_object))
        .route_layer(middleware::from_fn(validate_object_id));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(object_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn(log_request))
        .layer(CatchPanicLayer::new())
}
