//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks every node's bucket

use crate::services::{gateway::Gateway, node_client::NodeClient};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use futures::future::join_all;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Asks every registered node whether its bucket exists, all nodes at once.
/// HTTP 200 when every node answers yes, HTTP 503 otherwise. A node that is
/// down makes the ids it owns unavailable, so one failure is enough.
pub async fn readyz(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    let checks = join_all(gateway.nodes().map(check_node)).await;

    let overall_ok = checks.iter().all(|(_, check)| check.ok);
    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        nodes: checks.into_iter().collect(),
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn check_node(client: &NodeClient) -> (String, NodeCheck) {
    let endpoint = client.node().endpoint.clone();
    let check = match client.bucket_exists().await {
        Ok(true) => NodeCheck {
            ok: true,
            endpoint,
            error: None,
        },
        Ok(false) => NodeCheck {
            ok: false,
            endpoint,
            error: Some("bucket missing".into()),
        },
        Err(e) => NodeCheck {
            ok: false,
            endpoint,
            error: Some(format!("error: {}", e)),
        },
    };
    (client.id().to_string(), check)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    nodes: BTreeMap<String, NodeCheck>,
}

#[derive(Serialize)]
struct NodeCheck {
    ok: bool,
    endpoint: String,
    error: Option<String>,
}
