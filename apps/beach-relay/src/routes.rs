use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::metrics;
use crate::protocol::{Operation, Outcome};
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    uptime_secs: u64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            RelayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, None),
            RelayError::NotFound => (StatusCode::NOT_FOUND, None),
            RelayError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, None),
            RelayError::Store(err) => (StatusCode::INTERNAL_SERVER_ERROR, Some(err.to_string())),
        };
        let body = ErrorBody {
            error: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.service().store_backend(),
        uptime_secs: state.uptime_secs(),
    })
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather(),
    )
}

/// Entry point for every signaling request; anything that is not a known operation is
/// rejected here before the service sees it.
async fn signal(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let body = json_body(&body);
    let op = match Operation::parse(&method, uri.path(), &query, &body) {
        Ok(op) => op,
        Err(err) => {
            metrics::record_operation("unparsed", err.kind());
            warn!(%method, path = uri.path(), error = %err, "rejected signaling request");
            return err.into_response();
        }
    };

    let status = match op {
        Operation::CreateRoom => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    let name = op.name();
    let room = op.room().cloned();
    match state.service().dispatch(op).await {
        Ok(outcome) => {
            debug!(operation = name, room = ?room, "signaling request served");
            (status, Json::<Outcome>(outcome)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// POST bodies that are absent or not JSON read as `null`, so every field is "missing".
fn json_body(raw: &Bytes) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(raw).unwrap_or(Value::Null)
}

/// OPTIONS on any path answers 204, keeping whatever CORS headers the inner layer set.
async fn options_no_content(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_options {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = if allowed_origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(allowed_origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(err) => {
                warn!(origin = allowed_origin, error = %err, "invalid ALLOWED_ORIGIN; allowing any");
                AllowOrigin::any()
            }
        }
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn router(state: AppState, allowed_origin: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .fallback(signal)
        .with_state(state)
        .layer(cors_layer(allowed_origin))
        .layer(middleware::from_fn(options_no_content))
        .layer(TraceLayer::new_for_http())
}
