use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Path, Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    blobs::BlobService,
    http_objects::{Blob, BlobCreated, BlobGateAPIError, CreateBlob},
};

/// Requests carry the whole payload as base64 JSON, so the body limit has to
/// cover the largest blob accepted.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct RouteState {
    pub blob_service: Arc<BlobService>,
    /// Static bearer token; `None` leaves the API open.
    pub api_token: Option<Arc<str>>,
}

pub fn create_routes(route_state: RouteState) -> Router {
    let api = Router::new()
        .route("/api/v1/blobs", post(create_blob))
        .route("/api/v1/blobs/{*blob_id}", get(get_blob))
        .layer(middleware::from_fn_with_state(
            route_state.clone(),
            require_bearer_token,
        ))
        .with_state(route_state);

    Router::new()
        .route("/", get(index))
        .merge(api)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    let method = req.method();
                    let uri = req.uri();

                    let matched_path = req
                        .extensions()
                        .get::<MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::debug_span!("request", %method, %uri, matched_path)
                })
                .on_failure(()),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
}

async fn index() -> &'static str {
    "Blobgate Server"
}

async fn require_bearer_token(
    State(state): State<RouteState>,
    request: Request,
    next: Next,
) -> Result<Response, BlobGateAPIError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim());

    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => Err(BlobGateAPIError::unauthorized("Invalid bearer token")),
        None => Err(BlobGateAPIError::unauthorized("Missing bearer token")),
    }
}

#[tracing::instrument(skip_all)]
async fn create_blob(
    State(state): State<RouteState>,
    Json(payload): Json<CreateBlob>,
) -> Result<Json<BlobCreated>, BlobGateAPIError> {
    payload.validate()?;
    let id = state
        .blob_service
        .store(&payload.id, &payload.data)
        .await?;
    Ok(Json(BlobCreated::new(id.to_string())))
}

#[tracing::instrument(skip_all)]
async fn get_blob(
    State(state): State<RouteState>,
    Path(blob_id): Path<String>,
) -> Result<Json<Blob>, BlobGateAPIError> {
    let blob = state.blob_service.retrieve(&blob_id).await?;
    Ok(Json(blob.into()))
}
