//! Survey response API routes
//!
//! - `POST /submit` — ingest one URL-encoded form submission
//! - `GET <export path>` — download every stored response as one CSV table
//!
//! Any non-POST method on `/submit` is rejected with `405` by the router;
//! a body that fails URL-decoding is a `400`. The export path is provided
//! by configuration when the router is built.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::error::AppError;
use crate::features::FeatureState;

use super::commands::submit::{self, SubmitResponseCommand};
use super::queries::export_csv;

/// Creates the responses router with the export mounted on the given path.
pub fn responses_routes(export_path: &str) -> Router<FeatureState> {
    Router::new()
        .route("/submit", post(submit_response))
        .route(export_path, get(export_responses))
}

/// Ingest one survey submission.
///
/// The record is durably persisted before the acknowledgment is sent; a
/// store failure returns `500` and triggers no notification.
#[tracing::instrument(skip(state, headers, body))]
async fn submit_response(
    State(state): State<FeatureState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let fields = submit::parse_form(&body)
        .map_err(|e| AppError::BadRequest(format!("Unable to parse form body: {}", e)))?;

    let origin = submit::origin_address(&headers, peer.map(|ConnectInfo(addr)| addr));
    let command = SubmitResponseCommand { fields, origin };

    let id = submit::handle(&state.store, &state.notifier, command).await?;

    tracing::info!(record_id = %id, "survey response recorded");

    Ok((StatusCode::OK, state.ack_message.clone()).into_response())
}

/// Export every stored response as a single CSV attachment.
#[tracing::instrument(skip(state))]
async fn export_responses(State(state): State<FeatureState>) -> Result<Response, AppError> {
    let csv = export_csv::handle(&state.store).await?;

    tracing::info!(bytes = csv.len(), "responses exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"responses.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
