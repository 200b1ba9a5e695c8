use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use common::prelude::BucketInfo;

use crate::http_server::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize)]
pub struct ListBucketsResponse {
    pub buckets: Vec<BucketInfo>,
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Result<Response, ApiError> {
    let buckets = state.console().list_buckets().await?;
    Ok((http::StatusCode::OK, Json(ListBucketsResponse { buckets })).into_response())
}
