use askama::Template;
use askama_axum::IntoResponse;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use common::prelude::ConsoleError;

/// Status code a console failure is reported with.
pub fn status_for(err: &ConsoleError) -> StatusCode {
    match err {
        ConsoleError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ConsoleError::NotFound { .. } => StatusCode::NOT_FOUND,
        ConsoleError::StoreUnavailable { .. } => StatusCode::BAD_GATEWAY,
        ConsoleError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn log_failure(err: &ConsoleError) {
    match err {
        ConsoleError::StoreUnavailable { .. } => tracing::warn!("{}", err),
        ConsoleError::Cancelled { .. } => tracing::debug!("{}", err),
        _ => tracing::debug!("request rejected: {}", err),
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    reason: String,
    message: String,
}

/// Failure of an HTML page handler, rendered as an error page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl PageError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PageError::Console(err) => status_for(err),
            PageError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<MultipartError> for PageError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let PageError::Console(err) = &self {
            log_failure(err);
        }

        let status = self.status();
        let template = ErrorTemplate {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.to_string(),
        };
        (status, template).into_response()
    }
}

/// Failure of a JSON API handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Console(err) => {
                log_failure(&err);
                let msg = serde_json::json!({"msg": err.to_string()});
                (status_for(&err), Json(msg)).into_response()
            }
        }
    }
}
