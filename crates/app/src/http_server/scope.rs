use std::convert::Infallible;
use std::time::Duration;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::Config;

/// Cancellation scope of a single request.
///
/// The token fires when the request's deadline passes or when the handler
/// future is dropped, e.g. because the client disconnected.
pub struct RequestScope {
    token: CancellationToken,
    _guard: DropGuard,
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl RequestScope {
    pub fn new(timeout: Option<Duration>) -> Self {
        let token = CancellationToken::new();

        if let Some(timeout) = timeout {
            let deadline = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = deadline.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        tracing::debug!(?timeout, "request deadline passed");
                        deadline.cancel();
                    }
                }
            });
        }

        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let timeout = parts
            .extensions
            .get::<Config>()
            .map(|config| config.request_timeout);
        Ok(Self::new(timeout))
    }
}
