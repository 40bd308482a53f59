//! HTTP surface of the proxy.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{QueryError, UpstreamError};
use crate::facade::QueryFacade;

pub use routes::create_router;

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// A [`QueryError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub QueryError);

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            QueryError::StopNotFound(_) => StatusCode::NOT_FOUND,
            QueryError::Upstream(UpstreamError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            QueryError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            QueryError::StopNotFound(_) => ErrorBody {
                error: "stop not found".into(),
                detail: Some(self.0.to_string()),
            },
            QueryError::Upstream(e) => ErrorBody {
                error: "upstream unavailable".into(),
                detail: Some(e.to_string()),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Binds `addr` and serves until ctrl-c.
pub async fn serve(addr: SocketAddr, facade: Arc<QueryFacade>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, create_router(facade))
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
}

/// Resolves once `signal` fires. If the signal cannot be listened for, never
/// resolves, so the server keeps running until killed.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            error!(error = %e, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_forever_without_signal_handler() {
        let failed = async { Err(std::io::Error::other("no signal handler")) };
        let waited = tokio::time::timeout(Duration::from_secs(3600), shutdown_on(failed)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_resolves_on_signal() {
        shutdown_on(async { Ok(()) }).await;
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(QueryError::StopNotFound("1".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(UpstreamError::Timeout.into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError(UpstreamError::Status { status: 500, body: String::new() }.into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(UpstreamError::MalformedPayload("x".into()).into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
