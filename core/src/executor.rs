//! Executes one request with a bounded duration and a normalized outcome.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::client::parse_response;
use crate::error::ApiError;
use crate::http::{HttpRequest, Payload};
use crate::transport::Transport;

/// Runs requests through a `Transport` under a cancellation timer.
///
/// The timer lives inside the request future: it is released on every exit
/// path, and its expiry drops only that request's in-flight call.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, default_timeout: Duration) -> Self {
        Self {
            transport,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute with the configured default timeout.
    pub async fn execute(&self, request: HttpRequest) -> Result<Payload, ApiError> {
        self.execute_with_timeout(request, self.default_timeout).await
    }

    pub async fn execute_with_timeout(
        &self,
        request: HttpRequest,
        timeout: Duration,
    ) -> Result<Payload, ApiError> {
        let span = tracing::debug_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = request.method.as_str(),
            path = %request.path,
        );
        async move {
            let response = match tokio::time::timeout(timeout, self.transport.send(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    warn!(error = %err, "request failed");
                    return Err(err);
                }
                Err(_) => {
                    warn!(?timeout, "request aborted");
                    return Err(ApiError::Timeout(timeout));
                }
            };
            let status = response.status;
            match parse_response(response) {
                Ok(payload) => {
                    debug!(status, "request succeeded");
                    Ok(payload)
                }
                Err(err) => {
                    warn!(status, error = %err, "request rejected");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}
