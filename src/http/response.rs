//! Error responses.
//!
//! # Responsibilities
//! - Map forwarding errors to appropriate HTTP status codes
//!
//! # Design Decisions
//! - Unreachable upstreams answer 502 Bad Gateway, never a default 200
//! - Upstream timeouts result in 504 Gateway Timeout
//! - Successful upstream responses are passed through untouched (see forward.rs)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::http::forward::ForwardError;

impl ForwardError {
    /// Status code reported to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            // Nobody is listening, but the handler must still return something.
            ForwardError::ClientStream => StatusCode::BAD_REQUEST,
            ForwardError::UpstreamConnect(_) | ForwardError::InvalidUpstreamUri(_) => StatusCode::BAD_GATEWAY,
            ForwardError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::GATEWAY_TIMEOUT => "Upstream timed out",
            StatusCode::BAD_REQUEST => "Client request failed",
            _ => "Upstream request failed",
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_is_gateway_timeout() {
        let response = ForwardError::UpstreamTimeout(Duration::from_secs(1)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn client_stream_is_not_a_gateway_error() {
        assert_eq!(ForwardError::ClientStream.status(), StatusCode::BAD_REQUEST);
    }
}
