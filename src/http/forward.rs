//! Request forwarding to the fixed upstream.
//!
//! # Responsibilities
//! - Track every inbound request in the ledger
//! - Rebase the request URI onto the destination, keep method and headers
//! - Stream the inbound body upstream and the upstream body back
//! - Map upstream failures to explicit gateway errors

use axum::{
    body::Body,
    extract::State,
    http::{request::Parts, Request, Uri, Version},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

use crate::http::lifecycle::{CloseReason, RequestPhase, TrackedRequest};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Errors that end a forwarded request before a response is streamed.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The client connection failed while its body was being sent upstream.
    #[error("client stream failed")]
    ClientStream,

    /// The upstream could not be reached or failed before sending headers.
    #[error("upstream request failed: {0}")]
    UpstreamConnect(#[source] hyper_util::client::legacy::Error),

    /// The upstream did not send response headers in time.
    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    /// The request URI could not be rebased onto the destination.
    #[error("invalid upstream uri: {0}")]
    InvalidUpstreamUri(#[from] axum::http::Error),
}

impl ForwardError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::ClientStream => "client_stream",
            ForwardError::UpstreamConnect(_) => "upstream_connect",
            ForwardError::UpstreamTimeout(_) => "upstream_timeout",
            ForwardError::InvalidUpstreamUri(_) => "invalid_uri",
        }
    }
}

/// Catch-all handler: forwards every request to the destination.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let tracked = TrackedRequest::open(&state.ledger, method.as_str(), &path);

    tracing::debug!(
        request_id = %tracked.id(),
        method = %method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match forward(&state, &tracked, parts, body).await {
        Ok(response) => {
            metrics::record_response(method.as_str(), response.status().as_u16());
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, tracked.into_response_body(body))
        }
        Err(e) => {
            let reason = match e {
                ForwardError::ClientStream => CloseReason::ClientAborted,
                _ => CloseReason::UpstreamFailed,
            };
            tracing::error!(
                request_id = %tracked.id(),
                phase = ?tracked.phase(),
                error = %e,
                "Forwarding failed"
            );
            metrics::record_upstream_error(e.kind());
            tracked.close(reason);

            let response = e.into_response();
            metrics::record_response(method.as_str(), response.status().as_u16());
            response
        }
    }
}

/// Send one request upstream and wait for its response headers.
async fn forward(
    state: &AppState,
    tracked: &TrackedRequest,
    parts: Parts,
    body: Body,
) -> Result<Response<Body>, ForwardError> {
    let uri = upstream_uri(&state.destination, &parts.uri)?;

    let mut builder = Request::builder()
        .method(parts.method)
        .uri(uri)
        .version(Version::HTTP_11);
    if let Some(headers) = builder.headers_mut() {
        *headers = parts.headers;
    }

    tracked.advance(RequestPhase::Forwarding);
    let outbound = builder.body(tracked.inbound_body(body))?;

    // The response deadline starts once the inbound body is fully sent.
    let sent = tokio::select! {
        sent = state.client.request(outbound) => sent,
        () = response_deadline(tracked, state.response_timeout) => {
            return Err(ForwardError::UpstreamTimeout(state.response_timeout));
        }
    };
    let response = match sent {
        Ok(response) => response,
        Err(_) if tracked.client_failed() => return Err(ForwardError::ClientStream),
        Err(e) => return Err(ForwardError::UpstreamConnect(e)),
    };

    tracked.advance(RequestPhase::StreamingResponse);
    tracing::debug!(
        request_id = %tracked.id(),
        status = %response.status(),
        "Upstream responded"
    );

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Wait for the request body to go out, then for `limit`.
async fn response_deadline(tracked: &TrackedRequest, limit: Duration) {
    tracked.body_sent().await;
    tokio::time::sleep(limit).await;
}

/// Point `original` at the destination, keeping path and query.
pub fn upstream_uri(destination: &str, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Uri::builder()
        .scheme("http")
        .authority(destination)
        .path_and_query(path_and_query)
        .build()
}
