//! Per-request lifecycle.
//!
//! # State Machine
//! ```text
//! Opened → Forwarding → AwaitingResponse → StreamingResponse → Closed
//!    └──────────┴───────────────┴──────────────────┴──────────→ Closed (on error)
//! ```
//!
//! A `TrackedRequest` owns the ledger entry for one request. Whoever holds
//! it last closes it: the handler on an error path, the response body once
//! the upstream body ends, or `Drop` when the client goes away (or the
//! connection task is aborted at shutdown). Closing is idempotent, so
//! `untrack` runs exactly once per `track`.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use tokio::sync::Notify;

use crate::ledger::{Ledger, Outcome, RequestId};
use crate::observability::metrics;

/// Phase of a forwarded request.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestPhase {
    /// Tracked, nothing sent upstream yet.
    Opened = 0,
    /// Outbound request created, inbound body streaming.
    Forwarding = 1,
    /// Inbound body fully sent, waiting for response headers.
    AwaitingResponse = 2,
    /// Response headers received, copying the body to the client.
    StreamingResponse = 3,
    /// Untracked. Terminal.
    Closed = 4,
}

impl From<u8> for RequestPhase {
    fn from(val: u8) -> Self {
        match val {
            0 => RequestPhase::Opened,
            1 => RequestPhase::Forwarding,
            2 => RequestPhase::AwaitingResponse,
            3 => RequestPhase::StreamingResponse,
            _ => RequestPhase::Closed,
        }
    }
}

/// Why a request was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The full response was delivered.
    Completed,
    /// The client went away, or its request body failed.
    ClientAborted,
    /// The upstream could not be reached or failed mid-response.
    UpstreamFailed,
}

impl CloseReason {
    fn outcome(self) -> Outcome {
        match self {
            CloseReason::Completed => Outcome::Succeeded,
            CloseReason::ClientAborted | CloseReason::UpstreamFailed => Outcome::Failed,
        }
    }
}

#[derive(Debug)]
struct RequestState {
    id: RequestId,
    ledger: Ledger,
    phase: AtomicU8,
    client_failed: AtomicBool,
    /// Woken once the inbound body has been handed upstream in full.
    body_sent: Notify,
}

impl RequestState {
    fn phase(&self) -> RequestPhase {
        RequestPhase::from(self.phase.load(Ordering::Acquire))
    }

    /// Move forward to `to`. Never moves backwards and never leaves `Closed`.
    fn advance(&self, to: RequestPhase) -> bool {
        if to == RequestPhase::Closed {
            return false;
        }
        let advanced = self
            .phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < to as u8).then_some(to as u8)
            })
            .is_ok();
        if advanced && to >= RequestPhase::AwaitingResponse {
            self.body_sent.notify_one();
        }
        advanced
    }

    fn close(&self, reason: CloseReason) -> bool {
        let previous = RequestPhase::from(self.phase.swap(RequestPhase::Closed as u8, Ordering::AcqRel));
        if previous == RequestPhase::Closed {
            return false;
        }
        self.body_sent.notify_one();

        tracing::debug!(request_id = %self.id, phase = ?previous, reason = ?reason, "Request closed");
        if let Ok(done) = self.ledger.untrack_with(self.id, reason.outcome()) {
            metrics::record_completion(reason, done.duration);
        }
        metrics::request_closed();
        true
    }
}

/// Owning handle for one tracked request.
#[derive(Debug)]
pub struct TrackedRequest {
    state: Arc<RequestState>,
}

impl TrackedRequest {
    /// Track a new request in `ledger`. Starts in `Opened`.
    pub fn open(ledger: &Ledger, method: &str, path: &str) -> Self {
        let id = ledger.track(method, path);
        metrics::request_opened();
        Self {
            state: Arc::new(RequestState {
                id,
                ledger: ledger.clone(),
                phase: AtomicU8::new(RequestPhase::Opened as u8),
                client_failed: AtomicBool::new(false),
                body_sent: Notify::new(),
            }),
        }
    }

    pub fn id(&self) -> RequestId {
        self.state.id
    }

    pub fn phase(&self) -> RequestPhase {
        self.state.phase()
    }

    /// Advance to a later phase. Returns false if already there or closed.
    pub fn advance(&self, to: RequestPhase) -> bool {
        self.state.advance(to)
    }

    /// Close the request. Returns false if it was already closed.
    pub fn close(&self, reason: CloseReason) -> bool {
        self.state.close(reason)
    }

    /// Whether the inbound body errored while being forwarded.
    pub fn client_failed(&self) -> bool {
        self.state.client_failed.load(Ordering::Acquire)
    }

    /// Resolve once the request has reached `AwaitingResponse` (or closed).
    pub async fn body_sent(&self) {
        let notified = self.state.body_sent.notified();
        if self.phase() >= RequestPhase::AwaitingResponse {
            return;
        }
        notified.await;
    }

    /// Wrap the inbound body so its end moves the request to `AwaitingResponse`.
    pub fn inbound_body(&self, body: Body) -> Body {
        if body.is_end_stream() {
            self.advance(RequestPhase::AwaitingResponse);
            return body;
        }
        Body::new(InboundBody {
            inner: body,
            state: Arc::clone(&self.state),
        })
    }

    /// Hand the request over to the response body. The request closes when
    /// that body ends, fails, or is dropped.
    pub fn into_response_body(self, body: Body) -> Body {
        self.advance(RequestPhase::StreamingResponse);
        if body.is_end_stream() {
            self.close(CloseReason::Completed);
            return body;
        }
        Body::new(TrackedBody {
            inner: body,
            request: self,
        })
    }
}

impl Drop for TrackedRequest {
    fn drop(&mut self) {
        self.state.close(CloseReason::ClientAborted);
    }
}

/// Inbound request body on its way upstream.
struct InboundBody {
    inner: Body,
    state: Arc<RequestState>,
}

impl HttpBody for InboundBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => {
                self.state.advance(RequestPhase::AwaitingResponse);
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::debug!(request_id = %self.state.id, error = %e, "Client body failed");
                self.state.client_failed.store(true, Ordering::Release);
                self.state.close(CloseReason::ClientAborted);
            }
            Poll::Ready(Some(Ok(_))) if self.inner.is_end_stream() => {
                self.state.advance(RequestPhase::AwaitingResponse);
            }
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Upstream response body on its way to the client.
struct TrackedBody {
    inner: Body,
    request: TrackedRequest,
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => {
                self.request.close(CloseReason::Completed);
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(request_id = %self.request.id(), error = %e, "Upstream body failed");
                self.request.close(CloseReason::UpstreamFailed);
            }
            // The server may stop polling once the body reports its end.
            Poll::Ready(Some(Ok(_))) if self.inner.is_end_stream() => {
                self.request.close(CloseReason::Completed);
            }
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
