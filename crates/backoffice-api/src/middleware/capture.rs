//! Request capture middleware
//!
//! Builds one [`LogRecord`] per request and hands it to the log channel.
//! Request bodies are read up to the capture limit and then re-assembled for
//! the handler. The response body is teed as it streams out, and the record is
//! submitted when that stream ends or is dropped, so latency covers the whole
//! exchange.

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use backoffice_access_log::{
    capture::effective_limit, capture_body, BodyCapture, LogRecord, LogSender,
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{
    stream::{self, BoxStream},
    Stream, StreamExt,
};
use std::{
    any::Any,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tracing::{debug, error, info};

use crate::response::{ApiError, HandlerErrors};

/// State shared by every instance of the capture middleware
pub struct CaptureState {
    pub sender: LogSender,
    /// Per-body capture limit; 0 falls back to the default
    pub max_body_bytes: usize,
    /// Requests whose path contains any of these are not captured
    pub skip_paths: Vec<String>,
}

impl CaptureState {
    pub fn new(sender: LogSender, max_body_bytes: usize, skip_paths: Vec<String>) -> Self {
        Self {
            sender,
            max_body_bytes,
            skip_paths,
        }
    }

    fn skips(&self, request: &Request) -> bool {
        if request.method() == Method::OPTIONS {
            return true;
        }
        let path = request.uri().path();
        self.skip_paths
            .iter()
            .any(|skip| !skip.is_empty() && path.contains(skip.as_str()))
    }
}

/// Capture middleware
pub async fn capture_requests(
    State(state): State<Arc<CaptureState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.skips(&request) {
        return next.run(request).await;
    }

    let started = Instant::now();
    let limit = effective_limit(state.max_body_bytes);

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let handler = match request.extensions().get::<MatchedPath>() {
        Some(matched) => format!("{} {}", method, matched.as_str()),
        None => path.clone(),
    };
    let ip = client_ip(request.headers(), request.extensions().get::<ConnectInfo<SocketAddr>>());
    let user_agent = header_string(request.headers(), header::USER_AGENT.as_str());
    let content_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(-1);

    let (parts, body) = request.into_parts();
    let (request_capture, body) = if parts.method == Method::GET {
        (BodyCapture::empty(), body)
    } else {
        read_prefix(body, limit).await
    };

    let response = next.run(Request::from_parts(parts, body)).await;

    let (mut parts, body) = response.into_parts();
    let errors = parts
        .extensions
        .remove::<HandlerErrors>()
        .map(|reported| reported.0.join("\n"))
        .unwrap_or_default();

    let pending = PendingRecord {
        sender: state.sender.clone(),
        started,
        method,
        path,
        query,
        ip,
        user_agent,
        status: parts.status.as_u16(),
        handler,
        request: request_capture,
        errors,
        content_length,
    };

    let tee = ResponseTee {
        inner: body.into_data_stream().boxed(),
        held: BytesMut::new(),
        limit,
        pending: Some(pending),
    };

    Response::from_parts(parts, Body::from_stream(tee))
}

/// Turn a handler panic into a 500 envelope the capture layer can still record.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!("Handler panicked: {}", detail);

    let mut response = ApiError::Internal("internal server error".to_string()).into_response();
    response
        .extensions_mut()
        .insert(HandlerErrors(vec![format!("panic: {}", detail)]));
    response
}

fn header_string(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').map(str::trim).find(|ip| !ip.is_empty()));
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = header_string(headers, "x-real-ip");
    if !real_ip.trim().is_empty() {
        return real_ip.trim().to_string();
    }

    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

/// Read frames until more than `limit` bytes are held or the body ends, then
/// hand back the capture plus a body that replays everything for the handler.
async fn read_prefix(body: Body, limit: usize) -> (BodyCapture, Body) {
    let mut frames = body.into_data_stream();
    let mut held: Vec<Bytes> = Vec::new();
    let mut size = 0;
    let mut failure = None;
    let mut ended = false;

    while size <= limit {
        match frames.next().await {
            Some(Ok(chunk)) => {
                size += chunk.len();
                held.push(chunk);
            }
            Some(Err(e)) => {
                debug!("Request body read failed: {}", e);
                failure = Some(e);
                break;
            }
            None => {
                ended = true;
                break;
            }
        }
    }

    let mut prefix = BytesMut::with_capacity(size);
    for chunk in &held {
        prefix.extend_from_slice(chunk);
    }
    let prefix = prefix.freeze();
    let capture = capture_body(&prefix, limit, !ended);

    if ended {
        return (capture, Body::from(prefix));
    }

    let replay = stream::iter(
        held.into_iter()
            .map(Ok)
            .chain(failure.into_iter().map(Err)),
    );
    (capture, Body::from_stream(replay.chain(frames)))
}

/// Everything about the exchange except the response body
struct PendingRecord {
    sender: LogSender,
    started: Instant,
    method: String,
    path: String,
    query: String,
    ip: String,
    user_agent: String,
    status: u16,
    handler: String,
    request: BodyCapture,
    errors: String,
    content_length: i64,
}

impl PendingRecord {
    fn submit(self, response: BodyCapture) {
        let latency = self.started.elapsed();
        let now = Utc::now();

        info!(
            target: "http_request",
            method = %self.method,
            path = %self.path,
            status = self.status,
            latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            ip = %self.ip,
            "request completed"
        );

        let record = LogRecord {
            timestamp: now,
            method: self.method,
            path: self.path,
            query: self.query,
            ip: self.ip,
            user_agent: self.user_agent,
            status: self.status,
            latency,
            handler: self.handler,
            truncated: self.request.truncated || response.truncated,
            request: self.request.body,
            response: response.body,
            errors: self.errors,
            content_length: self.content_length,
            created_at: now,
        };

        self.sender.enqueue(record);
    }
}

/// Response body wrapper that keeps at most `limit + 1` bytes of what it forwards
struct ResponseTee {
    inner: BoxStream<'static, Result<Bytes, axum::Error>>,
    held: BytesMut,
    limit: usize,
    pending: Option<PendingRecord>,
}

impl ResponseTee {
    fn observe(&mut self, chunk: &Bytes) {
        // One byte past the limit is enough to know the body was cut
        let room = (self.limit + 1).saturating_sub(self.held.len());
        if room > 0 {
            self.held
                .extend_from_slice(&chunk[..chunk.len().min(room)]);
        }
    }

    fn finish(&mut self) {
        if let Some(pending) = self.pending.take() {
            let response = capture_body(&self.held, self.limit, false);
            pending.submit(response);
        }
    }
}

impl Stream for ResponseTee {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.observe(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for ResponseTee {
    fn drop(&mut self) {
        self.finish();
    }
}
