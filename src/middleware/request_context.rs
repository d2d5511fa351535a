use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::{HeaderMap, HeaderName, HeaderValue, request::Parts};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::ErrorDetail;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PIPELINE: &str = "expense_api";

/// Per-request logging context, passed explicitly down to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub pipeline: &'static str,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            pipeline: PIPELINE,
        }
    }

    /// Reuse an inbound `x-request-id`, or mint a UUIDv4.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let inbound = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128);
        match inbound {
            Some(id) => Self::new(id),
            None => Self::new(Uuid::new_v4().to_string()),
        }
    }

    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.request_id).ok()
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Outside the layer (e.g. a bare handler in a test) fall back to the headers.
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| Self::from_headers(&parts.headers)))
    }
}

/// Layer body for `axum::middleware::from_fn`: builds the context once,
/// echoes `x-request-id` on every response including rejections, and logs
/// failed requests with the context attached.
pub async fn track_request(mut req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_headers(req.headers());
    req.extensions_mut().insert(ctx.clone());
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let mut resp = next.run(req).await;

    if let Some(value) = ctx.header_value() {
        resp.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    let status = resp.status();
    let detail = resp
        .extensions()
        .get::<ErrorDetail>()
        .map(|d| d.0.as_str())
        .unwrap_or("-");
    if status.is_server_error() {
        error!(
            request_id = %ctx.request_id,
            pipeline = ctx.pipeline,
            %method,
            path = %path,
            status = status.as_u16(),
            error = detail,
            "request failed"
        );
    } else if status.is_client_error() {
        warn!(
            request_id = %ctx.request_id,
            pipeline = ctx.pipeline,
            %method,
            path = %path,
            status = status.as_u16(),
            error = detail,
            "request rejected"
        );
    }
    resp
}
