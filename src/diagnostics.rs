//! Debug-level dumps of outgoing requests and incoming responses.
//!
//! Both run inside the per-attempt span, so every line carries that
//! attempt's `request_id`.

use reqwest::{header::HeaderMap, StatusCode};
use tracing::Level;

use crate::headers::redacted;

pub(crate) fn debug_request(request: &reqwest::Request) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    let body = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    tracing::debug!(
        method = %request.method(),
        url = %request.url(),
        headers = ?redacted(request.headers()),
        body = %body,
        "outgoing request"
    );
}

pub(crate) fn debug_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    tracing::debug!(
        status = status.as_u16(),
        headers = ?redacted(headers),
        body = %String::from_utf8_lossy(body),
        "incoming response"
    );
}
