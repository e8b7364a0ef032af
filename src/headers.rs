use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

/// `Accept` values added when the caller sets none, in order.
pub const DEFAULT_ACCEPT: [&str; 3] = ["application/vnd.api+json", "application/json", "*/*"];

/// `Content-Type` added when the caller sets none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Merges the default headers into `headers` without touching caller values.
///
/// `Authorization` becomes `Bearer <token>`, including the bare `Bearer `
/// produced by an empty token. Fails only when the token cannot be carried
/// in a header value.
pub(crate) fn apply_defaults(headers: &mut HeaderMap, token: &str) -> Result<(), String> {
    if is_unset(headers, &ACCEPT) {
        headers.remove(ACCEPT);
        for value in DEFAULT_ACCEPT {
            headers.append(ACCEPT, HeaderValue::from_static(value));
        }
    }
    if is_unset(headers, &CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    }
    if is_unset(headers, &AUTHORIZATION) {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| format!("bearer token is not a valid Authorization value: {err}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(())
}

// A header present with an empty first value counts as absent.
fn is_unset(headers: &HeaderMap, name: &HeaderName) -> bool {
    headers
        .get(name)
        .map_or(true, |value| value.as_bytes().is_empty())
}

/// Renders headers for debug output with credentials masked.
pub(crate) fn redacted(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if *name == AUTHORIZATION || value.is_sensitive() {
                "<redacted>".to_owned()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_owned(), shown)
        })
        .collect()
}
