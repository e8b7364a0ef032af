use reqwest::{header::HeaderMap, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Fully buffered response of one attempt.
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) url: Url,
    pub(crate) body: Vec<u8>,
    pub(crate) attempts: u32,
    pub(crate) retry_exhausted: bool,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL of the response, after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            Error::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                self.text()
            ))
        })
    }

    /// Number of attempts the call took, this one included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns `true` when the retry predicate still asked for another
    /// attempt on the final one.
    ///
    /// Such a response is still returned as `Ok`; the status code tells the
    /// caller whether it is usable.
    pub fn retry_exhausted(&self) -> bool {
        self.retry_exhausted
    }

    /// Passes the response through when its status matches `expected`,
    /// otherwise converts it into [`Error::UnexpectedStatus`].
    pub fn expect_status(self, expected: StatusCode) -> Result<Self> {
        if self.status == expected {
            return Ok(self);
        }
        Err(status_mismatch(
            expected.as_u16(),
            self.status.as_u16(),
            self.url.as_str(),
            &self.body,
        ))
    }
}

/// Builds the diagnostic error for a response whose status differs from the
/// expected one.
///
/// The rendered message combines all four inputs:
///
/// ```
/// let err = httpretry::status_mismatch(201, 409, "https://api.test/items", b"conflict");
/// assert_eq!(
///     err.to_string(),
///     "expected 201,\nactual: 409,\nURL: https://api.test/items,\nresponse: conflict"
/// );
/// ```
pub fn status_mismatch(expected: u16, actual: u16, url: &str, body: &[u8]) -> Error {
    Error::UnexpectedStatus {
        expected,
        actual,
        url: url.to_owned(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
