/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured URL could not be parsed. No attempt was made.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// A default header could not be built from the configured token.
    /// No attempt was made.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The request could not be built from the configuration. No retry was
    /// attempted.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] reqwest::Error),
    /// Every attempt up to the last one failed before a response arrived.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        /// Number of attempts performed.
        attempts: u32,
        /// Error reported by the last attempt.
        #[source]
        source: reqwest::Error,
    },
    /// The cancellation token fired before the loop finished.
    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
    /// A response carried a status other than the one the caller expected.
    ///
    /// Built with [`crate::status_mismatch`] or
    /// [`crate::Response::expect_status`]; the retry loop never returns it.
    #[error("expected {expected},\nactual: {actual},\nURL: {url},\nresponse: {body}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        url: String,
        body: String,
    },
    /// Request payload serialization error.
    #[error("encode error: {0}")]
    Encode(String),
    /// Response body decoding error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Status code associated with the error, `0` when none was received.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnexpectedStatus { actual, .. } => *actual,
            _ => 0,
        }
    }

    /// Returns `true` for failures raised before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Cancelled { .. })
    }
}
