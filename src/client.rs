use std::{fmt, sync::Arc};

use reqwest::{header::HeaderMap, Method, Url};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    diagnostics::{debug_request, debug_response},
    headers::apply_defaults,
    transport::shared_client,
    Error, Response, Result, RetryOptions,
};

/// Decides whether a delivered response should trigger another attempt.
///
/// Receives the response and the 1-based attempt number.
pub type RetryPredicate = Arc<dyn Fn(&Response, u32) -> bool + Send + Sync>;

#[derive(Clone)]
/// HTTP request against one endpoint, retried on transport failure or while
/// the retry predicate holds.
///
/// Attempts run one after the other with a fixed wait in between. A
/// delivered response is returned as `Ok` whatever its status, unless the
/// predicate asks for another attempt.
pub struct RetryableRequest {
    http: reqwest::Client,
    url: String,
    token: String,
    headers: HeaderMap,
    header_error: Option<String>,
    options: RetryOptions,
    retry_if: Option<RetryPredicate>,
}

impl fmt::Debug for RetryableRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryableRequest")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("headers", &crate::headers::redacted(&self.headers))
            .field("options", &self.options)
            .field("retry_if", &self.retry_if.is_some())
            .finish()
    }
}

enum AttemptFailure {
    Transport(reqwest::Error),
    // The request could not be built; retrying cannot change that.
    Invalid(reqwest::Error),
    Cancelled,
}

impl AttemptFailure {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Invalid(err)
        } else {
            Self::Transport(err)
        }
    }
}

impl RetryableRequest {
    /// Creates a request for `url` authenticated with a bearer `token`.
    ///
    /// Default headers are applied (`Accept`, `Content-Type`,
    /// `Authorization: Bearer <token>`). Nothing is validated here; a bad URL
    /// or token is reported by the first request method call.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut request = Self {
            http: shared_client().clone(),
            url: url.into(),
            token: token.into(),
            headers: HeaderMap::new(),
            header_error: None,
            options: RetryOptions::default(),
            retry_if: None,
        };
        request.merge_headers(HeaderMap::new());
        request
    }

    /// Creates a request from environment variables.
    ///
    /// Reads:
    /// - `HTTPRETRY_URL`: target URL (required)
    /// - `HTTPRETRY_TOKEN`: bearer token (optional, empty when unset)
    /// - the retry variables listed on [`RetryOptions::from_env`]
    ///
    /// # Example
    ///
    /// ```no_run
    /// use httpretry::RetryableRequest;
    ///
    /// let request = RetryableRequest::from_env().expect("missing HTTPRETRY_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let url = std::env::var("HTTPRETRY_URL")
            .map_err(|_| "missing HTTPRETRY_URL environment variable".to_owned())?;
        if url.trim().is_empty() {
            return Err("HTTPRETRY_URL is set but empty".to_owned());
        }
        let token = std::env::var("HTTPRETRY_TOKEN").unwrap_or_default();
        let options = RetryOptions::from_env()?;
        Ok(Self::new(url, token).with_options(options))
    }

    /// Uses `headers` as the caller headers. Defaults fill in only what is
    /// missing.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.merge_headers(headers);
        self
    }

    /// Applies retry and timeout options. Zero values fall back to defaults.
    pub fn with_options(mut self, options: RetryOptions) -> Self {
        self.options = options.normalized();
        self
    }

    /// Sets the retry predicate.
    ///
    /// Keep it narrow: a blanket `status != 201` retries every unexpected
    /// answer, including authentication failures that will never succeed.
    pub fn with_retry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response, u32) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    /// Sends through `client` instead of the shared transport.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub async fn get(&self, cancel: &CancellationToken) -> Result<Response> {
        self.send(Method::GET, None, cancel).await
    }

    pub async fn post(
        &self,
        cancel: &CancellationToken,
        body: impl AsRef<[u8]>,
    ) -> Result<Response> {
        self.send(Method::POST, Some(body.as_ref()), cancel).await
    }

    pub async fn put(
        &self,
        cancel: &CancellationToken,
        body: impl AsRef<[u8]>,
    ) -> Result<Response> {
        self.send(Method::PUT, Some(body.as_ref()), cancel).await
    }

    pub async fn patch(
        &self,
        cancel: &CancellationToken,
        body: impl AsRef<[u8]>,
    ) -> Result<Response> {
        self.send(Method::PATCH, Some(body.as_ref()), cancel).await
    }

    pub async fn delete(&self, cancel: &CancellationToken) -> Result<Response> {
        self.send(Method::DELETE, None, cancel).await
    }

    /// Serializes `value` as JSON and posts it.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        value: &T,
    ) -> Result<Response> {
        let body = encode_json(value)?;
        self.send(Method::POST, Some(body.as_slice()), cancel).await
    }

    /// Serializes `value` as JSON and puts it.
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        value: &T,
    ) -> Result<Response> {
        let body = encode_json(value)?;
        self.send(Method::PUT, Some(body.as_slice()), cancel).await
    }

    /// Serializes `value` as JSON and patches it.
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        value: &T,
    ) -> Result<Response> {
        let body = encode_json(value)?;
        self.send(Method::PATCH, Some(body.as_slice()), cancel).await
    }

    /// Runs the attempt loop for an arbitrary method.
    ///
    /// The body, if any, is resent unchanged on every attempt. On exhaustion
    /// the last outcome is returned: the last transport error, or the last
    /// response with [`Response::retry_exhausted`] set.
    pub async fn send(
        &self,
        method: Method,
        body: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let url = self.parse_url()?;
        if let Some(reason) = &self.header_error {
            return Err(Error::InvalidHeader(reason.clone()));
        }

        let max_retries = self.options.max_retries.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let request_id = Uuid::new_v4();
            let span = tracing::debug_span!(
                "http_attempt",
                %request_id,
                attempt,
                method = %method
            );
            let outcome = self
                .attempt(&method, &url, body, cancel)
                .instrument(span)
                .await;

            match outcome {
                Ok(mut response) => {
                    response.attempts = attempt;
                    if !self.should_retry(&response, attempt) {
                        return Ok(response);
                    }
                    if attempt >= max_retries {
                        tracing::info!(
                            %request_id,
                            attempt,
                            status = response.status_code(),
                            "retries exhausted for {method} {url}, returning last response"
                        );
                        response.retry_exhausted = true;
                        return Ok(response);
                    }
                    tracing::info!(
                        %request_id,
                        attempt,
                        status = response.status_code(),
                        "retry predicate returned true for {method} {url}"
                    );
                }
                Err(AttemptFailure::Cancelled) => {
                    return Err(Error::Cancelled { attempts: attempt });
                }
                Err(AttemptFailure::Invalid(err)) => {
                    return Err(Error::InvalidRequest(err));
                }
                Err(AttemptFailure::Transport(err)) => {
                    tracing::warn!(
                        %request_id,
                        attempt,
                        error = %err,
                        "request {method} {url} failed"
                    );
                    if attempt >= max_retries {
                        return Err(Error::Transport {
                            attempts: attempt,
                            source: err,
                        });
                    }
                }
            }

            if !self.wait_before_retry(cancel).await {
                return Err(Error::Cancelled { attempts: attempt });
            }
        }
    }

    /// One request/response exchange with the body fully buffered.
    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Response, AttemptFailure> {
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .headers(self.headers.clone());
        if let Some(timeout) = self.options.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }
        let request = builder.build().map_err(AttemptFailure::from_reqwest)?;
        debug_request(&request);

        let exchange = async {
            let response = self.http.execute(request).await?;
            let status = response.status();
            let headers = response.headers().clone();
            let url = response.url().clone();
            let body = response.bytes().await?.to_vec();
            debug_response(status, &headers, &body);
            Ok::<_, reqwest::Error>(Response {
                status,
                headers,
                url,
                body,
                attempts: 0,
                retry_exhausted: false,
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AttemptFailure::Cancelled),
            result = exchange => result.map_err(AttemptFailure::from_reqwest),
        }
    }

    fn should_retry(&self, response: &Response, attempt: u32) -> bool {
        self.retry_if
            .as_ref()
            .is_some_and(|predicate| predicate(response, attempt))
    }

    /// Waits the fixed retry interval.
    ///
    /// Returns `false` when `cancel` fired during the wait.
    async fn wait_before_retry(&self, cancel: &CancellationToken) -> bool {
        let wait = self.options.retry_wait();
        tracing::debug!("retrying request after {} ms", wait.as_millis());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }

    fn parse_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url).map_err(|err| Error::InvalidUrl {
            url: self.url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    fn merge_headers(&mut self, mut headers: HeaderMap) {
        self.header_error = apply_defaults(&mut headers, &self.token).err();
        self.headers = headers;
    }
}

fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|err| Error::Encode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use tokio_util::sync::CancellationToken;

    use super::{AttemptFailure, RetryableRequest};
    use crate::{Error, RetryOptions};

    #[test]
    fn new_applies_default_headers() {
        let request = RetryableRequest::new("https://api.test/items", "abc");
        let accept: Vec<_> = request.headers().get_all(ACCEPT).iter().collect();
        assert_eq!(
            accept,
            vec!["application/vnd.api+json", "application/json", "*/*"]
        );
        assert_eq!(
            request.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/vnd.api+json"))
        );
        assert_eq!(
            request.headers().get(AUTHORIZATION),
            Some(&HeaderValue::from_static("Bearer abc"))
        );
    }

    #[test]
    fn with_headers_keeps_caller_values_and_fills_the_rest() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let request = RetryableRequest::new("https://api.test", "").with_headers(headers);

        assert_eq!(
            request.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/plain"))
        );
        assert_eq!(request.headers().get_all(ACCEPT).iter().count(), 3);
        assert_eq!(
            request.headers().get(AUTHORIZATION),
            Some(&HeaderValue::from_static("Bearer "))
        );
    }

    #[test]
    fn with_options_normalizes_zero_values() {
        let request = RetryableRequest::new("https://api.test", "t").with_options(RetryOptions {
            max_retries: 0,
            retry_wait_ms: 0,
            timeout_ms: None,
        });
        assert_eq!(request.options(), &RetryOptions::default());
    }

    #[test]
    fn debug_redacts_token() {
        let request = RetryableRequest::new("https://api.test", "secret-token");
        let debug = format!("{request:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn invalid_url_fails_without_attempt() {
        let request = RetryableRequest::new("not a url", "t");
        let err = request
            .get(&CancellationToken::new())
            .await
            .expect_err("url must be rejected");
        assert!(matches!(err, Error::InvalidUrl { ref url, .. } if url == "not a url"));
        assert_eq!(err.status_code(), 0);
    }

    #[tokio::test]
    async fn unsupported_scheme_fails_without_retry() {
        let request = RetryableRequest::new("ftp://example.invalid/x", "t").with_options(
            RetryOptions {
                max_retries: 3,
                retry_wait_ms: 10_000,
                timeout_ms: None,
            },
        );
        let started = std::time::Instant::now();
        let err = request
            .get(&CancellationToken::new())
            .await
            .expect_err("ftp scheme must be rejected");

        assert!(matches!(err, Error::InvalidUrl { ref reason, .. } if reason.contains("ftp")));
        assert!(!err.is_transport());
        assert_eq!(err.status_code(), 0);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn builder_errors_are_not_retryable() {
        let err = reqwest::Client::new()
            .get("http://[::1")
            .build()
            .expect_err("malformed url must fail to build");
        assert!(err.is_builder());
        assert!(matches!(
            AttemptFailure::from_reqwest(err),
            AttemptFailure::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn invalid_token_fails_without_attempt() {
        let request = RetryableRequest::new("https://api.test", "line\nbreak");
        let err = request
            .delete(&CancellationToken::new())
            .await
            .expect_err("token must be rejected");
        assert!(matches!(err, Error::InvalidHeader(_)));
    }
}
