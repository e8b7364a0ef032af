use httpretry::{CancellationToken, RetryOptions, RetryableRequest};
use reqwest::StatusCode;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let url = std::env::var("HTTPRETRY_URL")?;
    let token = std::env::var("HTTPRETRY_TOKEN").unwrap_or_default();

    // Only rate limiting and gateway hiccups are worth another attempt.
    let request = RetryableRequest::new(url, token)
        .with_options(RetryOptions {
            max_retries: 6,
            retry_wait_ms: 500,
            timeout_ms: Some(5_000),
        })
        .with_retry_predicate(|resp, _| {
            matches!(
                resp.status(),
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
            )
        });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let payload = json!({"data": {"type": "jobs", "attributes": {"name": "nightly"}}});
    let response = request.post_json(&cancel, &payload).await?;
    if response.retry_exhausted() {
        eprintln!("server still busy after {} attempt(s)", response.attempts());
    }
    let response = response.expect_status(StatusCode::CREATED)?;
    println!("{}", response.text());

    Ok(())
}
