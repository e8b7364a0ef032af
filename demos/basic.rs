use httpretry::{CancellationToken, RetryableRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let request = RetryableRequest::from_env().map_err(anyhow::Error::msg)?;
    let cancel = CancellationToken::new();

    let response = request.get(&cancel).await?;
    println!("{} after {} attempt(s)", response.status(), response.attempts());
    println!("{}", response.text());

    Ok(())
}
