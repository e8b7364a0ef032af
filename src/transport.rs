//! Process-wide HTTP transport.
//!
//! A single pooled [`reqwest::Client`] is shared by every
//! [`RetryableRequest`](crate::RetryableRequest) that was not given its own,
//! so connections and file handles are reused under high request volume.

use std::sync::OnceLock;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Returns the shared client, creating it on first use.
///
/// Lives for the rest of the process; there is no teardown.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        tracing::debug!("initializing shared http transport");
        reqwest::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::shared_client;

    #[test]
    fn repeated_calls_return_the_same_instance() {
        let first = shared_client() as *const reqwest::Client;
        let second = shared_client() as *const reqwest::Client;
        assert_eq!(first, second);
    }

    #[test]
    fn shared_across_threads() {
        let here = shared_client() as *const reqwest::Client as usize;
        let there = std::thread::spawn(|| shared_client() as *const reqwest::Client as usize)
            .join()
            .expect("thread must not panic");
        assert_eq!(here, there);
    }
}
