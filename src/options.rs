use std::time::Duration;

/// Default number of attempts per call.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default fixed wait between attempts, in milliseconds.
pub const DEFAULT_RETRY_WAIT_MS: u64 = 1_000;

/// Configures retry and timeout behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of attempts per call, the first one included.
    /// `0` falls back to [`DEFAULT_MAX_RETRIES`].
    pub max_retries: u32,
    /// Fixed wait between attempts in milliseconds.
    /// `0` falls back to [`DEFAULT_RETRY_WAIT_MS`].
    pub retry_wait_ms: u64,
    /// Optional per-attempt timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_wait_ms: DEFAULT_RETRY_WAIT_MS,
            timeout_ms: None,
        }
    }
}

impl RetryOptions {
    /// Reads options from environment variables.
    ///
    /// Reads (all optional):
    /// - `HTTPRETRY_MAX_RETRIES`
    /// - `HTTPRETRY_WAIT_MS`
    /// - `HTTPRETRY_TIMEOUT_MS`
    ///
    /// Unset variables keep their defaults; unparsable values are an error.
    pub fn from_env() -> std::result::Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            max_retries: env_number("HTTPRETRY_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            retry_wait_ms: env_number("HTTPRETRY_WAIT_MS")?.unwrap_or(defaults.retry_wait_ms),
            timeout_ms: env_number("HTTPRETRY_TIMEOUT_MS")?,
        })
    }

    /// Replaces zero values with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.max_retries == 0 {
            self.max_retries = DEFAULT_MAX_RETRIES;
        }
        if self.retry_wait_ms == 0 {
            self.retry_wait_ms = DEFAULT_RETRY_WAIT_MS;
        }
        self
    }

    pub(crate) fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> std::result::Result<Option<T>, String> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} must be a non-negative integer, got '{raw}'")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryOptions, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT_MS};

    #[test]
    fn defaults_are_ten_attempts_one_second_apart() {
        let opts = RetryOptions::default();
        assert_eq!(opts.max_retries, 10);
        assert_eq!(opts.retry_wait_ms, 1_000);
        assert_eq!(opts.timeout_ms, None);
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let opts = RetryOptions {
            max_retries: 0,
            retry_wait_ms: 0,
            timeout_ms: Some(50),
        }
        .normalized();
        assert_eq!(opts.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(opts.retry_wait_ms, DEFAULT_RETRY_WAIT_MS);
        assert_eq!(opts.timeout_ms, Some(50));
    }

    #[test]
    fn explicit_values_are_kept() {
        let opts = RetryOptions {
            max_retries: 3,
            retry_wait_ms: 5,
            timeout_ms: None,
        }
        .normalized();
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.retry_wait().as_millis(), 5);
        assert!(opts.timeout().is_none());
    }
}
