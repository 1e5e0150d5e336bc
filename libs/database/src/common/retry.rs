//! Backoff for the window where a service starts before its database accepts
//! connections.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential backoff settings for startup connection attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    /// Cap for any single wait
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Wait a random 50%..100% of the scheduled delay
    pub use_jitter: bool,
}

impl RetryConfig {
    /// 3 retries, 100ms initial delay doubling up to 5s, with jitter.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Scheduled wait after failed attempt number `retry` (0-based), before jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let scheduled = (self.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(scheduled.min(self.max_delay_ms))
    }

    fn wait_for(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        if self.use_jitter {
            jittered(delay)
        } else {
            delay
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

#[cfg(feature = "config")]
impl core_config::FromEnv for RetryConfig {
    /// `DB_CONNECT_RETRIES` (5), `DB_RETRY_INITIAL_DELAY_MS` (500),
    /// `DB_RETRY_MAX_DELAY_MS` (10000).
    fn from_env() -> Result<Self, core_config::ConfigError> {
        use core_config::env_parse_or;

        Ok(Self::new()
            .with_max_retries(env_parse_or("DB_CONNECT_RETRIES", 5)?)
            .with_initial_delay(env_parse_or("DB_RETRY_INITIAL_DELAY_MS", 500)?)
            .with_max_delay(env_parse_or("DB_RETRY_MAX_DELAY_MS", 10_000)?))
    }
}

/// Run `operation` until it succeeds or `config.max_retries` retries are spent.
/// The last error is returned.
///
/// ```ignore
/// let db = retry_with_backoff(
///     || connect_with_options(options.clone()),
///     RetryConfig::new().with_max_retries(5),
/// )
/// .await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retries = 0;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!(retries, "Connected after retrying");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if retries >= config.max_retries {
            warn!(attempts = retries + 1, error = %error, "Giving up");
            return Err(error);
        }

        let wait = config.wait_for(retries);
        warn!(
            retry = retries + 1,
            max_retries = config.max_retries,
            wait_ms = wait.as_millis() as u64,
            error = %error,
            "Attempt failed, backing off"
        );
        tokio::time::sleep(wait).await;
        retries += 1;
    }
}

fn jittered(delay: Duration) -> Duration {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let percent = 50 + RandomState::new().hash_one(std::time::SystemTime::now()) % 51;
    delay * percent as u32 / 100
}
