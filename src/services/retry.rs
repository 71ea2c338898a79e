use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use super::error::AnalysisError;

/// Bounded retry with exponential backoff against a single credential.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait before retrying after 0-based `attempt` failed: base * 2^attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempt budget
    /// is spent. The error of the final attempt is returned as-is.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, AnalysisError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        let mut attempt = 0;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                log::warn!("⚠️ {} failed (non-retryable error): {}", label, err);
                return Err(err);
            }

            if attempt + 1 >= self.max_attempts {
                log::warn!(
                    "⚠️ {} failed after {} attempts: {}",
                    label,
                    self.max_attempts,
                    err
                );
                return Err(err);
            }

            let delay = self.backoff(attempt);
            log::warn!(
                "🔁 {} - attempt {} failed, retrying in {}ms: {}",
                label,
                attempt + 1,
                delay.as_millis(),
                err
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(crate::config::DEFAULT_BASE_DELAY_MS),
        )
    }
}

/// Tries each credential in order and returns the first success. Switching
/// credentials never waits; all backoff happens inside `f`.
pub async fn try_each_credential<'a, T, F, Fut>(
    credentials: &'a [String],
    mut f: F,
) -> Result<T, AnalysisError>
where
    F: FnMut(usize, &'a str) -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    if credentials.is_empty() {
        return Err(AnalysisError::Configuration);
    }

    let mut last_error = None;

    for (index, key) in credentials.iter().enumerate() {
        log::info!("🔑 Attempting with API key {}/{}...", index + 1, credentials.len());

        match f(index, key.as_str()).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if index + 1 < credentials.len() {
                    log::warn!("⚠️ API key {} exhausted, trying next key...", index + 1);
                }
                last_error = Some(err);
            }
        }
    }

    log::error!(
        "❌ All API keys exhausted: {}",
        last_error.as_ref().map(|e| e.to_string()).unwrap_or_default()
    );
    Err(AnalysisError::Exhausted {
        last: last_error.map(Box::new),
    })
}
