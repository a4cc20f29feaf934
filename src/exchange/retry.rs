use std::future::Future;
use anyhow::{anyhow, Result};
use rand::Rng;
use serde_json::json;
use tokio::time::{sleep, Duration};

use crate::logging::{log, obj, v_str, Domain, Level};

/// Retry configuration
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            max_delay_ms: 5000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    /// No retries: one attempt only.
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Exponential backoff with ±jitter_factor jitter
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);

        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let final_delay = (clamped + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

/// Retry a fallible async operation with exponential backoff
pub async fn retry_async<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt < config.max_retries {
                    let delay = config.delay_for_attempt(attempt);
                    log(
                        Level::Warn,
                        Domain::Market,
                        "retry",
                        obj(&[
                            ("operation", v_str(operation_name)),
                            ("attempt", json!(attempt + 1)),
                            ("max_attempts", json!(config.max_retries + 1)),
                            ("delay_ms", json!(delay.as_millis() as u64)),
                            ("msg", v_str(&format!("{:#}", e))),
                        ]),
                    );
                    sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("retry_async exhausted without error")))
}
