use crate::api::base::{
    error::ApiError,
    transport::{HttpRequest, HttpResponse, HttpTransport},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

/// Statuses treated as rate limiting. Everything else is final.
pub const RATE_LIMIT_STATUSES: [u16; 2] = [429, 503];

/// Exponential backoff with jitter for rate-limited vendor calls.
///
/// The delay before retry `n` is `min(base * 2^n + jitter, max_delay)`, so the
/// sequence never decreases once jitter is bounded by `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: 5,
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl BackoffPolicy {
    pub fn is_retryable(status: u16) -> bool {
        RATE_LIMIT_STATUSES.contains(&status)
    }

    pub fn delay_for(&self, retry: u32, jitter: Duration) -> Duration {
        let factor = 1u32 << retry.min(16);
        let exponential = self.base_delay.saturating_mul(factor);
        exponential.saturating_add(jitter).min(self.max_delay)
    }

    pub fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let fraction: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.max_jitter.mul_f64(fraction)
    }

    /// Sends `request`, sleeping and resending while the vendor answers with a
    /// rate-limit status. Once retries are exhausted the last response is
    /// returned as-is for the caller to turn into a failed record.
    pub async fn send(
        &self,
        transport: &dyn HttpTransport,
        request: &HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        let mut retry = 0;

        loop {
            let response = transport.send(request.clone()).await?;
            if !Self::is_retryable(response.status) {
                return Ok(response);
            }

            if retry >= self.max_retries {
                error!(
                    url = %request.full_url(),
                    status = response.status,
                    retries = retry,
                    "Rate limit retries exhausted"
                );
                return Ok(response);
            }

            let delay = self.delay_for(retry, self.jitter());
            warn!(
                url = %request.full_url(),
                status = response.status,
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, backing off"
            );
            sleep(delay).await;
            retry += 1;
        }
    }
}
