use connectors::sql::base::error::DbError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Indicates whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Result of running an operation under the retry policy.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was considered fatal and should bubble up immediately.
    Fatal(E),
    /// The error was retryable, but the configured attempts were exhausted.
    AttemptsExceeded(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(err) | RetryError::AttemptsExceeded(err) => err,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
        }
    }

    /// Sync-state writes: 1s, 2s, 4s... capped at 30s, five attempts in total.
    pub fn for_sync_state() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Warehouse writes: a single reissue after the connection drops.
    pub fn for_connection_loss() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(500),
        }
    }

    /// Executes the operation with the configured retry policy.
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        mut op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        self.run_attempts(|_| op(), classify).await
    }

    /// Like [`run`](Self::run) but hands the zero-based attempt number to the
    /// operation, so retries can reset state (e.g. reconnect) first.
    pub async fn run_attempts<F, Fut, T, E, Classifier>(
        &self,
        mut op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0;

        loop {
            match op(attempt).await {
                Ok(result) => return Ok(result),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => return Err(RetryError::Fatal(err)),
                    RetryDisposition::Retry => {
                        if attempt + 1 >= self.max_attempts {
                            return Err(RetryError::AttemptsExceeded(err));
                        }

                        let delay = self.backoff_delay(attempt);
                        sleep(delay).await;
                        attempt += 1;
                    }
                },
            }
        }
    }

    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::from_millis(0);
        }

        let factor = 1u128 << attempt.min(6);
        let base_ms = self.base_delay.as_millis();
        let delay_ms = base_ms.saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}

/// Only a lost session is worth another attempt.
pub fn classify_db_error(err: &DbError) -> RetryDisposition {
    match err {
        DbError::ConnectionLost(_) => RetryDisposition::Retry,
        DbError::AlreadyExists(_)
        | DbError::Sql(_)
        | DbError::InvalidUrl(_)
        | DbError::Tls(_) => RetryDisposition::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sync_state_delays_double_up_to_cap() {
        let policy = RetryPolicy::for_sync_state();
        let delays: Vec<_> = (0..6).map(|a| policy.backoff_delay(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = &AtomicUsize::new(0);
        let result = RetryPolicy::for_sync_state()
            .run(
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 3 {
                        Err(DbError::ConnectionLost("gone".into()))
                    } else {
                        Ok(n)
                    }
                },
                classify_db_error,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_stop_immediately() {
        let calls = &AtomicUsize::new(0);
        let result: Result<(), _> = RetryPolicy::for_sync_state()
            .run(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(DbError::Sql("syntax error".into()))
                },
                classify_db_error,
            )
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(DbError::Sql(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_bounded() {
        let seen = std::sync::Mutex::new(Vec::new());
        let result: Result<(), _> = RetryPolicy::for_connection_loss()
            .run_attempts(
                |attempt| {
                    seen.lock().unwrap().push(attempt);
                    async { Err(DbError::ConnectionLost("gone".into())) }
                },
                classify_db_error,
            )
            .await;

        assert!(matches!(result, Err(RetryError::AttemptsExceeded(_))));
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}
