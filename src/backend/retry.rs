//! Bounded retry with exponential backoff around a backend call.

use std::time::Duration;

use tracing::{info, warn};

use crate::models::ChatMessage;
use crate::sanitize;

use super::{Backend, BackendError};

/// Send a prompt through `backend`, retrying failures with exponential
/// backoff, and return the sanitized reply text.
///
/// `max_attempts` is the total number of attempts; the delay before
/// attempt `n+1` is `base_delay * 2^n`, so the sequence is
/// non-decreasing. After the final failure the terminal error carries
/// the backend name and attempt count.
pub async fn dispatch(
    backend: &dyn Backend,
    prompt: &str,
    history: &[ChatMessage],
    max_attempts: u32,
    base_delay: Duration,
) -> Result<String, BackendError> {
    let name = backend.name();
    let attempts = max_attempts.max(1);

    for attempt in 0..attempts {
        info!("sending request to {name} (attempt {}/{attempts})", attempt + 1);
        match backend.send(prompt, history).await {
            Ok(reply) => {
                info!("{name} responded on attempt {}", attempt + 1);
                return Ok(sanitize::sanitize(&reply, sanitize::REVIEW_ALLOWED_TAGS));
            }
            Err(e) => {
                warn!("{name} attempt {} failed: {e}", attempt + 1);
                if attempt + 1 < attempts {
                    let delay = backoff(base_delay, attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(BackendError::Exhausted {
        backend: name,
        attempts,
    })
}

/// Delay before the retry following attempt `attempt` (0-based).
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `fail_first` times, then succeeds with a canned reply.
    struct FlakyBackend {
        calls: AtomicU32,
        fail_first: u32,
        reply: String,
    }

    impl FlakyBackend {
        fn new(fail_first: u32, reply: &str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first,
                reply: reply.to_string(),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for FlakyBackend {
        fn name(&self) -> String {
            "flaky".to_string()
        }

        async fn send(
            &self,
            _prompt: &str,
            _history: &[ChatMessage],
        ) -> Result<String, BackendError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(BackendError::Api {
                    backend: "flaky".into(),
                    message: "boom".into(),
                })
            } else {
                Ok(self.reply.clone())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let backend = FlakyBackend::new(0, "hello");
        let reply = dispatch(&backend, "p", &[], 3, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_retrying_after_success() {
        let backend = FlakyBackend::new(1, "recovered");
        let reply = dispatch(&backend, "p", &[], 5, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(reply, "recovered");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exactly_max_attempts_on_sustained_failure() {
        let backend = FlakyBackend::new(u32::MAX, "never");
        let err = dispatch(&backend, "p", &[], 3, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(backend.calls(), 3);
        match err {
            BackendError::Exhausted { backend, attempts } => {
                assert_eq!(backend, "flaky");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected Exhausted, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_is_treated_as_one() {
        let backend = FlakyBackend::new(0, "once");
        let reply = dispatch(&backend, "p", &[], 0, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(reply, "once");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reply_is_sanitized() {
        let backend = FlakyBackend::new(0, "<script>x</script><b>fine</b>");
        let reply = dispatch(&backend, "p", &[], 1, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(reply, "x<b>fine</b>");
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 0), Duration::from_millis(100));
        assert_eq!(backoff(base, 1), Duration::from_millis(200));
        assert_eq!(backoff(base, 2), Duration::from_millis(400));
        // Non-decreasing across the whole sequence
        let delays: Vec<_> = (0..6).map(|i| backoff(base, i)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }
}
