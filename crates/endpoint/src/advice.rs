//! Cross-cutting advice applied around each pull-dispatch attempt.
//!
//! The advice chain is an explicit ordered list of middleware over a
//! re-invocable attempt closure: an advice may retry the attempt,
//! short-circuit it, or let the error surface.

use {
    crate::error::Result,
    async_trait::async_trait,
    std::{future::Future, pin::Pin, sync::Arc, time::Duration},
    tracing::warn,
};

/// Future of one attempt: `Ok(true)` when a message was pulled and
/// dispatched, `Ok(false)` when nothing was available.
pub type AttemptFuture = Pin<Box<dyn Future<Output = Result<bool>> + Send>>;

/// A re-invocable pull-dispatch attempt.
pub type DispatchAttempt = Arc<dyn Fn() -> AttemptFuture + Send + Sync>;

/// One layer of the advice chain.
#[async_trait]
pub trait DispatchAdvice: Send + Sync {
    async fn invoke(&self, attempt: DispatchAttempt) -> Result<bool>;
}

/// Compose the chain around an attempt. The first advice in the slice is the
/// outermost wrapper.
#[must_use]
pub fn apply_advice_chain(
    chain: &[Arc<dyn DispatchAdvice>],
    attempt: DispatchAttempt,
) -> DispatchAttempt {
    let mut wrapped = attempt;
    for advice in chain.iter().rev() {
        let advice = Arc::clone(advice);
        let inner = wrapped;
        wrapped = Arc::new(move || {
            let advice = Arc::clone(&advice);
            let inner = Arc::clone(&inner);
            Box::pin(async move { advice.invoke(inner).await })
        });
    }
    wrapped
}

/// Re-attempts a failed dispatch with a fixed backoff before surfacing the
/// error. Configuration errors are never retried.
pub struct RetryAdvice {
    max_attempts: usize,
    backoff: Duration,
}

impl RetryAdvice {
    #[must_use]
    pub fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

#[async_trait]
impl DispatchAdvice for RetryAdvice {
    async fn invoke(&self, attempt: DispatchAttempt) -> Result<bool> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt().await {
                Ok(dispatched) => return Ok(dispatched),
                Err(err) if err.is_fatal() || attempts >= self.max_attempts => return Err(err),
                Err(err) => {
                    warn!(attempt = attempts, error = %err, "dispatch failed, retrying");
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::error::Error,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    fn failing_attempt(failures: usize, calls: Arc<AtomicUsize>) -> DispatchAttempt {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                if call < failures {
                    Err(Error::dispatch(anyhow::anyhow!("transient")))
                } else {
                    Ok(true)
                }
            })
        })
    }

    #[tokio::test]
    async fn retry_recovers_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let advice = RetryAdvice::new(3, Duration::ZERO);
        let dispatched = advice.invoke(failing_attempt(2, calls.clone())).await.unwrap();
        assert!(dispatched);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let advice = RetryAdvice::new(2, Duration::ZERO);
        let err = advice
            .invoke(failing_attempt(5, calls.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn configuration_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let advice = RetryAdvice::new(5, Duration::ZERO);
        let counting = Arc::clone(&calls);
        let attempt: DispatchAttempt = Arc::new(move || {
            let calls = Arc::clone(&counting);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::configuration("ep", "broken wiring"))
            })
        });
        let err = advice.invoke(attempt).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chain_order_is_outermost_first() {
        struct Tag {
            label: &'static str,
            log: Arc<std::sync::Mutex<Vec<&'static str>>>,
        }

        #[async_trait]
        impl DispatchAdvice for Tag {
            async fn invoke(&self, attempt: DispatchAttempt) -> Result<bool> {
                self.log
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(self.label);
                attempt().await
            }
        }

        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn DispatchAdvice>> = vec![
            Arc::new(Tag {
                label: "outer",
                log: log.clone(),
            }),
            Arc::new(Tag {
                label: "inner",
                log: log.clone(),
            }),
        ];
        let attempt: DispatchAttempt = Arc::new(|| Box::pin(async { Ok(false) }));
        let wrapped = apply_advice_chain(&chain, attempt);
        wrapped().await.unwrap();
        let order = log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(order, vec!["outer", "inner"]);
    }
}
