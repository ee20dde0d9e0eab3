//! Shared polling engine behind [`crate::PollingEndpoint`] and
//! [`crate::SourcePollingAdapter`].

use {
    crate::{
        advice::{DispatchAttempt, apply_advice_chain},
        error::{Error, Result},
        policy::PollingPolicy,
        trigger::TriggerContext,
    },
    std::{
        future::Future,
        pin::Pin,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    },
    tokio::{
        sync::{Mutex, Notify},
        task::JoinHandle,
    },
    tracing::{debug, error, info},
};

/// Callback reporting an unrecovered cycle failure.
pub(crate) type FailureSink =
    Arc<dyn Fn(Error) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// One spawned run of the loop. The shutdown signal is per-run: a stop
/// notification fired while the loop is mid-cycle must not leak a stored
/// permit into a later restart.
struct Run {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Owns the scheduled loop: waits on the trigger, runs one cycle per fire,
/// isolates cycle errors, and drains the in-flight cycle on stop.
pub(crate) struct Poller {
    policy: PollingPolicy,
    running: AtomicBool,
    run: Mutex<Option<Run>>,
}

impl Poller {
    pub(crate) fn new(policy: PollingPolicy) -> Self {
        Self {
            policy,
            running: AtomicBool::new(false),
            run: Mutex::new(None),
        }
    }

    pub(crate) fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the loop. No-op when already running.
    pub(crate) async fn start(
        self: &Arc<Self>,
        name: String,
        attempt: DispatchAttempt,
        on_failure: FailureSink,
    ) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let shutdown = Arc::new(Notify::new());
        let poller = Arc::clone(self);
        let signal = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            poller.poll_loop(&name, attempt, on_failure, &signal).await;
        });
        *self.run.lock().await = Some(Run { shutdown, handle });
    }

    /// Signal the loop to exit at its next suspension point and wait for the
    /// in-flight cycle to complete. Idempotent.
    pub(crate) async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let run = self.run.lock().await.take();
        if let Some(run) = run {
            run.shutdown.notify_one();
            if let Err(err) = run.handle.await {
                if err.is_panic() {
                    error!("polling task panicked during shutdown");
                }
            }
        }
    }

    async fn poll_loop(
        &self,
        name: &str,
        attempt: DispatchAttempt,
        on_failure: FailureSink,
        shutdown: &Notify,
    ) {
        let attempt = apply_advice_chain(&self.policy.advice_chain, attempt);
        let mut context = TriggerContext::default();
        while self.running.load(Ordering::Acquire) {
            let Some(scheduled) = self.policy.trigger.next_fire(&context) else {
                debug!(endpoint = %name, "trigger exhausted, polling loop ending");
                break;
            };
            tokio::select! {
                () = tokio::time::sleep_until(scheduled) => {},
                () = shutdown.notified() => break,
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            context.last_scheduled = Some(scheduled);
            context.last_actual = Some(tokio::time::Instant::now());
            if let Err(err) = self.poll_cycle(&attempt).await {
                let fatal = err.is_fatal();
                on_failure(err).await;
                if fatal {
                    error!(endpoint = %name, "fatal wiring error, polling loop stopped");
                    break;
                }
            }
            context.last_completion = Some(tokio::time::Instant::now());
        }
        self.running.store(false, Ordering::Release);
        info!(endpoint = %name, "polling loop exited");
    }

    /// One cycle: open the transaction, run up to the batch limit of
    /// advice-wrapped attempts, close the transaction.
    async fn poll_cycle(&self, attempt: &DispatchAttempt) -> Result<()> {
        if let Some(transaction) = &self.policy.transaction {
            transaction.begin().await.map_err(Error::dispatch)?;
        }

        let limit = self.policy.max_messages_per_poll.unwrap_or(usize::MAX);
        let mut failed = None;
        let mut dispatched = 0usize;
        while dispatched < limit {
            match attempt().await {
                Ok(true) => dispatched += 1,
                Ok(false) => break,
                Err(err) => {
                    failed = Some(err);
                    break;
                },
            }
        }

        if let Some(transaction) = &self.policy.transaction {
            if failed.is_none() {
                transaction.commit().await.map_err(Error::dispatch)?;
            } else if let Err(rollback_err) = transaction.rollback().await {
                error!(error = %rollback_err, "rollback failed after dispatch error");
            }
        }

        match failed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
