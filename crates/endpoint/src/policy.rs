//! Polling behavior bundled as a value object.

use {
    crate::{
        advice::DispatchAdvice, executor::DispatchExecutor, transaction::TransactionBoundary,
        trigger::Trigger,
    },
    std::{sync::Arc, time::Duration},
};

/// Receive timeout applied when a policy does not override it.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything a polling endpoint needs besides its channel and handler:
/// the trigger, the per-cycle batch limit, the receive timeout, optional
/// bounded dispatch concurrency, optional transactional wrapping, and the
/// ordered advice chain.
#[derive(Clone)]
pub struct PollingPolicy {
    pub trigger: Arc<dyn Trigger>,
    /// Max pull-dispatch pairs per cycle; `None` drains until empty.
    pub max_messages_per_poll: Option<usize>,
    pub receive_timeout: Duration,
    pub executor: Option<Arc<DispatchExecutor>>,
    pub transaction: Option<Arc<dyn TransactionBoundary>>,
    pub advice_chain: Vec<Arc<dyn DispatchAdvice>>,
}

impl PollingPolicy {
    #[must_use]
    pub fn new(trigger: Arc<dyn Trigger>) -> Self {
        Self {
            trigger,
            max_messages_per_poll: None,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            executor: None,
            transaction: None,
            advice_chain: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_messages_per_poll(mut self, max: usize) -> Self {
        self.max_messages_per_poll = Some(max);
        self
    }

    #[must_use]
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Arc<DispatchExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    #[must_use]
    pub fn with_transaction(mut self, transaction: Arc<dyn TransactionBoundary>) -> Self {
        self.transaction = Some(transaction);
        self
    }

    #[must_use]
    pub fn with_advice(mut self, advice: Arc<dyn DispatchAdvice>) -> Self {
        self.advice_chain.push(advice);
        self
    }
}
