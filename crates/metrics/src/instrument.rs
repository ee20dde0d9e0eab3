//! Transparent metrics decorators.
//!
//! Each decorator forwards the wrapped component's full contract (including
//! capability accessors) and only adds side-channel counter updates. The
//! wrapped component is reachable through `inner()`, so identity checks and
//! idempotence probes see through the decoration.

use {
    crate::handles::{ChannelMetrics, HandlerMetrics, SourceMetrics},
    async_trait::async_trait,
    relay_channels::{
        MessageChannel, MessageHandler, MessageSource, PollableChannel, SubscribableChannel,
    },
    relay_common::Message,
    std::{
        sync::Arc,
        time::{Duration, Instant},
    },
};

pub struct InstrumentedHandler {
    inner: Arc<dyn MessageHandler>,
    metrics: Arc<HandlerMetrics>,
}

impl InstrumentedHandler {
    #[must_use]
    pub fn new(inner: Arc<dyn MessageHandler>, metrics: Arc<HandlerMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl MessageHandler for InstrumentedHandler {
    async fn handle(&self, message: Message) -> anyhow::Result<()> {
        self.metrics.enter();
        let started = Instant::now();
        let result = self.inner.handle(message).await;
        self.metrics.exit(started.elapsed(), result.is_err());
        result
    }

    fn inner(&self) -> Option<Arc<dyn MessageHandler>> {
        Some(Arc::clone(&self.inner))
    }

    fn is_instrumented(&self) -> bool {
        true
    }
}

pub struct InstrumentedSource {
    inner: Arc<dyn MessageSource>,
    metrics: Arc<SourceMetrics>,
}

impl InstrumentedSource {
    #[must_use]
    pub fn new(inner: Arc<dyn MessageSource>, metrics: Arc<SourceMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl MessageSource for InstrumentedSource {
    async fn receive(&self) -> anyhow::Result<Option<Message>> {
        self.metrics.record_poll();
        let result = self.inner.receive().await;
        if matches!(result, Ok(Some(_))) {
            self.metrics.record_message();
        }
        result
    }

    fn inner(&self) -> Option<Arc<dyn MessageSource>> {
        Some(Arc::clone(&self.inner))
    }

    fn is_instrumented(&self) -> bool {
        true
    }
}

/// Channel decorator counting sends, receives, and errors.
///
/// Implements both capability traits and reports each one only when the
/// wrapped channel has it, so the decorated channel classifies exactly like
/// the original.
pub struct InstrumentedChannel {
    inner: Arc<dyn MessageChannel>,
    metrics: Arc<ChannelMetrics>,
}

impl InstrumentedChannel {
    #[must_use]
    pub fn new(inner: Arc<dyn MessageChannel>, metrics: Arc<ChannelMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl MessageChannel for InstrumentedChannel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, message: Message) -> relay_channels::Result<()> {
        let started = Instant::now();
        let result = self.inner.send(message).await;
        match &result {
            Ok(()) => self.metrics.record_send(started.elapsed()),
            Err(_) => self.metrics.record_error(),
        }
        result
    }

    fn as_subscribable(&self) -> Option<&dyn SubscribableChannel> {
        self.inner.as_subscribable().map(|_| self as &dyn SubscribableChannel)
    }

    fn as_pollable(&self) -> Option<&dyn PollableChannel> {
        self.inner.as_pollable().map(|_| self as &dyn PollableChannel)
    }

    fn inner(&self) -> Option<Arc<dyn MessageChannel>> {
        Some(Arc::clone(&self.inner))
    }

    fn is_instrumented(&self) -> bool {
        true
    }
}

impl SubscribableChannel for InstrumentedChannel {
    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> relay_channels::Result<()> {
        match self.inner.as_subscribable() {
            Some(subscribable) => subscribable.subscribe(handler),
            None => Err(relay_channels::Error::not_subscribable(self.name())),
        }
    }

    fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool {
        self.inner
            .as_subscribable()
            .is_some_and(|subscribable| subscribable.unsubscribe(handler))
    }

    fn subscriber_count(&self) -> usize {
        self.inner
            .as_subscribable()
            .map_or(0, SubscribableChannel::subscriber_count)
    }
}

#[async_trait]
impl PollableChannel for InstrumentedChannel {
    async fn receive(&self, timeout: Option<Duration>) -> relay_channels::Result<Option<Message>> {
        let pollable = self
            .inner
            .as_pollable()
            .ok_or_else(|| relay_channels::Error::not_pollable(self.name()))?;
        let result = pollable.receive(timeout).await;
        if matches!(result, Ok(Some(_))) {
            self.metrics.record_receive();
        }
        result
    }

    fn queue_depth(&self) -> Option<usize> {
        self.inner
            .as_pollable()
            .and_then(PollableChannel::queue_depth)
    }
}
