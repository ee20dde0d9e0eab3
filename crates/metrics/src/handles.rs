//! Per-component metrics handles.
//!
//! A handle owns the counters for one physical component and a cached
//! identity assigned at registry activation. Counters are independent
//! atomics; the registry never locks them for steady-state reads.

use {
    crate::{
        resolver::Identity,
        stats::{DurationStats, RateMeter, RateSnapshot, Statistics},
    },
    relay_channels::{MessageChannel, MessageHandler, MessageSource},
    std::{
        sync::{
            Arc, Mutex, PoisonError,
            atomic::{AtomicU64, AtomicUsize, Ordering},
        },
        time::Duration,
    },
};

#[derive(Default)]
struct IdentitySlot(Mutex<Option<Identity>>);

impl IdentitySlot {
    fn get(&self) -> Option<Identity> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, identity: Identity) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Counters for one channel: sends, receives, errors, send duration.
pub struct ChannelMetrics {
    channel: Arc<dyn MessageChannel>,
    sends: RateMeter,
    errors: RateMeter,
    receives: AtomicU64,
    send_duration: DurationStats,
    identity: IdentitySlot,
}

impl ChannelMetrics {
    #[must_use]
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            channel,
            sends: RateMeter::new(),
            errors: RateMeter::new(),
            receives: AtomicU64::new(0),
            send_duration: DurationStats::new(),
            identity: IdentitySlot::default(),
        }
    }

    #[must_use]
    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    pub fn record_send(&self, duration: Duration) {
        self.sends.record();
        self.send_duration.record(duration);
    }

    pub fn record_error(&self) {
        self.errors.record();
    }

    pub fn record_receive(&self) {
        self.receives.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn send_count(&self) -> u64 {
        self.sends.count()
    }

    #[must_use]
    pub fn receive_count(&self) -> u64 {
        self.receives.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors.count()
    }

    #[must_use]
    pub fn send_rate(&self) -> RateSnapshot {
        self.sends.snapshot()
    }

    #[must_use]
    pub fn error_rate(&self) -> RateSnapshot {
        self.errors.snapshot()
    }

    #[must_use]
    pub fn send_duration(&self) -> Statistics {
        self.send_duration.snapshot()
    }

    /// Whether the channel exposes a live queue depth.
    #[must_use]
    pub fn is_queue_backed(&self) -> bool {
        self.queue_depth().is_some()
    }

    /// Current depth of the backing queue, read live from the channel.
    #[must_use]
    pub fn queue_depth(&self) -> Option<usize> {
        self.channel
            .as_pollable()
            .and_then(|pollable| pollable.queue_depth())
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.get()
    }

    pub(crate) fn set_identity(&self, identity: Identity) {
        self.identity.set(identity);
    }

    pub(crate) fn clear_identity(&self) {
        self.identity.clear();
    }
}

/// Counters for one handler: active invocations, totals, errors, duration.
pub struct HandlerMetrics {
    handler: Arc<dyn MessageHandler>,
    active: AtomicUsize,
    handled: AtomicU64,
    errors: AtomicU64,
    duration: DurationStats,
    identity: IdentitySlot,
}

impl HandlerMetrics {
    #[must_use]
    pub fn new(handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            handler,
            active: AtomicUsize::new(0),
            handled: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            duration: DurationStats::new(),
            identity: IdentitySlot::default(),
        }
    }

    pub(crate) fn handler(&self) -> &Arc<dyn MessageHandler> {
        &self.handler
    }

    pub fn enter(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exit(&self, duration: Duration, failed: bool) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.handled.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.duration.record(duration);
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn handle_count(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn duration(&self) -> Statistics {
        self.duration.snapshot()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.get()
    }

    pub(crate) fn set_identity(&self, identity: Identity) {
        self.identity.set(identity);
    }

    pub(crate) fn clear_identity(&self) {
        self.identity.clear();
    }
}

/// Counters for one message source: polls attempted, messages produced.
pub struct SourceMetrics {
    source: Arc<dyn MessageSource>,
    polls: AtomicU64,
    messages: AtomicU64,
    identity: IdentitySlot,
}

impl SourceMetrics {
    #[must_use]
    pub fn new(source: Arc<dyn MessageSource>) -> Self {
        Self {
            source,
            polls: AtomicU64::new(0),
            messages: AtomicU64::new(0),
            identity: IdentitySlot::default(),
        }
    }

    pub(crate) fn source(&self) -> &Arc<dyn MessageSource> {
        &self.source
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn poll_count(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.get()
    }

    pub(crate) fn set_identity(&self, identity: Identity) {
        self.identity.set(identity);
    }

    pub(crate) fn clear_identity(&self) {
        self.identity.clear();
    }
}
