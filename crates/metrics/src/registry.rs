//! Process-wide metrics registry.
//!
//! Components are instrumented as they are created, which pends their
//! handles per kind. `activate` resolves each pending handle to a logical
//! name, applies the operator's inclusion patterns, and publishes the
//! surviving handles under hierarchical object names. `deactivate` clears
//! the published set and every cached identity; a later activation
//! recomputes from scratch. Activation and deactivation are serialized by a
//! lifecycle lock that never blocks counter updates on live handles.

use {
    crate::{
        error::Error,
        handles::{ChannelMetrics, HandlerMetrics, SourceMetrics},
        instrument::{InstrumentedChannel, InstrumentedHandler, InstrumentedSource},
        patterns::NamePatterns,
        resolver::{Identity, IdentityResolver, Provenance, channel_identity},
        stats::{RateSnapshot, Statistics},
    },
    relay_channels::{
        MessageChannel, MessageHandler, MessageSource, physical_channel, physical_handler,
        physical_source,
    },
    relay_common::naming::strip_internal_prefix,
    relay_endpoint::{Endpoint, EndpointHost},
    serde::Serialize,
    std::sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    tracing::{debug, info, warn},
};

const DEFAULT_DOMAIN: &str = "relay";

struct ChannelEntry {
    identity: Identity,
    object_name: String,
    metrics: Arc<ChannelMetrics>,
}

struct HandlerEntry {
    identity: Identity,
    object_name: String,
    metrics: Arc<HandlerMetrics>,
    endpoint: Option<Arc<dyn Endpoint>>,
}

struct SourceEntry {
    identity: Identity,
    object_name: String,
    metrics: Arc<SourceMetrics>,
    endpoint: Option<Arc<dyn Endpoint>>,
}

struct EndpointEntry {
    name: String,
    object_name: String,
    endpoint: Arc<dyn Endpoint>,
}

#[derive(Default)]
struct Inner {
    resolver: IdentityResolver,
    known_channels: Vec<Arc<ChannelMetrics>>,
    known_handlers: Vec<Arc<HandlerMetrics>>,
    known_sources: Vec<Arc<SourceMetrics>>,
    channels: Vec<ChannelEntry>,
    handlers: Vec<HandlerEntry>,
    sources: Vec<SourceEntry>,
    endpoints: Vec<EndpointEntry>,
}

/// Registry of instrumented components, keyed by resolved logical name.
pub struct MetricsRegistry {
    domain: String,
    patterns: NamePatterns,
    static_properties: Vec<(String, String)>,
    running: AtomicBool,
    lifecycle: Mutex<()>,
    inner: Mutex<Inner>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN)
    }
}

impl MetricsRegistry {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            patterns: NamePatterns::all(),
            static_properties: Vec::new(),
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Restrict registration to names matching the given patterns.
    #[must_use]
    pub fn with_patterns(mut self, patterns: NamePatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Add a static key/value pair appended to every object name.
    #[must_use]
    pub fn with_static_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.static_properties.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wrap a channel with a metrics decorator and pend its handle.
    ///
    /// Already-instrumented channels are returned unchanged.
    pub fn instrument_channel(&self, channel: Arc<dyn MessageChannel>) -> Arc<dyn MessageChannel> {
        if channel.is_instrumented() {
            return channel;
        }
        let metrics = Arc::new(ChannelMetrics::new(physical_channel(&channel)));
        let wrapped = InstrumentedChannel::new(channel, Arc::clone(&metrics));
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .known_channels
            .push(metrics);
        Arc::new(wrapped)
    }

    /// Wrap a handler with a metrics decorator and pend its handle.
    pub fn instrument_handler(&self, handler: Arc<dyn MessageHandler>) -> Arc<dyn MessageHandler> {
        if handler.is_instrumented() {
            return handler;
        }
        let metrics = Arc::new(HandlerMetrics::new(physical_handler(&handler)));
        let wrapped = InstrumentedHandler::new(handler, Arc::clone(&metrics));
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .known_handlers
            .push(metrics);
        Arc::new(wrapped)
    }

    /// Wrap a source with a metrics decorator and pend its handle.
    pub fn instrument_source(&self, source: Arc<dyn MessageSource>) -> Arc<dyn MessageSource> {
        if source.is_instrumented() {
            return source;
        }
        let metrics = Arc::new(SourceMetrics::new(physical_source(&source)));
        let wrapped = InstrumentedSource::new(source, Arc::clone(&metrics));
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .known_sources
            .push(metrics);
        Arc::new(wrapped)
    }

    /// Resolve every pending handle against the host's endpoints and publish
    /// the ones whose names pass the inclusion patterns.
    ///
    /// First registrant wins per name; re-activation is a no-op for names
    /// already published.
    pub fn activate(&self, host: &EndpointHost) {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        let endpoints = host.endpoints();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let known_channels = inner.known_channels.clone();
        for metrics in known_channels {
            let identity = match metrics.identity() {
                Some(identity) => identity,
                None => {
                    let identity = channel_identity(metrics.channel_name());
                    metrics.set_identity(identity.clone());
                    identity
                },
            };
            self.publish_channel(&mut inner, identity, metrics);
        }

        let known_handlers = inner.known_handlers.clone();
        for metrics in known_handlers {
            let (identity, endpoint) = match metrics.identity() {
                Some(identity) => (identity, None),
                None => {
                    let (identity, endpoint) =
                        inner.resolver.resolve_handler(metrics.handler(), &endpoints);
                    metrics.set_identity(identity.clone());
                    (identity, endpoint)
                },
            };
            self.publish_handler(&mut inner, identity, metrics, endpoint);
        }

        let known_sources = inner.known_sources.clone();
        for metrics in known_sources {
            let (identity, endpoint) = match metrics.identity() {
                Some(identity) => (identity, None),
                None => {
                    let (identity, endpoint) =
                        inner.resolver.resolve_source(metrics.source(), &endpoints);
                    metrics.set_identity(identity.clone());
                    (identity, endpoint)
                },
            };
            self.publish_source(&mut inner, identity, metrics, endpoint);
        }

        for endpoint in &endpoints {
            self.publish_endpoint(&mut inner, endpoint);
        }

        self.running.store(true, Ordering::SeqCst);
        info!(
            domain = %self.domain,
            channels = inner.channels.len(),
            handlers = inner.handlers.len(),
            sources = inner.sources.len(),
            endpoints = inner.endpoints.len(),
            "metrics registry activated"
        );
    }

    /// Remove every published entry and clear cached identities. Pending
    /// handles stay known and keep counting; the next activation resolves
    /// them afresh.
    pub fn deactivate(&self) {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.channels.clear();
        inner.handlers.clear();
        inner.sources.clear();
        inner.endpoints.clear();
        for metrics in &inner.known_channels {
            metrics.clear_identity();
        }
        for metrics in &inner.known_handlers {
            metrics.clear_identity();
        }
        for metrics in &inner.known_sources {
            metrics.clear_identity();
        }
        inner.resolver.clear();
        self.running.store(false, Ordering::SeqCst);
        info!(domain = %self.domain, "metrics registry deactivated");
    }

    fn publish_channel(&self, inner: &mut Inner, identity: Identity, metrics: Arc<ChannelMetrics>) {
        if !self.patterns.includes(&identity.name) {
            debug!(name = %identity.name, "channel excluded by name patterns");
            return;
        }
        if let Some(existing) = inner
            .channels
            .iter()
            .find(|entry| entry.identity.name == identity.name)
        {
            if !Arc::ptr_eq(&existing.metrics, &metrics) {
                warn!(error = %Error::duplicate(&identity.name), "skipping channel");
            }
            return;
        }
        let object_name = self.object_name("channel", &identity);
        inner.channels.push(ChannelEntry {
            identity,
            object_name,
            metrics,
        });
    }

    fn publish_handler(
        &self,
        inner: &mut Inner,
        identity: Identity,
        metrics: Arc<HandlerMetrics>,
        endpoint: Option<Arc<dyn Endpoint>>,
    ) {
        if !self.patterns.includes(&identity.name) {
            debug!(name = %identity.name, "handler excluded by name patterns");
            return;
        }
        if let Some(existing) = inner
            .handlers
            .iter()
            .find(|entry| entry.identity.name == identity.name)
        {
            if !Arc::ptr_eq(&existing.metrics, &metrics) {
                warn!(error = %Error::duplicate(&identity.name), "skipping handler");
            }
            return;
        }
        let object_name = self.object_name("handler", &identity);
        inner.handlers.push(HandlerEntry {
            identity,
            object_name,
            metrics,
            endpoint,
        });
    }

    fn publish_source(
        &self,
        inner: &mut Inner,
        identity: Identity,
        metrics: Arc<SourceMetrics>,
        endpoint: Option<Arc<dyn Endpoint>>,
    ) {
        if !self.patterns.includes(&identity.name) {
            debug!(name = %identity.name, "source excluded by name patterns");
            return;
        }
        if let Some(existing) = inner
            .sources
            .iter()
            .find(|entry| entry.identity.name == identity.name)
        {
            if !Arc::ptr_eq(&existing.metrics, &metrics) {
                warn!(error = %Error::duplicate(&identity.name), "skipping source");
            }
            return;
        }
        let object_name = self.object_name("source", &identity);
        inner.sources.push(SourceEntry {
            identity,
            object_name,
            metrics,
            endpoint,
        });
    }

    fn publish_endpoint(&self, inner: &mut Inner, endpoint: &Arc<dyn Endpoint>) {
        if inner
            .endpoints
            .iter()
            .any(|entry| Arc::ptr_eq(&entry.endpoint, endpoint))
        {
            return;
        }
        let raw = endpoint.name();
        let (base, provenance) = match strip_internal_prefix(raw) {
            Some(stripped) => (stripped.to_string(), Provenance::Internal),
            None => (raw.to_string(), Provenance::Endpoint),
        };
        if !self.patterns.includes(&base) {
            debug!(name = %base, "endpoint excluded by name patterns");
            return;
        }
        // Distinct endpoints may strip to the same base name; suffix in
        // discovery order.
        let mut name = base.clone();
        let mut occurrence = 1;
        while inner.endpoints.iter().any(|entry| entry.name == name) {
            occurrence += 1;
            name = format!("{base}#{occurrence}");
        }
        let identity = Identity::new(name.clone(), provenance);
        let object_name = self.object_name("endpoint", &identity);
        inner.endpoints.push(EndpointEntry {
            name,
            object_name,
            endpoint: Arc::clone(endpoint),
        });
    }

    fn object_name(&self, kind: &str, identity: &Identity) -> String {
        let mut rendered = format!(
            "{}:type={kind},name={},bean={}",
            self.domain, identity.name, identity.provenance
        );
        for (key, value) in &self.static_properties {
            rendered.push_str(&format!(",{key}={value}"));
        }
        rendered
    }

    // Read-only query surface.

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .channels
            .len()
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .len()
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sources
            .len()
    }

    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .channels
            .iter()
            .map(|entry| entry.identity.name.clone())
            .collect()
    }

    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .handlers
            .iter()
            .map(|entry| entry.identity.name.clone())
            .collect()
    }

    /// Handler invocations currently in flight, summed over all handlers.
    #[must_use]
    pub fn active_handler_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .handlers
            .iter()
            .map(|entry| entry.metrics.active_count())
            .sum()
    }

    /// Messages sitting in queue-backed channels, summed live.
    #[must_use]
    pub fn queued_message_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .channels
            .iter()
            .filter_map(|entry| entry.metrics.queue_depth())
            .sum()
    }

    #[must_use]
    pub fn handler_duration(&self, name: &str) -> Option<Statistics> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .handlers
            .iter()
            .find(|entry| entry.identity.name == name)
            .map(|entry| entry.metrics.duration())
    }

    #[must_use]
    pub fn handler_provenance(&self, name: &str) -> Option<Provenance> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .handlers
            .iter()
            .find(|entry| entry.identity.name == name)
            .map(|entry| entry.identity.provenance)
    }

    #[must_use]
    pub fn source_message_count(&self, name: &str) -> Option<u64> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .sources
            .iter()
            .find(|entry| entry.identity.name == name)
            .map(|entry| entry.metrics.message_count())
    }

    #[must_use]
    pub fn channel_receive_count(&self, name: &str) -> Option<u64> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .channels
            .iter()
            .find(|entry| entry.identity.name == name)
            .map(|entry| entry.metrics.receive_count())
    }

    #[must_use]
    pub fn channel_send_rate(&self, name: &str) -> Option<RateSnapshot> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .channels
            .iter()
            .find(|entry| entry.identity.name == name)
            .map(|entry| entry.metrics.send_rate())
    }

    #[must_use]
    pub fn channel_error_rate(&self, name: &str) -> Option<RateSnapshot> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .channels
            .iter()
            .find(|entry| entry.identity.name == name)
            .map(|entry| entry.metrics.error_rate())
    }

    /// Object names of every published entry, in registration order.
    #[must_use]
    pub fn object_names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .channels
            .iter()
            .map(|entry| entry.object_name.clone())
            .chain(inner.handlers.iter().map(|entry| entry.object_name.clone()))
            .chain(inner.sources.iter().map(|entry| entry.object_name.clone()))
            .chain(inner.endpoints.iter().map(|entry| entry.object_name.clone()))
            .collect()
    }

    /// The endpoint a published component was traced back to.
    #[must_use]
    pub fn association(&self, name: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.resolver.association(name).map(str::to_string)
    }

    /// Start the endpoint behind a published entry. Returns `None` when no
    /// entry under that name controls an endpoint.
    pub async fn start_component(&self, name: &str) -> Option<relay_endpoint::Result<()>> {
        let endpoint = self.find_endpoint(name)?;
        Some(endpoint.start().await)
    }

    /// Stop the endpoint behind a published entry. Returns `false` when no
    /// entry under that name controls an endpoint.
    pub async fn stop_component(&self, name: &str) -> bool {
        match self.find_endpoint(name) {
            Some(endpoint) => {
                endpoint.stop().await;
                true
            },
            None => false,
        }
    }

    #[must_use]
    pub fn component_running(&self, name: &str) -> Option<bool> {
        self.find_endpoint(name).map(|endpoint| endpoint.is_running())
    }

    fn find_endpoint(&self, name: &str) -> Option<Arc<dyn Endpoint>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner
            .handlers
            .iter()
            .find(|entry| entry.identity.name == name)
        {
            if let Some(endpoint) = &entry.endpoint {
                return Some(Arc::clone(endpoint));
            }
        }
        if let Some(entry) = inner
            .sources
            .iter()
            .find(|entry| entry.identity.name == name)
        {
            if let Some(endpoint) = &entry.endpoint {
                return Some(Arc::clone(endpoint));
            }
        }
        inner
            .endpoints
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| Arc::clone(&entry.endpoint))
    }

    /// Structured snapshot of every published entry, for external export.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            domain: self.domain.clone(),
            channels: inner
                .channels
                .iter()
                .map(|entry| ChannelSnapshot {
                    name: entry.identity.name.clone(),
                    object_name: entry.object_name.clone(),
                    provenance: entry.identity.provenance,
                    send: entry.metrics.send_rate(),
                    error: entry.metrics.error_rate(),
                    receive_count: entry.metrics.receive_count(),
                    send_duration: entry.metrics.send_duration(),
                    queue_depth: entry.metrics.queue_depth(),
                })
                .collect(),
            handlers: inner
                .handlers
                .iter()
                .map(|entry| HandlerSnapshot {
                    name: entry.identity.name.clone(),
                    object_name: entry.object_name.clone(),
                    provenance: entry.identity.provenance,
                    active_count: entry.metrics.active_count(),
                    handle_count: entry.metrics.handle_count(),
                    error_count: entry.metrics.error_count(),
                    duration: entry.metrics.duration(),
                })
                .collect(),
            sources: inner
                .sources
                .iter()
                .map(|entry| SourceSnapshot {
                    name: entry.identity.name.clone(),
                    object_name: entry.object_name.clone(),
                    provenance: entry.identity.provenance,
                    poll_count: entry.metrics.poll_count(),
                    message_count: entry.metrics.message_count(),
                })
                .collect(),
            endpoints: inner
                .endpoints
                .iter()
                .map(|entry| EndpointSnapshot {
                    name: entry.name.clone(),
                    object_name: entry.object_name.clone(),
                    running: entry.endpoint.is_running(),
                })
                .collect(),
        }
    }
}

/// Serializable view of the registry for external export.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub domain: String,
    pub channels: Vec<ChannelSnapshot>,
    pub handlers: Vec<HandlerSnapshot>,
    pub sources: Vec<SourceSnapshot>,
    pub endpoints: Vec<EndpointSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub name: String,
    pub object_name: String,
    pub provenance: Provenance,
    pub send: RateSnapshot,
    pub error: RateSnapshot,
    pub receive_count: u64,
    pub send_duration: Statistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandlerSnapshot {
    pub name: String,
    pub object_name: String,
    pub provenance: Provenance,
    pub active_count: usize,
    pub handle_count: u64,
    pub error_count: u64,
    pub duration: Statistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub name: String,
    pub object_name: String,
    pub provenance: Provenance,
    pub poll_count: u64,
    pub message_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    pub name: String,
    pub object_name: String,
    pub running: bool,
}
