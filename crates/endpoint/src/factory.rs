//! Lazy, idempotent endpoint assembly from a definition.

use {
    crate::{
        endpoint::Endpoint,
        error::{Error, Result},
        event_driven::EventDrivenEndpoint,
        host::EndpointHost,
        policy::PollingPolicy,
        polling::PollingEndpoint,
    },
    relay_channels::{MessageChannel, MessageHandler},
    std::sync::{Arc, PoisonError, RwLock},
    tokio::sync::Mutex,
    tracing::debug,
};

/// An endpoint definition plus the lazily assembled endpoint.
///
/// Assembly runs at most once, serialized by a dedicated lock: concurrent
/// callers block until the first assembly completes, then observe the same
/// endpoint instance. Before assembly, lifecycle queries return safe
/// defaults and start/stop are no-ops.
pub struct EndpointFactory {
    name: String,
    input_channel: String,
    handler: Arc<dyn MessageHandler>,
    policy: Option<PollingPolicy>,
    error_channel: Option<String>,
    auto_startup: bool,
    phase: i32,
    assembly_lock: Mutex<()>,
    built: RwLock<Option<Arc<dyn Endpoint>>>,
}

impl EndpointFactory {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
        input_channel: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_channel: input_channel.into(),
            handler,
            policy: None,
            error_channel: None,
            auto_startup: true,
            phase: 0,
            assembly_lock: Mutex::new(()),
            built: RwLock::new(None),
        }
    }

    /// Definition without a declared name; the host assigns a generated one
    /// at registration.
    #[must_use]
    pub fn anonymous(handler: Arc<dyn MessageHandler>, input_channel: impl Into<String>) -> Self {
        Self::new(String::new(), handler, input_channel)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PollingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_error_channel(mut self, channel: impl Into<String>) -> Self {
        self.error_channel = Some(channel.into());
        self
    }

    #[must_use]
    pub fn with_auto_startup(mut self, auto_startup: bool) -> Self {
        self.auto_startup = auto_startup;
        self
    }

    #[must_use]
    pub fn with_phase(mut self, phase: i32) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub(crate) fn handler(&self) -> &Arc<dyn MessageHandler> {
        &self.handler
    }

    /// The assembled endpoint, when assembly has happened.
    #[must_use]
    pub fn assembled(&self) -> Option<Arc<dyn Endpoint>> {
        self.built
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Assemble the endpoint, or return the previously assembled instance.
    pub async fn endpoint(&self, host: &EndpointHost) -> Result<Arc<dyn Endpoint>> {
        if let Some(endpoint) = self.assembled() {
            return Ok(endpoint);
        }
        let _guard = self.assembly_lock.lock().await;
        if let Some(endpoint) = self.assembled() {
            return Ok(endpoint);
        }
        let endpoint = self.assemble(host)?;
        debug!(endpoint = %self.name, "endpoint assembled");
        *self.built.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::clone(&endpoint));
        Ok(endpoint)
    }

    fn assemble(&self, host: &EndpointHost) -> Result<Arc<dyn Endpoint>> {
        let channel = host.channels().get(&self.input_channel).ok_or_else(|| {
            Error::configuration(
                &self.name,
                format!("no such input channel `{}`", self.input_channel),
            )
        })?;
        let error_channel = self.resolve_error_channel(host)?;

        if channel.as_subscribable().is_some() {
            if self.policy.is_some() {
                return Err(Error::configuration(
                    &self.name,
                    format!(
                        "a polling policy must not be supplied: channel `{}` is push-capable",
                        self.input_channel
                    ),
                ));
            }
            let endpoint = EventDrivenEndpoint::new(
                &self.name,
                channel,
                Arc::clone(&self.handler),
                self.auto_startup,
                self.phase,
            )?;
            Ok(Arc::new(endpoint))
        } else if channel.as_pollable().is_some() {
            let policy = match self.policy.clone().or_else(|| host.default_policy()) {
                Some(policy) => policy,
                None => {
                    return Err(Error::configuration(
                        &self.name,
                        "no polling policy supplied and no default policy configured",
                    ));
                },
            };
            let endpoint = PollingEndpoint::new(
                &self.name,
                channel,
                Arc::clone(&self.handler),
                policy,
                error_channel,
                self.auto_startup,
                self.phase,
            )?;
            Ok(Arc::new(endpoint))
        } else {
            Err(Error::configuration(
                &self.name,
                format!("unsupported channel type: `{}`", self.input_channel),
            ))
        }
    }

    fn resolve_error_channel(
        &self,
        host: &EndpointHost,
    ) -> Result<Option<Arc<dyn MessageChannel>>> {
        match &self.error_channel {
            Some(name) => host.channels().get(name).map(Some).ok_or_else(|| {
                Error::configuration(&self.name, format!("no such error channel `{name}`"))
            }),
            None => Ok(None),
        }
    }

    // Lifecycle delegation: forwards to the endpoint once assembled,
    // safe defaults before.

    #[must_use]
    pub fn is_auto_startup(&self) -> bool {
        self.assembled()
            .map_or(self.auto_startup, |endpoint| endpoint.is_auto_startup())
    }

    #[must_use]
    pub fn phase(&self) -> i32 {
        self.assembled().map_or(self.phase, |endpoint| endpoint.phase())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.assembled().is_some_and(|endpoint| endpoint.is_running())
    }

    pub async fn start(&self) -> Result<()> {
        match self.assembled() {
            Some(endpoint) => endpoint.start().await,
            None => Ok(()),
        }
    }

    pub async fn stop(&self) {
        if let Some(endpoint) = self.assembled() {
            endpoint.stop().await;
        }
    }

    pub async fn stop_with_callback(&self, callback: Box<dyn FnOnce() + Send>) {
        match self.assembled() {
            Some(endpoint) => endpoint.stop_with_callback(callback).await,
            None => callback(),
        }
    }
}
