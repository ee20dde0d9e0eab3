//! Source-polling adapter: polls a message source and sends the result into
//! an output channel.

use {
    crate::{
        advice::DispatchAttempt,
        endpoint::{Endpoint, EndpointWiring},
        error::{Error, Result},
        poller::{FailureSink, Poller},
        policy::PollingPolicy,
    },
    async_trait::async_trait,
    relay_channels::{MessageChannel, MessageSource},
    std::sync::Arc,
    tracing::{error, info},
};

pub struct SourcePollingAdapter {
    name: String,
    source: Arc<dyn MessageSource>,
    output_channel: Arc<dyn MessageChannel>,
    auto_startup: bool,
    phase: i32,
    poller: Arc<Poller>,
}

impl SourcePollingAdapter {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn MessageSource>,
        output_channel: Arc<dyn MessageChannel>,
        policy: PollingPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            output_channel,
            auto_startup: true,
            phase: 0,
            poller: Arc::new(Poller::new(policy)),
        }
    }

    /// Adapter registered without a declared name; the host assigns a
    /// generated one.
    #[must_use]
    pub fn anonymous(
        source: Arc<dyn MessageSource>,
        output_channel: Arc<dyn MessageChannel>,
        policy: PollingPolicy,
    ) -> Self {
        Self::new(String::new(), source, output_channel, policy)
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

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    fn dispatch_attempt(&self) -> DispatchAttempt {
        let source = Arc::clone(&self.source);
        let channel = Arc::clone(&self.output_channel);
        Arc::new(move || {
            let source = Arc::clone(&source);
            let channel = Arc::clone(&channel);
            Box::pin(async move {
                let Some(message) = source.receive().await.map_err(Error::dispatch)? else {
                    return Ok(false);
                };
                channel.send(message).await?;
                Ok(true)
            })
        })
    }

    fn failure_sink(&self) -> FailureSink {
        let name = self.name.clone();
        Arc::new(move |err: Error| {
            let name = name.clone();
            Box::pin(async move {
                error!(endpoint = %name, error = %err, "source poll cycle failed");
            })
        })
    }
}

#[async_trait]
impl Endpoint for SourcePollingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_auto_startup(&self) -> bool {
        self.auto_startup
    }

    fn phase(&self) -> i32 {
        self.phase
    }

    fn is_running(&self) -> bool {
        self.poller.is_running()
    }

    async fn start(&self) -> Result<()> {
        self.poller
            .start(self.name.clone(), self.dispatch_attempt(), self.failure_sink())
            .await;
        info!(endpoint = %self.name, channel = %self.output_channel.name(), "source adapter started");
        Ok(())
    }

    async fn stop(&self) {
        self.poller.stop().await;
        info!(endpoint = %self.name, "source adapter stopped");
    }

    fn wiring(&self) -> EndpointWiring {
        EndpointWiring {
            source: Some(Arc::clone(&self.source)),
            output_channel: Some(self.output_channel.name().to_string()),
            ..EndpointWiring::default()
        }
    }
}
