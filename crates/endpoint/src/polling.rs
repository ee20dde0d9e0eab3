//! Polling consumer: pulls from a pull-capable channel and dispatches to the
//! handler on a trigger-driven loop.

use {
    crate::{
        advice::DispatchAttempt,
        endpoint::{Endpoint, EndpointWiring},
        error::{Error, Result},
        poller::{FailureSink, Poller},
        policy::PollingPolicy,
    },
    async_trait::async_trait,
    relay_channels::{MessageChannel, MessageHandler},
    relay_common::Message,
    std::sync::Arc,
    tracing::{error, info, warn},
};

pub struct PollingEndpoint {
    name: String,
    channel: Arc<dyn MessageChannel>,
    handler: Arc<dyn MessageHandler>,
    error_channel: Option<Arc<dyn MessageChannel>>,
    auto_startup: bool,
    phase: i32,
    poller: Arc<Poller>,
}

impl PollingEndpoint {
    pub fn new(
        name: impl Into<String>,
        channel: Arc<dyn MessageChannel>,
        handler: Arc<dyn MessageHandler>,
        policy: PollingPolicy,
        error_channel: Option<Arc<dyn MessageChannel>>,
        auto_startup: bool,
        phase: i32,
    ) -> Result<Self> {
        let name = name.into();
        if channel.as_pollable().is_none() {
            return Err(Error::configuration(
                &name,
                format!("channel `{}` is not pull-capable", channel.name()),
            ));
        }
        Ok(Self {
            name,
            channel,
            handler,
            error_channel,
            auto_startup,
            phase,
            poller: Arc::new(Poller::new(policy)),
        })
    }

    /// One pull-dispatch pair; the advice chain wraps this closure.
    fn dispatch_attempt(&self) -> DispatchAttempt {
        let channel = Arc::clone(&self.channel);
        let handler = Arc::clone(&self.handler);
        let name = self.name.clone();
        let timeout = self.poller.policy().receive_timeout;
        let executor = self.poller.policy().executor.clone();
        Arc::new(move || {
            let channel = Arc::clone(&channel);
            let handler = Arc::clone(&handler);
            let name = name.clone();
            let executor = executor.clone();
            Box::pin(async move {
                let pollable = channel
                    .as_pollable()
                    .ok_or_else(|| Error::configuration(&name, "channel lost pull capability"))?;
                let Some(message) = pollable.receive(Some(timeout)).await? else {
                    return Ok(false);
                };
                let _slot = match &executor {
                    Some(executor) => executor.acquire().await,
                    None => None,
                };
                handler.handle(message).await.map_err(Error::dispatch)?;
                Ok(true)
            })
        })
    }

    fn failure_sink(&self) -> FailureSink {
        let name = self.name.clone();
        let error_channel = self.error_channel.clone();
        Arc::new(move |err: Error| {
            let name = name.clone();
            let error_channel = error_channel.clone();
            Box::pin(async move {
                error!(endpoint = %name, error = %err, "poll cycle failed");
                if let Some(channel) = error_channel {
                    let report = Message::text(err.to_string()).with_header("endpoint", name.clone());
                    if let Err(send_err) = channel.send(report).await {
                        warn!(endpoint = %name, error = %send_err, "failed to publish to error channel");
                    }
                }
            })
        })
    }
}

#[async_trait]
impl Endpoint for PollingEndpoint {
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
        info!(endpoint = %self.name, channel = %self.channel.name(), "polling endpoint started");
        Ok(())
    }

    async fn stop(&self) {
        self.poller.stop().await;
        info!(endpoint = %self.name, "polling endpoint stopped");
    }

    fn wiring(&self) -> EndpointWiring {
        EndpointWiring {
            handler: Some(Arc::clone(&self.handler)),
            input_channel: Some(self.channel.name().to_string()),
            ..EndpointWiring::default()
        }
    }
}
