//! Event-driven consumer: the handler subscribes to a push-capable channel.

use {
    crate::{
        endpoint::{Endpoint, EndpointWiring},
        error::{Error, Result},
    },
    async_trait::async_trait,
    relay_channels::{MessageChannel, MessageHandler},
    std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    tracing::info,
};

/// Registers its handler as a channel subscriber on start and removes it on
/// stop. Delivery happens on the sender's task; the endpoint itself owns no
/// loop.
pub struct EventDrivenEndpoint {
    name: String,
    channel: Arc<dyn MessageChannel>,
    handler: Arc<dyn MessageHandler>,
    auto_startup: bool,
    phase: i32,
    running: AtomicBool,
}

impl EventDrivenEndpoint {
    pub fn new(
        name: impl Into<String>,
        channel: Arc<dyn MessageChannel>,
        handler: Arc<dyn MessageHandler>,
        auto_startup: bool,
        phase: i32,
    ) -> Result<Self> {
        let name = name.into();
        if channel.as_subscribable().is_none() {
            return Err(Error::configuration(
                &name,
                format!("channel `{}` is not push-capable", channel.name()),
            ));
        }
        Ok(Self {
            name,
            channel,
            handler,
            auto_startup,
            phase,
            running: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Endpoint for EventDrivenEndpoint {
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
        self.running.load(Ordering::Acquire)
    }

    async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let subscribed = self
            .channel
            .as_subscribable()
            .ok_or_else(|| Error::configuration(&self.name, "channel lost push capability"))
            .and_then(|subscribable| {
                subscribable
                    .subscribe(Arc::clone(&self.handler))
                    .map_err(Error::from)
            });
        if let Err(err) = subscribed {
            self.running.store(false, Ordering::SeqCst);
            return Err(err);
        }
        info!(endpoint = %self.name, channel = %self.channel.name(), "event-driven endpoint started");
        Ok(())
    }

    async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(subscribable) = self.channel.as_subscribable() {
            subscribable.unsubscribe(&self.handler);
        }
        info!(endpoint = %self.name, "event-driven endpoint stopped");
    }

    fn wiring(&self) -> EndpointWiring {
        EndpointWiring {
            handler: Some(Arc::clone(&self.handler)),
            input_channel: Some(self.channel.name().to_string()),
            ..EndpointWiring::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        relay_channels::{Error as ChannelError, SubscribableChannel},
        relay_common::Message,
    };

    struct NoopHandler;

    #[async_trait]
    impl MessageHandler for NoopHandler {
        async fn handle(&self, _message: Message) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Push-capable channel that refuses every subscription.
    struct RefusingChannel;

    #[async_trait]
    impl MessageChannel for RefusingChannel {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn send(&self, _message: Message) -> relay_channels::Result<()> {
            Err(ChannelError::no_subscribers("refusing"))
        }

        fn as_subscribable(&self) -> Option<&dyn SubscribableChannel> {
            Some(self)
        }
    }

    impl SubscribableChannel for RefusingChannel {
        fn subscribe(&self, _handler: Arc<dyn MessageHandler>) -> relay_channels::Result<()> {
            Err(ChannelError::not_subscribable("refusing"))
        }

        fn unsubscribe(&self, _handler: &Arc<dyn MessageHandler>) -> bool {
            false
        }

        fn subscriber_count(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn failed_subscription_leaves_endpoint_stopped() {
        let endpoint = EventDrivenEndpoint::new(
            "refused",
            Arc::new(RefusingChannel),
            Arc::new(NoopHandler),
            true,
            0,
        )
        .unwrap();

        assert!(endpoint.start().await.is_err());
        assert!(!endpoint.is_running());
        // A later start must attempt the subscription again, not short-circuit
        // on a stale running flag.
        assert!(endpoint.start().await.is_err());
    }
}
