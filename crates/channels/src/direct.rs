//! Push-capable channel delivering directly to subscribers.

use {
    crate::{
        Error, Result,
        channel::{MessageChannel, SubscribableChannel},
        handler::{MessageHandler, same_handler},
    },
    async_trait::async_trait,
    relay_common::Message,
    std::sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    tracing::debug,
};

/// A point-to-point push channel.
///
/// `send` dispatches the message to exactly one subscriber, rotating through
/// subscribers round-robin when more than one is registered. Delivery happens
/// on the sender's task; a failing subscriber fails the send.
pub struct DirectChannel {
    name: String,
    subscribers: RwLock<Vec<Arc<dyn MessageHandler>>>,
    cursor: AtomicUsize,
}

impl DirectChannel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    fn next_subscriber(&self) -> Option<Arc<dyn MessageHandler>> {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if subscribers.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % subscribers.len();
        Some(Arc::clone(&subscribers[index]))
    }
}

#[async_trait]
impl MessageChannel for DirectChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: Message) -> Result<()> {
        let handler = self
            .next_subscriber()
            .ok_or_else(|| Error::no_subscribers(&self.name))?;
        handler
            .handle(message)
            .await
            .map_err(|source| Error::dispatch(&self.name, source))
    }

    fn as_subscribable(&self) -> Option<&dyn SubscribableChannel> {
        Some(self)
    }
}

impl SubscribableChannel for DirectChannel {
    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.push(handler);
        debug!(channel = %self.name, count = subscribers.len(), "subscriber added");
        Ok(())
    }

    fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|existing| !same_handler(existing, handler));
        before != subscribers.len()
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    struct CountingHandler {
        handled: AtomicUsize,
    }

    #[async_trait]
    impl MessageHandler for CountingHandler {
        async fn handle(&self, _message: Message) -> anyhow::Result<()> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn send_without_subscribers_fails() {
        let channel = DirectChannel::new("orders");
        let err = channel.send(Message::text("x")).await.unwrap_err();
        assert!(matches!(err, Error::NoSubscribers { .. }));
    }

    #[tokio::test]
    async fn round_robin_across_subscribers() {
        let channel = DirectChannel::new("orders");
        let a = Arc::new(CountingHandler {
            handled: AtomicUsize::new(0),
        });
        let b = Arc::new(CountingHandler {
            handled: AtomicUsize::new(0),
        });
        channel.subscribe(a.clone()).unwrap();
        channel.subscribe(b.clone()).unwrap();

        for _ in 0..4 {
            channel.send(Message::text("m")).await.unwrap();
        }
        assert_eq!(a.handled.load(Ordering::SeqCst), 2);
        assert_eq!(b.handled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unsubscribe_removes_by_identity() {
        let channel = DirectChannel::new("orders");
        let a: Arc<dyn MessageHandler> = Arc::new(CountingHandler {
            handled: AtomicUsize::new(0),
        });
        channel.subscribe(a.clone()).unwrap();
        assert!(channel.unsubscribe(&a));
        assert!(!channel.unsubscribe(&a));
        assert_eq!(channel.subscriber_count(), 0);
    }
}
