//! Pull-capable channel backed by an in-memory queue.

use {
    crate::{
        Result,
        channel::{MessageChannel, PollableChannel},
    },
    async_trait::async_trait,
    relay_common::Message,
    std::{
        collections::VecDeque,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    },
    tokio::sync::{Mutex, Notify},
};

/// A queue-backed pollable channel, optionally bounded.
///
/// `send` on a full bounded queue waits for space. `receive` waits up to the
/// supplied timeout for a message. Depth is tracked separately so the
/// monitoring layer can read it without taking the queue lock.
pub struct QueueChannel {
    name: String,
    capacity: Option<usize>,
    queue: Mutex<VecDeque<Message>>,
    depth: AtomicUsize,
    not_empty: Notify,
    not_full: Notify,
}

impl QueueChannel {
    /// Create an unbounded queue channel.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity_opt(name, None)
    }

    /// Create a bounded queue channel.
    #[must_use]
    pub fn bounded(name: impl Into<String>, capacity: usize) -> Self {
        Self::with_capacity_opt(name, Some(capacity))
    }

    fn with_capacity_opt(name: impl Into<String>, capacity: Option<usize>) -> Self {
        Self {
            name: name.into(),
            capacity,
            queue: Mutex::new(VecDeque::new()),
            depth: AtomicUsize::new(0),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[async_trait]
impl MessageChannel for QueueChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: Message) -> Result<()> {
        let mut message = Some(message);
        loop {
            let space = self.not_full.notified();
            {
                let mut queue = self.queue.lock().await;
                if self.capacity.is_none_or(|cap| queue.len() < cap) {
                    if let Some(message) = message.take() {
                        queue.push_back(message);
                    }
                    self.depth.store(queue.len(), Ordering::Release);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }
            space.await;
        }
    }

    fn as_pollable(&self) -> Option<&dyn PollableChannel> {
        Some(self)
    }
}

#[async_trait]
impl PollableChannel for QueueChannel {
    async fn receive(&self, timeout: Option<Duration>) -> Result<Option<Message>> {
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            let available = self.not_empty.notified();
            {
                let mut queue = self.queue.lock().await;
                if let Some(message) = queue.pop_front() {
                    self.depth.store(queue.len(), Ordering::Release);
                    self.not_full.notify_one();
                    return Ok(Some(message));
                }
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Ok(None);
                    }
                    tokio::select! {
                        () = available => {},
                        () = tokio::time::sleep_until(deadline) => return Ok(None),
                    }
                },
                None => available.await,
            }
        }
    }

    fn queue_depth(&self) -> Option<usize> {
        Some(self.depth.load(Ordering::Acquire))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::sync::Arc};

    #[tokio::test]
    async fn receive_returns_queued_message() {
        let channel = QueueChannel::new("work");
        channel.send(Message::text("a")).await.unwrap();
        let received = channel.receive(Some(Duration::ZERO)).await.unwrap();
        assert_eq!(received.unwrap().payload_str(), Some("a"));
        assert_eq!(channel.queue_depth(), Some(0));
    }

    #[tokio::test]
    async fn zero_timeout_is_non_blocking() {
        let channel = QueueChannel::new("work");
        let received = channel.receive(Some(Duration::ZERO)).await.unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn receive_times_out_when_empty() {
        let channel = QueueChannel::new("work");
        let start = tokio::time::Instant::now();
        let received = channel
            .receive(Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(received.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn receive_wakes_on_late_send() {
        let channel = Arc::new(QueueChannel::new("work"));
        let sender = Arc::clone(&channel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sender.send(Message::text("late")).await.unwrap();
        });
        let received = channel
            .receive(Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(received.unwrap().payload_str(), Some("late"));
    }

    #[tokio::test]
    async fn bounded_send_waits_for_space() {
        let channel = Arc::new(QueueChannel::bounded("work", 1));
        channel.send(Message::text("first")).await.unwrap();

        let blocked = Arc::clone(&channel);
        let send_task = tokio::spawn(async move { blocked.send(Message::text("second")).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!send_task.is_finished());

        let first = channel.receive(Some(Duration::ZERO)).await.unwrap();
        assert_eq!(first.unwrap().payload_str(), Some("first"));
        send_task.await.unwrap().unwrap();
        assert_eq!(channel.queue_depth(), Some(1));
    }
}
