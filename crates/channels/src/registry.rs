//! Component directory mapping channel names to live channels.

use {
    crate::{Error, Result, channel::MessageChannel},
    std::{
        collections::HashMap,
        sync::{Arc, PoisonError, RwLock},
    },
    tracing::debug,
};

/// Registry of all live channels, shared by endpoints and monitoring.
///
/// Names are unique; registering a duplicate is a wiring error.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, Arc<dyn MessageChannel>>>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, channel: Arc<dyn MessageChannel>) -> Result<()> {
        let name = channel.name().to_string();
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if channels.contains_key(&name) {
            return Err(Error::DuplicateChannel { name });
        }
        debug!(channel = %name, "channel registered");
        channels.insert(name, channel);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn MessageChannel>> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, crate::queue::QueueChannel};

    #[test]
    fn duplicate_names_are_rejected() {
        let registry = ChannelRegistry::new();
        registry
            .register(Arc::new(QueueChannel::new("orders")))
            .unwrap();
        let err = registry
            .register(Arc::new(QueueChannel::new("orders")))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateChannel { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let registry = ChannelRegistry::new();
        registry
            .register(Arc::new(QueueChannel::new("orders")))
            .unwrap();
        assert!(registry.get("orders").is_some());
        assert!(registry.get("billing").is_none());
    }
}
