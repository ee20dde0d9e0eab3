//! The host that owns channels, the default polling policy, and the ordered
//! endpoint set.

use {
    crate::{
        endpoint::Endpoint,
        error::{Error, Result},
        factory::EndpointFactory,
        policy::PollingPolicy,
        source_adapter::SourcePollingAdapter,
    },
    relay_channels::{ChannelRegistry, same_handler},
    std::sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    tracing::info,
};

enum HostEntry {
    Consumer(Arc<EndpointFactory>),
    Adapter(Arc<SourcePollingAdapter>),
}

/// Hosts the component directory and every endpoint definition.
///
/// Endpoints are kept in registration order; monitoring enumerates them in
/// that order, which makes identity resolution deterministic for a fixed
/// component set.
#[derive(Default)]
pub struct EndpointHost {
    channels: ChannelRegistry,
    default_policy: RwLock<Option<PollingPolicy>>,
    entries: RwLock<Vec<HostEntry>>,
    generated: AtomicUsize,
}

impl EndpointHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Process-wide fallback policy for pull endpoints registered without one.
    pub fn set_default_policy(&self, policy: PollingPolicy) {
        *self
            .default_policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(policy);
    }

    #[must_use]
    pub fn default_policy(&self) -> Option<PollingPolicy> {
        self.default_policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a consumer endpoint definition.
    ///
    /// Anonymous definitions receive a generated name. A handler instance may
    /// back at most one endpoint; reuse is a wiring error.
    pub fn add_consumer(&self, mut factory: EndpointFactory) -> Result<Arc<EndpointFactory>> {
        if !factory.has_name() {
            factory.set_name(self.next_generated_name("endpoint"));
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.iter() {
            if let HostEntry::Consumer(existing) = entry {
                if existing.name() == factory.name() {
                    return Err(Error::configuration(
                        factory.name(),
                        "an endpoint with this name is already registered",
                    ));
                }
                if same_handler(existing.handler(), factory.handler()) {
                    return Err(Error::configuration(
                        factory.name(),
                        format!(
                            "handler is already bound to endpoint `{}`",
                            existing.name()
                        ),
                    ));
                }
            }
        }
        let factory = Arc::new(factory);
        entries.push(HostEntry::Consumer(Arc::clone(&factory)));
        info!(endpoint = %factory.name(), "consumer endpoint registered");
        Ok(factory)
    }

    /// Register a source-polling adapter.
    pub fn add_source_adapter(
        &self,
        mut adapter: SourcePollingAdapter,
    ) -> Result<Arc<SourcePollingAdapter>> {
        if !adapter.has_name() {
            adapter.set_name(self.next_generated_name("adapter"));
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let adapter = Arc::new(adapter);
        entries.push(HostEntry::Adapter(Arc::clone(&adapter)));
        info!(endpoint = %adapter.name(), "source adapter registered");
        Ok(adapter)
    }

    fn next_generated_name(&self, kind: &str) -> String {
        relay_common::naming::generated_name(kind, self.generated.fetch_add(1, Ordering::Relaxed))
    }

    /// Live endpoints in registration order. Consumers that have not been
    /// assembled yet are skipped.
    #[must_use]
    pub fn endpoints(&self) -> Vec<Arc<dyn Endpoint>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter_map(|entry| match entry {
                HostEntry::Consumer(factory) => factory.assembled(),
                HostEntry::Adapter(adapter) => Some(Arc::clone(adapter) as Arc<dyn Endpoint>),
            })
            .collect()
    }

    /// Assemble every registered consumer endpoint.
    pub async fn assemble_all(&self) -> Result<()> {
        let consumers: Vec<Arc<EndpointFactory>> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter_map(|entry| match entry {
                    HostEntry::Consumer(factory) => Some(Arc::clone(factory)),
                    HostEntry::Adapter(_) => None,
                })
                .collect()
        };
        for factory in consumers {
            factory.endpoint(self).await?;
        }
        Ok(())
    }

    /// Assemble everything, then start auto-startup endpoints in ascending
    /// phase order.
    pub async fn start_all(&self) -> Result<()> {
        self.assemble_all().await?;
        let mut endpoints = self.endpoints();
        endpoints.sort_by_key(|endpoint| endpoint.phase());
        for endpoint in endpoints {
            if endpoint.is_auto_startup() && !endpoint.is_running() {
                endpoint.start().await?;
            }
        }
        Ok(())
    }

    /// Stop every running endpoint in descending phase order.
    pub async fn stop_all(&self) {
        let mut endpoints = self.endpoints();
        endpoints.sort_by_key(|endpoint| std::cmp::Reverse(endpoint.phase()));
        for endpoint in endpoints {
            if endpoint.is_running() {
                endpoint.stop().await;
            }
        }
    }
}
