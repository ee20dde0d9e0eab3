//! Pollable message producers.

use {async_trait::async_trait, relay_common::Message, std::sync::Arc};

/// A message producer polled by a source-polling adapter.
///
/// `receive` returns `Ok(None)` when nothing is currently available; the
/// adapter's trigger decides when to poll again.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn receive(&self) -> anyhow::Result<Option<Message>>;

    /// The wrapped source, when `self` is a decorator.
    fn inner(&self) -> Option<Arc<dyn MessageSource>> {
        None
    }

    /// Whether a metrics interceptor is already present in the chain.
    fn is_instrumented(&self) -> bool {
        false
    }
}

/// Unwind decorator layers down to the physical source instance.
#[must_use]
pub fn physical_source(source: &Arc<dyn MessageSource>) -> Arc<dyn MessageSource> {
    let mut current = Arc::clone(source);
    while let Some(next) = current.inner() {
        current = next;
    }
    current
}

/// Reference identity of two sources after unwrapping decorators.
#[must_use]
pub fn same_source(a: &Arc<dyn MessageSource>, b: &Arc<dyn MessageSource>) -> bool {
    Arc::ptr_eq(&physical_source(a), &physical_source(b))
}
