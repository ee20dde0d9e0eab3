//! The message-processing unit consumed by endpoints.

use {async_trait::async_trait, relay_common::Message, std::sync::Arc};

/// A unit of processing: consume one message, no return value.
///
/// A handler is exclusively owned by one endpoint after assembly. Decorators
/// (e.g. metrics interceptors) wrap a handler and report it through
/// [`MessageHandler::inner`] so identity checks can reach the physical
/// instance underneath.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> anyhow::Result<()>;

    /// The wrapped handler, when `self` is a decorator.
    fn inner(&self) -> Option<Arc<dyn MessageHandler>> {
        None
    }

    /// Whether a metrics interceptor is already present in the chain.
    fn is_instrumented(&self) -> bool {
        false
    }
}

/// Unwind decorator layers down to the physical handler instance.
#[must_use]
pub fn physical_handler(handler: &Arc<dyn MessageHandler>) -> Arc<dyn MessageHandler> {
    let mut current = Arc::clone(handler);
    while let Some(next) = current.inner() {
        current = next;
    }
    current
}

/// Reference identity of two handlers after unwrapping decorators.
#[must_use]
pub fn same_handler(a: &Arc<dyn MessageHandler>, b: &Arc<dyn MessageHandler>) -> bool {
    Arc::ptr_eq(&physical_handler(a), &physical_handler(b))
}
