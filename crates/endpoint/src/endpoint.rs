//! The endpoint contract and wiring introspection.

use {
    crate::error::Result,
    async_trait::async_trait,
    relay_channels::{MessageHandler, MessageSource},
    std::sync::Arc,
};

/// What a live endpoint wraps, exposed as plain accessors so monitoring can
/// resolve component identity without peeking into private state.
#[derive(Clone, Default)]
pub struct EndpointWiring {
    pub handler: Option<Arc<dyn MessageHandler>>,
    pub source: Option<Arc<dyn MessageSource>>,
    /// Name of the channel the endpoint consumes from.
    pub input_channel: Option<String>,
    /// Name of the channel the endpoint produces into.
    pub output_channel: Option<String>,
}

/// A runnable binding of a processing unit to a channel.
#[async_trait]
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;

    fn is_auto_startup(&self) -> bool;

    /// Start-order phase; lower phases start first and stop last.
    fn phase(&self) -> i32;

    fn is_running(&self) -> bool;

    async fn start(&self) -> Result<()>;

    /// Stop the endpoint. Idempotent; returns once any in-flight work has
    /// completed.
    async fn stop(&self);

    /// Stop and invoke `callback` exactly once after the endpoint has fully
    /// stopped.
    async fn stop_with_callback(&self, callback: Box<dyn FnOnce() + Send>) {
        self.stop().await;
        callback();
    }

    /// Wiring introspection for monitoring and name resolution.
    fn wiring(&self) -> EndpointWiring;
}
