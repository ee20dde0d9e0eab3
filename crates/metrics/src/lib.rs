//! Runtime metrics for live components.
//!
//! Channels, handlers, and sources are wrapped with transparent counting
//! decorators as they are created; the [`MetricsRegistry`] later resolves
//! each wrapped component to a stable logical name (via the
//! [`IdentityResolver`], consulting the endpoint host) and publishes its
//! handle behind a glob-filtered, read-only query surface.

pub mod error;
pub mod handles;
pub mod instrument;
pub mod patterns;
pub mod registry;
pub mod resolver;
pub mod stats;

pub use {
    error::{Error, Result},
    handles::{ChannelMetrics, HandlerMetrics, SourceMetrics},
    instrument::{InstrumentedChannel, InstrumentedHandler, InstrumentedSource},
    patterns::NamePatterns,
    registry::{MetricsRegistry, RegistrySnapshot},
    resolver::{Identity, IdentityResolver, Provenance},
    stats::{DurationStats, RateMeter, RateSnapshot, Statistics},
};
