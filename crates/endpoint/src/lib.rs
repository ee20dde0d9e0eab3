//! Endpoint assembly: binds a message handler (or source) to a channel,
//! choosing event-driven or polling dispatch from the channel's capability.
//!
//! The [`EndpointFactory`] performs one-time, lock-serialized assembly per
//! endpoint definition; the [`EndpointHost`] owns the channel directory, the
//! process-wide default [`PollingPolicy`], and the ordered set of endpoints
//! that monitoring enumerates.

pub mod advice;
pub mod endpoint;
pub mod error;
pub mod event_driven;
pub mod executor;
pub mod factory;
pub mod host;
mod poller;
pub mod policy;
pub mod polling;
pub mod source_adapter;
pub mod transaction;
pub mod trigger;

pub use {
    advice::{DispatchAdvice, DispatchAttempt, RetryAdvice, apply_advice_chain},
    endpoint::{Endpoint, EndpointWiring},
    error::{Error, Result},
    event_driven::EventDrivenEndpoint,
    executor::DispatchExecutor,
    factory::EndpointFactory,
    host::EndpointHost,
    policy::PollingPolicy,
    polling::PollingEndpoint,
    source_adapter::SourcePollingAdapter,
    transaction::TransactionBoundary,
    trigger::{PeriodicTrigger, Trigger, TriggerContext},
};
