//! Message channels and the processing-unit traits that consume them.
//!
//! A channel is either push-capable ([`SubscribableChannel`]: it delivers to
//! registered handlers) or pull-capable ([`PollableChannel`]: consumers
//! retrieve with an optional timeout). Capability is probed through the
//! `as_subscribable` / `as_pollable` accessors rather than downcasting, so
//! decorators can forward it transparently.

pub mod channel;
pub mod direct;
pub mod error;
pub mod handler;
pub mod queue;
pub mod registry;
pub mod source;

pub use {
    channel::{MessageChannel, PollableChannel, SubscribableChannel, physical_channel},
    direct::DirectChannel,
    error::{Error, Result},
    handler::{MessageHandler, physical_handler, same_handler},
    queue::QueueChannel,
    registry::ChannelRegistry,
    source::{MessageSource, physical_source, same_source},
};
