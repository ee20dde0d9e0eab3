use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed transport errors raised by channel primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Send on a push channel with nothing subscribed.
    #[error("channel `{channel}` has no subscribers")]
    NoSubscribers { channel: String },

    /// Pull operation attempted on a channel without pull capability.
    #[error("channel `{channel}` is not pollable")]
    NotPollable { channel: String },

    /// Subscribe attempted on a channel without push capability.
    #[error("channel `{channel}` is not subscribable")]
    NotSubscribable { channel: String },

    /// A subscriber failed while a push channel was delivering to it.
    #[error("subscriber on channel `{channel}` failed: {source}")]
    Dispatch {
        channel: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Registry already holds a channel under this name.
    #[error("channel `{name}` is already registered")]
    DuplicateChannel { name: String },
}

impl Error {
    #[must_use]
    pub fn no_subscribers(channel: impl Into<String>) -> Self {
        Self::NoSubscribers {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn not_pollable(channel: impl Into<String>) -> Self {
        Self::NotPollable {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn not_subscribable(channel: impl Into<String>) -> Self {
        Self::NotSubscribable {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn dispatch(channel: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Dispatch {
            channel: channel.into(),
            source: source.into(),
        }
    }
}
