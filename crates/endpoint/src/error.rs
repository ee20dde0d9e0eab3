use std::error::Error as StdError;

/// Crate-wide result type for endpoint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Endpoint error taxonomy.
///
/// Configuration errors are fatal to assembly and surface synchronously to
/// the caller. Dispatch and transport errors are isolated per poll cycle;
/// the polling loop survives them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or missing wiring detected at assembly time.
    #[error("endpoint `{endpoint}`: {message}")]
    Configuration { endpoint: String, message: String },

    /// A handler or source invocation failed during a poll cycle.
    #[error("dispatch failed: {source}")]
    Dispatch {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A channel primitive failed mid-cycle.
    #[error(transparent)]
    Transport(#[from] relay_channels::Error),
}

impl Error {
    #[must_use]
    pub fn configuration(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn dispatch(source: anyhow::Error) -> Self {
        Self::Dispatch {
            source: source.into(),
        }
    }

    /// Whether the polling loop should stop rather than continue to the next
    /// cycle. Only wiring defects qualify.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
