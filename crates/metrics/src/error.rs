/// Crate-wide result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or populating the metrics registry.
///
/// Identity resolution has no error variant: it always degrades to a
/// fallback name instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An entry under this name already exists in the registry.
    #[error("component `{name}` is already registered")]
    DuplicateRegistration { name: String },

    /// An operator-supplied inclusion pattern failed to parse.
    #[error("invalid component name pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl Error {
    #[must_use]
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateRegistration { name: name.into() }
    }
}
