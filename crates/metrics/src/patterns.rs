//! Operator-configured inclusion patterns for component names.

use crate::error::{Error, Result};

/// Ordered list of glob patterns deciding which resolved names enter the
/// registry. An empty list matches everything.
#[derive(Debug, Default, Clone)]
pub struct NamePatterns {
    patterns: Vec<glob::Pattern>,
}

impl NamePatterns {
    /// Match-all filter.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                glob::Pattern::new(pattern.as_ref()).map_err(|source| Error::InvalidPattern {
                    pattern: pattern.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn includes(&self, name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_matches_everything() {
        assert!(NamePatterns::all().includes("anything"));
    }

    #[test]
    fn globs_filter_by_prefix() {
        let patterns = NamePatterns::new(["order*"]).unwrap();
        assert!(patterns.includes("orderProcessor"));
        assert!(!patterns.includes("billingProcessor"));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        assert!(matches!(
            NamePatterns::new(["order[["]),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
