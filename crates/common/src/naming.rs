//! Component naming conventions shared by the endpoint host and the metrics
//! registry.
//!
//! Components declared without an explicit name receive a generated name
//! under [`GENERATED_COMPONENT_PREFIX`]. Components the framework wires for
//! its own use carry [`INTERNAL_COMPONENT_PREFIX`]; monitoring strips that
//! prefix before exposing the name.

/// Prefix of framework-internal component names (note the leading underscore).
pub const INTERNAL_COMPONENT_PREFIX: &str = "_org.example.internal";

/// Prefix of auto-generated names for anonymously declared components.
pub const GENERATED_COMPONENT_PREFIX: &str = "org.example.internal";

/// Strip the internal prefix (and its trailing dot) from a component name.
///
/// Returns `None` when the name is not internal.
#[must_use]
pub fn strip_internal_prefix(name: &str) -> Option<&str> {
    name.strip_prefix(INTERNAL_COMPONENT_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|rest| !rest.is_empty())
}

/// Whether a name was auto-generated for an anonymously declared component.
#[must_use]
pub fn is_generated_name(name: &str) -> bool {
    name.starts_with(GENERATED_COMPONENT_PREFIX) && !name.starts_with(INTERNAL_COMPONENT_PREFIX)
}

/// Build a generated name for the `index`-th anonymous component of `kind`.
#[must_use]
pub fn generated_name(kind: &str, index: usize) -> String {
    format!("{GENERATED_COMPONENT_PREFIX}.{kind}#{index}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn strips_internal_prefix() {
        assert_eq!(strip_internal_prefix("_org.example.internal.foo"), Some("foo"));
        assert_eq!(
            strip_internal_prefix("_org.example.internal.errorLogger"),
            Some("errorLogger")
        );
        assert_eq!(strip_internal_prefix("orderProcessor"), None);
        assert_eq!(strip_internal_prefix("_org.example.internal"), None);
    }

    #[test]
    fn classifies_generated_names() {
        assert!(is_generated_name(&generated_name("endpoint", 0)));
        assert!(!is_generated_name("_org.example.internal.foo"));
        assert!(!is_generated_name("orderProcessor"));
    }
}
