//! Logical-name resolution for components that were never given one.
//!
//! A handler or source created inline inside a larger wiring graph has no
//! explicit name. The resolver walks the endpoints known to the host, finds
//! the one wrapping the component (by reference identity after unwrapping
//! decorator layers), and derives a stable name plus a provenance tag from
//! the endpoint's own naming. Endpoints are enumerated in host registration
//! order, so resolution is deterministic for a fixed component set and the
//! first matching endpoint wins.

use {
    relay_channels::{MessageHandler, MessageSource, same_handler, same_source},
    relay_common::naming::{is_generated_name, strip_internal_prefix},
    relay_endpoint::Endpoint,
    serde::Serialize,
    std::{collections::HashMap, fmt, sync::Arc},
    tracing::debug,
};

/// How a component's logical name was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// The enclosing endpoint's declared name.
    Endpoint,
    /// A framework-internal endpoint name, exposed with its prefix stripped.
    Internal,
    /// Derived by position from the channel an anonymous endpoint touches.
    Anonymous,
    /// No enclosing endpoint was found; the name is a stringified identity.
    HandlerFallback,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Endpoint => "endpoint",
            Self::Internal => "internal",
            Self::Anonymous => "anonymous",
            Self::HandlerFallback => "handler-fallback",
        })
    }
}

/// A resolved component identity: logical name plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub name: String,
    pub provenance: Provenance,
}

impl Identity {
    #[must_use]
    pub fn new(name: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            name: name.into(),
            provenance,
        }
    }
}

/// Identity for a channel, which always carries an explicit name.
#[must_use]
pub fn channel_identity(name: &str) -> Identity {
    match strip_internal_prefix(name) {
        Some(stripped) => Identity::new(stripped, Provenance::Internal),
        None => Identity::new(name, Provenance::Endpoint),
    }
}

/// Resolves component identities against the set of known endpoints.
///
/// Holds the per-channel counters that disambiguate anonymous names and the
/// component-to-endpoint association table. Both are discovery-order state
/// and are cleared when the registry deactivates.
#[derive(Default)]
pub struct IdentityResolver {
    anonymous_uses: HashMap<String, usize>,
    associations: HashMap<String, String>,
}

impl IdentityResolver {
    /// Resolve a handler's identity, returning the enclosing endpoint when
    /// one was found so the caller can wire lifecycle control through it.
    pub fn resolve_handler(
        &mut self,
        handler: &Arc<dyn MessageHandler>,
        endpoints: &[Arc<dyn Endpoint>],
    ) -> (Identity, Option<Arc<dyn Endpoint>>) {
        for endpoint in endpoints {
            let wiring = endpoint.wiring();
            let Some(candidate) = wiring.handler else {
                continue;
            };
            if !same_handler(&candidate, handler) {
                continue;
            }
            let identity = self.endpoint_identity(endpoint.name(), wiring.input_channel.as_deref());
            self.record_association(&identity.name, endpoint.name());
            return (identity, Some(Arc::clone(endpoint)));
        }
        let name = format!("handler@{:p}", Arc::as_ptr(handler));
        debug!(name = %name, "no endpoint wraps this handler; using fallback identity");
        (Identity::new(name, Provenance::HandlerFallback), None)
    }

    /// Resolve a source's identity. Anonymous sources are named after the
    /// output channel their adapter feeds.
    pub fn resolve_source(
        &mut self,
        source: &Arc<dyn MessageSource>,
        endpoints: &[Arc<dyn Endpoint>],
    ) -> (Identity, Option<Arc<dyn Endpoint>>) {
        for endpoint in endpoints {
            let wiring = endpoint.wiring();
            let Some(candidate) = wiring.source else {
                continue;
            };
            if !same_source(&candidate, source) {
                continue;
            }
            let identity =
                self.endpoint_identity(endpoint.name(), wiring.output_channel.as_deref());
            self.record_association(&identity.name, endpoint.name());
            return (identity, Some(Arc::clone(endpoint)));
        }
        let name = format!("source@{:p}", Arc::as_ptr(source));
        debug!(name = %name, "no endpoint wraps this source; using fallback identity");
        (Identity::new(name, Provenance::HandlerFallback), None)
    }

    /// The endpoint a resolved name was traced back to, for diagnostics.
    #[must_use]
    pub fn association(&self, name: &str) -> Option<&str> {
        self.associations.get(name).map(String::as_str)
    }

    /// Drop all anonymous counters and associations; the next resolution
    /// pass recomputes from scratch.
    pub fn clear(&mut self) {
        self.anonymous_uses.clear();
        self.associations.clear();
    }

    fn endpoint_identity(&mut self, endpoint_name: &str, channel: Option<&str>) -> Identity {
        if let Some(stripped) = strip_internal_prefix(endpoint_name) {
            return Identity::new(stripped, Provenance::Internal);
        }
        if is_generated_name(endpoint_name) {
            // The endpoint itself was declared anonymously; name the
            // component after the channel it touches instead.
            if let Some(channel) = channel {
                let uses = self
                    .anonymous_uses
                    .entry(channel.to_string())
                    .and_modify(|uses| *uses += 1)
                    .or_insert(1);
                let name = if *uses == 1 {
                    channel.to_string()
                } else {
                    format!("{channel}#{uses}")
                };
                return Identity::new(name, Provenance::Anonymous);
            }
            return Identity::new(endpoint_name, Provenance::Anonymous);
        }
        Identity::new(endpoint_name, Provenance::Endpoint)
    }

    fn record_association(&mut self, component: &str, endpoint: &str) {
        self.associations
            .insert(component.to_string(), endpoint.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_identity_strips_internal_prefix() {
        let identity = channel_identity("_org.example.internal.errorLogger");
        assert_eq!(identity.name, "errorLogger");
        assert_eq!(identity.provenance, Provenance::Internal);

        let identity = channel_identity("orders");
        assert_eq!(identity.name, "orders");
        assert_eq!(identity.provenance, Provenance::Endpoint);
    }

    #[test]
    fn provenance_renders_as_tags() {
        assert_eq!(Provenance::Endpoint.to_string(), "endpoint");
        assert_eq!(Provenance::HandlerFallback.to_string(), "handler-fallback");
    }
}
