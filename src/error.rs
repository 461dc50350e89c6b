//! Error types for service model conversion and the identity registry
//!
//! Errors carry structured fields so callers can decide propagation: a
//! conversion failure names the resource it came from, a secure-naming
//! failure names both identities involved.

use thiserror::Error;

/// Main error type for lattice-identity operations
#[derive(Debug, Error)]
pub enum Error {
    /// A cluster object could not be converted into the service model
    #[error("conversion error for {resource}: {message}")]
    Conversion {
        /// `namespace/name` of the object being converted
        resource: String,
        /// Description of what's invalid
        message: String,
        /// The offending field path (e.g., "spec.ports[0].port")
        field: Option<String>,
    },

    /// A probe references a named port the container does not declare
    #[error("container {container} has no port named {port:?}")]
    UnresolvedProbePort {
        /// Name of the container owning the probe
        container: String,
        /// The named port the probe referenced
        port: String,
    },

    /// A peer identity failed the secure-naming check
    #[error("identity {presented:?} cannot act as {expected:?}")]
    SecureNaming {
        /// Identity presented by the peer
        presented: String,
        /// Identity the peer was expected to hold
        expected: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "informer", "config")
        context: String,
    },
}

impl Error {
    /// Create a conversion error for a specific resource and field path
    pub fn conversion_for_field(
        resource: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            resource: resource.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unresolved probe port error
    pub fn unresolved_probe_port(container: impl Into<String>, port: impl Into<String>) -> Self {
        Self::UnresolvedProbePort {
            container: container.into(),
            port: port.into(),
        }
    }

    /// Create a secure-naming mismatch error
    pub fn secure_naming(presented: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::SecureNaming {
            presented: presented.into(),
            expected: expected.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Short label for the error category, used as a metric attribute
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Conversion { .. } => "conversion",
            Error::UnresolvedProbePort { .. } => "unresolved_probe_port",
            Error::SecureNaming { .. } => "secure_naming",
            Error::Internal { .. } => "internal",
        }
    }
}
