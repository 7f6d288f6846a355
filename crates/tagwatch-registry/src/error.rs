//! Error types for registry operations.

use thiserror::Error;

/// Bearer token acquisition failed.
///
/// This is `Clone` so a single failed acquisition can be shared with every
/// caller waiting on the same [`CredentialCache`](crate::CredentialCache).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Authentication failed for {registry} during {step}: {message}")]
pub struct AuthError {
    /// Registry host the token was requested for.
    pub registry: String,

    /// Which exchange step failed (e.g. `aad token`, `oauth2 exchange`).
    pub step: String,

    /// HTTP status returned by the endpoint, if a response was received.
    pub status: Option<u16>,

    /// Error message.
    pub message: String,
}

impl AuthError {
    /// Creates an error for a non-success response.
    #[must_use]
    pub fn status(
        registry: impl Into<String>,
        step: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            step: step.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an error for a transport or decoding failure.
    #[must_use]
    pub fn other(
        registry: impl Into<String>,
        step: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            step: step.into(),
            status: None,
            message: message.into(),
        }
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Bearer token acquisition failed.
    #[error(transparent)]
    Authentication(#[from] AuthError),

    /// The manifest endpoint returned a non-success status or could not be reached.
    #[error("Failed to resolve {reference}: {message}")]
    ResolutionFailed {
        /// `repository:tag` being resolved.
        reference: String,
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The manifest response carried no `Docker-Content-Digest` header.
    #[error("Registry returned no digest for {reference}")]
    MissingDigest {
        /// `repository:tag` being resolved.
        reference: String,
    },

    /// No client variant exists for the provider.
    #[error("Unsupported registry provider: {provider}")]
    UnsupportedProvider {
        /// Provider name.
        provider: String,
    },

    /// The client could not be configured.
    #[error("Invalid registry configuration: {reason}")]
    InvalidConfig {
        /// Reason for invalidity.
        reason: String,
    },
}

impl RegistryError {
    /// Returns true for token acquisition failures.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Returns true for manifest resolution failures, including a missing digest.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::ResolutionFailed { .. } | Self::MissingDigest { .. })
    }

    /// Returns the HTTP status associated with the failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication(AuthError { status, .. })
            | Self::ResolutionFailed { status, .. } => *status,
            _ => None,
        }
    }
}
