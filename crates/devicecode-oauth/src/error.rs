//! Error types for device-code sign-in.

use std::io;

/// Result type alias for sign-in operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running a sign-in.
///
/// Expiry and cancellation are not errors; they are reported as
/// [`TokenOutcome`](crate::TokenOutcome) variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Definitive rejection by the identity provider.
    #[error("Provider error: {code} - {description}")]
    Provider {
        /// `OAuth2` error code (e.g., `invalid_grant`).
        code: String,
        /// Human-readable description.
        description: String,
        /// Numeric `AADSTS` codes, when the provider is Azure AD.
        error_codes: Vec<u32>,
    },

    /// The provider answered with something that is not a valid token or session.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The device code session was already polled to completion.
    #[error("Device code session already finished")]
    SessionFinished,

    /// Missing or malformed client/authority settings.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Creates a provider error from an error code and description.
    #[must_use]
    pub fn provider(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            description: description.into(),
            error_codes: Vec::new(),
        }
    }

    /// Returns the provider's error code, if this is a provider error.
    #[must_use]
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            Self::Provider { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns a mitigation hint for well-known Azure AD rejections.
    ///
    /// These are almost always app registration or authority mistakes.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        let Self::Provider {
            description,
            error_codes,
            ..
        } = self
        else {
            return None;
        };

        let has = |code: u32| {
            error_codes.contains(&code) || description.contains(&format!("AADSTS{code}"))
        };

        if has(50059) {
            Some(
                "No tenant-identifying information was found. Use a tenanted authority \
                 (your tenant ID or domain) instead of /common or /organizations.",
            )
        } else if has(90133) {
            Some(
                "Device code flow is not supported under /common or /consumers. \
                 Use a tenanted authority.",
            )
        } else if has(90002) {
            Some(
                "Tenant not found. Check the tenant ID or domain name in the configuration \
                 and that the tenant has an active subscription.",
            )
        } else {
            None
        }
    }
}
