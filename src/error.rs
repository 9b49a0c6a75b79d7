//! Error types for the image generation gateway.

/// Errors that can occur while resolving configuration, dispatching to a
/// provider backend, or post-processing an image.
///
/// Every failure on the dispatch path is one of these kinds; the tool layer
/// reports the `Display` message and nothing else. Credentials are never part
/// of any message.
#[derive(Debug, thiserror::Error)]
pub enum ImagenxError {
    /// Required model identifier or credential absent after merging the
    /// request headers with the process environment.
    #[error("missing configuration: {field} not provided via header or environment")]
    MissingConfiguration {
        /// The header/environment field that could not be resolved.
        field: String,
    },

    /// Identifier does not split into exactly `provider:model`.
    #[error("malformed model identifier '{0}': expected 'provider:model' with a single colon")]
    MalformedIdentifier(String),

    /// The identifier's provider segment has no registered backend.
    #[error("provider '{provider}' not found")]
    UnknownProvider {
        /// The unresolvable provider token.
        provider: String,
    },

    /// Structurally invalid backend constructor arguments.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Size rejected by the backend's allow-list.
    #[error("size '{size}' is not supported by provider '{provider}'")]
    UnsupportedSize {
        /// Provider that rejected the size.
        provider: String,
        /// The rejected size string.
        size: String,
    },

    /// Capability not implemented by the resolved backend.
    #[error("provider '{provider}' does not support {capability}")]
    CapabilityNotSupported {
        /// Provider that lacks the capability.
        provider: String,
        /// Name of the missing capability method.
        capability: &'static str,
    },

    /// Opaque failure from a remote provider during a generation call.
    /// Not retried at this layer; the original message is preserved.
    #[error("provider '{provider}' request failed: {message}")]
    Remote {
        /// Provider whose remote call failed.
        provider: String,
        /// Diagnostic message from the backend, verbatim.
        message: String,
    },

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Failed to decode provider-returned image data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (e.g., reading a reference image).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster decode/encode error from local post-processing.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl ImagenxError {
    /// Shorthand for a remote-provider failure.
    pub fn remote(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Remote {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a missing-configuration failure.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            field: field.into(),
        }
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, ImagenxError>;
