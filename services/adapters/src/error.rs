//! Error types for the adapters crate
//!
//! Venue failures never show up here: they are returned as [`types::ApiError`] values in place
//! of data. [`AdapterError`] is reserved for defects in adapter configuration or caller usage,
//! and for the session plumbing that has no caller to hand an error value to.

use thiserror::Error;
use types::{Endpoint, ItemKind, VenueId};

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A payload of this class arrived but no field map is registered for it
    #[error("No field map for {kind} items on venue {venue}")]
    MissingFieldMap {
        /// Venue whose adapter lacks the map
        venue: VenueId,
        /// Item class without a map
        kind: ItemKind,
    },

    /// A path or channel template references a parameter the call did not supply
    #[error("Template '{template}' for venue {venue} needs parameter '{param}'")]
    MissingTemplateParam {
        /// Venue owning the template
        venue: VenueId,
        /// The template text
        template: String,
        /// Canonical name of the missing parameter
        param: String,
    },

    /// The venue adapter has no path for the endpoint
    #[error("Endpoint {endpoint} is not supported by venue {venue}")]
    UnsupportedEndpoint {
        /// The venue
        venue: VenueId,
        /// The unsupported endpoint
        endpoint: Endpoint,
    },

    /// No converter registered for the requested API version
    #[error("Venue {venue} has no converter for API version {version}")]
    UnknownVersion {
        /// The venue
        venue: VenueId,
        /// Requested version
        version: String,
    },

    /// No adapter configuration for this venue and transport
    #[error("Venue {venue} has no {transport} adapter")]
    UnsupportedVenue {
        /// The venue
        venue: VenueId,
        /// `"REST"` or `"WebSocket"`
        transport: &'static str,
    },

    /// Connection-related errors
    #[error("Connection failed for venue {venue}: {reason}")]
    ConnectionFailed {
        /// The venue that failed to connect
        venue: VenueId,
        /// Reason for the failure
        reason: String,
    },

    /// Connection timeout during the opening handshake
    #[error("Connection timeout for venue {venue} after {timeout_ms}ms")]
    ConnectionTimeout {
        /// The venue that timed out
        venue: VenueId,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Connect was requested while no subscription is recorded
    #[error("Nothing to subscribe on venue {venue}, refusing to connect")]
    NothingToSubscribe {
        /// The venue
        venue: VenueId,
    },

    /// The session reached its terminal state and accepts no more commands
    #[error("Session for venue {venue} is closed")]
    SessionClosed {
        /// The venue
        venue: VenueId,
    },

    /// Request signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON parsing error
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Canonical value conversion error
    #[error(transparent)]
    Types(#[from] types::TypesError),

    /// HTTP client construction or transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// I/O error during network operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AdapterError {
    /// Defects in adapter configuration or caller usage; retrying will not help
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AdapterError::MissingFieldMap { .. }
                | AdapterError::MissingTemplateParam { .. }
                | AdapterError::UnsupportedEndpoint { .. }
                | AdapterError::UnknownVersion { .. }
                | AdapterError::UnsupportedVenue { .. }
                | AdapterError::Configuration(_)
        )
    }

    /// Check if this error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AdapterError::ConnectionFailed { .. }
                | AdapterError::ConnectionTimeout { .. }
                | AdapterError::WebSocket(_)
                | AdapterError::Http(_)
                | AdapterError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_not_recoverable() {
        let error = AdapterError::MissingTemplateParam {
            venue: VenueId::Bitfinex,
            template: "trades/t{symbol}/hist".to_string(),
            param: "symbol".to_string(),
        };
        assert!(error.is_configuration());
        assert!(!error.is_recoverable());
        assert!(error.to_string().contains("trades/t{symbol}/hist"));
    }

    #[test]
    fn test_connection_errors_are_recoverable() {
        let error = AdapterError::ConnectionTimeout {
            venue: VenueId::Okex,
            timeout_ms: 10_000,
        };
        assert!(error.is_recoverable());
        assert!(!error.is_configuration());
    }
}
