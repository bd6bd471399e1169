//! Error types for session negotiation.
//!
//! [`SessionError`] is the complete taxonomy surfaced to callers of the
//! negotiation. [`TransportError`] is what a [`crate::SessionTransport`]
//! implementation reports; it converts 1:1 into the matching
//! [`SessionError`] variant.
//!
//! Every error is terminal for the call. Nothing in this crate retries.

use thiserror::Error;

/// Boxed source error carried through from a transport implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Transport port errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`crate::SessionTransport`].
///
/// The underlying client error is kept as the `source` unchanged so callers
/// can downcast to the concrete transport error if they need to.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built (e.g. the address is not a valid URL).
    ///
    /// Reported before any network activity.
    #[error("Invalid request address '{address}'")]
    InvalidAddress {
        /// The address that could not be turned into a request.
        address: String,
        /// Underlying parse or builder error.
        #[source]
        source: BoxError,
    },

    /// The request was built but the exchange failed at the transport layer
    /// (connection refused, DNS failure, transport timeout).
    #[error("Request to '{url}' failed")]
    Send {
        /// The request URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: BoxError,
    },

    /// A response arrived but its body could not be read to completion.
    #[error("Failed to read response body from '{url}'")]
    Read {
        /// The request URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: BoxError,
    },
}

// ---------------------------------------------------------------------------
// Negotiation errors
// ---------------------------------------------------------------------------

/// Errors that end a session negotiation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The desired capabilities could not be serialised to JSON, or did not
    /// serialise to a JSON object.
    #[error("Failed to encode desired capabilities")]
    Encoding {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// The session request could not be constructed from the server address.
    #[error("Failed to construct session request for '{address}'")]
    RequestConstruction {
        /// The server address as supplied by the caller.
        address: String,
        /// Why the request could not be built (absent for an empty address).
        #[source]
        source: Option<BoxError>,
    },

    /// The HTTP exchange failed at the transport layer.
    #[error("Transport failure posting to '{url}'")]
    Transport {
        /// The request URL.
        url: String,
        /// Underlying transport error, unchanged.
        #[source]
        source: BoxError,
    },

    /// The response body could not be read to completion.
    #[error("Failed to read session response from '{url}'")]
    ResponseRead {
        /// The request URL.
        url: String,
        /// Underlying transport error, unchanged.
        #[source]
        source: BoxError,
    },

    /// The response body is not valid JSON for the session descriptor schema.
    #[error("Malformed session response")]
    MalformedResponse {
        /// Underlying deserialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// The response was well-formed but carried no session identifier in any
    /// recognised location. The remote end declined to create a session.
    #[error("Failed to retrieve a session ID")]
    NoSessionId,
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidAddress { address, source } => Self::RequestConstruction {
                address,
                source: Some(source),
            },
            TransportError::Send { url, source } => Self::Transport { url, source },
            TransportError::Read { url, source } => Self::ResponseRead { url, source },
        }
    }
}
