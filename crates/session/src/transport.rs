//! Transport port used by the session opener.
//!
//! Infrastructure crates implement [`SessionTransport`] for a concrete HTTP
//! client. The opener only needs one operation: POST a JSON body and hand
//! back the fully-read response.

use async_trait::async_trait;

use crate::TransportError;

/// A fully-read HTTP response.
///
/// The body has been read to completion and the underlying connection
/// released by the time a transport returns this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code, e.g. `200`.
    pub status: u16,
    /// Complete response body.
    pub body: Vec<u8>,
}

/// Performs the single HTTP exchange of a session negotiation.
///
/// Implementations must:
///
/// - send exactly one request (no retries);
/// - set `Content-Type: application/json`;
/// - report a malformed `url` as [`TransportError::InvalidAddress`] before
///   doing any network activity;
/// - read the whole body before returning, releasing the response on every
///   exit path.
///
/// Implementations may be shared across concurrent calls.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// POSTs `body` to `url` as `application/json`.
    async fn post_json(&self, url: &str, body: Vec<u8>)
        -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: SessionTransport + ?Sized> SessionTransport for std::sync::Arc<T> {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        (**self).post_json(url, body).await
    }
}
