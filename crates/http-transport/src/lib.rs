//! HTTP transport for WebDriver session negotiation.
//!
//! Implements the [`session::SessionTransport`] trait over [`reqwest`] and
//! exposes [`connect`], the public entry point for opening a session against
//! a remote end.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request construction, the HTTP exchange, and body
//! reading live here. The [`session`] crate sees only
//! [`session::SessionTransport`].
//!
//! ## Default client
//!
//! When the caller does not supply a [`reqwest::Client`], a process-wide
//! default is built on first use and shared by every later call. It is never
//! mutated after construction. Building it can fail (e.g. the TLS backend
//! cannot initialise); that surfaces as [`SessionError::Transport`] rather
//! than a panic. Timeouts, proxies and TLS settings are the caller's to
//! configure on their own client.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Serialize;
use session::{Session, SessionError, SessionTransport, TransportError, TransportResponse};
use tracing::debug;

/// A session negotiated over [`HttpTransport`].
pub type HttpSession = Session<HttpTransport>;

fn default_client() -> Result<Client, reqwest::Error> {
    static DEFAULT: OnceLock<Client> = OnceLock::new();
    if let Some(client) = DEFAULT.get() {
        return Ok(client.clone());
    }
    // A concurrent first call may win the race; either client is equivalent.
    let client = Client::builder().build()?;
    Ok(DEFAULT.get_or_init(|| client).clone())
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// [`SessionTransport`] backed by a [`reqwest::Client`].
///
/// Cloning is cheap; clones share the client's connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport whose client gives up on a request after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Client::builder().timeout(timeout).build().map(Self::new)
    }

    /// Uses the shared process-wide client, building it on first use.
    pub fn shared() -> Result<Self, reqwest::Error> {
        default_client().map(Self::new)
    }

    /// The underlying client, for issuing further session commands.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl SessionTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidAddress {
            address: url.to_owned(),
            source: Box::new(e),
        })?;

        let response = self
            .client
            .post(parsed)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    TransportError::InvalidAddress {
                        address: url.to_owned(),
                        source: Box::new(e),
                    }
                } else {
                    TransportError::Send {
                        url: url.to_owned(),
                        source: Box::new(e),
                    }
                }
            })?;

        let status = response.status().as_u16();
        debug!(http_status = status, "Reading response body");

        // `bytes()` consumes the response; the connection is released whether
        // the read succeeds or not.
        let body = response.bytes().await.map_err(|e| TransportError::Read {
            url: url.to_owned(),
            source: Box::new(e),
        })?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Opens a WebDriver session at `address`.
///
/// `capabilities` are sent as `desiredCapabilities` (an empty object when
/// `None`). When `client` is `None` the shared default client is used.
///
/// Returns the session handle and whether the server's response carried a
/// `status` field.
pub async fn connect<C>(
    address: &str,
    capabilities: Option<&C>,
    client: Option<Client>,
) -> Result<(HttpSession, bool), SessionError>
where
    C: Serialize + ?Sized,
{
    let transport = match client {
        Some(client) => HttpTransport::new(client),
        None => HttpTransport::shared().map_err(|e| SessionError::Transport {
            url: address.to_owned(),
            source: Box::new(e),
        })?,
    };
    session::connect_with(address, capabilities, transport).await
}
