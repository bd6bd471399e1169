//! Capability encoding, response resolution, and the session opener.
//!
//! The flow is linear:
//!
//! 1. [`encode_capabilities`] wraps the caller's capabilities in the
//!    `desiredCapabilities` envelope.
//! 2. [`open_session`] POSTs the body once and parses the reply with
//!    [`parse_response`].
//! 3. [`resolve`] applies the precedence rule: flat identifier, then the
//!    `value` fallback, then [`SessionError::NoSessionId`].
//!
//! [`connect_with`] composes all three and builds the [`Session`] handle.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    Capabilities, NegotiatedSession, NegotiationId, NewSessionRequest, ResponseShape,
    ServerAddress, Session, SessionError, SessionId, SessionResponse, SessionTransport,
};

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Serialises `capabilities` as `{"desiredCapabilities": <capabilities>}`.
///
/// `None` (or a value that serialises to `null`) becomes an empty object.
/// Anything that serialises to a non-object, or fails to serialise, is an
/// [`SessionError::Encoding`].
pub fn encode_capabilities<C>(capabilities: Option<&C>) -> Result<Vec<u8>, SessionError>
where
    C: Serialize + ?Sized,
{
    let desired_capabilities = match capabilities {
        None => Capabilities::new(),
        Some(caps) => match serde_json::to_value(caps)
            .map_err(|source| SessionError::Encoding { source })?
        {
            Value::Object(map) => map,
            Value::Null => Capabilities::new(),
            other => {
                return Err(SessionError::Encoding {
                    source: serde_json::Error::custom(format!(
                        "desired capabilities must be a JSON object, got {}",
                        json_kind(&other)
                    )),
                })
            }
        },
    };

    serde_json::to_vec(&NewSessionRequest {
        desired_capabilities,
    })
    .map_err(|source| SessionError::Encoding { source })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Parses a response body into a [`SessionResponse`].
///
/// A literal `null` body yields an empty descriptor, which
/// [`resolve`] then rejects with [`SessionError::NoSessionId`].
pub fn parse_response(body: &[u8]) -> Result<SessionResponse, SessionError> {
    serde_json::from_slice::<Option<SessionResponse>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|source| SessionError::MalformedResponse { source })
}

/// Applies the identifier precedence rule to a parsed response.
///
/// The `status` field is reduced to a presence flag; its value is not
/// inspected.
pub fn resolve(response: &SessionResponse) -> Result<NegotiatedSession, SessionError> {
    let has_status = response.has_status();

    let (id, shape) = match (response.flat_session_id(), response.nested_session_id()) {
        (Some(id), _) => (id, ResponseShape::Flat),
        (None, Some(id)) => (id, ResponseShape::Nested),
        (None, None) => return Err(SessionError::NoSessionId),
    };

    let session_id = SessionId::new(id).ok_or(SessionError::NoSessionId)?;
    Ok(NegotiatedSession {
        session_id,
        has_status,
        shape,
    })
}

// ---------------------------------------------------------------------------
// Opener
// ---------------------------------------------------------------------------

/// POSTs `body` to `<address>/session` once and resolves the session
/// identifier from the reply.
///
/// The HTTP status code is not consulted: a well-formed body carrying an
/// identifier succeeds regardless of status, and one that carries none fails
/// with [`SessionError::NoSessionId`].
pub async fn open_session<T>(
    address: &ServerAddress,
    body: Vec<u8>,
    transport: &T,
) -> Result<NegotiatedSession, SessionError>
where
    T: SessionTransport + ?Sized,
{
    let endpoint = address.new_session_endpoint();
    let negotiation_id = NegotiationId::new_random();
    let span = info_span!("open_session", %endpoint, %negotiation_id);

    async move {
        debug!(bytes = body.len(), "Posting new session request");
        let response = transport.post_json(&endpoint, body).await?;
        debug!(
            http_status = response.status,
            bytes = response.body.len(),
            "Received new session response"
        );

        let parsed = parse_response(&response.body)?;
        match resolve(&parsed) {
            Ok(negotiated) => {
                info!(
                    session_id = %negotiated.session_id,
                    shape = %negotiated.shape,
                    has_status = negotiated.has_status,
                    "Session negotiated"
                );
                Ok(negotiated)
            }
            Err(err) => {
                warn!(
                    http_status = response.status,
                    "Response carried no session identifier"
                );
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}

/// Negotiates a session with the remote end at `address` over `transport`.
///
/// Returns the [`Session`] handle and whether the response carried a
/// `status` field. Encoding happens before the address is examined; both
/// happen before any network activity.
pub async fn connect_with<C, T>(
    address: &str,
    capabilities: Option<&C>,
    transport: T,
) -> Result<(Session<T>, bool), SessionError>
where
    C: Serialize + ?Sized,
    T: SessionTransport,
{
    let body = encode_capabilities(capabilities)?;

    let server = ServerAddress::new(address).ok_or_else(|| SessionError::RequestConstruction {
        address: address.to_owned(),
        source: None,
    })?;

    let negotiated = open_session(&server, body, &transport).await?;
    let url = server.session_url(&negotiated.session_id);
    Ok((
        Session::new(url, negotiated.session_id, transport),
        negotiated.has_status,
    ))
}
