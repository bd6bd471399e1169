//! Newtype identifiers and addresses for WebDriver sessions.
//!
//! A session identifier, a server address, and a session URL are all strings
//! on the wire. Each gets its own newtype so that, for example, a raw
//! [`SessionId`] can never be handed to something expecting a fully-qualified
//! [`SessionUrl`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rejection from deserialising an identifier or address that is empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} must not be empty")]
pub struct EmptyValue(&'static str);

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and a
// TryFrom<String> that serde deserialises through.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String")]
        pub struct $name(String);

        impl TryFrom<String> for $name {
            type Error = EmptyValue;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(EmptyValue(stringify!($name)))
            }
        }

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Opaque identifier assigned by the remote end to a newly created session.
    ///
    /// Never empty: the negotiation fails rather than produce an empty id.
    SessionId
}

string_id! {
    /// Fully-qualified address of a session resource
    /// (`<server>/session/<id>`).
    ///
    /// Built by [`ServerAddress::session_url`]; every subsequent command for
    /// the session is addressed relative to it.
    SessionUrl
}

// ---------------------------------------------------------------------------
// Server address
// ---------------------------------------------------------------------------

/// Base address of a WebDriver remote end (e.g. `"http://localhost:4444/wd/hub"`).
///
/// Trailing `/` characters are trimmed on construction so that derived
/// addresses never contain a doubled separator. Whether the address is a
/// syntactically valid URL is decided by the transport, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ServerAddress(String);

impl TryFrom<String> for ServerAddress {
    type Error = EmptyValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(EmptyValue("ServerAddress"))
    }
}

impl ServerAddress {
    /// Creates a server address, returning `None` if nothing remains after
    /// trimming whitespace and trailing slashes.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let trimmed = v.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// Returns the normalised address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of the session-creation endpoint, `<address>/session`.
    pub fn new_session_endpoint(&self) -> String {
        format!("{}/session", self.0)
    }

    /// Address of an existing session, `<address>/session/<id>`.
    pub fn session_url(&self, id: &SessionId) -> SessionUrl {
        SessionUrl(format!("{}/session/{}", self.0, id.as_str()))
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Negotiation correlation
// ---------------------------------------------------------------------------

/// Identifies a single session negotiation (one call to open a session).
///
/// Generated fresh per call and recorded on the `open_session` span so every
/// event emitted during one negotiation can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NegotiationId(Uuid);

impl NegotiationId {
    /// Generates a new random negotiation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for NegotiationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
