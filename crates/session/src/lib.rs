//! WebDriver session negotiation domain.
//!
//! This crate contains the whole of the new-session exchange except the HTTP
//! client: the desired-capabilities envelope, the tolerant response record,
//! the identifier precedence rule, the session handle, and the
//! [`SessionTransport`] port that infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no HTTP client
//! dependency. It defines *what* the exchange needs; infrastructure crates
//! (e.g. `http-transport`) define *how* to carry it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtypes (`SessionId`, `SessionUrl`, `ServerAddress`, `NegotiationId`) |
//! | [`types`] | Wire types (`NewSessionRequest`, `SessionResponse`) and results |
//! | [`errors`] | `SessionError` taxonomy and the transport port error |
//! | [`transport`] | The `SessionTransport` port trait |
//! | [`negotiation`] | Encoder, resolver, opener, and `connect_with` |
//! | [`handle`] | The `Session` handle |

pub mod errors;
pub mod handle;
pub mod identifiers;
pub mod negotiation;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{BoxError, SessionError, TransportError};
pub use handle::Session;
pub use identifiers::{EmptyValue, NegotiationId, ServerAddress, SessionId, SessionUrl};
pub use negotiation::{connect_with, encode_capabilities, open_session, parse_response, resolve};
pub use transport::{SessionTransport, TransportResponse};
pub use types::{
    Capabilities, NegotiatedSession, NestedSession, NewSessionRequest, ResponseShape,
    SessionResponse, Timestamp,
};
