//! The session handle returned by a successful negotiation.

use crate::{SessionId, SessionUrl, Timestamp};

/// An open WebDriver session: the session's resource address paired with the
/// transport used for every subsequent command.
///
/// Only constructed by [`crate::connect_with`] once a non-empty session
/// identifier has been resolved, so holding a `Session` means negotiation
/// succeeded. The handle is immutable; the caller owns it outright.
#[derive(Debug, Clone)]
pub struct Session<T> {
    url: SessionUrl,
    id: SessionId,
    transport: T,
    opened_at: Timestamp,
}

impl<T> Session<T> {
    pub(crate) fn new(url: SessionUrl, id: SessionId, transport: T) -> Self {
        Self {
            url,
            id,
            transport,
            opened_at: Timestamp::now(),
        }
    }

    /// Fully-qualified session address, `<server>/session/<id>`.
    pub fn url(&self) -> &SessionUrl {
        &self.url
    }

    /// Identifier assigned by the remote end.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Transport the session was negotiated over.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// When the negotiation completed.
    pub fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    /// Address of a command resource under this session, e.g.
    /// `endpoint("url")` gives `<server>/session/<id>/url`.
    pub fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.url.to_string()
        } else {
            format!("{}/{}", self.url, path)
        }
    }

    /// Consumes the handle, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
