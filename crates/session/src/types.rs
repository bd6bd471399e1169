//! Wire and value types for session negotiation.
//!
//! [`NewSessionRequest`] is the outbound envelope. [`SessionResponse`] is a
//! single tolerant record covering every inbound shape the negotiation
//! recognises; [`NegotiatedSession`] is what remains once the precedence rule
//! has been applied to it.

use chrono::{DateTime, Utc};
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::SessionId;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Desired capabilities requested from the remote end
/// (e.g. `{"browserName": "firefox"}`).
pub type Capabilities = serde_json::Map<String, serde_json::Value>;

/// Outbound body of a new-session request: `{"desiredCapabilities": {...}}`.
///
/// The field is always present on the wire, even when the map is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionRequest {
    /// Capabilities as a JSON object.
    pub desired_capabilities: Capabilities,
}

// ---------------------------------------------------------------------------
// Inbound session descriptor
// ---------------------------------------------------------------------------

/// Session descriptor returned by the remote end.
///
/// Matches both recognised shapes at once:
///
/// | Shape | Example |
/// |-------|---------|
/// | Flat | `{"sessionId": "abc", "status": 0}` |
/// | Nested | `{"value": {"sessionId": "abc"}}` |
///
/// Keys are matched ASCII case-insensitively (`SessionID`, `sessionId`,
/// `SESSIONID` all name the same field). When one object repeats a field
/// under different casings, the last occurrence wins. Unknown keys are
/// ignored. A `null` identifier or `value` leaves the field as it was; a
/// `null` status clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResponse {
    /// Top-level session identifier.
    pub session_id: Option<String>,

    /// Nested envelope used by drivers that put the identifier under `value`.
    pub value: Option<NestedSession>,

    /// Legacy status code. Only its presence is ever consulted.
    pub status: Option<i64>,
}

/// The `value` object of a [`SessionResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedSession {
    /// Session identifier carried inside `value`.
    pub session_id: Option<String>,
}

const SESSION_ID_KEY: &str = "sessionid";
const VALUE_KEY: &str = "value";
const STATUS_KEY: &str = "status";

impl<'de> Deserialize<'de> for SessionResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResponseVisitor;

        impl<'de> Visitor<'de> for ResponseVisitor {
            type Value = SessionResponse;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a session descriptor object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut response = SessionResponse::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key.eq_ignore_ascii_case(SESSION_ID_KEY) {
                        if let Some(id) = map.next_value::<Option<String>>()? {
                            response.session_id = Some(id);
                        }
                    } else if key.eq_ignore_ascii_case(VALUE_KEY) {
                        // Repeated `value` objects merge into one.
                        if let Some(nested) = map.next_value::<Option<NestedSession>>()? {
                            let current = response.value.get_or_insert_with(NestedSession::default);
                            if nested.session_id.is_some() {
                                current.session_id = nested.session_id;
                            }
                        }
                    } else if key.eq_ignore_ascii_case(STATUS_KEY) {
                        response.status = map.next_value::<Option<i64>>()?;
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(response)
            }
        }

        deserializer.deserialize_map(ResponseVisitor)
    }
}

impl<'de> Deserialize<'de> for NestedSession {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NestedVisitor;

        impl<'de> Visitor<'de> for NestedVisitor {
            type Value = NestedSession;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a `value` object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut nested = NestedSession::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key.eq_ignore_ascii_case(SESSION_ID_KEY) {
                        if let Some(id) = map.next_value::<Option<String>>()? {
                            nested.session_id = Some(id);
                        }
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(nested)
            }
        }

        deserializer.deserialize_map(NestedVisitor)
    }
}

impl SessionResponse {
    /// Returns `true` if the response carried a `status` field, whatever its value.
    pub fn has_status(&self) -> bool {
        self.status.is_some()
    }

    /// Top-level identifier, if present and non-empty.
    pub fn flat_session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Identifier nested under `value`, if present and non-empty.
    pub fn nested_session_id(&self) -> Option<&str> {
        self.value
            .as_ref()
            .and_then(|v| v.session_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Resolution result
// ---------------------------------------------------------------------------

/// Which location of the [`SessionResponse`] supplied the session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Top-level `sessionId`.
    Flat,
    /// Fallback `value.sessionId`.
    Nested,
}

impl std::fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Nested => f.write_str("nested"),
        }
    }
}

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedSession {
    /// Identifier assigned by the remote end.
    pub session_id: SessionId,
    /// Whether the response carried a `status` field.
    pub has_status: bool,
    /// Where the identifier was found.
    pub shape: ResponseShape,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> SessionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn request_envelope_uses_camel_case_key() {
        let req = NewSessionRequest {
            desired_capabilities: Capabilities::new(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"desiredCapabilities": {}})
        );
    }

    #[test]
    fn recognises_field_name_casings() {
        for key in [
            "SessionID",
            "sessionId",
            "sessionID",
            "SessionId",
            "sessionid",
            "SESSIONID",
            "sEsSiOnId",
        ] {
            let flat = parse(json!({ key: "abc" }));
            assert_eq!(flat.flat_session_id(), Some("abc"), "flat {key}");

            let nested = parse(json!({ "value": { key: "abc" } }));
            assert_eq!(nested.nested_session_id(), Some("abc"), "nested {key}");
        }
        assert_eq!(
            parse(json!({"Value": {"sessionId": "v"}})).nested_session_id(),
            Some("v")
        );
        assert_eq!(
            parse(json!({"VALUE": {"SESSIONID": "v"}})).nested_session_id(),
            Some("v")
        );
        assert!(parse(json!({"Status": 13})).has_status());
        assert!(parse(json!({"STATUS": 13})).has_status());
    }

    fn parse_bytes(body: &str) -> SessionResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn repeated_field_under_two_casings_keeps_the_last() {
        let resp = parse_bytes(r#"{"sessionId": "first", "SessionID": "second"}"#);
        assert_eq!(resp.flat_session_id(), Some("second"));

        let resp = parse_bytes(r#"{"sessionId": "X", "SessionID": "X"}"#);
        assert_eq!(resp.flat_session_id(), Some("X"));

        let resp = parse_bytes(r#"{"status": 0, "STATUS": null}"#);
        assert!(!resp.has_status());
    }

    #[test]
    fn null_identifier_does_not_clear_an_earlier_one() {
        let resp = parse_bytes(r#"{"sessionId": "kept", "SESSIONID": null}"#);
        assert_eq!(resp.flat_session_id(), Some("kept"));
    }

    #[test]
    fn repeated_value_objects_merge() {
        let resp = parse_bytes(r#"{"value": {"sessionId": "Y"}, "Value": {"other": 1}}"#);
        assert_eq!(resp.nested_session_id(), Some("Y"));

        let resp = parse_bytes(r#"{"value": {"sessionId": "Y"}, "VALUE": {"sessionid": "Z"}}"#);
        assert_eq!(resp.nested_session_id(), Some("Z"));
    }

    #[test]
    fn status_presence_not_value() {
        assert!(parse(json!({"status": 0})).has_status());
        assert!(parse(json!({"status": 33})).has_status());
        assert!(!parse(json!({})).has_status());
        assert!(!parse(json!({"status": null})).has_status());
    }

    #[test]
    fn empty_and_null_identifiers_are_absent() {
        let resp = parse(json!({"sessionId": "", "value": null}));
        assert_eq!(resp.flat_session_id(), None);
        assert_eq!(resp.nested_session_id(), None);

        let resp = parse(json!({"sessionId": null, "value": {"sessionId": ""}}));
        assert_eq!(resp.flat_session_id(), None);
        assert_eq!(resp.nested_session_id(), None);
    }

    #[test]
    fn ignores_unrelated_fields() {
        let resp = parse(json!({
            "value": {
                "sessionId": "w3c",
                "capabilities": {"browserName": "firefox"}
            },
            "extra": [1, 2, 3]
        }));
        assert_eq!(resp.nested_session_id(), Some("w3c"));
    }

    #[test]
    fn negotiated_session_never_deserialises_with_empty_id() {
        let empty = json!({"session_id": "", "has_status": false, "shape": "flat"});
        assert!(serde_json::from_value::<NegotiatedSession>(empty).is_err());

        let ok = json!({"session_id": "abc", "has_status": true, "shape": "nested"});
        let n: NegotiatedSession = serde_json::from_value(ok).unwrap();
        assert_eq!(n.session_id.as_str(), "abc");
        assert_eq!(n.shape, ResponseShape::Nested);
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        assert!(serde_json::from_value::<SessionResponse>(json!({"status": "ok"})).is_err());
        assert!(serde_json::from_value::<SessionResponse>(json!({"sessionId": 7})).is_err());
        assert!(serde_json::from_value::<SessionResponse>(json!({"value": "x"})).is_err());
        assert!(serde_json::from_value::<SessionResponse>(json!([])).is_err());
    }
}
