//! Wire model for the JSON message envelope.
//!
//! Every queue message is a JSON envelope carrying routing fields and an
//! opaque payload. The payload and the metadata object are preserved as the
//! raw bytes received on the wire, so handlers see exactly what the producer
//! sent, unknown metadata fields included.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

/// Canonical Draft-07 schema for the envelope. Register-ready: users pass
/// this string to `Router::new` as-is.
pub const ENVELOPE_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "properties": {
    "schemaVersion": { "type": "string" },
    "messageType": { "type": "string" },
    "messageVersion": { "type": "string" },
    "message": { "type": "object" },
    "metadata": { "type": "object" }
  },
  "required": ["schemaVersion", "messageType", "messageVersion", "message", "metadata"]
}"#;

// ---------------------------------------------------------------------------
// MessageEnvelope
// ---------------------------------------------------------------------------

/// Outer layer of a queue message: routing fields plus the opaque payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Envelope format version, currently `"1.0"`.
    pub schema_version: String,
    /// Logical event name.
    pub message_type: String,
    /// Schema version of the payload.
    pub message_version: String,
    /// The payload, kept as the raw JSON received on the wire.
    pub message: Box<RawValue>,
    /// Common metadata present in every message.
    pub metadata: MessageMetadata,
}

impl MessageEnvelope {
    /// The payload as raw JSON bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.message.get().as_bytes()
    }

    /// The registration key this envelope routes to under exact matching.
    #[must_use]
    pub fn handler_key(&self) -> HandlerKey {
        HandlerKey::new(&self.message_type, &self.message_version)
    }
}

// ---------------------------------------------------------------------------
// MessageMetadata
// ---------------------------------------------------------------------------

/// Metadata object of an envelope.
///
/// Keeps the verbatim JSON slice alongside the typed fields: handlers
/// receive `as_json()` unchanged, so producer-supplied fields beyond the
/// common three survive the trip through the router.
#[derive(Debug, Clone)]
pub struct MessageMetadata {
    raw: Box<RawValue>,
    fields: MetadataFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MetadataFields {
    timestamp: String,
    source: String,
    message_id: String,
}

impl MessageMetadata {
    /// Producer timestamp, empty when absent.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.fields.timestamp
    }

    /// Producing system, empty when absent.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.fields.source
    }

    /// Producer-assigned message identifier, empty when absent.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.fields.message_id
    }

    /// The metadata object exactly as received on the wire.
    #[must_use]
    pub fn as_json(&self) -> &str {
        self.raw.get()
    }
}

impl<'de> Deserialize<'de> for MessageMetadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let fields: MetadataFields =
            serde_json::from_str(raw.get()).map_err(serde::de::Error::custom)?;
        Ok(Self { raw, fields })
    }
}

// ---------------------------------------------------------------------------
// HandlerKey
// ---------------------------------------------------------------------------

/// Canonical `messageType:messageVersion` registration key.
/// Case-sensitive and immutable once formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey(String);

impl HandlerKey {
    /// Forms the key for a type/version pair.
    #[must_use]
    pub fn new(message_type: &str, message_version: &str) -> Self {
        Self(format!("{message_type}:{message_version}"))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "schemaVersion": "1.0",
        "messageType": "UserCreated",
        "messageVersion": "v1",
        "message": {"userId": "123"},
        "metadata": {"timestamp": "2024-01-01T00:00:00Z", "source": "svc", "messageId": "id-1"}
    }"#;

    #[test]
    fn parses_full_envelope() {
        let envelope: MessageEnvelope = serde_json::from_str(FULL).unwrap();
        assert_eq!(envelope.schema_version, "1.0");
        assert_eq!(envelope.message_type, "UserCreated");
        assert_eq!(envelope.message_version, "v1");
        assert_eq!(envelope.payload(), br#"{"userId": "123"}"#);
        assert_eq!(envelope.metadata.timestamp(), "2024-01-01T00:00:00Z");
        assert_eq!(envelope.metadata.source(), "svc");
        assert_eq!(envelope.metadata.message_id(), "id-1");
    }

    #[test]
    fn handler_key_joins_type_and_version() {
        let envelope: MessageEnvelope = serde_json::from_str(FULL).unwrap();
        assert_eq!(envelope.handler_key(), HandlerKey::new("UserCreated", "v1"));
        assert_eq!(envelope.handler_key().as_str(), "UserCreated:v1");
    }

    #[test]
    fn missing_routing_field_fails_parse() {
        let json = r#"{"schemaVersion": "1.0", "message": {}, "metadata": {}}"#;
        assert!(serde_json::from_str::<MessageEnvelope>(json).is_err());
    }

    #[test]
    fn absent_metadata_fields_read_as_empty() {
        let json = r#"{
            "schemaVersion": "1.0",
            "messageType": "T",
            "messageVersion": "v1",
            "message": {},
            "metadata": {}
        }"#;
        let envelope: MessageEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.metadata.timestamp(), "");
        assert_eq!(envelope.metadata.source(), "");
        assert_eq!(envelope.metadata.message_id(), "");
    }

    #[test]
    fn metadata_preserves_unknown_fields_verbatim() {
        let json = r#"{
            "schemaVersion": "1.0",
            "messageType": "T",
            "messageVersion": "v1",
            "message": {},
            "metadata": {"messageId": "id-9", "traceId": "abc", "hop": 3}
        }"#;
        let envelope: MessageEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.metadata.message_id(), "id-9");
        assert_eq!(
            envelope.metadata.as_json(),
            r#"{"messageId": "id-9", "traceId": "abc", "hop": 3}"#
        );
    }

    #[test]
    fn wrongly_typed_metadata_field_fails_parse() {
        let json = r#"{
            "schemaVersion": "1.0",
            "messageType": "T",
            "messageVersion": "v1",
            "message": {},
            "metadata": {"messageId": 42}
        }"#;
        assert!(serde_json::from_str::<MessageEnvelope>(json).is_err());
    }

    #[test]
    fn handler_key_is_case_sensitive() {
        assert_ne!(HandlerKey::new("T", "v1"), HandlerKey::new("t", "v1"));
    }

    #[test]
    fn handler_keys_order_lexicographically() {
        let mut keys = vec![
            HandlerKey::new("U", "v1"),
            HandlerKey::new("T", "v2"),
            HandlerKey::new("T", "v1"),
        ];
        keys.sort();
        assert_eq!(keys[0].as_str(), "T:v1");
        assert_eq!(keys[1].as_str(), "T:v2");
        assert_eq!(keys[2].as_str(), "U:v1");
    }

    #[test]
    fn envelope_schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(ENVELOPE_SCHEMA).unwrap();
        assert_eq!(schema["required"].as_array().unwrap().len(), 5);
    }
}
