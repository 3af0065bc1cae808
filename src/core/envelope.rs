//! Purpose: Parse a submitted send document into an immutable `MessageEnvelope`.
//! Exports: `MessageEnvelope`, `RESERVED_PAYLOAD_KEYS`.
//! Role: Core of the gateway; partitions reserved keys from opaque app data.
//! Invariants: Reserved-field extraction and `data` exactly partition the
//! nested payload's keys; no key is consumed twice or dropped silently.
//! Invariants: The caller's document is borrowed, never mutated.
//! Invariants: A shape error aborts construction; no partial envelope escapes.

use crate::core::criteria::SendCriteria;
use crate::core::error::Error;
use serde_json::{Map, Value};
use std::fmt::Write as _;

/// Nested-payload keys with platform-defined semantics. Everything else in
/// the `message` object passes through as opaque application data.
pub const RESERVED_PAYLOAD_KEYS: [&str; 7] = [
    "alert",
    "title",
    "action",
    "sound",
    "action-category",
    "content-available",
    "badge",
];

/// A parsed, validated push message.
///
/// Submitted documents are flexible JSON maps, like:
/// ```json
/// {
///   "alias": ["someUsername"],
///   "deviceType": ["someDevice"],
///   "categories": ["someCategory"],
///   "variants": ["someVariantID"],
///   "ttl": 3600,
///   "simple-push": "version=123",
///   "message": {
///     "alert": "HELLO!",
///     "title": "Title",
///     "action-category": "some value",
///     "sound": "default",
///     "badge": 2,
///     "content-available": true,
///     "someKey": "some value"
///   }
/// }
/// ```
/// Core fields are immutable after construction; only the two request
/// metadata fields (`ip_address`, `client_identifier`) have setters, written
/// by the transport before the envelope is handed to delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEnvelope {
    criteria: SendCriteria,

    alert: Option<String>,
    title: Option<String>,
    action: Option<String>,
    action_category: Option<String>,
    sound: Option<String>,
    content_available: bool,
    badge: Option<i64>,
    time_to_live: Option<i64>,
    simple_push: Option<String>,

    data: Option<Map<String, Value>>,

    ip_address: Option<String>,
    client_identifier: Option<String>,
}

impl MessageEnvelope {
    /// Builds an envelope from the decoded top-level document.
    ///
    /// The document is read, not consumed: reserved keys are looked up by
    /// name and `data` is computed as the nested payload minus
    /// [`RESERVED_PAYLOAD_KEYS`]. Unknown top-level keys are tolerated and
    /// ignored; a recognized key with the wrong shape is a `TypeMismatch`
    /// and nothing is returned.
    pub fn from_document(document: &Map<String, Value>) -> Result<Self, Error> {
        let criteria = SendCriteria::from_document(document)?;

        let payload = match document.get("message") {
            None | Some(Value::Null) => None,
            Some(Value::Object(payload)) => Some(payload),
            Some(_) => return Err(Error::type_mismatch("message", "a JSON object")),
        };

        let (alert, title, action, sound, action_category, content_available, badge, data) =
            match payload {
                Some(payload) => (
                    string_field(payload, "alert")?,
                    string_field(payload, "title")?,
                    string_field(payload, "action")?,
                    string_field(payload, "sound")?,
                    string_field(payload, "action-category")?,
                    bool_field(payload, "content-available")?.unwrap_or(false),
                    integer_field(payload, "badge")?,
                    Some(opaque_data(payload)),
                ),
                None => (None, None, None, None, None, false, None, None),
            };

        let time_to_live = integer_field(document, "ttl")?;
        let simple_push = string_field(document, "simple-push")?;
        // A misspelled top-level "simplePush" (no hyphen) is intentionally
        // not recognized: ignored, not an error, captured nowhere.

        Ok(Self {
            criteria,
            alert,
            title,
            action,
            action_category,
            sound,
            content_available,
            badge,
            time_to_live,
            simple_push,
            data,
            ip_address: None,
            client_identifier: None,
        })
    }

    pub fn criteria(&self) -> &SendCriteria {
        &self.criteria
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn action_category(&self) -> Option<&str> {
        self.action_category.as_deref()
    }

    pub fn sound(&self) -> Option<&str> {
        self.sound.as_deref()
    }

    pub fn content_available(&self) -> bool {
        self.content_available
    }

    /// Badge count, or `-1` when the payload did not supply one. The
    /// sentinel is part of the wire-compatible contract.
    pub fn badge(&self) -> i64 {
        self.badge.unwrap_or(-1)
    }

    /// Time-to-live in seconds, or `-1` when `ttl` was not supplied.
    pub fn time_to_live(&self) -> i64 {
        self.time_to_live.unwrap_or(-1)
    }

    pub fn simple_push(&self) -> Option<&str> {
        self.simple_push.as_deref()
    }

    /// Opaque application data from the nested payload. `None` means no
    /// `message` object was submitted at all; an empty map means one was
    /// submitted but held only reserved keys.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn client_identifier(&self) -> Option<&str> {
        self.client_identifier.as_deref()
    }

    pub fn set_ip_address(&mut self, ip_address: impl Into<String>) {
        self.ip_address = Some(ip_address.into());
    }

    pub fn set_client_identifier(&mut self, client_identifier: impl Into<String>) {
        self.client_identifier = Some(client_identifier.into());
    }

    /// Renders the legacy audit projection of the envelope.
    ///
    /// This is a human-readable logging format, not a machine round-trip
    /// format: unset strings render as the literal text `null` inside
    /// quotes, absent integers render as the `-1` sentinel, and `data`
    /// values are naively stringified into quoted text without recursive
    /// escaping. Auditing tooling depends on this exact shape.
    pub fn to_audit_json(&self) -> String {
        let mut out = String::from("{");
        audit_string(&mut out, "ipAddress", self.ip_address.as_deref());
        out.push(',');
        audit_string(&mut out, "clientIdentifier", self.client_identifier.as_deref());
        out.push(',');
        audit_string(&mut out, "simplePush", self.simple_push.as_deref());
        out.push(',');
        audit_string(&mut out, "alert", self.alert.as_deref());
        out.push(',');
        audit_string(&mut out, "title", self.title.as_deref());
        out.push(',');
        audit_string(&mut out, "action", self.action.as_deref());
        out.push(',');
        audit_string(&mut out, "action-category", self.action_category.as_deref());
        out.push(',');
        audit_string(&mut out, "sound", self.sound.as_deref());
        out.push(',');
        let _ = write!(out, "\"contentAvailable\":{}", self.content_available);
        let _ = write!(out, ",\"badge\":{}", self.badge());
        let _ = write!(out, ",\"timeToLive\":{}", self.time_to_live());
        out.push_str(",\"data\":{");
        if let Some(data) = &self.data {
            let mut first = true;
            for (key, value) in data {
                if !first {
                    out.push(',');
                }
                first = false;
                let _ = write!(out, "\"{key}\":\"{}\"", stringify_value(value));
            }
        }
        out.push_str("}}");
        out
    }
}

fn audit_string(out: &mut String, key: &str, value: Option<&str>) {
    let _ = write!(out, "\"{key}\":\"{}\"", value.unwrap_or("null"));
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn opaque_data(payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .iter()
        .filter(|(key, _)| !RESERVED_PAYLOAD_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>, Error> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(Error::type_mismatch(key, "a string")),
    }
}

fn bool_field(map: &Map<String, Value>, key: &str) -> Result<Option<bool>, Error> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(Error::type_mismatch(key, "a boolean")),
    }
}

fn integer_field(map: &Map<String, Value>, key: &str) -> Result<Option<i64>, Error> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(value)) => match value.as_i64() {
            Some(value) => Ok(Some(value)),
            None => Err(Error::type_mismatch(key, "an integer")),
        },
        Some(_) => Err(Error::type_mismatch(key, "an integer")),
    }
}
