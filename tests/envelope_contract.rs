//! Purpose: Contract coverage for envelope construction from send documents.
//! Exports: Integration tests only.
//! Role: Mirror the gateway's sender contract: defaults, reserved-key
//! partitioning, shape errors, and the legacy audit projection.
//! Invariants: Assertions target observable envelope state, never internals.

use pushgate::api::{ErrorKind, MessageEnvelope};
use serde_json::{Map, Value, json};

fn document(value: Value) -> Map<String, Value> {
    value.as_object().expect("object").clone()
}

#[test]
fn broadcast_message() {
    let doc = document(json!({
        "message": {
            "alert": "Howdy",
            "sound": "default",
            "badge": 2,
            "someKey": "someValue",
        }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");

    assert_eq!(envelope.alert(), Some("Howdy"));
    assert_eq!(envelope.sound(), Some("default"));
    assert_eq!(envelope.badge(), 2);
    assert_eq!(
        envelope.data().expect("data").get("someKey"),
        Some(&json!("someValue"))
    );

    // no TTL:
    assert_eq!(envelope.time_to_live(), -1);

    // multiple access?
    assert_eq!(envelope.alert(), Some("Howdy"));
    assert_eq!(
        envelope.data().expect("data").get("someKey"),
        Some(&json!("someValue"))
    );

    assert_eq!(envelope.criteria().aliases(), None);
    assert_eq!(envelope.criteria().device_types(), None);
    assert_eq!(envelope.criteria().categories(), None);
    assert_eq!(envelope.criteria().variants(), None);
    assert_eq!(envelope.simple_push(), None);
}

#[test]
fn broadcast_message_with_simple_push() {
    let doc = document(json!({
        "message": { "alert": "Howdy", "someKey": "someValue" },
        "simple-push": "version=123",
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.simple_push(), Some("version=123"));
}

#[test]
fn misspelled_simple_push_is_silently_ignored() {
    let doc = document(json!({
        "message": { "alert": "Howdy", "someKey": "someValue" },
        "simplePush": "version=123",
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.simple_push(), None);
    // and it does not show up as application data either:
    assert!(!envelope.data().expect("data").contains_key("simplePush"));
}

#[test]
fn no_badge_payload() {
    let doc = document(json!({
        "message": { "alert": "Howdy", "sound": "default", "someKey": "someValue" }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.alert(), Some("Howdy"));
    assert_eq!(envelope.badge(), -1);
}

#[test]
fn title() {
    let doc = document(json!({
        "message": { "alert": "howdy", "title": "I'm a Title" }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.title(), Some("I'm a Title"));
}

#[test]
fn action() {
    let doc = document(json!({
        "message": { "alert": "howdy", "action": "View" }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.action(), Some("View"));
}

#[test]
fn action_category() {
    let doc = document(json!({
        "message": { "alert": "Howdy", "action-category": "POSTS" }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.action_category(), Some("POSTS"));
}

#[test]
fn content_available() {
    let doc = document(json!({
        "message": {
            "alert": "Howdy",
            "sound": "default",
            "someKey": "someValue",
            "content-available": true,
        }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.alert(), Some("Howdy"));
    assert_eq!(envelope.badge(), -1);
    assert!(envelope.content_available());
}

#[test]
fn no_content_available() {
    let doc = document(json!({
        "message": { "alert": "Howdy", "sound": "default", "someKey": "someValue" }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert!(!envelope.content_available());
}

#[test]
fn url_args_stay_in_data() {
    let doc = document(json!({
        "message": {
            "alert": "howdy",
            "title": "I'm a Title",
            "url-args": ["Arg1", "Arg2"],
        }
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(
        envelope.data().expect("data").get("url-args"),
        Some(&json!(["Arg1", "Arg2"]))
    );
}

#[test]
fn scalar_message_object_is_rejected() {
    let doc = document(json!({ "message": "payload" }));
    let err = MessageEnvelope::from_document(&doc).expect_err("expected mismatch");
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.field(), Some("message"));
}

#[test]
fn audit_projection_matches_legacy_format() {
    let doc = document(json!({
        "message": {
            "alert": "Howdy",
            "sound": "default",
            "badge": 2,
            "someKey": "someValue",
        },
        "simple-push": "version=123",
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");

    assert_eq!(
        envelope.to_audit_json(),
        concat!(
            "{",
            "\"ipAddress\":\"null\",",
            "\"clientIdentifier\":\"null\",",
            "\"simplePush\":\"version=123\",",
            "\"alert\":\"Howdy\",",
            "\"title\":\"null\",",
            "\"action\":\"null\",",
            "\"action-category\":\"null\",",
            "\"sound\":\"default\",",
            "\"contentAvailable\":false,",
            "\"badge\":2,",
            "\"timeToLive\":-1,",
            "\"data\":{\"someKey\":\"someValue\"}",
            "}"
        )
    );
}

#[test]
fn audit_projection_without_payload_renders_defaults() {
    let envelope = MessageEnvelope::from_document(&Map::new()).expect("parse");

    assert_eq!(
        envelope.to_audit_json(),
        concat!(
            "{",
            "\"ipAddress\":\"null\",",
            "\"clientIdentifier\":\"null\",",
            "\"simplePush\":\"null\",",
            "\"alert\":\"null\",",
            "\"title\":\"null\",",
            "\"action\":\"null\",",
            "\"action-category\":\"null\",",
            "\"sound\":\"null\",",
            "\"contentAvailable\":false,",
            "\"badge\":-1,",
            "\"timeToLive\":-1,",
            "\"data\":{}",
            "}"
        )
    );
}

#[test]
fn audit_projection_includes_request_metadata() {
    let doc = document(json!({ "message": { "alert": "Howdy" } }));
    let mut envelope = MessageEnvelope::from_document(&doc).expect("parse");
    envelope.set_ip_address("10.0.0.7");
    envelope.set_client_identifier("dashboard");

    let audit = envelope.to_audit_json();
    assert!(audit.starts_with("{\"ipAddress\":\"10.0.0.7\",\"clientIdentifier\":\"dashboard\","));
}

#[test]
fn ttl_is_read_from_the_top_level() {
    let doc = document(json!({
        "ttl": 3600,
        "message": { "alert": "Howdy" },
    }));

    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.time_to_live(), 3600);
    // a nested ttl is application data, not a reserved key:
    let doc = document(json!({ "message": { "ttl": 60 } }));
    let envelope = MessageEnvelope::from_document(&doc).expect("parse");
    assert_eq!(envelope.time_to_live(), -1);
    assert_eq!(envelope.data().expect("data").get("ttl"), Some(&json!(60)));
}
