use chrono::Duration;
use tollgate::{
    Clock, FixedClock,
    envelope::{EnvelopeError, Head, Package, Request, Response, ResponseHead},
};

const SALT: &str = "caller-salt";

fn signed(clock: &FixedClock, body: &str) -> Request {
    let mut request = Package::new(Head::new("t1", "frontend", 42, clock.now()), body);
    request.set_secret(SALT);
    request.sign().unwrap();
    request
}

#[test]
fn test_replay_window_edges() {
    let clock = FixedClock::default();
    let request = signed(&clock, "{}");

    clock.advance_secs(120);
    assert_eq!(request.head.check_with(&clock), Ok(()));
    clock.advance_secs(1);
    assert_eq!(request.head.check_with(&clock), Err(EnvelopeError::Expired));

    let early = FixedClock::default();
    early.advance_secs(-120);
    assert_eq!(request.head.check_with(&early), Ok(()));
    early.advance_secs(-1);
    assert_eq!(request.head.check_with(&early), Err(EnvelopeError::Future));
}

#[test]
fn test_wire_shape() {
    let clock = FixedClock::default();
    let request = signed(&clock, r#"{"Token":"t"}"#);
    let json = serde_json::to_value(&request).unwrap();

    for field in ["Domain", "Id", "Sequence", "Timestamp", "Signature"] {
        assert!(json["Head"].get(field).is_some(), "missing {field}");
    }
    assert_eq!(json["Body"], r#"{"Token":"t"}"#);
    assert!(!json.to_string().contains(SALT));
}

#[test]
fn test_signature_survives_transport() {
    let clock = FixedClock::default();
    let request = signed(&clock, r#"{"Login":"alice"}"#);
    let wire = serde_json::to_string(&request).unwrap();

    let mut received: Request = serde_json::from_str(&wire).unwrap();
    assert!(!received.has_secret());
    received.set_secret(SALT);
    assert!(received.good_signature());
    assert!(!received.has_secret());

    let mut wrong_key: Request = serde_json::from_str(&wire).unwrap();
    wrong_key.set_secret("another-salt");
    assert!(!wrong_key.good_signature());
}

#[test]
fn test_any_head_change_breaks_signature() {
    let clock = FixedClock::default();
    let original = signed(&clock, "{}");

    let mut tampered = original.clone();
    tampered.head.sequence += 1;
    tampered.set_secret(SALT);
    assert!(!tampered.good_signature());

    let mut tampered = original.clone();
    tampered.head.timestamp = Some(clock.now() + Duration::seconds(1));
    tampered.set_secret(SALT);
    assert!(!tampered.good_signature());

    let mut tampered = original;
    tampered.head.domain = "t2".into();
    tampered.set_secret(SALT);
    assert!(!tampered.good_signature());
}

#[test]
fn test_missing_fields_are_reported_in_order() {
    let clock = FixedClock::default();
    let mut head = Head::default();
    assert_eq!(head.check_with(&clock), Err(EnvelopeError::NoDomain));
    head.domain = "t1".into();
    assert_eq!(head.check_with(&clock), Err(EnvelopeError::NoId));
    head.id = "frontend".into();
    assert_eq!(head.check_with(&clock), Err(EnvelopeError::NoTimestamp));
    head.timestamp = Some(clock.now());
    assert_eq!(head.check_with(&clock), Ok(()));
}

#[test]
fn test_response_signing() {
    let clock = FixedClock::default();
    let mut head = ResponseHead::new(9, clock.now());
    head.code = 404;
    head.message = "not found".into();
    let mut response: Response = Package::new(head, "");

    assert_eq!(response.sign(), Err(EnvelopeError::NoSecret));
    response.set_secret(SALT);
    response.sign().unwrap();
    assert!(!response.head.is_success());

    let mut copy = response.clone();
    copy.head.code = 200;
    copy.set_secret(SALT);
    assert!(!copy.good_signature());
}
