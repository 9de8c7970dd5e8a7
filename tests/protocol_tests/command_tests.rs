//! Command Tests
//!
//! Tests for tags, the payload table and command validation.

use tensormeter::protocol::{Command, PayloadKind, Tag, Value};
use tensormeter::TensormeterError;

fn tag(s: &str) -> Tag {
    s.parse().unwrap()
}

// =============================================================================
// Tag Tests
// =============================================================================

#[test]
fn test_tag_parse_and_display() {
    let t = tag("mod?");
    assert_eq!(t.as_str(), "mod?");
    assert_eq!(t.to_string(), "mod?");
    assert_eq!(t.as_bytes(), b"mod?");
    assert_eq!(format!("{:?}", t), "Tag(\"mod?\")");
    assert_eq!(Tag::try_from("newd").unwrap(), Tag::NEWD);
}

#[test]
fn test_tag_rejects_bad_input() {
    for bad in ["", "new", "newdd", "né!"] {
        assert!(
            matches!(bad.parse::<Tag>(), Err(TensormeterError::InvalidCommand(_))),
            "{:?} should be rejected",
            bad
        );
    }

    assert!(matches!(
        Tag::from_bytes([0xFF, b'a', b'b', b'c']),
        Err(TensormeterError::Protocol(_))
    ));
}

// =============================================================================
// Payload Table Tests
// =============================================================================

#[test]
fn test_payload_table() {
    for t in [
        "lfrq", "sres", "avgt", "vamp", "camp", "vodc", "cudc", "virg", "vorg", "crng", "vpro",
        "cpro",
    ] {
        assert_eq!(tag(t).payload_kind(), PayloadKind::F64, "{}", t);
    }
    for t in ["meas", "trmo"] {
        assert_eq!(tag(t).payload_kind(), PayloadKind::I32, "{}", t);
    }
    for t in ["amod", "mod?", "cmod"] {
        assert_eq!(tag(t).payload_kind(), PayloadKind::U16, "{}", t);
    }
    for t in ["tcai", "refe"] {
        assert_eq!(tag(t).payload_kind(), PayloadKind::Bool, "{}", t);
    }
    for t in ["cldt", "newd", "alld"] {
        assert_eq!(tag(t).payload_kind(), PayloadKind::Empty, "{}", t);
    }
    for t in ["xxxx", "LFRQ", "abcd"] {
        assert_eq!(tag(t).payload_kind(), PayloadKind::Raw, "{}", t);
    }
}

#[test]
fn test_payload_sizes() {
    assert_eq!(PayloadKind::F64.size(), 8);
    assert_eq!(PayloadKind::I32.size(), 4);
    assert_eq!(PayloadKind::U16.size(), 2);
    assert_eq!(PayloadKind::Bool.size(), 1);
    assert_eq!(PayloadKind::Raw.size(), 1);
    assert_eq!(PayloadKind::Empty.size(), 0);
}

// =============================================================================
// Command Validation Tests
// =============================================================================

#[test]
fn test_command_new_validates_value_type() {
    assert!(Command::new(Tag::VODC, Some(Value::F64(1.0))).is_ok());
    assert!(Command::new(Tag::NEWD, None).is_ok());

    let cases = [
        (Tag::VODC, Some(Value::I32(1))),
        (Tag::VODC, None),
        (Tag::MEAS, Some(Value::U16(1))),
        (Tag::ALLD, Some(Value::Raw(0))),
        (tag("zzzz"), None),
    ];
    for (t, value) in cases {
        assert!(
            matches!(Command::new(t, value), Err(TensormeterError::InvalidCommand(_))),
            "{} with {:?} should be rejected",
            t,
            value
        );
    }
}

#[test]
fn test_command_constructors() {
    let meas = Command::measurement_count(100);
    assert_eq!(meas.tag(), Tag::MEAS);
    assert_eq!(meas.value(), Some(Value::I32(100)));
    assert_eq!(meas.payload_len(), 4);

    assert_eq!(Command::output_voltage(0.5).payload_len(), 8);
    assert_eq!(Command::clear_data().tag(), Tag::CLDT);
    assert_eq!(Command::new_data().payload_len(), 0);
    assert_eq!(Command::all_data().value(), None);
}

// =============================================================================
// Value Parsing Tests
// =============================================================================

#[test]
fn test_value_parse() {
    assert_eq!(Value::parse(PayloadKind::F64, "-1.5e3").unwrap(), Some(Value::F64(-1500.0)));
    assert_eq!(Value::parse(PayloadKind::I32, " -7 ").unwrap(), Some(Value::I32(-7)));
    assert_eq!(Value::parse(PayloadKind::U16, "65535").unwrap(), Some(Value::U16(65535)));
    assert_eq!(Value::parse(PayloadKind::Bool, "1").unwrap(), Some(Value::Bool(true)));
    assert_eq!(Value::parse(PayloadKind::Bool, "false").unwrap(), Some(Value::Bool(false)));
    assert_eq!(Value::parse(PayloadKind::Raw, "-128").unwrap(), Some(Value::Raw(-128)));
    assert_eq!(Value::parse(PayloadKind::Empty, "").unwrap(), None);
}

#[test]
fn test_value_parse_errors() {
    let cases = [
        (PayloadKind::F64, "volts"),
        (PayloadKind::I32, "1.5"),
        (PayloadKind::U16, "-1"),
        (PayloadKind::Bool, "yes"),
        (PayloadKind::Raw, "300"),
        (PayloadKind::Empty, "1"),
    ];
    for (kind, text) in cases {
        assert!(
            matches!(Value::parse(kind, text), Err(TensormeterError::InvalidCommand(_))),
            "{:?} as {:?} should be rejected",
            text,
            kind
        );
    }
}
