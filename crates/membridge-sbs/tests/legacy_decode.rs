//! Decoding buffers written under the legacy v1 protocol.
//!
//! The v1 grammar numbers its tags differently and has no dynamic-2 width.
//! These buffers are hand-built against the v1 table; the public API must
//! route them through the legacy decoder off the protocol byte alone.

use membridge_sbs::{DecodeError, Value, from_value, tag, to_value};
use num_bigint::BigInt;

#[test]
fn v1_scalars_decode() {
    // v1 integer block starts at 4; a one-byte integer is tag 4.
    assert_eq!(
        to_value(&[tag::PROTOCOL_V1, 4, 7]).unwrap(),
        Value::Int(BigInt::from(7))
    );

    // v1 strings start at 0, same as v2.
    assert_eq!(
        to_value(&[tag::PROTOCOL_V1, 1, 2, b'h', b'i']).unwrap(),
        Value::Str("hi".into())
    );
}

#[test]
fn v1_composites_decode() {
    // v1 list width-1 is tag 25; boolean true is 11.
    let bytes = [tag::PROTOCOL_V1, 25, 2, 11, 4, 3];
    assert_eq!(
        to_value(&bytes).unwrap(),
        Value::List(vec![Value::Bool(true), Value::Int(BigInt::from(3))])
    );
}

#[test]
fn v1_rejects_v2_only_codes() {
    // 82 is the top of the v2 counter block; v1 tags stop at 68.
    assert_eq!(
        to_value(&[tag::PROTOCOL_V1, 82]).unwrap_err(),
        DecodeError::UnknownTag { tag: 82, offset: 0 }
    );
}

#[test]
fn encoders_never_emit_the_legacy_protocol() {
    let value = Value::List(vec![Value::Bool(true)]);
    let bytes = from_value(&value).unwrap();
    assert_eq!(bytes[0], tag::PROTOCOL_V2);
    // The same logical value reads back under both grammars, from
    // different tag numbers.
    assert_eq!(to_value(&bytes).unwrap(), value);
    assert_eq!(to_value(&[tag::PROTOCOL_V1, 25, 1, 11]).unwrap(), value);
}
