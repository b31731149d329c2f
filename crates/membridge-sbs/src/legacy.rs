//! Read-only decoder for the legacy v1 grammar.
//!
//! v1 shares the v2 grammar's philosophy (one tag byte, width-variant
//! blocks, little-endian lengths, identical payload shapes) but numbers its
//! tags differently: every container family carries only four width
//! variants (no dynamic-2), and the integer family stops at dynamic-1, so
//! all later codes sit lower than their v2 counterparts.
//!
//! No v1 corpus survives in this tree; the table below reconstructs the
//! grammar from the family order and is isolated here so a recovered
//! corpus can correct it in one place. Encoders never emit v1.

use num_bigint::BigInt;

use crate::{
    decode::{
        Reader, construct_date, construct_datetime, construct_decimal, construct_time,
        construct_uuid, enter, iso_text, utf8,
    },
    errors::{DecodeError, DecodeResult},
    value::Value,
};

// The v1 tag table. Families keep the v2 order; each block is one code
// narrower per dropped width variant.

const STR_E: u8 = 0;
const STR_1: u8 = 1;
const STR_D1: u8 = 3;
const INT_1: u8 = 4;
const INT_D1: u8 = 9;
const FLOAT: u8 = 10;
const BOOL_TRUE: u8 = 11;
const BOOL_FALSE: u8 = 12;
const COMPLEX: u8 = 13;
const NONE: u8 = 14;
const ELLIPSIS: u8 = 15;
const BYTES_E: u8 = 16;
const BYTES_1: u8 = 17;
const BYTES_D1: u8 = 19;
const BYTEARRAY_E: u8 = 20;
const BYTEARRAY_1: u8 = 21;
const BYTEARRAY_D1: u8 = 23;
const LIST_E: u8 = 24;
const LIST_1: u8 = 25;
const LIST_D1: u8 = 27;
const SET_E: u8 = 28;
const SET_1: u8 = 29;
const SET_D1: u8 = 31;
const TUPLE_E: u8 = 32;
const TUPLE_1: u8 = 33;
const TUPLE_D1: u8 = 35;
const DICT_E: u8 = 36;
const DICT_1: u8 = 37;
const DICT_D1: u8 = 39;
const FROZENSET_E: u8 = 40;
const FROZENSET_1: u8 = 41;
const FROZENSET_D1: u8 = 43;
const DATETIME: u8 = 44;
const TIMEDELTA: u8 = 45;
const DATE: u8 = 46;
const TIME: u8 = 47;
const UUID: u8 = 48;
const MEMORYVIEW_E: u8 = 49;
const MEMORYVIEW_1: u8 = 50;
const MEMORYVIEW_D1: u8 = 52;
const DECIMAL_1: u8 = 53;
const DECIMAL_D1: u8 = 55;
const RANGE: u8 = 56;
const NAMEDTUPLE_E: u8 = 57;
const NAMEDTUPLE_1: u8 = 58;
const NAMEDTUPLE_D1: u8 = 60;
const DEQUE_E: u8 = 61;
const DEQUE_1: u8 = 62;
const DEQUE_D1: u8 = 64;
const COUNTER_E: u8 = 65;
const COUNTER_1: u8 = 66;
const COUNTER_D1: u8 = 68;

/// Read a v1 length field: width 1, width 2, or dynamic-1.
fn block_len(r: &mut Reader<'_>, step: u8) -> DecodeResult<usize> {
    match step {
        0 => r.read_len(1),
        1 => r.read_len(2),
        _ => {
            let k = usize::from(r.take_u8()?);
            r.read_len(k)
        },
    }
}

/// Decode one v1 value from `bytes` (which carry no protocol byte).
pub(crate) fn decode_value(bytes: &[u8]) -> DecodeResult<Value> {
    let mut reader = Reader::new(bytes);
    value_at(&mut reader, 0)
}

fn value_at(r: &mut Reader<'_>, depth: u32) -> DecodeResult<Value> {
    let at = r.offset();
    let t = r.take_u8()?;
    match t {
        STR_E => Ok(Value::Str(String::new())),
        STR_1..=STR_D1 => {
            let len = block_len(r, t - STR_1)?;
            Ok(Value::Str(utf8(r, len, "string")?))
        },

        INT_1..=INT_D1 => Ok(Value::Int(int_payload(r, t)?)),

        FLOAT => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(r.take(8)?);
            Ok(Value::Float(f64::from_le_bytes(bytes)))
        },
        BOOL_TRUE => Ok(Value::Bool(true)),
        BOOL_FALSE => Ok(Value::Bool(false)),
        COMPLEX => {
            let mut real = [0u8; 8];
            real.copy_from_slice(r.take(8)?);
            let mut imag = [0u8; 8];
            imag.copy_from_slice(r.take(8)?);
            Ok(Value::Complex {
                real: f64::from_le_bytes(real),
                imag: f64::from_le_bytes(imag),
            })
        },
        NONE => Ok(Value::None),
        ELLIPSIS => Ok(Value::Ellipsis),

        BYTES_E => Ok(Value::Bytes(bytes::Bytes::new())),
        BYTES_1..=BYTES_D1 => {
            let len = block_len(r, t - BYTES_1)?;
            Ok(Value::Bytes(bytes::Bytes::copy_from_slice(r.take(len)?)))
        },
        BYTEARRAY_E => Ok(Value::ByteArray(Vec::new())),
        BYTEARRAY_1..=BYTEARRAY_D1 => {
            let len = block_len(r, t - BYTEARRAY_1)?;
            Ok(Value::ByteArray(r.take(len)?.to_vec()))
        },
        MEMORYVIEW_E => Ok(Value::MemoryView(bytes::Bytes::new())),
        MEMORYVIEW_1..=MEMORYVIEW_D1 => {
            let len = block_len(r, t - MEMORYVIEW_1)?;
            Ok(Value::MemoryView(bytes::Bytes::copy_from_slice(r.take(len)?)))
        },

        DATETIME => construct_datetime(&iso_text(r, "datetime")?),
        TIMEDELTA => {
            let mut fields = [0i32; 3];
            for field in &mut fields {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(r.take(4)?);
                *field = i32::from_le_bytes(bytes);
            }
            Ok(Value::TimeDelta { days: fields[0], seconds: fields[1], micros: fields[2] })
        },
        DATE => construct_date(&iso_text(r, "date")?),
        TIME => construct_time(&iso_text(r, "time")?),
        UUID => {
            let payload_at = r.offset();
            let raw = r.take(32)?;
            let text = std::str::from_utf8(raw)
                .map_err(|_| DecodeError::InvalidEncoding { what: "uuid", offset: payload_at })?;
            construct_uuid(text)
        },

        DECIMAL_1..=DECIMAL_D1 => {
            let len = block_len(r, t - DECIMAL_1)?;
            construct_decimal(&utf8(r, len, "decimal")?)
        },

        RANGE => {
            let start = int_at(r)?;
            let stop = int_at(r)?;
            let step = int_at(r)?;
            Ok(Value::Range { start, stop, step })
        },

        LIST_E => {
            let _ = enter(depth)?;
            Ok(Value::List(Vec::new()))
        },
        LIST_1..=LIST_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - LIST_1)?;
            Ok(Value::List(seq(r, depth, count)?))
        },
        TUPLE_E => {
            let _ = enter(depth)?;
            Ok(Value::Tuple(Vec::new()))
        },
        TUPLE_1..=TUPLE_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - TUPLE_1)?;
            Ok(Value::Tuple(seq(r, depth, count)?))
        },
        SET_E => {
            let _ = enter(depth)?;
            Ok(Value::Set(Vec::new()))
        },
        SET_1..=SET_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - SET_1)?;
            Ok(Value::Set(seq(r, depth, count)?))
        },
        FROZENSET_E => {
            let _ = enter(depth)?;
            Ok(Value::FrozenSet(Vec::new()))
        },
        FROZENSET_1..=FROZENSET_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - FROZENSET_1)?;
            Ok(Value::FrozenSet(seq(r, depth, count)?))
        },
        DEQUE_E => {
            let _ = enter(depth)?;
            Ok(Value::Deque(std::collections::VecDeque::new()))
        },
        DEQUE_1..=DEQUE_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - DEQUE_1)?;
            Ok(Value::Deque(seq(r, depth, count)?.into()))
        },

        DICT_E => {
            let _ = enter(depth)?;
            Ok(Value::Dict(Vec::new()))
        },
        DICT_1..=DICT_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - DICT_1)?;
            r.ensure(count.saturating_mul(2))?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = value_at(r, depth)?;
                let val = value_at(r, depth)?;
                pairs.push((key, val));
            }
            Ok(Value::Dict(pairs))
        },
        COUNTER_E => {
            let _ = enter(depth)?;
            Ok(Value::Counter(Vec::new()))
        },
        COUNTER_1..=COUNTER_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - COUNTER_1)?;
            r.ensure(count.saturating_mul(2))?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = value_at(r, depth)?;
                let multiplicity = int_at(r)?;
                pairs.push((key, multiplicity));
            }
            Ok(Value::Counter(pairs))
        },

        NAMEDTUPLE_E => {
            let _ = enter(depth)?;
            Ok(Value::NamedTuple { type_name: String::new(), fields: Vec::new() })
        },
        NAMEDTUPLE_1..=NAMEDTUPLE_D1 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - NAMEDTUPLE_1)?;
            let type_name = str_at(r)?;
            r.ensure(count.saturating_mul(2))?;
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                let name = str_at(r)?;
                let val = value_at(r, depth)?;
                fields.push((name, val));
            }
            Ok(Value::NamedTuple { type_name, fields })
        },

        other => Err(DecodeError::UnknownTag { tag: other, offset: at }),
    }
}

fn seq(r: &mut Reader<'_>, depth: u32, count: usize) -> DecodeResult<Vec<Value>> {
    r.ensure(count)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(value_at(r, depth)?);
    }
    Ok(items)
}

fn int_payload(r: &mut Reader<'_>, t: u8) -> DecodeResult<BigInt> {
    let k = match t {
        INT_D1 => usize::from(r.take_u8()?),
        _ => usize::from(t - INT_1) + 1,
    };
    Ok(BigInt::from_signed_bytes_le(r.take(k)?))
}

fn int_at(r: &mut Reader<'_>) -> DecodeResult<BigInt> {
    let at = r.offset();
    let t = r.take_u8()?;
    if !(INT_1..=INT_D1).contains(&t) {
        return Err(DecodeError::Construct {
            what: "integer",
            detail: format!("expected an integer tag, found {t:#04x} at offset {at}"),
        });
    }
    int_payload(r, t)
}

fn str_at(r: &mut Reader<'_>) -> DecodeResult<String> {
    let at = r.offset();
    let t = r.take_u8()?;
    match t {
        STR_E => Ok(String::new()),
        STR_1..=STR_D1 => {
            let len = block_len(r, t - STR_1)?;
            utf8(r, len, "string")
        },
        other => Err(DecodeError::Construct {
            what: "namedtuple",
            detail: format!("expected a string tag, found {other:#04x} at offset {at}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_decode_under_shifted_tags() {
        assert_eq!(decode_value(&[NONE]).unwrap(), Value::None);
        assert_eq!(decode_value(&[BOOL_TRUE]).unwrap(), Value::Bool(true));
        assert_eq!(decode_value(&[INT_1, 7]).unwrap(), Value::Int(BigInt::from(7)));
        assert_eq!(
            decode_value(&[STR_1, 2, b'h', b'i']).unwrap(),
            Value::Str("hi".into())
        );
    }

    #[test]
    fn v2_only_codes_are_unknown_in_v1() {
        // 69 is past the v1 counter block; v2 uses codes up to 82.
        assert_eq!(
            decode_value(&[69]).unwrap_err(),
            DecodeError::UnknownTag { tag: 69, offset: 0 }
        );
    }

    #[test]
    fn composites_nest_like_v2() {
        let bytes = [LIST_1, 2, BOOL_TRUE, INT_1, 3];
        assert_eq!(
            decode_value(&bytes).unwrap(),
            Value::List(vec![Value::Bool(true), Value::Int(BigInt::from(3))])
        );
    }

    #[test]
    fn truncation_is_detected() {
        let bytes = [LIST_1, 2, BOOL_TRUE];
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            DecodeError::Truncated { .. }
        ));
    }
}
