//! Bounds-checked decoder for the current (v2) grammar.
//!
//! The decoder walks untrusted bytes with a cursor that validates every
//! read before performing it: a short buffer always surfaces as a
//! `Truncated` error, never as a read past the end. Dispatch is a single
//! match over the closed tag catalog; anything outside it is `UnknownTag`.
//! Decoded blobs and strings are copied out of the input buffer, so no
//! returned value borrows from it.
//!
//! Composite recursion is bounded at the same depth as the encoder.
//! Conforming buffers never approach the bound; it exists to stop crafted
//! input from exhausting the stack.

use bigdecimal::BigDecimal;
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_bigint::BigInt;
use uuid::Uuid;

use crate::{
    encode::MAX_DEPTH,
    errors::{DecodeError, DecodeResult},
    lenenc, tag,
    value::{self, Value},
};

/// Cursor over the byte region being decoded.
///
/// `offset` only ever advances, and only after [`Reader::ensure`] has
/// proven the read is in bounds.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Fail with `Truncated` unless `needed` bytes remain.
    pub(crate) fn ensure(&self, needed: usize) -> DecodeResult<()> {
        let available = self.remaining();
        if needed > available {
            return Err(DecodeError::Truncated { offset: self.offset, needed, available });
        }
        Ok(())
    }

    pub(crate) fn take_u8(&mut self) -> DecodeResult<u8> {
        self.ensure(1)?;
        let byte = self.bytes[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    pub(crate) fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Read `width` little-endian length bytes.
    ///
    /// A length that cannot fit in `usize` claims more bytes than any real
    /// buffer holds and is rejected as an invalid length encoding.
    pub(crate) fn read_len(&mut self, width: usize) -> DecodeResult<usize> {
        let at = self.offset;
        let bytes = self.take(width)?;
        lenenc::read_len(bytes)
            .ok_or(DecodeError::InvalidEncoding { what: "length", offset: at })
    }
}

/// Track entry into a composite, enforcing the nesting bound.
pub(crate) fn enter(depth: u32) -> DecodeResult<u32> {
    if depth >= MAX_DEPTH {
        return Err(DecodeError::DepthExceeded { limit: MAX_DEPTH });
    }
    Ok(depth + 1)
}

/// Read the length field for a width-variant block.
///
/// `step` is the tag's distance from the family's width-1 code: 0 and 1 are
/// the fixed one- and two-byte widths, 2 is dynamic-1, 3 is dynamic-2.
/// Non-minimal widths are accepted.
pub(crate) fn block_len(r: &mut Reader<'_>, step: u8) -> DecodeResult<usize> {
    match step {
        0 => r.read_len(1),
        1 => r.read_len(2),
        2 => {
            let k = usize::from(r.take_u8()?);
            r.read_len(k)
        },
        _ => {
            let j = usize::from(r.take_u8()?);
            let k = r.read_len(j)?;
            r.read_len(k)
        },
    }
}

/// Decode one value from `bytes` (which carry no protocol byte).
///
/// Bytes past the single top-level value are ignored; segment payloads are
/// routinely larger than the value they hold.
pub(crate) fn decode_value(bytes: &[u8]) -> DecodeResult<Value> {
    let mut reader = Reader::new(bytes);
    value_at(&mut reader, 0)
}

fn value_at(r: &mut Reader<'_>, depth: u32) -> DecodeResult<Value> {
    let at = r.offset();
    let t = r.take_u8()?;
    match t {
        tag::STR_E => Ok(Value::Str(String::new())),
        tag::STR_1..=tag::STR_D2 => {
            let len = block_len(r, t - tag::STR_1)?;
            Ok(Value::Str(utf8(r, len, "string")?))
        },

        tag::INT_1..=tag::INT_D2 => Ok(Value::Int(int_payload(r, t)?)),

        tag::FLOAT => Ok(Value::Float(f64_at(r)?)),
        tag::BOOL_TRUE => Ok(Value::Bool(true)),
        tag::BOOL_FALSE => Ok(Value::Bool(false)),
        tag::COMPLEX => {
            let real = f64_at(r)?;
            let imag = f64_at(r)?;
            Ok(Value::Complex { real, imag })
        },
        tag::NONE => Ok(Value::None),
        tag::ELLIPSIS => Ok(Value::Ellipsis),

        tag::BYTES_E => Ok(Value::Bytes(Bytes::new())),
        tag::BYTES_1..=tag::BYTES_D2 => {
            let len = block_len(r, t - tag::BYTES_1)?;
            Ok(Value::Bytes(Bytes::copy_from_slice(r.take(len)?)))
        },
        tag::BYTEARRAY_E => Ok(Value::ByteArray(Vec::new())),
        tag::BYTEARRAY_1..=tag::BYTEARRAY_D2 => {
            let len = block_len(r, t - tag::BYTEARRAY_1)?;
            Ok(Value::ByteArray(r.take(len)?.to_vec()))
        },
        tag::MEMORYVIEW_E => Ok(Value::MemoryView(Bytes::new())),
        tag::MEMORYVIEW_1..=tag::MEMORYVIEW_D2 => {
            let len = block_len(r, t - tag::MEMORYVIEW_1)?;
            Ok(Value::MemoryView(Bytes::copy_from_slice(r.take(len)?)))
        },

        tag::DATETIME => construct_datetime(&iso_text(r, "datetime")?),
        tag::TIMEDELTA => {
            let days = i32_at(r)?;
            let seconds = i32_at(r)?;
            let micros = i32_at(r)?;
            Ok(Value::TimeDelta { days, seconds, micros })
        },
        tag::DATE => construct_date(&iso_text(r, "date")?),
        tag::TIME => construct_time(&iso_text(r, "time")?),
        tag::UUID => {
            let payload_at = r.offset();
            let raw = r.take(32)?;
            let text = std::str::from_utf8(raw)
                .map_err(|_| DecodeError::InvalidEncoding { what: "uuid", offset: payload_at })?;
            construct_uuid(text)
        },

        tag::DECIMAL_1..=tag::DECIMAL_D2 => {
            let len = block_len(r, t - tag::DECIMAL_1)?;
            construct_decimal(&utf8(r, len, "decimal")?)
        },

        tag::RANGE => {
            let start = int_at(r)?;
            let stop = int_at(r)?;
            let step = int_at(r)?;
            Ok(Value::Range { start, stop, step })
        },

        tag::LIST_E => {
            let _ = enter(depth)?;
            Ok(Value::List(Vec::new()))
        },
        tag::LIST_1..=tag::LIST_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::LIST_1)?;
            Ok(Value::List(seq(r, depth, count)?))
        },
        tag::TUPLE_E => {
            let _ = enter(depth)?;
            Ok(Value::Tuple(Vec::new()))
        },
        tag::TUPLE_1..=tag::TUPLE_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::TUPLE_1)?;
            Ok(Value::Tuple(seq(r, depth, count)?))
        },
        tag::SET_E => {
            let _ = enter(depth)?;
            Ok(Value::Set(Vec::new()))
        },
        tag::SET_1..=tag::SET_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::SET_1)?;
            Ok(Value::Set(seq(r, depth, count)?))
        },
        tag::FROZENSET_E => {
            let _ = enter(depth)?;
            Ok(Value::FrozenSet(Vec::new()))
        },
        tag::FROZENSET_1..=tag::FROZENSET_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::FROZENSET_1)?;
            Ok(Value::FrozenSet(seq(r, depth, count)?))
        },
        tag::DEQUE_E => {
            let _ = enter(depth)?;
            Ok(Value::Deque(std::collections::VecDeque::new()))
        },
        tag::DEQUE_1..=tag::DEQUE_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::DEQUE_1)?;
            Ok(Value::Deque(seq(r, depth, count)?.into()))
        },

        tag::DICT_E => {
            let _ = enter(depth)?;
            Ok(Value::Dict(Vec::new()))
        },
        tag::DICT_1..=tag::DICT_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::DICT_1)?;
            r.ensure(count.saturating_mul(2))?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = value_at(r, depth)?;
                let val = value_at(r, depth)?;
                pairs.push((key, val));
            }
            Ok(Value::Dict(pairs))
        },
        tag::COUNTER_E => {
            let _ = enter(depth)?;
            Ok(Value::Counter(Vec::new()))
        },
        tag::COUNTER_1..=tag::COUNTER_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::COUNTER_1)?;
            r.ensure(count.saturating_mul(2))?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = value_at(r, depth)?;
                let multiplicity = int_at(r)?;
                pairs.push((key, multiplicity));
            }
            Ok(Value::Counter(pairs))
        },

        tag::NAMEDTUPLE_E => {
            let _ = enter(depth)?;
            Ok(Value::NamedTuple { type_name: String::new(), fields: Vec::new() })
        },
        tag::NAMEDTUPLE_1..=tag::NAMEDTUPLE_D2 => {
            let depth = enter(depth)?;
            let count = block_len(r, t - tag::NAMEDTUPLE_1)?;
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

/// Decode `count` consecutive values.
fn seq(r: &mut Reader<'_>, depth: u32, count: usize) -> DecodeResult<Vec<Value>> {
    // Every element costs at least its tag byte, so a count larger than the
    // remaining input is truncation; checking first also bounds the
    // allocation below by the input size.
    r.ensure(count)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(value_at(r, depth)?);
    }
    Ok(items)
}

/// Read the payload of an integer whose tag has already been consumed.
pub(crate) fn int_payload(r: &mut Reader<'_>, t: u8) -> DecodeResult<BigInt> {
    let k = match t {
        tag::INT_D1 => usize::from(r.take_u8()?),
        tag::INT_D2 => {
            let j = usize::from(r.take_u8()?);
            r.read_len(j)?
        },
        _ => usize::from(t - tag::INT_1) + 1,
    };
    Ok(BigInt::from_signed_bytes_le(r.take(k)?))
}

/// Decode a value that must be an integer (range bounds, counter counts).
fn int_at(r: &mut Reader<'_>) -> DecodeResult<BigInt> {
    let at = r.offset();
    let t = r.take_u8()?;
    if !(tag::INT_1..=tag::INT_D2).contains(&t) {
        return Err(DecodeError::Construct {
            what: "integer",
            detail: format!("expected an integer tag, found {t:#04x} at offset {at}"),
        });
    }
    int_payload(r, t)
}

/// Decode a value that must be a string (namedtuple type and field names).
fn str_at(r: &mut Reader<'_>) -> DecodeResult<String> {
    let at = r.offset();
    let t = r.take_u8()?;
    match t {
        tag::STR_E => Ok(String::new()),
        tag::STR_1..=tag::STR_D2 => {
            let len = block_len(r, t - tag::STR_1)?;
            utf8(r, len, "string")
        },
        other => Err(DecodeError::Construct {
            what: "namedtuple",
            detail: format!("expected a string tag, found {other:#04x} at offset {at}"),
        }),
    }
}

fn f64_at(r: &mut Reader<'_>) -> DecodeResult<f64> {
    let raw = r.take(8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(raw);
    Ok(f64::from_le_bytes(bytes))
}

fn i32_at(r: &mut Reader<'_>) -> DecodeResult<i32> {
    let raw = r.take(4)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(raw);
    Ok(i32::from_le_bytes(bytes))
}

/// Copy `len` bytes out as validated UTF-8.
pub(crate) fn utf8(r: &mut Reader<'_>, len: usize, what: &'static str) -> DecodeResult<String> {
    let at = r.offset();
    let raw = r.take(len)?;
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidEncoding { what, offset: at })
}

/// Read a date/time payload: one length byte, then UTF-8 text.
pub(crate) fn iso_text(r: &mut Reader<'_>, what: &'static str) -> DecodeResult<String> {
    let len = usize::from(r.take_u8()?);
    utf8(r, len, what)
}

pub(crate) fn construct_datetime(text: &str) -> DecodeResult<Value> {
    NaiveDateTime::parse_from_str(text, value::ISO_DATETIME_FORMAT)
        .map(Value::DateTime)
        .map_err(|e| DecodeError::Construct { what: "datetime", detail: e.to_string() })
}

pub(crate) fn construct_date(text: &str) -> DecodeResult<Value> {
    NaiveDate::parse_from_str(text, value::ISO_DATE_FORMAT)
        .map(Value::Date)
        .map_err(|e| DecodeError::Construct { what: "date", detail: e.to_string() })
}

pub(crate) fn construct_time(text: &str) -> DecodeResult<Value> {
    NaiveTime::parse_from_str(text, value::ISO_TIME_FORMAT)
        .map(Value::Time)
        .map_err(|e| DecodeError::Construct { what: "time", detail: e.to_string() })
}

pub(crate) fn construct_uuid(text: &str) -> DecodeResult<Value> {
    Uuid::try_parse(text)
        .map(Value::Uuid)
        .map_err(|e| DecodeError::Construct { what: "uuid", detail: e.to_string() })
}

pub(crate) fn construct_decimal(text: &str) -> DecodeResult<Value> {
    text.parse::<BigDecimal>()
        .map(Value::Decimal)
        .map_err(|e| DecodeError::Construct { what: "decimal", detail: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_composite_reports_truncation() {
        // A list claiming two elements but carrying only one.
        let bytes = [tag::LIST_1, 2, tag::BOOL_TRUE];
        let err = decode_value(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }), "got {err:?}");
    }

    #[test]
    fn unknown_tag_is_rejected_with_offset() {
        let bytes = [tag::LIST_1, 1, 0xE0];
        assert_eq!(
            decode_value(&bytes).unwrap_err(),
            DecodeError::UnknownTag { tag: 0xE0, offset: 2 }
        );
    }

    #[test]
    fn non_minimal_widths_are_accepted() {
        // "A" carried under a two-byte length field.
        let bytes = [tag::STR_2, 1, 0, b'A'];
        assert_eq!(decode_value(&bytes).unwrap(), Value::Str("A".into()));
    }

    #[test]
    fn int_dynamic2_reads_width_of_width() {
        // j = 1 width byte, k = 1 payload byte, payload 42.
        let bytes = [tag::INT_D2, 1, 1, 42];
        assert_eq!(decode_value(&bytes).unwrap(), Value::Int(BigInt::from(42)));
    }

    #[test]
    fn invalid_utf8_is_invalid_encoding() {
        let bytes = [tag::STR_1, 2, 0xFF, 0xFE];
        assert_eq!(
            decode_value(&bytes).unwrap_err(),
            DecodeError::InvalidEncoding { what: "string", offset: 2 }
        );
    }

    #[test]
    fn decimal_payloads_construct_real_decimals() {
        let bytes = [tag::DECIMAL_1, 4, b'1', b'.', b'2', b'5'];
        assert_eq!(
            decode_value(&bytes).unwrap(),
            Value::Decimal("1.25".parse::<BigDecimal>().unwrap())
        );
    }

    #[test]
    fn non_numeric_decimal_is_construct_failure() {
        let bytes = [tag::DECIMAL_1, 3, b'a', b'b', b'c'];
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            DecodeError::Construct { what: "decimal", .. }
        ));
    }

    #[test]
    fn bad_uuid_hex_is_construct_failure() {
        let mut bytes = vec![tag::UUID];
        bytes.extend_from_slice(&[b'z'; 32]);
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            DecodeError::Construct { what: "uuid", .. }
        ));
    }

    #[test]
    fn counter_counts_must_be_integers() {
        let bytes = [tag::COUNTER_1, 1, tag::NONE, tag::BOOL_TRUE];
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            DecodeError::Construct { what: "integer", .. }
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let bytes = [tag::NONE, 0xAA, 0xBB];
        assert_eq!(decode_value(&bytes).unwrap(), Value::None);
    }

    #[test]
    fn crafted_nesting_past_the_bound_is_rejected() {
        let nested = |n: usize| {
            let mut bytes = Vec::new();
            for _ in 1..n {
                bytes.extend_from_slice(&[tag::LIST_1, 1]);
            }
            bytes.push(tag::LIST_E);
            bytes
        };

        assert!(decode_value(&nested(100)).is_ok());
        assert_eq!(
            decode_value(&nested(101)).unwrap_err(),
            DecodeError::DepthExceeded { limit: MAX_DEPTH }
        );
    }

    #[test]
    fn absurd_element_counts_fail_fast() {
        // A list claiming u64::MAX elements must fail before allocating.
        let mut bytes = vec![tag::LIST_D1, 8];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        let err = decode_value(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }), "got {err:?}");
    }
}
