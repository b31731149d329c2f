//! Value-tree encoder.
//!
//! Walks a [`Value`] and emits tag + length + payload per the wire grammar.
//! The output buffer starts at a shallow size estimate plus constant
//! headroom and grows in 128-byte steps through `try_reserve`, so allocation
//! failure surfaces as a typed error instead of an abort. A nest counter
//! bounds composite recursion at [`MAX_DEPTH`]; cycles in producer data are
//! not detected directly, the depth bound is the defense.

use num_bigint::BigInt;

use crate::{
    errors::{EncodeError, EncodeResult},
    lenenc,
    tag::{self, WidthFamily},
    value::{self, Value},
};

/// Maximum number of simultaneously open composite encoders.
pub(crate) const MAX_DEPTH: u32 = 100;

/// Constant headroom added to the initial estimate, and the minimum step by
/// which the buffer grows on overflow.
const GROW_STEP: usize = 128;

/// Incremental encoder state: the output buffer and the nest counter.
pub(crate) struct Encoder {
    buf: Vec<u8>,
    depth: u32,
}

impl Encoder {
    /// Create an encoder sized for `value`'s shallow footprint.
    pub(crate) fn for_value(value: &Value) -> EncodeResult<Self> {
        let estimate = shallow_estimate(value) + GROW_STEP;
        let mut buf = Vec::new();
        buf.try_reserve(estimate)
            .map_err(|_| EncodeError::AllocationFailed { requested: estimate })?;
        Ok(Self { buf, depth: 0 })
    }

    /// Consume the encoder and return the finished buffer.
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Ensure at least `needed` spare bytes, growing by `max(needed, 128)`.
    fn grow(&mut self, needed: usize) -> EncodeResult<()> {
        if self.buf.capacity() - self.buf.len() < needed {
            let additional = needed.max(GROW_STEP);
            self.buf
                .try_reserve(additional)
                .map_err(|_| EncodeError::AllocationFailed { requested: additional })?;
        }
        Ok(())
    }

    pub(crate) fn put_u8(&mut self, byte: u8) -> EncodeResult<()> {
        self.grow(1)?;
        self.buf.push(byte);
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> EncodeResult<()> {
        self.grow(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn put_len(&mut self, v: u64, width: usize) -> EncodeResult<()> {
        self.grow(width)?;
        lenenc::write_len(&mut self.buf, v, width);
        Ok(())
    }

    fn enter(&mut self) -> EncodeResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EncodeError::DepthExceeded { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Emit the width-selected tag and length bytes for a family block.
    ///
    /// Producers always pick the narrowest variant that holds `len`; a
    /// zero length collapses to the empty tag where the family has one.
    fn put_block(&mut self, family: WidthFamily, len: usize) -> EncodeResult<()> {
        let width = lenenc::byte_width(len as u64);
        match width {
            0 => match family.empty {
                Some(empty) => self.put_u8(empty)?,
                None => {
                    self.put_u8(family.one)?;
                    self.put_u8(0)?;
                },
            },
            1 => {
                self.put_u8(family.one)?;
                self.put_u8(len as u8)?;
            },
            2 => {
                self.put_u8(family.one + 1)?;
                self.put_len(len as u64, 2)?;
            },
            w if w < 256 => {
                self.put_u8(family.one + 2)?;
                self.put_u8(w as u8)?;
                self.put_len(len as u64, w)?;
            },
            w => {
                // Unreachable while usize is 64 bits or less, but the
                // grammar defines the dynamic-2 form and the decoder
                // accepts it.
                let ww = lenenc::byte_width(w as u64);
                self.put_u8(family.one + 3)?;
                self.put_u8(ww as u8)?;
                self.put_len(w as u64, ww)?;
                self.put_len(len as u64, w)?;
            },
        }
        Ok(())
    }

    /// Emit a complete integer value: width tag (or dynamic length) plus the
    /// two's-complement little-endian payload.
    fn put_int(&mut self, value: &BigInt) -> EncodeResult<()> {
        let payload = value.to_signed_bytes_le();
        let k = payload.len();
        match k {
            1..=5 => self.put_u8(tag::INT_1 + (k as u8 - 1))?,
            _ if k <= 255 => {
                self.put_u8(tag::INT_D1)?;
                self.put_u8(k as u8)?;
            },
            _ => {
                let w = lenenc::byte_width(k as u64);
                self.put_u8(tag::INT_D2)?;
                self.put_u8(w as u8)?;
                self.put_len(k as u64, w)?;
            },
        }
        self.put_slice(&payload)
    }

    /// Emit a complete string value.
    fn put_str(&mut self, text: &str) -> EncodeResult<()> {
        self.put_block(tag::STR_FAMILY, text.len())?;
        self.put_slice(text.as_bytes())
    }

    /// Emit a date/time scalar: tag, one length byte, ISO-8601 text.
    fn put_iso(&mut self, tag_code: u8, text: &str) -> EncodeResult<()> {
        if text.len() > 255 {
            return Err(EncodeError::Unrepresentable {
                detail: format!("ISO-8601 text of {} bytes needs more than one length byte", text.len()),
            });
        }
        self.put_u8(tag_code)?;
        self.put_u8(text.len() as u8)?;
        self.put_slice(text.as_bytes())
    }

    /// Emit an element sequence under its family block.
    fn put_seq<'v>(
        &mut self,
        family: WidthFamily,
        items: impl Iterator<Item = &'v Value>,
        len: usize,
    ) -> EncodeResult<()> {
        self.enter()?;
        self.put_block(family, len)?;
        for item in items {
            self.encode_value(item)?;
        }
        self.leave();
        Ok(())
    }

    /// Encode one value, recursively.
    pub(crate) fn encode_value(&mut self, value: &Value) -> EncodeResult<()> {
        match value {
            Value::Str(s) => self.put_str(s),
            Value::Int(i) => self.put_int(i),
            Value::Float(f) => {
                self.put_u8(tag::FLOAT)?;
                self.put_slice(&f.to_le_bytes())
            },
            Value::Bool(true) => self.put_u8(tag::BOOL_TRUE),
            Value::Bool(false) => self.put_u8(tag::BOOL_FALSE),
            Value::Complex { real, imag } => {
                self.put_u8(tag::COMPLEX)?;
                self.put_slice(&real.to_le_bytes())?;
                self.put_slice(&imag.to_le_bytes())
            },
            Value::None => self.put_u8(tag::NONE),
            Value::Ellipsis => self.put_u8(tag::ELLIPSIS),
            Value::Bytes(b) => {
                self.put_block(tag::BYTES_FAMILY, b.len())?;
                self.put_slice(b)
            },
            Value::ByteArray(b) => {
                self.put_block(tag::BYTEARRAY_FAMILY, b.len())?;
                self.put_slice(b)
            },
            Value::MemoryView(b) => {
                self.put_block(tag::MEMORYVIEW_FAMILY, b.len())?;
                self.put_slice(b)
            },
            Value::Decimal(d) => {
                let text = d.to_string();
                self.put_block(tag::DECIMAL_FAMILY, text.len())?;
                self.put_slice(text.as_bytes())
            },
            Value::Uuid(u) => {
                self.put_u8(tag::UUID)?;
                let mut hex = [0u8; 32];
                let text = u.as_simple().encode_lower(&mut hex);
                self.put_slice(text.as_bytes())
            },
            Value::DateTime(dt) => {
                let text = dt.format(value::ISO_DATETIME_FORMAT).to_string();
                self.put_iso(tag::DATETIME, &text)
            },
            Value::Date(d) => {
                let text = d.format(value::ISO_DATE_FORMAT).to_string();
                self.put_iso(tag::DATE, &text)
            },
            Value::Time(t) => {
                let text = t.format(value::ISO_TIME_FORMAT).to_string();
                self.put_iso(tag::TIME, &text)
            },
            Value::TimeDelta { days, seconds, micros } => {
                self.put_u8(tag::TIMEDELTA)?;
                self.put_slice(&days.to_le_bytes())?;
                self.put_slice(&seconds.to_le_bytes())?;
                self.put_slice(&micros.to_le_bytes())
            },
            Value::Range { start, stop, step } => {
                self.put_u8(tag::RANGE)?;
                self.put_int(start)?;
                self.put_int(stop)?;
                self.put_int(step)
            },
            Value::List(items) => self.put_seq(tag::LIST_FAMILY, items.iter(), items.len()),
            Value::Tuple(items) => self.put_seq(tag::TUPLE_FAMILY, items.iter(), items.len()),
            Value::Deque(items) => self.put_seq(tag::DEQUE_FAMILY, items.iter(), items.len()),
            Value::Set(items) => self.put_seq(tag::SET_FAMILY, items.iter(), items.len()),
            Value::FrozenSet(items) => {
                self.put_seq(tag::FROZENSET_FAMILY, items.iter(), items.len())
            },
            Value::Dict(pairs) => {
                self.enter()?;
                self.put_block(tag::DICT_FAMILY, pairs.len())?;
                for (key, val) in pairs {
                    self.encode_value(key)?;
                    self.encode_value(val)?;
                }
                self.leave();
                Ok(())
            },
            Value::Counter(pairs) => {
                self.enter()?;
                self.put_block(tag::COUNTER_FAMILY, pairs.len())?;
                for (key, count) in pairs {
                    self.encode_value(key)?;
                    self.put_int(count)?;
                }
                self.leave();
                Ok(())
            },
            Value::NamedTuple { type_name, fields } => {
                self.enter()?;
                if fields.is_empty() && !type_name.is_empty() {
                    // The empty tag carries no payload at all, so a named
                    // record without fields needs an explicit zero count to
                    // keep its type name.
                    self.put_u8(tag::NAMEDTUPLE_1)?;
                    self.put_u8(0)?;
                    self.put_str(type_name)?;
                } else {
                    self.put_block(tag::NAMEDTUPLE_FAMILY, fields.len())?;
                    if !fields.is_empty() {
                        self.put_str(type_name)?;
                        for (name, val) in fields {
                            self.put_str(name)?;
                            self.encode_value(val)?;
                        }
                    }
                }
                self.leave();
                Ok(())
            },
        }
    }
}

/// Rough byte cost of `value` without descending into composite elements.
fn shallow_estimate(value: &Value) -> usize {
    match value {
        Value::Str(s) => s.len() + 6,
        Value::Decimal(_) => 24,
        Value::Bytes(b) | Value::MemoryView(b) => b.len() + 6,
        Value::ByteArray(b) => b.len() + 6,
        Value::Int(_) => 16,
        Value::Float(_) => 9,
        Value::Bool(_) | Value::None | Value::Ellipsis => 1,
        Value::Complex { .. } => 17,
        Value::Uuid(_) => 33,
        Value::DateTime(_) | Value::Date(_) | Value::Time(_) => 34,
        Value::TimeDelta { .. } => 13,
        Value::Range { .. } => 25,
        Value::List(items)
        | Value::Tuple(items)
        | Value::Set(items)
        | Value::FrozenSet(items) => items.len() * 2 + 6,
        Value::Deque(items) => items.len() * 2 + 6,
        Value::Dict(pairs) => pairs.len() * 4 + 6,
        Value::Counter(pairs) => pairs.len() * 4 + 6,
        Value::NamedTuple { type_name, fields } => type_name.len() + fields.len() * 4 + 12,
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;

    fn encoded(value: &Value) -> Vec<u8> {
        let mut enc = Encoder::for_value(value).unwrap();
        enc.encode_value(value).unwrap();
        enc.into_bytes()
    }

    #[test]
    fn width_selection_is_minimal() {
        // len 0 -> empty tag, no length bytes
        assert_eq!(encoded(&Value::Str(String::new())), [tag::STR_E]);

        // len 1 -> width-1 tag
        assert_eq!(encoded(&Value::Str("A".into())), [tag::STR_1, 1, b'A']);

        // len 255 still fits one byte
        let s = "x".repeat(255);
        let bytes = encoded(&Value::Str(s));
        assert_eq!(&bytes[..2], [tag::STR_1, 255]);
        assert_eq!(bytes.len(), 2 + 255);

        // len 256 needs two length bytes
        let s = "x".repeat(256);
        let bytes = encoded(&Value::Str(s));
        assert_eq!(&bytes[..3], [tag::STR_2, 0, 1]);

        // len 65536 needs the dynamic-1 form with three length bytes
        let s = "x".repeat(65_536);
        let bytes = encoded(&Value::Str(s));
        assert_eq!(&bytes[..5], [tag::STR_D1, 3, 0, 0, 1]);
    }

    #[test]
    fn decimal_emits_its_canonical_text() {
        assert_eq!(
            encoded(&Value::Decimal(BigDecimal::from(0))),
            [tag::DECIMAL_1, 1, b'0']
        );

        let d = "-12.5".parse::<BigDecimal>().unwrap();
        assert_eq!(
            encoded(&Value::Decimal(d)),
            [tag::DECIMAL_1, 5, b'-', b'1', b'2', b'.', b'5']
        );
    }

    #[test]
    fn int_width_tags_carry_payload_size() {
        assert_eq!(encoded(&Value::Int(BigInt::from(0))), [tag::INT_1, 0x00]);
        assert_eq!(encoded(&Value::Int(BigInt::from(-1))), [tag::INT_1, 0xFF]);
        // 255 needs a sign byte on top of the magnitude byte.
        assert_eq!(encoded(&Value::Int(BigInt::from(255))), [tag::INT_2, 0xFF, 0x00]);
        assert_eq!(
            encoded(&Value::Int(BigInt::from(0x0102_0304_05i64))),
            [tag::INT_5, 5, 4, 3, 2, 1]
        );

        // More than five payload bytes falls through to the dynamic-1 form.
        let wide = BigInt::from(0x0102_0304_0506_07i64);
        assert_eq!(encoded(&Value::Int(wide))[..2], [tag::INT_D1, 7]);

        // A 300-byte magnitude needs the dynamic-2 form.
        let mut magnitude = vec![0u8; 300];
        magnitude[299] = 1;
        let big = BigInt::from_signed_bytes_le(&magnitude);
        let bytes = encoded(&Value::Int(big));
        assert_eq!(&bytes[..4], [tag::INT_D2, 2, 44, 1]); // 300 = 0x012C
        assert_eq!(bytes.len(), 4 + 300);
    }

    #[test]
    fn scalars_encode_to_fixed_shapes() {
        assert_eq!(encoded(&Value::Bool(true)), [tag::BOOL_TRUE]);
        assert_eq!(encoded(&Value::Bool(false)), [tag::BOOL_FALSE]);
        assert_eq!(encoded(&Value::None), [tag::NONE]);
        assert_eq!(encoded(&Value::Ellipsis), [tag::ELLIPSIS]);

        let bytes = encoded(&Value::Float(1.5));
        assert_eq!(bytes[0], tag::FLOAT);
        assert_eq!(&bytes[1..], 1.5f64.to_le_bytes());

        let bytes = encoded(&Value::Complex { real: 1.0, imag: -2.0 });
        assert_eq!(bytes.len(), 17);
        assert_eq!(&bytes[1..9], 1.0f64.to_le_bytes());
        assert_eq!(&bytes[9..], (-2.0f64).to_le_bytes());

        let bytes = encoded(&Value::TimeDelta { days: 1, seconds: -2, micros: 3 });
        assert_eq!(bytes[0], tag::TIMEDELTA);
        assert_eq!(&bytes[1..5], 1i32.to_le_bytes());
        assert_eq!(&bytes[5..9], (-2i32).to_le_bytes());
        assert_eq!(&bytes[9..13], 3i32.to_le_bytes());
    }

    #[test]
    fn range_concatenates_three_ints() {
        let bytes = encoded(&Value::Range {
            start: BigInt::from(0),
            stop: BigInt::from(10),
            step: BigInt::from(2),
        });
        assert_eq!(bytes, [tag::RANGE, tag::INT_1, 0, tag::INT_1, 10, tag::INT_1, 2]);
    }

    #[test]
    fn depth_bound_is_one_hundred() {
        let nest = |depth: usize| {
            let mut v = Value::List(Vec::new());
            for _ in 1..depth {
                v = Value::List(vec![v]);
            }
            v
        };

        let ok = nest(100);
        let mut enc = Encoder::for_value(&ok).unwrap();
        assert!(enc.encode_value(&ok).is_ok());

        let too_deep = nest(101);
        let mut enc = Encoder::for_value(&too_deep).unwrap();
        assert_eq!(
            enc.encode_value(&too_deep).unwrap_err(),
            EncodeError::DepthExceeded { limit: MAX_DEPTH }
        );
    }
}
