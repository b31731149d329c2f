//! Fuzz target for encode/decode round-trip identity.
//!
//! Builds a bounded value tree from fuzzer input, encodes it, and checks
//! the decode comes back equal. NaN floats are normalized because they
//! never compare equal to themselves.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use bigdecimal::BigDecimal;
use libfuzzer_sys::fuzz_target;
use membridge_sbs::{Value, from_value, to_value};
use num_bigint::BigInt;

fn arbitrary_value(u: &mut Unstructured<'_>, depth: u32) -> arbitrary::Result<Value> {
    // Leaves only once the tree is deep enough.
    let top = if depth >= 3 { 10 } else { 13 };
    Ok(match u.int_in_range(0..=top)? {
        0 => Value::Str(String::arbitrary(u)?),
        1 => Value::Int(BigInt::from(i64::arbitrary(u)?)),
        2 => {
            let f = f64::arbitrary(u)?;
            Value::Float(if f.is_nan() { 0.0 } else { f })
        }
        3 => Value::Bool(bool::arbitrary(u)?),
        4 => Value::None,
        5 => Value::Ellipsis,
        6 => Value::Bytes(Vec::<u8>::arbitrary(u)?.into()),
        7 => Value::ByteArray(Vec::arbitrary(u)?),
        8 => Value::TimeDelta {
            days: i32::arbitrary(u)?,
            seconds: i32::arbitrary(u)?,
            micros: i32::arbitrary(u)?,
        },
        9 => Value::Range {
            start: BigInt::from(i64::arbitrary(u)?),
            stop: BigInt::from(i64::arbitrary(u)?),
            step: BigInt::from(i64::arbitrary(u)?),
        },
        10 => Value::Decimal(BigDecimal::new(
            BigInt::from(i64::arbitrary(u)?),
            i64::from(i8::arbitrary(u)?),
        )),
        11 => {
            let count = u.int_in_range(0..=4)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(arbitrary_value(u, depth + 1)?);
            }
            Value::List(items)
        }
        12 => {
            let count = u.int_in_range(0..=4)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(arbitrary_value(u, depth + 1)?);
            }
            Value::Tuple(items)
        }
        _ => {
            let count = u.int_in_range(0..=3)?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = arbitrary_value(u, depth + 1)?;
                let val = arbitrary_value(u, depth + 1)?;
                pairs.push((key, val));
            }
            Value::Dict(pairs)
        }
    })
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(value) = arbitrary_value(&mut u, 0) else {
        return;
    };
    let bytes = from_value(&value).expect("fuzz trees stay within every encoder bound");
    let decoded = to_value(&bytes).expect("encoder output must decode");
    assert_eq!(decoded, value);
});
