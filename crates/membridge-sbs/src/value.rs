//! The dynamic value model carried over the wire.
//!
//! `Value` is the closed sum of everything the Structured Bytes Stack can
//! round-trip: primitive scalars, byte blobs, domain scalars, and composites.
//! Every variant maps to exactly one tag family in the wire catalog, and the
//! encoder dispatches by exhaustive match, so adding a variant without wiring
//! it through the codec is a compile error, not a runtime surprise.
//!
//! Composites preserve the producer's element order as emitted. `Set` and
//! `FrozenSet` are `Vec`-backed for the same reason: iteration order is the
//! producer's order and is not normalized, and `Value` contains `f64` so it
//! cannot implement `Eq`/`Hash` anyway.

use std::collections::VecDeque;

use bigdecimal::BigDecimal;
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_bigint::BigInt;
use uuid::Uuid;

/// Wire form of [`Value::DateTime`]: ISO-8601 with a `T` separator and an
/// optional fractional second.
pub(crate) const ISO_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Wire form of [`Value::Date`].
pub(crate) const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
/// Wire form of [`Value::Time`].
pub(crate) const ISO_TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A dynamic value that the wire format can represent.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 text
    Str(String),
    /// Signed arbitrary-precision integer
    Int(BigInt),
    /// 64-bit IEEE 754 floating point
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Complex number, real and imaginary parts as 64-bit floats
    Complex {
        /// Real component
        real: f64,
        /// Imaginary component
        imag: f64,
    },
    /// The unit / null value
    None,
    /// The ellipsis placeholder value
    Ellipsis,

    /// Immutable byte blob
    Bytes(Bytes),
    /// Mutable byte blob
    ByteArray(Vec<u8>),
    /// Byte-addressable view; carried as an opaque blob
    MemoryView(Bytes),

    /// Arbitrary-precision decimal, carried as decimal text
    Decimal(BigDecimal),
    /// UUID, carried as 32 hexadecimal characters
    Uuid(Uuid),
    /// Calendar date and time of day, carried as ISO-8601 text
    DateTime(NaiveDateTime),
    /// Calendar date, carried as ISO-8601 text
    Date(NaiveDate),
    /// Time of day, carried as ISO-8601 text
    Time(NaiveTime),
    /// Elapsed duration as days, seconds, and microseconds
    TimeDelta {
        /// Whole days
        days: i32,
        /// Seconds within the day
        seconds: i32,
        /// Microseconds within the second
        micros: i32,
    },
    /// Integer range with start, stop, and step bounds
    Range {
        /// First value of the range
        start: BigInt,
        /// Exclusive upper bound
        stop: BigInt,
        /// Stride between values
        step: BigInt,
    },

    /// Ordered sequence
    List(Vec<Value>),
    /// Ordered immutable sequence
    Tuple(Vec<Value>),
    /// Double-ended queue
    Deque(VecDeque<Value>),
    /// Named record: a type name plus ordered (field name, value) pairs
    NamedTuple {
        /// The record type's name
        type_name: String,
        /// Field names and values in declaration order
        fields: Vec<(String, Value)>,
    },

    /// Unordered collection, emitted in producer order
    Set(Vec<Value>),
    /// Immutable unordered collection, emitted in producer order
    FrozenSet(Vec<Value>),

    /// Key-value mapping, emitted in traversal order
    Dict(Vec<(Value, Value)>),
    /// Multiplicity mapping; counts are always integers
    Counter(Vec<(Value, BigInt)>),
}

impl Value {
    /// Short name of this value's kind, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Complex { .. } => "complex",
            Self::None => "none",
            Self::Ellipsis => "ellipsis",
            Self::Bytes(_) => "bytes",
            Self::ByteArray(_) => "bytearray",
            Self::MemoryView(_) => "memoryview",
            Self::Decimal(_) => "decimal",
            Self::Uuid(_) => "uuid",
            Self::DateTime(_) => "datetime",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::TimeDelta { .. } => "timedelta",
            Self::Range { .. } => "range",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Deque(_) => "deque",
            Self::NamedTuple { .. } => "namedtuple",
            Self::Set(_) => "set",
            Self::FrozenSet(_) => "frozenset",
            Self::Dict(_) => "dict",
            Self::Counter(_) => "counter",
        }
    }

    /// Returns true for composite kinds that count against the nesting bound.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::List(_)
                | Self::Tuple(_)
                | Self::Deque(_)
                | Self::NamedTuple { .. }
                | Self::Set(_)
                | Self::FrozenSet(_)
                | Self::Dict(_)
                | Self::Counter(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(Value::Str(String::new()).kind(), "str");
        assert_eq!(Value::Int(BigInt::from(0)).kind(), "int");
        assert_eq!(Value::None.kind(), "none");
        assert_eq!(
            Value::NamedTuple { type_name: "Point".into(), fields: Vec::new() }.kind(),
            "namedtuple"
        );
    }

    #[test]
    fn composites_are_classified() {
        assert!(Value::List(Vec::new()).is_composite());
        assert!(Value::Counter(Vec::new()).is_composite());
        assert!(!Value::Bool(true).is_composite());
        assert!(!Value::Range {
            start: BigInt::from(0),
            stop: BigInt::from(1),
            step: BigInt::from(1)
        }
        .is_composite());
    }
}
