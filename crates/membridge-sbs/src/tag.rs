//! The closed tag catalog for the current (v2) wire grammar.
//!
//! Every encoded value starts with one tag byte. Container-like families own
//! a contiguous block of five codes covering the width variants: empty (`E`,
//! omitted where "empty" is not distinct), one length byte (`1`), two length
//! bytes (`2`), dynamic-1 (`D1`: a width byte then that many length bytes),
//! and dynamic-2 (`D2`: a width-of-width byte, the width, then the length
//! bytes). Fixed-payload scalars use a single code.
//!
//! The numeric values are the wire format; they must never be renumbered.
//! Protocol markers count down from 255 so future type tags can only grow
//! upward and never collide with them.

// Str block.

/// Empty string.
pub const STR_E: u8 = 0;
/// String, 1 length byte.
pub const STR_1: u8 = 1;
/// String, 2 length bytes.
pub const STR_2: u8 = 2;
/// String, dynamic-1 length.
pub const STR_D1: u8 = 3;
/// String, dynamic-2 length.
pub const STR_D2: u8 = 4;

// Int block: the width tags carry the payload byte count directly; there is
// no distinct "empty" integer.

/// Integer, 1 payload byte.
pub const INT_1: u8 = 5;
/// Integer, 2 payload bytes.
pub const INT_2: u8 = 6;
/// Integer, 3 payload bytes.
pub const INT_3: u8 = 7;
/// Integer, 4 payload bytes.
pub const INT_4: u8 = 8;
/// Integer, 5 payload bytes.
pub const INT_5: u8 = 9;
/// Integer, dynamic-1 payload length.
pub const INT_D1: u8 = 10;
/// Integer, dynamic-2 payload length.
pub const INT_D2: u8 = 11;

/// 64-bit IEEE 754 float, 8 payload bytes.
pub const FLOAT: u8 = 12;
/// Boolean true, no payload.
pub const BOOL_TRUE: u8 = 13;
/// Boolean false, no payload.
pub const BOOL_FALSE: u8 = 14;
/// Complex number, 16 payload bytes (real then imaginary).
pub const COMPLEX: u8 = 15;
/// Unit value, no payload.
pub const NONE: u8 = 16;
/// Ellipsis value, no payload.
pub const ELLIPSIS: u8 = 17;

/// Empty bytes.
pub const BYTES_E: u8 = 18;
/// Bytes, 1 length byte.
pub const BYTES_1: u8 = 19;
/// Bytes, 2 length bytes.
pub const BYTES_2: u8 = 20;
/// Bytes, dynamic-1 length.
pub const BYTES_D1: u8 = 21;
/// Bytes, dynamic-2 length.
pub const BYTES_D2: u8 = 22;

/// Empty bytearray.
pub const BYTEARRAY_E: u8 = 23;
/// Bytearray, 1 length byte.
pub const BYTEARRAY_1: u8 = 24;
/// Bytearray, 2 length bytes.
pub const BYTEARRAY_2: u8 = 25;
/// Bytearray, dynamic-1 length.
pub const BYTEARRAY_D1: u8 = 26;
/// Bytearray, dynamic-2 length.
pub const BYTEARRAY_D2: u8 = 27;

/// Empty list.
pub const LIST_E: u8 = 28;
/// List, 1 count byte.
pub const LIST_1: u8 = 29;
/// List, 2 count bytes.
pub const LIST_2: u8 = 30;
/// List, dynamic-1 count.
pub const LIST_D1: u8 = 31;
/// List, dynamic-2 count.
pub const LIST_D2: u8 = 32;

/// Empty set.
pub const SET_E: u8 = 33;
/// Set, 1 count byte.
pub const SET_1: u8 = 34;
/// Set, 2 count bytes.
pub const SET_2: u8 = 35;
/// Set, dynamic-1 count.
pub const SET_D1: u8 = 36;
/// Set, dynamic-2 count.
pub const SET_D2: u8 = 37;

/// Empty tuple.
pub const TUPLE_E: u8 = 38;
/// Tuple, 1 count byte.
pub const TUPLE_1: u8 = 39;
/// Tuple, 2 count bytes.
pub const TUPLE_2: u8 = 40;
/// Tuple, dynamic-1 count.
pub const TUPLE_D1: u8 = 41;
/// Tuple, dynamic-2 count.
pub const TUPLE_D2: u8 = 42;

/// Empty dict.
pub const DICT_E: u8 = 43;
/// Dict, 1 pair-count byte.
pub const DICT_1: u8 = 44;
/// Dict, 2 pair-count bytes.
pub const DICT_2: u8 = 45;
/// Dict, dynamic-1 pair count.
pub const DICT_D1: u8 = 46;
/// Dict, dynamic-2 pair count.
pub const DICT_D2: u8 = 47;

/// Empty frozenset.
pub const FROZENSET_E: u8 = 48;
/// Frozenset, 1 count byte.
pub const FROZENSET_1: u8 = 49;
/// Frozenset, 2 count bytes.
pub const FROZENSET_2: u8 = 50;
/// Frozenset, dynamic-1 count.
pub const FROZENSET_D1: u8 = 51;
/// Frozenset, dynamic-2 count.
pub const FROZENSET_D2: u8 = 52;

/// Date and time, 1 length byte then ISO-8601 text.
pub const DATETIME: u8 = 53;
/// Time delta, 12 payload bytes (days, seconds, microseconds as i32 LE).
pub const TIMEDELTA: u8 = 54;
/// Date, 1 length byte then ISO-8601 text.
pub const DATE: u8 = 55;
/// Time, 1 length byte then ISO-8601 text.
pub const TIME: u8 = 56;
/// UUID, 32 payload bytes of ASCII hex.
pub const UUID: u8 = 57;

/// Empty memoryview.
pub const MEMORYVIEW_E: u8 = 58;
/// Memoryview, 1 length byte.
pub const MEMORYVIEW_1: u8 = 59;
/// Memoryview, 2 length bytes.
pub const MEMORYVIEW_2: u8 = 60;
/// Memoryview, dynamic-1 length.
pub const MEMORYVIEW_D1: u8 = 61;
/// Memoryview, dynamic-2 length.
pub const MEMORYVIEW_D2: u8 = 62;

// Decimal has no empty variant; its block starts at the "1" width.

/// Decimal, 1 length byte.
pub const DECIMAL_1: u8 = 63;
/// Decimal, 2 length bytes.
pub const DECIMAL_2: u8 = 64;
/// Decimal, dynamic-1 length.
pub const DECIMAL_D1: u8 = 65;
/// Decimal, dynamic-2 length.
pub const DECIMAL_D2: u8 = 66;

/// Range, no length field; three encoded integers follow.
pub const RANGE: u8 = 67;

/// Empty namedtuple.
pub const NAMEDTUPLE_E: u8 = 68;
/// Namedtuple, 1 field-count byte.
pub const NAMEDTUPLE_1: u8 = 69;
/// Namedtuple, 2 field-count bytes.
pub const NAMEDTUPLE_2: u8 = 70;
/// Namedtuple, dynamic-1 field count.
pub const NAMEDTUPLE_D1: u8 = 71;
/// Namedtuple, dynamic-2 field count.
pub const NAMEDTUPLE_D2: u8 = 72;

/// Empty deque.
pub const DEQUE_E: u8 = 73;
/// Deque, 1 count byte.
pub const DEQUE_1: u8 = 74;
/// Deque, 2 count bytes.
pub const DEQUE_2: u8 = 75;
/// Deque, dynamic-1 count.
pub const DEQUE_D1: u8 = 76;
/// Deque, dynamic-2 count.
pub const DEQUE_D2: u8 = 77;

/// Empty counter.
pub const COUNTER_E: u8 = 78;
/// Counter, 1 pair-count byte.
pub const COUNTER_1: u8 = 79;
/// Counter, 2 pair-count bytes.
pub const COUNTER_2: u8 = 80;
/// Counter, dynamic-1 pair count.
pub const COUNTER_D1: u8 = 81;
/// Counter, dynamic-2 pair count.
pub const COUNTER_D2: u8 = 82;

// Reserved markers, counting down from 255.

/// Reserved extension marker.
pub const MARKER_EXT: u8 = 255;
/// Protocol marker for the legacy v1 grammar (decode only).
pub const PROTOCOL_V1: u8 = 254;
/// Protocol marker for the current v2 grammar.
pub const PROTOCOL_V2: u8 = 253;

/// A contiguous width-variant block within the catalog.
///
/// `one` is the 1-length-byte code; `2`, `D1`, and `D2` follow contiguously.
/// Families without a distinct empty encoding (Decimal) have `empty: None`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WidthFamily {
    /// Code of the empty variant, if the family has one.
    pub empty: Option<u8>,
    /// Code of the 1-length-byte variant.
    pub one: u8,
}

pub(crate) const STR_FAMILY: WidthFamily = WidthFamily { empty: Some(STR_E), one: STR_1 };
pub(crate) const BYTES_FAMILY: WidthFamily = WidthFamily { empty: Some(BYTES_E), one: BYTES_1 };
pub(crate) const BYTEARRAY_FAMILY: WidthFamily =
    WidthFamily { empty: Some(BYTEARRAY_E), one: BYTEARRAY_1 };
pub(crate) const LIST_FAMILY: WidthFamily = WidthFamily { empty: Some(LIST_E), one: LIST_1 };
pub(crate) const SET_FAMILY: WidthFamily = WidthFamily { empty: Some(SET_E), one: SET_1 };
pub(crate) const TUPLE_FAMILY: WidthFamily = WidthFamily { empty: Some(TUPLE_E), one: TUPLE_1 };
pub(crate) const DICT_FAMILY: WidthFamily = WidthFamily { empty: Some(DICT_E), one: DICT_1 };
pub(crate) const FROZENSET_FAMILY: WidthFamily =
    WidthFamily { empty: Some(FROZENSET_E), one: FROZENSET_1 };
pub(crate) const MEMORYVIEW_FAMILY: WidthFamily =
    WidthFamily { empty: Some(MEMORYVIEW_E), one: MEMORYVIEW_1 };
pub(crate) const DECIMAL_FAMILY: WidthFamily = WidthFamily { empty: None, one: DECIMAL_1 };
pub(crate) const NAMEDTUPLE_FAMILY: WidthFamily =
    WidthFamily { empty: Some(NAMEDTUPLE_E), one: NAMEDTUPLE_1 };
pub(crate) const DEQUE_FAMILY: WidthFamily = WidthFamily { empty: Some(DEQUE_E), one: DEQUE_1 };
pub(crate) const COUNTER_FAMILY: WidthFamily =
    WidthFamily { empty: Some(COUNTER_E), one: COUNTER_1 };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_contiguous_and_disjoint() {
        // Each five-code family block ends right before the next begins.
        assert_eq!(STR_D2 + 1, INT_1);
        assert_eq!(INT_D2 + 1, FLOAT);
        assert_eq!(ELLIPSIS + 1, BYTES_E);
        assert_eq!(BYTES_D2 + 1, BYTEARRAY_E);
        assert_eq!(BYTEARRAY_D2 + 1, LIST_E);
        assert_eq!(LIST_D2 + 1, SET_E);
        assert_eq!(SET_D2 + 1, TUPLE_E);
        assert_eq!(TUPLE_D2 + 1, DICT_E);
        assert_eq!(DICT_D2 + 1, FROZENSET_E);
        assert_eq!(FROZENSET_D2 + 1, DATETIME);
        assert_eq!(TIME + 1, UUID);
        assert_eq!(UUID + 1, MEMORYVIEW_E);
        assert_eq!(MEMORYVIEW_D2 + 1, DECIMAL_1);
        assert_eq!(DECIMAL_D2 + 1, RANGE);
        assert_eq!(RANGE + 1, NAMEDTUPLE_E);
        assert_eq!(NAMEDTUPLE_D2 + 1, DEQUE_E);
        assert_eq!(DEQUE_D2 + 1, COUNTER_E);
    }

    #[test]
    fn markers_count_down_from_255() {
        assert_eq!(MARKER_EXT, 255);
        assert_eq!(PROTOCOL_V1, 254);
        assert_eq!(PROTOCOL_V2, 253);
        // Type tags can grow upward without ever reaching the marker range.
        assert!(COUNTER_D2 < PROTOCOL_V2);
    }
}
