//! Protocol-versioned entry points.
//!
//! Every encoded buffer begins with a protocol byte drawn from the marker
//! range counting down from 255. Encoding always stamps the current
//! protocol; decoding dispatches on the first byte, so old buffers written
//! under the legacy grammar keep decoding after an upgrade.

use bytes::Bytes;

use crate::{
    decode,
    encode::Encoder,
    errors::{DecodeError, DecodeResult, EncodeResult},
    legacy, tag,
    value::Value,
};

/// Encode `value` into a self-describing buffer.
///
/// The first byte is the current protocol marker; the rest is the single
/// encoded value.
///
/// # Errors
///
/// - [`EncodeError::DepthExceeded`](crate::EncodeError::DepthExceeded) when
///   composites nest more than 100 deep
/// - [`EncodeError::AllocationFailed`](crate::EncodeError::AllocationFailed)
///   when the output buffer cannot grow
/// - [`EncodeError::Unrepresentable`](crate::EncodeError::Unrepresentable)
///   when a length exceeds what its field can express
pub fn from_value(value: &Value) -> EncodeResult<Bytes> {
    let mut encoder = Encoder::for_value(value)?;
    encoder.put_u8(tag::PROTOCOL_V2)?;
    encoder.encode_value(value)?;
    Ok(Bytes::from(encoder.into_bytes()))
}

/// Decode the single value held by `bytes`.
///
/// The first byte selects the decoder version. Bytes past the end of the
/// top-level value are ignored; shared-memory payload areas are routinely
/// larger than the value they hold.
///
/// # Errors
///
/// - [`DecodeError::UnknownProtocol`](crate::DecodeError::UnknownProtocol)
///   when the first byte is not a recognized marker
/// - [`DecodeError::Truncated`](crate::DecodeError::Truncated) when any
///   read would pass the end of the buffer (including an empty buffer)
/// - [`DecodeError::UnknownTag`](crate::DecodeError::UnknownTag),
///   [`DecodeError::InvalidEncoding`](crate::DecodeError::InvalidEncoding),
///   [`DecodeError::Construct`](crate::DecodeError::Construct), and
///   [`DecodeError::DepthExceeded`](crate::DecodeError::DepthExceeded) as
///   the grammar and domain constructors dictate
pub fn to_value(bytes: &[u8]) -> DecodeResult<Value> {
    let Some(first) = bytes.first() else {
        return Err(DecodeError::Truncated { offset: 0, needed: 1, available: 0 });
    };
    match *first {
        tag::PROTOCOL_V2 => decode::decode_value(&bytes[1..]),
        tag::PROTOCOL_V1 => legacy::decode_value(&bytes[1..]),
        other => Err(DecodeError::UnknownProtocol { byte: other }),
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::*;

    #[test]
    fn every_buffer_is_stamped_with_the_current_protocol() {
        for value in [
            Value::None,
            Value::Int(BigInt::from(42)),
            Value::List(vec![Value::Bool(true)]),
        ] {
            let bytes = from_value(&value).unwrap();
            assert_eq!(bytes[0], tag::PROTOCOL_V2);
        }
    }

    #[test]
    fn unknown_first_byte_is_rejected() {
        assert_eq!(
            to_value(&[0x00, tag::NONE]).unwrap_err(),
            DecodeError::UnknownProtocol { byte: 0x00 }
        );
        // The reserved extension marker is not a protocol.
        assert_eq!(
            to_value(&[tag::MARKER_EXT]).unwrap_err(),
            DecodeError::UnknownProtocol { byte: tag::MARKER_EXT }
        );
    }

    #[test]
    fn empty_input_is_truncated() {
        assert_eq!(
            to_value(&[]).unwrap_err(),
            DecodeError::Truncated { offset: 0, needed: 1, available: 0 }
        );
    }

    #[test]
    fn legacy_marker_routes_to_the_v1_decoder() {
        // v1 encodes integers starting at tag 4.
        let bytes = [tag::PROTOCOL_V1, 4, 7];
        assert_eq!(to_value(&bytes).unwrap(), Value::Int(BigInt::from(7)));
        // The same payload under v2 is a string tag with a bad length.
        let bytes = [tag::PROTOCOL_V2, 4, 7];
        assert!(to_value(&bytes).is_err());
    }
}
