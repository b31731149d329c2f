//! The four-call memory API.
//!
//! Payloads are always a single serialized value; the bridge never
//! interprets them beyond handing bytes to the serializer. Reads copy the
//! payload out of the mapping before the lock is released, so decoded
//! values never alias shared memory.

use membridge_sbs::{Value, from_value, to_value};
use tracing::trace;

use crate::{errors::SegmentResult, segment};

/// Create the named segment with `prealloc_size` payload bytes.
///
/// Returns `true` when the segment was created, `false` when it already
/// existed and `error_if_exists` is off.
///
/// # Errors
///
/// [`SegmentError::AlreadyExists`](crate::SegmentError::AlreadyExists) when
/// the segment exists and `error_if_exists` is set, otherwise the OS-level
/// create failures.
pub fn create_memory(
    name: &str,
    prealloc_size: usize,
    error_if_exists: bool,
) -> SegmentResult<bool> {
    segment::create(name, prealloc_size, error_if_exists)
}

/// Unlink the named segment.
///
/// Returns `true` when the name was removed. With `throw_error` off a
/// missing segment is `false` rather than an error, which makes removal
/// idempotent at the caller's option. Processes still holding mappings keep
/// them until they close; this call does not drain them.
///
/// # Errors
///
/// Only with `throw_error` set:
/// [`SegmentError::NotFound`](crate::SegmentError::NotFound) or
/// [`SegmentError::UnlinkFailed`](crate::SegmentError::UnlinkFailed).
pub fn remove_memory(name: &str, throw_error: bool) -> SegmentResult<bool> {
    segment::remove(name, throw_error)
}

/// Serialize `value` and write it as the segment's payload.
///
/// The segment is grown as needed; with `create` on, a missing segment is
/// created first. The copy happens under the segment lock, so concurrent
/// readers observe either the previous payload or this one, never a
/// mixture.
///
/// # Errors
///
/// Encoding failures pass through as
/// [`SegmentError::Encode`](crate::SegmentError::Encode); a missing segment
/// with `create` off is
/// [`SegmentError::NotFound`](crate::SegmentError::NotFound); plus the
/// OS-level open, grow, and map failures.
pub fn write_memory(name: &str, value: &Value, create: bool) -> SegmentResult<()> {
    let encoded = from_value(value)?;
    let mut mapping = segment::open(name, encoded.len(), create)?;
    mapping.payload_mut()[..encoded.len()].copy_from_slice(&encoded);
    trace!(name, bytes = encoded.len(), "wrote segment payload");
    drop(mapping);
    Ok(())
}

/// Read and decode the segment's payload.
///
/// A segment with zero capacity (created but never written) reads as
/// [`Value::None`]. The payload bytes are copied out of the mapping under
/// the lock and decoded afterwards.
///
/// # Errors
///
/// [`SegmentError::NotFound`](crate::SegmentError::NotFound) when the
/// segment does not exist; decoding failures pass through as
/// [`SegmentError::Decode`](crate::SegmentError::Decode) (an allocated but
/// never-written payload of zeros decodes as an unknown protocol).
pub fn read_memory(name: &str) -> SegmentResult<Value> {
    let mapping = segment::open(name, 0, false)?;
    if mapping.max_size() == 0 {
        return Ok(Value::None);
    }
    let payload = mapping.payload().to_vec();
    drop(mapping);
    trace!(name, bytes = payload.len(), "read segment payload");
    Ok(to_value(&payload)?)
}
