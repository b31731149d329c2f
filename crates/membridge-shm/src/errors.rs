//! Error types for the shared-memory bridge.
//!
//! Segment errors carry the segment name and the underlying OS error so the
//! call site can tell a benign race (already exists, already removed) from
//! real failures. Serializer errors pass through unchanged; the bridge adds
//! nothing to them.

use std::io;

use membridge_sbs::{DecodeError, EncodeError};
use thiserror::Error;

/// Errors from the segment lifecycle and the memory API.
#[derive(Error, Debug)]
pub enum SegmentError {
    /// Creation was asked to fail on an existing segment, and it existed
    #[error("segment {name:?} already exists")]
    AlreadyExists {
        /// The segment name
        name: String,
    },

    /// The named segment does not exist
    #[error("segment {name:?} does not exist")]
    NotFound {
        /// The segment name
        name: String,
    },

    /// The name cannot be passed to the OS
    #[error("segment name {name:?} contains a NUL byte")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// `shm_open` failed for a reason other than existence
    #[error("opening segment {name:?} failed")]
    OpenFailed {
        /// The segment name
        name: String,
        /// The OS error
        #[source]
        source: io::Error,
    },

    /// `ftruncate` to the requested extent failed
    #[error("resizing segment {name:?} to {size} bytes failed")]
    TruncateFailed {
        /// The segment name
        name: String,
        /// The requested extent in bytes
        size: usize,
        /// The OS error
        #[source]
        source: io::Error,
    },

    /// `mmap` of the segment failed
    #[error("mapping {len} bytes of segment {name:?} failed")]
    MapFailed {
        /// The segment name
        name: String,
        /// The requested mapping length
        len: usize,
        /// The OS error
        #[source]
        source: io::Error,
    },

    /// Initializing the process-shared mutex failed
    #[error("initializing the shared mutex of segment {name:?} failed")]
    MutexInitFailed {
        /// The segment name
        name: String,
        /// The pthread error
        #[source]
        source: io::Error,
    },

    /// Acquiring the process-shared mutex failed
    #[error("locking segment {name:?} failed")]
    LockFailed {
        /// The segment name
        name: String,
        /// The pthread error
        #[source]
        source: io::Error,
    },

    /// `shm_unlink` failed for a reason other than absence
    #[error("unlinking segment {name:?} failed")]
    UnlinkFailed {
        /// The segment name
        name: String,
        /// The OS error
        #[source]
        source: io::Error,
    },

    /// The value could not be encoded for writing
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The segment payload could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Convenience alias for bridge results.
pub type SegmentResult<T> = Result<T, SegmentError>;
