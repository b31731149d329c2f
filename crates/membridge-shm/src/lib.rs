//! Shared-memory bridge: named POSIX segments whose payload is always one
//! serialized value.
//!
//! A segment is a `shm_open` object holding a small header (payload
//! capacity plus a `PTHREAD_PROCESS_SHARED` mutex) followed by the payload.
//! The mutex is the entire concurrency story: writers and readers hold it
//! across their whole copy, so the payload is never observed torn, and
//! between concurrent writers the last one wins. There is no timeout and no
//! versioning; a process that dies holding the lock wedges the segment
//! until an operator removes and recreates it.
//!
//! Segments grow on demand. Writing a value larger than the current
//! capacity resizes the object (with a little headroom) under the lock;
//! readers racing the resize re-read the capacity after they acquire the
//! lock, so they always map the full extent.
//!
//! ```no_run
//! use membridge_sbs::Value;
//! use membridge_shm::{read_memory, remove_memory, write_memory};
//!
//! write_memory("/scratch", &Value::Str("hello".into()), true)?;
//! assert_eq!(read_memory("/scratch")?, Value::Str("hello".into()));
//! remove_memory("/scratch", false)?;
//! # Ok::<(), membridge_shm::SegmentError>(())
//! ```

mod errors;
mod memory;
mod segment;

pub use errors::{SegmentError, SegmentResult};
pub use memory::{create_memory, read_memory, remove_memory, write_memory};
