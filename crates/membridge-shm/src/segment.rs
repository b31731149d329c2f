//! Named segment lifecycle: create, open-and-size, map, remove.
//!
//! A segment is a POSIX shared-memory object laid out as a header followed
//! by the payload area:
//!
//! ```text
//! offset 0:              { max_size: usize, mutex: pthread_mutex_t }
//! offset HEADER_SIZE:    payload bytes (max_size of them)
//! ```
//!
//! `max_size` records the current payload capacity; the object on the
//! shared-memory filesystem is `HEADER_SIZE + max_size` bytes. The mutex is
//! initialized once at create time with `PTHREAD_PROCESS_SHARED` and is the
//! coarse per-segment lock: [`open`] acquires it after mapping and
//! [`MappedSegment`] releases it before unmapping, so holders may touch the
//! payload for the lifetime of the mapping and never after.
//!
//! Growth happens under the lock: `ftruncate` to the new extent plus a
//! small headroom, remap, then update `max_size`. Because a racing opener
//! may observe a pre-grow capacity before it reaches the lock, `max_size`
//! is always re-read after acquisition.

use std::{ffi::CString, io, ptr::NonNull};

use tracing::debug;

use crate::errors::{SegmentError, SegmentResult};

/// Mapped segment header: payload capacity plus the cross-process lock.
#[repr(C)]
pub(crate) struct SegmentHeader {
    max_size: usize,
    mutex: libc::pthread_mutex_t,
}

/// Byte offset of the payload area within a mapping.
pub(crate) const HEADER_SIZE: usize = std::mem::size_of::<SegmentHeader>();

/// Extra payload bytes added on every grow to amortize repeated resizes.
const GROW_HEADROOM: usize = 32;

/// Segment objects are created world-accessible, matching the open
/// namespace of the shared-memory filesystem.
const SEGMENT_MODE: libc::mode_t = 0o666;

fn c_name(name: &str) -> SegmentResult<CString> {
    CString::new(name).map_err(|_| SegmentError::InvalidName { name: name.to_owned() })
}

/// Create the named segment with `prealloc_size` bytes of payload capacity.
///
/// Returns `Ok(true)` when the segment was created, `Ok(false)` when it
/// already existed and `error_if_exists` is off.
///
/// # Errors
///
/// `AlreadyExists` when the segment exists and `error_if_exists` is set;
/// otherwise the OS-level failures of open, truncate, map, and mutex init.
pub(crate) fn create(
    name: &str,
    prealloc_size: usize,
    error_if_exists: bool,
) -> SegmentResult<bool> {
    let c = c_name(name)?;
    // SAFETY: `c` is a valid NUL-terminated string.
    let fd = unsafe {
        libc::shm_open(c.as_ptr(), libc::O_CREAT | libc::O_EXCL | libc::O_RDWR, SEGMENT_MODE)
    };
    if fd < 0 {
        let source = io::Error::last_os_error();
        if source.raw_os_error() == Some(libc::EEXIST) {
            if error_if_exists {
                return Err(SegmentError::AlreadyExists { name: name.to_owned() });
            }
            return Ok(false);
        }
        return Err(SegmentError::OpenFailed { name: name.to_owned(), source });
    }

    let result = init_segment(name, fd, prealloc_size);
    // SAFETY: `fd` is open and owned by this call.
    unsafe { libc::close(fd) };
    if result.is_err() {
        // Do not leave a half-initialized segment behind; a later create
        // must be able to start from scratch.
        // SAFETY: `c` is a valid NUL-terminated string.
        unsafe { libc::shm_unlink(c.as_ptr()) };
    }
    result.map(|()| {
        debug!(name, prealloc_size, "created shared segment");
        true
    })
}

/// Size the fresh object and initialize its header.
fn init_segment(name: &str, fd: libc::c_int, prealloc_size: usize) -> SegmentResult<()> {
    let total = HEADER_SIZE.checked_add(prealloc_size).ok_or_else(|| {
        SegmentError::TruncateFailed {
            name: name.to_owned(),
            size: usize::MAX,
            source: io::Error::from_raw_os_error(libc::EFBIG),
        }
    })?;
    // SAFETY: `fd` is a valid descriptor for the object we just created.
    if unsafe { libc::ftruncate(fd, total as libc::off_t) } != 0 {
        return Err(SegmentError::TruncateFailed {
            name: name.to_owned(),
            size: total,
            source: io::Error::last_os_error(),
        });
    }

    let mapping = map_raw(name, fd, HEADER_SIZE)?;
    let header = mapping.as_ptr().cast::<SegmentHeader>();
    // SAFETY: the mapping covers the whole header; the attribute object
    // lives on this stack frame and is destroyed before returning.
    let rc = unsafe {
        let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
        let mut rc = libc::pthread_mutexattr_init(&mut attr);
        if rc == 0 {
            libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED);
            rc = libc::pthread_mutex_init(&raw mut (*header).mutex, &attr);
            libc::pthread_mutexattr_destroy(&mut attr);
        }
        if rc == 0 {
            (*header).max_size = prealloc_size;
        }
        rc
    };
    // SAFETY: `mapping` was mapped with exactly this length above.
    unsafe { libc::munmap(mapping.as_ptr().cast(), HEADER_SIZE) };
    if rc != 0 {
        return Err(SegmentError::MutexInitFailed {
            name: name.to_owned(),
            source: io::Error::from_raw_os_error(rc),
        });
    }
    Ok(())
}

/// Unlink the named segment.
///
/// Returns `Ok(true)` when the name was removed. With `throw_error` off,
/// every failure collapses to `Ok(false)`; with it on, a missing segment is
/// `NotFound` and anything else is `UnlinkFailed`. Existing mappings stay
/// valid until their holders unmap; callers coordinate draining externally.
pub(crate) fn remove(name: &str, throw_error: bool) -> SegmentResult<bool> {
    let c = c_name(name)?;
    // SAFETY: `c` is a valid NUL-terminated string.
    if unsafe { libc::shm_unlink(c.as_ptr()) } == 0 {
        debug!(name, "removed shared segment");
        return Ok(true);
    }
    let source = io::Error::last_os_error();
    if !throw_error {
        return Ok(false);
    }
    if source.raw_os_error() == Some(libc::ENOENT) {
        return Err(SegmentError::NotFound { name: name.to_owned() });
    }
    Err(SegmentError::UnlinkFailed { name: name.to_owned(), source })
}

/// Open the named segment, grow it to hold `new_size` payload bytes if
/// needed, and return the locked full-extent mapping.
///
/// With `auto_create` on, a missing segment is created first (sized to
/// `new_size`); losing a creation race to another process is benign, the
/// loser reopens what the winner built.
pub(crate) fn open(
    name: &str,
    new_size: usize,
    auto_create: bool,
) -> SegmentResult<MappedSegment> {
    let c = c_name(name)?;
    // SAFETY: `c` is a valid NUL-terminated string.
    let mut fd = unsafe { libc::shm_open(c.as_ptr(), libc::O_RDWR, 0) };
    if fd < 0 {
        let source = io::Error::last_os_error();
        if source.raw_os_error() != Some(libc::ENOENT) {
            return Err(SegmentError::OpenFailed { name: name.to_owned(), source });
        }
        if !auto_create {
            return Err(SegmentError::NotFound { name: name.to_owned() });
        }
        create(name, new_size, false)?;
        // SAFETY: `c` is a valid NUL-terminated string.
        fd = unsafe { libc::shm_open(c.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            return Err(SegmentError::OpenFailed {
                name: name.to_owned(),
                source: io::Error::last_os_error(),
            });
        }
    }

    let result = open_mapped(name, fd, new_size);
    // SAFETY: `fd` is open and owned by this call; the mapping outlives it.
    unsafe { libc::close(fd) };
    result
}

fn open_mapped(name: &str, fd: libc::c_int, new_size: usize) -> SegmentResult<MappedSegment> {
    // Map just the header to reach the lock.
    let small = map_raw(name, fd, HEADER_SIZE)?;
    let header = small.as_ptr().cast::<SegmentHeader>();

    // SAFETY: the mapping covers the header and the mutex was initialized
    // at create time.
    let rc = unsafe { libc::pthread_mutex_lock(&raw mut (*header).mutex) };
    if rc != 0 {
        // SAFETY: `small` was mapped with exactly this length.
        unsafe { libc::munmap(small.as_ptr().cast(), HEADER_SIZE) };
        return Err(SegmentError::LockFailed {
            name: name.to_owned(),
            source: io::Error::from_raw_os_error(rc),
        });
    }

    // A writer may have grown the object between our mapping and our lock;
    // the capacity is only trustworthy now that the lock is held.
    // SAFETY: the mapping covers the header and we hold the lock.
    let current = unsafe { (*header).max_size };

    let unwind = |err: SegmentError| {
        // SAFETY: we hold the lock and `small` is still mapped.
        unsafe {
            libc::pthread_mutex_unlock(&raw mut (*header).mutex);
            libc::munmap(small.as_ptr().cast(), HEADER_SIZE);
        }
        Err(err)
    };

    let target = if new_size > current {
        let Some(grown) = new_size.checked_add(GROW_HEADROOM) else {
            return unwind(SegmentError::TruncateFailed {
                name: name.to_owned(),
                size: usize::MAX,
                source: io::Error::from_raw_os_error(libc::EFBIG),
            });
        };
        let total = HEADER_SIZE + grown;
        // SAFETY: `fd` is a valid descriptor for this segment.
        if unsafe { libc::ftruncate(fd, total as libc::off_t) } != 0 {
            return unwind(SegmentError::TruncateFailed {
                name: name.to_owned(),
                size: total,
                source: io::Error::last_os_error(),
            });
        }
        grown
    } else {
        current
    };

    // Map the full extent before dropping the header-only view, so the lock
    // is always reachable through some live mapping.
    let full = match map_raw(name, fd, HEADER_SIZE + target) {
        Ok(ptr) => ptr,
        Err(err) => return unwind(err),
    };
    // SAFETY: `small` was mapped with exactly this length; the lock state
    // lives in the shared object, not in this mapping.
    unsafe { libc::munmap(small.as_ptr().cast(), HEADER_SIZE) };

    let mapped =
        MappedSegment { ptr: full, mapped_len: HEADER_SIZE + target, locked: true };
    if target != current {
        // SAFETY: the full mapping covers the header and we hold the lock.
        unsafe { (*mapped.header()).max_size = target };
        debug!(name, from = current, to = target, "grew shared segment");
    }
    Ok(mapped)
}

fn map_raw(name: &str, fd: libc::c_int, len: usize) -> SegmentResult<NonNull<u8>> {
    // SAFETY: `fd` is a valid descriptor and `len` covers at least the
    // header of an object we sized ourselves.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(SegmentError::MapFailed {
            name: name.to_owned(),
            len,
            source: io::Error::last_os_error(),
        });
    }
    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| SegmentError::MapFailed {
        name: name.to_owned(),
        len,
        source: io::Error::from_raw_os_error(libc::EINVAL),
    })
}

/// A locked, full-extent mapping of one segment.
///
/// Holding one is holding the segment's lock: the payload may be read and
/// written freely until the value is dropped, which releases the lock and
/// then unmaps. Payload bytes must be copied out before drop; no decoded
/// value may borrow from the mapping.
pub(crate) struct MappedSegment {
    ptr: NonNull<u8>,
    mapped_len: usize,
    locked: bool,
}

impl MappedSegment {
    fn header(&self) -> *mut SegmentHeader {
        self.ptr.as_ptr().cast()
    }

    /// Current payload capacity in bytes.
    pub(crate) fn max_size(&self) -> usize {
        // SAFETY: the mapping covers the header and we hold the lock.
        unsafe { (*self.header()).max_size }
    }

    /// The payload area.
    pub(crate) fn payload(&self) -> &[u8] {
        // SAFETY: the mapping is HEADER_SIZE + max_size bytes long and the
        // lock serializes all payload access.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(HEADER_SIZE), self.max_size()) }
    }

    /// The payload area, writable.
    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        // SAFETY: as for `payload`, and `&mut self` forbids aliasing within
        // this process; cross-process aliasing is serialized by the lock.
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(HEADER_SIZE), self.max_size())
        }
    }
}

impl Drop for MappedSegment {
    fn drop(&mut self) {
        if self.locked {
            // SAFETY: we locked this mutex in `open_mapped` and the mapping
            // is still live.
            unsafe { libc::pthread_mutex_unlock(&raw mut (*self.header()).mutex) };
            self.locked = false;
        }
        // SAFETY: `ptr` and `mapped_len` describe a mapping we own.
        unsafe { libc::munmap(self.ptr.as_ptr().cast(), self.mapped_len) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_starts_with_the_capacity_word() {
        assert_eq!(std::mem::offset_of!(SegmentHeader, max_size), 0);
        assert!(HEADER_SIZE >= std::mem::size_of::<usize>());
    }

    #[test]
    fn nul_in_name_is_rejected() {
        assert!(matches!(
            create("bad\0name", 0, false).unwrap_err(),
            SegmentError::InvalidName { .. }
        ));
    }
}
