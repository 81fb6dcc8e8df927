//! Memory-mapped, memory-locked file handles.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

/// Failure modes for acquiring a lock on a file. Each variant corresponds
/// to a single failing OS call.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
	#[error("open failed: {0}")]
	Open(io::Error),
	#[error("stat failed: {0}")]
	Stat(io::Error),
	#[error("mmap failed: {0}")]
	Map(io::Error),
}

/// An owning handle to a locked, resident mapping of a file's contents.
///
/// While this value exists, the mapped range is paged in and pinned
/// against eviction. Dropping it unmaps the region (and with it, the
/// kernel's lock on those pages). Not `Clone`: exactly one owner ever
/// releases the mapping.
pub struct LockToken {
	addr: *mut libc::c_void,
	len: usize,
}

impl LockToken {
	/// Opens `path` read-only, maps its full contents, and locks them
	/// resident. A zero-length file produces a no-op token that maps
	/// nothing and releases nothing on drop.
	pub fn lock(path: &Path) -> Result<Self, LockError> {
		let c_path = CString::new(path.as_os_str().as_bytes())
			.map_err(|e| LockError::Open(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

		let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDONLY | libc::O_CLOEXEC) };
		if fd < 0 {
			return Err(LockError::Open(io::Error::last_os_error()));
		}

		let size = unsafe {
			let mut stat: libc::stat = std::mem::zeroed();
			if libc::fstat(fd, &mut stat) != 0 {
				let err = io::Error::last_os_error();
				libc::close(fd);
				return Err(LockError::Stat(err));
			}
			stat.st_size as usize
		};

		if size == 0 {
			unsafe {
				libc::close(fd);
			}
			return Ok(LockToken {
				addr: ptr::null_mut(),
				len: 0,
			});
		}

		let addr = unsafe {
			libc::mmap(
				ptr::null_mut(),
				size,
				libc::PROT_READ,
				libc::MAP_SHARED | libc::MAP_LOCKED | libc::MAP_POPULATE,
				fd,
				0,
			)
		};
		if addr == libc::MAP_FAILED {
			let err = io::Error::last_os_error();
			unsafe {
				libc::close(fd);
			}
			return Err(LockError::Map(err));
		}

		// MAP_LOCKED is advisory on some kernels under memory pressure;
		// reinforce it with an explicit mlock(2).
		if unsafe { libc::mlock(addr, size) } != 0 {
			let err = io::Error::last_os_error();
			unsafe {
				libc::munmap(addr, size);
				libc::close(fd);
			}
			return Err(LockError::Map(err));
		}

		// The mapping keeps the inode (and its pages) alive; the
		// descriptor itself is no longer needed.
		unsafe {
			libc::close(fd);
		}

		Ok(LockToken { addr, len: size })
	}
}

impl Drop for LockToken {
	fn drop(&mut self) {
		if self.len > 0 {
			unsafe {
				libc::munmap(self.addr, self.len);
			}
		}
	}
}
