//! Byte-level random-access reader over a seekable file handle.

use std::io::{Read, Seek, SeekFrom};

use crate::ElfError;

/// Reads exactly `N` bytes, or reads up to `N` bytes best-effort, at
/// arbitrary file offsets.
///
/// `std::fs::File`'s `Read`/`Seek` implementations already retry
/// transparently on `ErrorKind::Interrupted`, so no separate `EINTR` loop
/// is needed here the way the original C implementation needed one around
/// raw `read(2)`/`lseek(2)` calls.
pub(crate) struct ElfReader<R> {
	inner: R,
}

impl<R: Read + Seek> ElfReader<R> {
	pub(crate) fn new(inner: R) -> Self {
		Self { inner }
	}

	/// Reads exactly `buf.len()` bytes at `offset`. Fails on seek failure,
	/// short read (premature EOF), or any other I/O error.
	pub(crate) fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), ElfError> {
		self.inner.seek(SeekFrom::Start(offset))?;
		self.inner.read_exact(buf)?;
		Ok(())
	}

	/// Reads up to `buf.len()` bytes at `offset`, returning the number of
	/// bytes actually read (zero at EOF). Used only for scanning
	/// null-terminated strings where the upper bound is coarse.
	pub(crate) fn read_best_effort_at(
		&mut self,
		offset: u64,
		buf: &mut [u8],
	) -> Result<usize, ElfError> {
		self.inner.seek(SeekFrom::Start(offset))?;
		Ok(self.inner.read(buf)?)
	}
}
