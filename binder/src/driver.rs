//! The scan driver: a pending-path work queue and the path→lock map it
//! feeds into the lock holder, with ELF dependency discovery wired
//! between the two.

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::thread;

use elf_resolver::ElfError;
use elf_resolver::ElfResolver;
use log::{debug, error, info, warn};

use crate::lock::{LockError, LockToken};
use crate::walker;

/// Owns the pending-path queue and the path→lock map, and drives the
/// walk-resolve-lock loop to completion (which, for this process, means
/// forever).
pub struct Driver {
	pending: Vec<PathBuf>,
	locks: HashMap<PathBuf, LockToken>,
	error: Option<LockError>,
}

impl Driver {
	/// Seeds the driver with the given paths, ready for [`Driver::run`].
	pub fn new(seeds: impl IntoIterator<Item = PathBuf>) -> Self {
		Driver {
			pending: seeds.into_iter().collect(),
			locks: HashMap::new(),
			error: None,
		}
	}

	/// Runs the batch-drain loop until the pending queue is empty, then
	/// parks the current thread indefinitely — the locks this driver
	/// holds must outlive the scan, so the process must not exit.
	///
	/// Returns an error if a lock acquisition fails; by the time this
	/// happens some files may already be locked, and those locks are
	/// dropped (and released) along with the rest of the driver.
	pub fn run(&mut self) -> Result<(), LockError> {
		while !self.pending.is_empty() {
			// Move the queue into a local batch before walking it, so
			// that paths enqueued by this batch's own callbacks don't
			// get visited until the next batch — walking and mutating
			// the same queue in place would require re-borrowing `self`
			// from inside its own callback.
			let batch = std::mem::take(&mut self.pending);
			for path in batch {
				debug!("walking {}", path.display());
				walker::walk(&path, &mut |p, m| self.visit_file(p, m));
				if self.error.is_some() {
					break;
				}
			}
			if self.error.is_some() {
				break;
			}
		}

		if let Some(e) = self.error.take() {
			return Err(e);
		}

		info!("entering resident state");
		thread::park();
		Ok(())
	}

	/// The per-file callback described by the scan driver's component
	/// design: skip non-regular entries, best-effort ELF-scan regular
	/// files for transitive dependencies, then lock them.
	fn visit_file(&mut self, path: &Path, meta: &Metadata) {
		if self.error.is_some() {
			return;
		}
		if !meta.is_file() {
			return;
		}
		if self.locks.contains_key(path) {
			debug!("{} already locked, skipping", path.display());
			return;
		}

		self.scan_elf(path);

		match LockToken::lock(path) {
			Ok(token) => {
				debug!("locked {}", path.display());
				self.locks.insert(path.to_path_buf(), token);
			}
			Err(e) => {
				error!("failed to lock {}: {}", path.display(), e);
				self.error = Some(e);
			}
		}
	}

	/// Best-effort ELF inspection. Any failure here — the file isn't
	/// ELF, or it's malformed, or it couldn't even be opened — is
	/// swallowed; the file is still locked afterward regardless.
	fn scan_elf(&mut self, path: &Path) {
		let file = match fs::File::open(path) {
			Ok(f) => f,
			Err(e) => {
				debug!("failed to open {} for ELF inspection: {}", path.display(), e);
				return;
			}
		};

		let mut resolver = match ElfResolver::new(file) {
			Ok(r) => r,
			Err(ElfError::NotElf) => {
				debug!("{} is not an ELF file", path.display());
				return;
			}
			Err(ElfError::UnknownClass) | Err(ElfError::UnknownByteOrder) => {
				debug!("{} has an unrecognized ELF class or byte order", path.display());
				return;
			}
			Err(e) => {
				warn!("malformed ELF header in {}: {}", path.display(), e);
				return;
			}
		};

		match resolver.interpreter() {
			Ok(Some(interp)) => {
				debug!("{} names interpreter {}", path.display(), interp);
				self.pending.push(PathBuf::from(interp));
			}
			Ok(None) => {}
			Err(e) => warn!("failed to read interpreter from {}: {}", path.display(), e),
		}

		match resolver.library_dependencies() {
			Ok(deps) => {
				for dep in deps {
					// Bare library names (e.g. "libc.so.6") are enqueued
					// exactly as the dynamic string table records them,
					// unresolved against any search path. They only
					// resolve to a real file if a seed path already
					// walks over a directory containing them.
					debug!("{} depends on {}", path.display(), dep);
					self.pending.push(PathBuf::from(dep));
				}
			}
			Err(e) => warn!("failed to read dependencies from {}: {}", path.display(), e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

	fn scratch_dir(name: &str) -> PathBuf {
		let mut dir = std::env::temp_dir();
		dir.push(format!("binder-driver-test-{}-{}", std::process::id(), name));
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	fn elf64_with_interp(interp: &str) -> Vec<u8> {
		let mut interp_bytes = interp.as_bytes().to_vec();
		interp_bytes.push(0);

		let mut buf = vec![0u8; 64];
		buf[0..4].copy_from_slice(&ELF_MAGIC);
		buf[4] = 2; // ELFCLASS64
		buf[5] = 1; // ELFDATA2LSB
		buf[32..40].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
		buf[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize
		buf[56..58].copy_from_slice(&1u16.to_le_bytes()); // e_phnum

		let mut phdr = [0u8; 56];
		phdr[0..4].copy_from_slice(&3u32.to_le_bytes()); // PT_INTERP
		let offset = 64 + 56u64;
		phdr[8..16].copy_from_slice(&offset.to_le_bytes());
		phdr[32..40].copy_from_slice(&(interp_bytes.len() as u64).to_le_bytes());
		phdr[40..48].copy_from_slice(&(interp_bytes.len() as u64).to_le_bytes());
		buf.extend_from_slice(&phdr);
		buf.extend_from_slice(&interp_bytes);
		buf
	}

	#[test]
	fn locks_a_plain_non_elf_file() {
		let dir = scratch_dir("plain");
		let file = dir.join("a.txt");
		fs::write(&file, b"not elf").unwrap();

		let mut driver = Driver::new(vec![file.clone()]);
		driver.visit_file(&file, &fs::symlink_metadata(&file).unwrap());

		assert!(driver.locks.contains_key(&file));
		fs::remove_dir_all(&dir).ok();
	}

	#[test]
	fn transitively_enqueues_and_locks_the_interpreter() {
		let dir = scratch_dir("transitive");
		let interp = dir.join("ld.so");
		fs::write(&interp, b"interpreter contents").unwrap();

		let binary = dir.join("program");
		fs::write(&binary, elf64_with_interp(interp.to_str().unwrap())).unwrap();

		let mut driver = Driver::new(vec![binary.clone()]);
		driver.run_one_batch_for_test();

		assert!(driver.locks.contains_key(&binary));
		assert!(driver.locks.contains_key(&interp));
		fs::remove_dir_all(&dir).ok();
	}

	#[test]
	fn does_not_relock_an_already_locked_path() {
		let dir = scratch_dir("dedup");
		let file = dir.join("a.txt");
		fs::write(&file, b"x").unwrap();
		let meta = fs::symlink_metadata(&file).unwrap();

		let mut driver = Driver::new(vec![]);
		driver.visit_file(&file, &meta);
		assert_eq!(driver.locks.len(), 1);
		driver.visit_file(&file, &meta);
		assert_eq!(driver.locks.len(), 1);
		fs::remove_dir_all(&dir).ok();
	}

	impl Driver {
		/// Drains exactly the paths present at call time, without
		/// parking afterward — lets tests observe transitive discovery
		/// without blocking the test thread forever.
		fn run_one_batch_for_test(&mut self) {
			while !self.pending.is_empty() {
				let batch = std::mem::take(&mut self.pending);
				for path in batch {
					walker::walk(&path, &mut |p, m| self.visit_file(p, m));
				}
			}
		}
	}
}
