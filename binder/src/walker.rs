//! Recursive, physical-links-only filesystem traversal.

use std::fs::{self, Metadata};
use std::path::Path;

/// Walks `path`, invoking `callback` once per entry found.
///
/// If `path` is itself a regular file (or any other non-directory), the
/// callback runs once for it. If `path` is a directory, every entry
/// encountered during recursive descent is passed to the callback,
/// including non-regular entries (devices, sockets, symlinks) — the
/// caller is expected to filter those. Symlinks are never followed:
/// [`fs::symlink_metadata`] is used throughout, so a symlink is observed
/// as a symlink rather than silently resolved to its target.
///
/// Unreadable paths and directory-enumeration errors are skipped
/// silently; the walker is a best-effort enumerator, not a strict one.
///
/// `callback` takes a plain `&mut impl FnMut` rather than being
/// registered through any shared or global state, so multiple walks can
/// run concurrently (on different threads or interleaved) without
/// contending on a lock.
pub fn walk(path: &Path, callback: &mut impl FnMut(&Path, &Metadata)) {
	let Ok(meta) = fs::symlink_metadata(path) else {
		return;
	};
	if meta.is_dir() {
		walk_dir(path, callback);
	} else {
		callback(path, &meta);
	}
}

fn walk_dir(dir: &Path, callback: &mut impl FnMut(&Path, &Metadata)) {
	let Ok(entries) = fs::read_dir(dir) else {
		return;
	};
	for entry in entries {
		let Ok(entry) = entry else {
			continue;
		};
		let entry_path = entry.path();
		let Ok(meta) = fs::symlink_metadata(&entry_path) else {
			continue;
		};
		callback(&entry_path, &meta);
		if meta.is_dir() {
			walk_dir(&entry_path, callback);
		}
	}
}
