//! A byte-exact parser for the parts of the ELF format a dynamic loader
//! (or anything that wants to know what a dynamic loader would load) cares
//! about: the file header, `PT_INTERP`, `PT_LOAD`, and `PT_DYNAMIC`.
//!
//! The parser handles 32- and 64-bit objects in either endianness on any
//! host. Every multi-byte field is decoded according to the endianness
//! recorded in the file itself, then widened into 64-bit host-order
//! values, so nothing downstream of [`ElfResolver::new`] ever needs to
//! know the source class or byte order again.

mod header;
mod reader;
mod resolver;

pub use header::ProgramType;
pub use resolver::ElfResolver;

use std::io;

/// The closed error taxonomy for ELF parsing.
#[derive(Debug, thiserror::Error)]
pub enum ElfError {
	/// The first four bytes were not the ELF magic.
	#[error("not an ELF file")]
	NotElf,
	/// `e_ident[EI_CLASS]` was not `ELFCLASS32` or `ELFCLASS64`.
	#[error("unknown ELF class")]
	UnknownClass,
	/// `e_ident[EI_DATA]` was not `ELFDATA2LSB` or `ELFDATA2MSB`.
	#[error("unknown ELF byte order")]
	UnknownByteOrder,
	/// A structural invariant of the file was violated.
	#[error("malformed ELF: {0}")]
	MalformedElf(String),
	/// A seek or read failed, including premature EOF.
	#[error("I/O error reading ELF file: {0}")]
	Io(#[from] io::Error),
}
