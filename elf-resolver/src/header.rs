//! On-disk ELF record layouts, widened and byte-order-normalized into
//! host-native form.
//!
//! Every accessor here takes the file's recorded [`Endian`] and decodes
//! multi-byte fields directly in that order, which has the same effect as
//! the original implementation's "detect mismatch, then byte-swap every
//! field" step: a field is always read correctly regardless of host byte
//! order, without a separate conditional swap pass.

use crate::ElfError;

pub(crate) const EI_CLASS: usize = 4;
pub(crate) const EI_DATA: usize = 5;

const ELFCLASSNONE: u8 = 0;
const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const ELFCLASSNUM: u8 = 3;

const ELFDATANONE: u8 = 0;
const ELFDATA2LSB: u8 = 1;
const ELFDATA2MSB: u8 = 2;
const ELFDATANUM: u8 = 3;

pub(crate) const EHDR32_SIZE: usize = 52;
pub(crate) const EHDR64_SIZE: usize = 64;
pub(crate) const PHDR32_SIZE: usize = 32;
pub(crate) const PHDR64_SIZE: usize = 56;
pub(crate) const DYN32_SIZE: usize = 8;
pub(crate) const DYN64_SIZE: usize = 16;

const PT_LOAD: u32 = 1;
const PT_DYNAMIC: u32 = 2;
const PT_INTERP: u32 = 3;

const DT_NEEDED: i64 = 1;
const DT_STRTAB: i64 = 5;

/// The byte order recorded in `e_ident[EI_DATA]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endian {
	Little,
	Big,
}

impl Endian {
	pub(crate) fn from_ei_data(b: u8) -> Result<Self, ElfError> {
		match b {
			ELFDATA2LSB => Ok(Endian::Little),
			ELFDATA2MSB => Ok(Endian::Big),
			ELFDATANONE | ELFDATANUM.. => Err(ElfError::UnknownByteOrder),
		}
	}

	fn u16(self, b: &[u8]) -> u16 {
		let b: [u8; 2] = b.try_into().unwrap();
		match self {
			Endian::Little => u16::from_le_bytes(b),
			Endian::Big => u16::from_be_bytes(b),
		}
	}

	fn u32(self, b: &[u8]) -> u32 {
		let b: [u8; 4] = b.try_into().unwrap();
		match self {
			Endian::Little => u32::from_le_bytes(b),
			Endian::Big => u32::from_be_bytes(b),
		}
	}

	fn u64(self, b: &[u8]) -> u64 {
		let b: [u8; 8] = b.try_into().unwrap();
		match self {
			Endian::Little => u64::from_le_bytes(b),
			Endian::Big => u64::from_be_bytes(b),
		}
	}

	fn i32(self, b: &[u8]) -> i32 {
		self.u32(b) as i32
	}

	fn i64(self, b: &[u8]) -> i64 {
		self.u64(b) as i64
	}
}

/// ELF class, widened so callers never need to branch on it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Class {
	Elf32,
	Elf64,
}

impl Class {
	pub(crate) fn from_ei_class(b: u8) -> Result<Self, ElfError> {
		match b {
			ELFCLASS32 => Ok(Class::Elf32),
			ELFCLASS64 => Ok(Class::Elf64),
			ELFCLASSNONE | ELFCLASSNUM.. => Err(ElfError::UnknownClass),
		}
	}

	pub(crate) fn ehdr_size(self) -> usize {
		match self {
			Class::Elf32 => EHDR32_SIZE,
			Class::Elf64 => EHDR64_SIZE,
		}
	}

	pub(crate) fn phdr_size(self) -> usize {
		match self {
			Class::Elf32 => PHDR32_SIZE,
			Class::Elf64 => PHDR64_SIZE,
		}
	}

	pub(crate) fn dyn_size(self) -> usize {
		match self {
			Class::Elf32 => DYN32_SIZE,
			Class::Elf64 => DYN64_SIZE,
		}
	}
}

/// The fields of the file header this crate consumes, widened to 64-bit
/// host-native values. Section-header fields are retained for parity with
/// the original tool but nothing in this crate reads them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileHeader {
	pub(crate) phoff: u64,
	pub(crate) phentsize: u64,
	pub(crate) phnum: u64,
	#[allow(dead_code)]
	pub(crate) shoff: u64,
	#[allow(dead_code)]
	pub(crate) shentsize: u64,
	#[allow(dead_code)]
	pub(crate) shnum: u64,
	#[allow(dead_code)]
	pub(crate) shstrndx: u64,
}

impl FileHeader {
	/// Parses a full class-appropriate header buffer (52 or 64 bytes,
	/// starting at `e_ident[0]`) given the already-determined class and
	/// endianness.
	pub(crate) fn parse(class: Class, endian: Endian, buf: &[u8]) -> Self {
		match class {
			Class::Elf32 => FileHeader {
				phoff: endian.u32(&buf[28..32]) as u64,
				shoff: endian.u32(&buf[32..36]) as u64,
				phentsize: endian.u16(&buf[42..44]) as u64,
				phnum: endian.u16(&buf[44..46]) as u64,
				shentsize: endian.u16(&buf[46..48]) as u64,
				shnum: endian.u16(&buf[48..50]) as u64,
				shstrndx: endian.u16(&buf[50..52]) as u64,
			},
			Class::Elf64 => FileHeader {
				phoff: endian.u64(&buf[32..40]),
				shoff: endian.u64(&buf[40..48]),
				phentsize: endian.u16(&buf[54..56]) as u64,
				phnum: endian.u16(&buf[56..58]) as u64,
				shentsize: endian.u16(&buf[58..60]) as u64,
				shnum: endian.u16(&buf[60..62]) as u64,
				shstrndx: endian.u16(&buf[62..64]) as u64,
			},
		}
	}
}

/// A program header type, widened to the types the resolver acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramType {
	/// A loadable segment; maps file bytes to a virtual-address range.
	Load,
	/// Contains the null-terminated path of the dynamic interpreter.
	Interp,
	/// Contains the dynamic-linking table.
	Dynamic,
	/// Any other program header type; not inspected by this crate.
	Other(u32),
}

impl ProgramType {
	fn from_raw(v: u32) -> Self {
		match v {
			PT_LOAD => ProgramType::Load,
			PT_INTERP => ProgramType::Interp,
			PT_DYNAMIC => ProgramType::Dynamic,
			other => ProgramType::Other(other),
		}
	}
}

/// A program header entry, widened to 64-bit host-native fields
/// regardless of source class.
#[derive(Debug, Clone, Copy)]
pub struct ProgramHeader {
	pub program_type: ProgramType,
	#[allow(dead_code)]
	pub flags: u32,
	pub offset: u64,
	pub vaddr: u64,
	#[allow(dead_code)]
	pub paddr: u64,
	pub filesz: u64,
	pub memsz: u64,
	#[allow(dead_code)]
	pub align: u64,
}

impl ProgramHeader {
	pub(crate) fn parse(class: Class, endian: Endian, buf: &[u8]) -> Self {
		match class {
			Class::Elf32 => ProgramHeader {
				program_type: ProgramType::from_raw(endian.u32(&buf[0..4])),
				offset: endian.u32(&buf[4..8]) as u64,
				vaddr: endian.u32(&buf[8..12]) as u64,
				paddr: endian.u32(&buf[12..16]) as u64,
				filesz: endian.u32(&buf[16..20]) as u64,
				memsz: endian.u32(&buf[20..24]) as u64,
				flags: endian.u32(&buf[24..28]),
				align: endian.u32(&buf[28..32]) as u64,
			},
			Class::Elf64 => ProgramHeader {
				program_type: ProgramType::from_raw(endian.u32(&buf[0..4])),
				flags: endian.u32(&buf[4..8]),
				offset: endian.u64(&buf[8..16]),
				vaddr: endian.u64(&buf[16..24]),
				paddr: endian.u64(&buf[24..32]),
				filesz: endian.u64(&buf[32..40]),
				memsz: endian.u64(&buf[40..48]),
				align: endian.u64(&buf[48..56]),
			},
		}
	}
}

/// A tag of interest from a `PT_DYNAMIC` entry; all other tags are folded
/// into [`DynTag::Other`] and ignored by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DynTag {
	Needed,
	Strtab,
	Other(i64),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DynamicEntry {
	pub(crate) tag: DynTag,
	/// `d_un.d_val` or `d_un.d_ptr`, whichever the tag implies. Both
	/// members of the union are the same width, so no distinction is
	/// needed to read it.
	pub(crate) value: u64,
}

impl DynamicEntry {
	pub(crate) fn parse(class: Class, endian: Endian, buf: &[u8]) -> Self {
		let (tag, value) = match class {
			Class::Elf32 => (endian.i32(&buf[0..4]) as i64, endian.u32(&buf[4..8]) as u64),
			Class::Elf64 => (endian.i64(&buf[0..8]), endian.u64(&buf[8..16])),
		};
		let tag = match tag {
			DT_NEEDED => DynTag::Needed,
			DT_STRTAB => DynTag::Strtab,
			other => DynTag::Other(other),
		};
		DynamicEntry { tag, value }
	}
}
