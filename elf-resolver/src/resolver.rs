//! Header validation and dependency queries over a parsed ELF file.

use std::collections::HashSet;
use std::io::{Read, Seek};

use crate::header::{
	Class, DynTag, DynamicEntry, Endian, FileHeader, ProgramHeader, ProgramType, EI_CLASS,
	EI_DATA,
};
use crate::reader::ElfReader;
use crate::ElfError;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Chunk size used when scanning for a NUL terminator inside the string
/// table. Matches the original tool's scan granularity; chosen so most
/// library-name lookups finish in a single read.
const STRTAB_SCAN_CHUNK: usize = 64;

/// A validated ELF file, ready to answer interpreter and dependency
/// queries. Holds the file header in normalized (64-bit, host-order)
/// form; everything else is read lazily on demand.
pub struct ElfResolver<R> {
	reader: ElfReader<R>,
	class: Class,
	endian: Endian,
	header: FileHeader,
}

impl<R: Read + Seek> ElfResolver<R> {
	/// Validates the ELF magic, class and byte order, then reads and
	/// normalizes the file header.
	///
	/// Fails with [`ElfError::NotElf`], [`ElfError::UnknownClass`] or
	/// [`ElfError::UnknownByteOrder`] on a malformed `e_ident`, and with
	/// [`ElfError::MalformedElf`] if the header declares a program-header
	/// entry size inconsistent with its class.
	pub fn new(inner: R) -> Result<Self, ElfError> {
		let mut reader = ElfReader::new(inner);

		// Read only enough to see the magic and the class byte before
		// deciding whether this is even worth reading further; a short
		// file with a bad magic should fail `NotElf`, not `Io`.
		let mut ident = [0u8; EI_CLASS + 1];
		reader.read_exact_at(0, &mut ident)?;
		if ident[0..4] != ELF_MAGIC {
			return Err(ElfError::NotElf);
		}
		let class = Class::from_ei_class(ident[EI_CLASS])?;

		let mut ehdr_buf = vec![0u8; class.ehdr_size()];
		reader.read_exact_at(0, &mut ehdr_buf)?;
		let endian = Endian::from_ei_data(ehdr_buf[EI_DATA])?;
		let header = FileHeader::parse(class, endian, &ehdr_buf);

		if header.phnum > 0 && header.phentsize as usize != class.phdr_size() {
			return Err(ElfError::MalformedElf(format!(
				"e_phentsize {} does not match expected size {} for this class",
				header.phentsize,
				class.phdr_size()
			)));
		}

		Ok(ElfResolver {
			reader,
			class,
			endian,
			header,
		})
	}

	/// Reads and normalizes every program header entry, in file order.
	fn program_headers(&mut self) -> Result<Vec<ProgramHeader>, ElfError> {
		let mut headers = Vec::with_capacity(self.header.phnum as usize);
		let phdr_size = self.class.phdr_size();
		let mut buf = vec![0u8; phdr_size];
		for i in 0..self.header.phnum {
			let offset = self.header.phoff + i * self.header.phentsize;
			self.reader.read_exact_at(offset, &mut buf)?;
			headers.push(ProgramHeader::parse(self.class, self.endian, &buf));
		}
		Ok(headers)
	}

	/// Returns the dynamic interpreter path recorded in `PT_INTERP`, or
	/// `None` if the file has no such segment (for example, a statically
	/// linked binary).
	///
	/// Fails with [`ElfError::MalformedElf`] if a `PT_INTERP` segment is
	/// present but empty or not NUL-terminated.
	pub fn interpreter(&mut self) -> Result<Option<String>, ElfError> {
		let headers = self.program_headers()?;
		let Some(interp) = headers
			.iter()
			.find(|h| h.program_type == ProgramType::Interp)
		else {
			return Ok(None);
		};

		if interp.filesz == 0 {
			return Err(ElfError::MalformedElf(
				"PT_INTERP segment is empty".to_string(),
			));
		}

		let mut buf = vec![0u8; interp.filesz as usize];
		self.reader.read_exact_at(interp.offset, &mut buf)?;
		if buf.last() != Some(&0) {
			return Err(ElfError::MalformedElf(
				"PT_INTERP segment is not NUL-terminated".to_string(),
			));
		}
		buf.pop();
		Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
	}

	/// Returns the set of library names this file's `DT_NEEDED` entries
	/// name, or an empty set if the file has no `PT_DYNAMIC` segment
	/// (again, typically a statically linked binary).
	///
	/// Names are returned exactly as recorded in the dynamic string
	/// table: bare library names (`libc.so.6`) are not resolved against
	/// any search path here, matching the original tool's behavior of
	/// handing them onward unchanged.
	pub fn library_dependencies(&mut self) -> Result<Vec<String>, ElfError> {
		let headers = self.program_headers()?;

		let Some(dynamic) = headers
			.iter()
			.find(|h| h.program_type == ProgramType::Dynamic)
		else {
			return Ok(Vec::new());
		};

		let loads: Vec<&ProgramHeader> = headers
			.iter()
			.filter(|h| h.program_type == ProgramType::Load)
			.collect();

		let dyn_size = self.class.dyn_size();
		let count = dynamic.filesz as usize / dyn_size;
		let mut needed_offsets = Vec::new();
		let mut strtab_vaddr = None;

		let mut buf = vec![0u8; dyn_size];
		for i in 0..count {
			let offset = dynamic.offset + (i * dyn_size) as u64;
			self.reader.read_exact_at(offset, &mut buf)?;
			let entry = DynamicEntry::parse(self.class, self.endian, &buf);
			match entry.tag {
				DynTag::Needed => needed_offsets.push(entry.value),
				DynTag::Strtab => strtab_vaddr = Some(entry.value),
				DynTag::Other(_) => {}
			}
		}

		if needed_offsets.is_empty() {
			return Ok(Vec::new());
		}

		let Some(strtab_vaddr) = strtab_vaddr else {
			return Err(ElfError::MalformedElf(
				"DT_NEEDED present without DT_STRTAB".to_string(),
			));
		};

		let strtab_load = loads
			.iter()
			.find(|l| strtab_vaddr >= l.vaddr && strtab_vaddr <= l.vaddr + l.memsz)
			.ok_or_else(|| {
				ElfError::MalformedElf("DT_STRTAB address is not covered by any PT_LOAD segment".to_string())
			})?;
		let strtab_file_offset = strtab_load.offset + (strtab_vaddr - strtab_load.vaddr);
		let strtab_limit = strtab_load.memsz - (strtab_vaddr - strtab_load.vaddr);

		let mut names = HashSet::new();
		for rel_offset in needed_offsets {
			if rel_offset > strtab_limit {
				return Err(ElfError::MalformedElf(
					"DT_NEEDED offset beyond strtab bound".to_string(),
				));
			}
			let name = self.read_string_at(strtab_file_offset + rel_offset)?;
			if !name.is_empty() {
				names.insert(name);
			}
		}
		Ok(names.into_iter().collect())
	}

	/// Scans forward from `offset` in fixed-size chunks until a NUL byte
	/// or end of file is found, returning everything read up to (but not
	/// including) the terminator.
	fn read_string_at(&mut self, offset: u64) -> Result<String, ElfError> {
		let mut bytes = Vec::new();
		let mut chunk = [0u8; STRTAB_SCAN_CHUNK];
		let mut pos = offset;
		loop {
			let n = self.reader.read_best_effort_at(pos, &mut chunk)?;
			if n == 0 {
				break;
			}
			match chunk[..n].iter().position(|&b| b == 0) {
				Some(nul) => {
					bytes.extend_from_slice(&chunk[..nul]);
					break;
				}
				None => {
					bytes.extend_from_slice(&chunk[..n]);
					pos += n as u64;
				}
			}
		}
		Ok(String::from_utf8_lossy(&bytes).into_owned())
	}
}
