use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{decode_err, err};

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

pub(super) const FOURCC_LEN: u64 = 4;
pub(super) const IDENTIFIER_LEN: u64 = 4;
pub(super) const ATOM_HEADER_LEN: u64 = FOURCC_LEN + IDENTIFIER_LEN;
pub(super) const FULL_ATOM_SIZE: u64 = ATOM_HEADER_LEN + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AtomInfo {
	pub(crate) start: u64,
	pub(crate) len: u64,
	pub(crate) extended: bool,
	/// The atom has a size of 0, and extends to the end of the file
	pub(crate) to_eof: bool,
	pub(crate) ident: [u8; 4],
}

// ISO/IEC 14496-12 permits any characters to be used in atom identifiers. This doesn't
// leave us any room for error detection.
//
// TagLib has decided on a character set to consider valid, so we will do the same:
// <https://github.com/taglib/taglib/issues/1077#issuecomment-1440385838>
pub(super) fn is_valid_identifier_byte(b: u8) -> bool {
	(b' '..=b'~').contains(&b) || b == b'\xA9'
}

impl AtomInfo {
	/// Read the atom header at the current position
	///
	/// `parent_end` is the end of the enclosing atom (or the file), the atom can't extend past it.
	pub(crate) fn read<R>(data: &mut R, parent_end: u64, parse_mode: ParsingMode) -> Result<Option<Self>>
	where
		R: Read + Seek,
	{
		let start = data.stream_position()?;
		if start + ATOM_HEADER_LEN > parent_end {
			return Ok(None);
		}

		let len_raw = u64::from(data.read_u32::<BigEndian>()?);

		let mut identifier = [0; IDENTIFIER_LEN as usize];
		data.read_exact(&mut identifier)?;

		if !identifier.iter().copied().all(is_valid_identifier_byte) {
			// The atom identifier contains invalid characters
			match parse_mode {
				ParsingMode::Strict => {
					decode_err!(@BAIL Mp4, "Encountered an atom with invalid characters");
				},
				ParsingMode::BestAttempt | ParsingMode::Relaxed => {
					log::warn!("Encountered an atom with invalid characters, stopping");
					return Ok(None);
				},
			}
		}

		let (len, extended, to_eof) = match len_raw {
			// The atom extends to the end of the parent
			0 => (parent_end - start, false, true),
			// There's an extended length
			1 => {
				if start + ATOM_HEADER_LEN + 8 > parent_end {
					err!(SizeMismatch);
				}

				(data.read_u64::<BigEndian>()?, true, false)
			},
			_ => (len_raw, false, false),
		};

		let header_len = if extended { ATOM_HEADER_LEN + 8 } else { ATOM_HEADER_LEN };
		if len < header_len {
			decode_err!(@BAIL Mp4, "Found an atom with an invalid length");
		}

		if start + len > parent_end {
			// As with all formats, there's a good chance certain software won't know how to actually use padding.
			// If the file ends with an incorrectly sized padding atom, we can just ignore it.
			let skippable = (parse_mode != ParsingMode::Strict && identifier == *b"free")
				|| parse_mode == ParsingMode::Relaxed;
			if skippable {
				log::warn!("Encountered an atom with an invalid length, stopping");
				data.seek(SeekFrom::Start(parent_end))?;
				return Ok(None);
			}

			err!(SizeMismatch);
		}

		log::trace!(
			"Found atom \"{}\" ({start}..{})",
			identifier.escape_ascii(),
			start + len
		);

		Ok(Some(Self {
			start,
			len,
			extended,
			to_eof,
			ident: identifier,
		}))
	}

	pub(crate) fn header_size(&self) -> u64 {
		if !self.extended {
			return ATOM_HEADER_LEN;
		}

		ATOM_HEADER_LEN + 8
	}

	pub(crate) fn end(&self) -> u64 {
		self.start + self.len
	}

	pub(crate) fn content_start(&self) -> u64 {
		self.start + self.header_size()
	}
}
