use crate::error::Result;
use crate::macros::decode_err;
use crate::util::synchsafe::SynchsafeInteger;

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder};

pub(crate) const HEADER_LEN: u64 = 10;

const FLAG_UNSYNCHRONISATION: u8 = 0x80;
const FLAG_EXTENDED_HEADER: u8 = 0x40;
const FLAG_FOOTER: u8 = 0x10;

/// The ID3v2 version
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum Id3v2Version {
	/// ID3v2.2
	V2,
	/// ID3v2.3
	V3,
	/// ID3v2.4
	V4,
}

impl Id3v2Version {
	pub(crate) fn from_major(major: u8) -> Option<Self> {
		match major {
			2 => Some(Self::V2),
			3 => Some(Self::V3),
			4 => Some(Self::V4),
			_ => None,
		}
	}

	pub(crate) fn major(self) -> u8 {
		match self {
			Self::V2 => 2,
			Self::V3 => 3,
			Self::V4 => 4,
		}
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Id3v2Header {
	pub(crate) version: Id3v2Version,
	pub(crate) flags: u8,
	/// The size of the tag contents (**DOES NOT INCLUDE THE HEADER/FOOTER**)
	pub(crate) size: u32,
}

impl Id3v2Header {
	/// Read a header at the current position
	///
	/// If there's no tag, the reader is put back where it was.
	pub(crate) fn read<R>(reader: &mut R) -> Result<Option<Self>>
	where
		R: Read + Seek,
	{
		let start = reader.stream_position()?;

		let mut header = [0; HEADER_LEN as usize];
		match reader.read_exact(&mut header) {
			Ok(()) => {},
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
				reader.seek(SeekFrom::Start(start))?;
				return Ok(None);
			},
			Err(e) => return Err(e.into()),
		}

		if &header[..3] != b"ID3" {
			reader.seek(SeekFrom::Start(start))?;
			return Ok(None);
		}

		log::debug!("Found an ID3v2 header at {start}");

		let Some(version) = Id3v2Version::from_major(header[3]) else {
			decode_err!(@BAIL "ID3v2: Found an unknown major version");
		};

		Ok(Some(Self {
			version,
			flags: header[5],
			size: BigEndian::read_u32(&header[6..]).unsynch(),
		}))
	}

	pub(crate) fn unsynchronised(&self) -> bool {
		self.flags & FLAG_UNSYNCHRONISATION == FLAG_UNSYNCHRONISATION
	}

	pub(crate) fn has_extended_header(&self) -> bool {
		self.version != Id3v2Version::V2 && self.flags & FLAG_EXTENDED_HEADER == FLAG_EXTENDED_HEADER
	}

	pub(crate) fn has_footer(&self) -> bool {
		self.version == Id3v2Version::V4 && self.flags & FLAG_FOOTER == FLAG_FOOTER
	}

	/// The full length of the tag, including the header and footer
	pub(crate) fn tag_len(&self) -> u64 {
		let footer = if self.has_footer() { HEADER_LEN } else { 0 };
		HEADER_LEN + u64::from(self.size) + footer
	}

	/// Why the tag can't be edited in place, if it can't
	pub(crate) fn unsupported_layout(&self) -> Option<&'static str> {
		if self.version == Id3v2Version::V2 {
			return Some("ID3v2.2 tags can't be edited");
		}

		if self.unsynchronised() {
			return Some("Unsynchronised ID3v2 tags can't be edited");
		}

		if self.has_extended_header() {
			return Some("ID3v2 tags with an extended header can't be edited");
		}

		if self.has_footer() {
			return Some("ID3v2 tags with a footer can't be edited");
		}

		None
	}
}

/// Skip an ID3v2 tag at the current position, if there is one
///
/// Returns the offset right after the tag.
pub(crate) fn skip_id3v2<R>(reader: &mut R) -> Result<Option<u64>>
where
	R: Read + Seek,
{
	let start = reader.stream_position()?;
	let Some(header) = Id3v2Header::read(reader)? else {
		return Ok(None);
	};

	let end = start + header.tag_len();
	log::debug!("Skipping ID3v2 tag ({start}..{end})");

	reader.seek(SeekFrom::Start(end))?;
	Ok(Some(end))
}
