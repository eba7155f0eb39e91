use super::header::Id3v2Version;
use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{decode_err, err};
use crate::util::synchsafe::SynchsafeInteger;
use crate::util::text::{TextEncoding, decode_text};

use std::io::Write;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

pub(super) const FRAME_HEADER_LEN: usize = 10;

// Compression, encryption and grouping
const V3_FORMAT_FLAGS: u16 = 0x00E0;
// Grouping, compression, encryption, unsynchronisation and data length indicator
const V4_FORMAT_FLAGS: u16 = 0x004F;

/// A frame borrowed from the tag content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Frame<'a> {
	pub(super) id: [u8; 4],
	pub(super) flags: u16,
	pub(super) content: &'a [u8],
}

impl Frame<'_> {
	pub(super) fn id_str(&self) -> &str {
		// IDs are validated to be ASCII when parsed
		std::str::from_utf8(&self.id).unwrap_or_default()
	}

	/// Whether this is a text frame that is read into, and written from, the tag items
	///
	/// Text frames with format flags can't be decoded, so they are kept as is.
	pub(super) fn is_editable(&self, version: Id3v2Version) -> bool {
		let format_flags = match version {
			Id3v2Version::V4 => V4_FORMAT_FLAGS,
			_ => V3_FORMAT_FLAGS,
		};

		is_text_frame_id(self.id_str()) && self.flags & format_flags == 0
	}
}

fn is_valid_id_byte(b: u8) -> bool {
	b.is_ascii_uppercase() || b.is_ascii_digit()
}

/// Whether `key` can be written as a text frame
pub(super) fn is_text_frame_id(key: &str) -> bool {
	key.len() == 4 && key.starts_with('T') && key != "TXXX" && key.bytes().all(is_valid_id_byte)
}

/// Split the frame area of a tag into frames
///
/// Returns the frames, and the length of the frame area. Anything past it is padding.
pub(super) fn parse_frames(
	content: &[u8],
	version: Id3v2Version,
	parse_mode: ParsingMode,
) -> Result<(Vec<Frame<'_>>, usize)> {
	let mut frames = Vec::new();
	let mut pos = 0;

	while pos + FRAME_HEADER_LEN <= content.len() {
		let header = &content[pos..pos + FRAME_HEADER_LEN];

		// Padding
		if header[0] == 0 {
			break;
		}

		if !header[..4].iter().copied().all(is_valid_id_byte) {
			if parse_mode == ParsingMode::Strict {
				decode_err!(@BAIL "ID3v2: Found an invalid frame ID");
			}

			log::warn!("Found an invalid frame ID at {pos}, treating the rest of the tag as padding");
			break;
		}

		let raw_size = BigEndian::read_u32(&header[4..8]);
		let size = match version {
			Id3v2Version::V4 => raw_size.unsynch(),
			_ => raw_size,
		};

		let end = pos + FRAME_HEADER_LEN + size as usize;
		if end > content.len() {
			decode_err!(@BAIL "ID3v2: Frame extends past the end of the tag");
		}

		let frame = Frame {
			id: [header[0], header[1], header[2], header[3]],
			flags: BigEndian::read_u16(&header[8..]),
			content: &content[pos + FRAME_HEADER_LEN..end],
		};

		log::trace!("Found frame \"{}\" ({size} bytes)", frame.id_str());

		frames.push(frame);
		pos = end;
	}

	Ok((frames, pos))
}

/// Decode the values of a text frame
///
/// ID3v2.4 separates multiple values with nulls. ID3v2.3 has no real notion of multiple values,
/// so the text is kept whole.
pub(super) fn decode_text_frame(content: &[u8], version: Id3v2Version) -> Result<Vec<String>> {
	let Some((&encoding, text)) = content.split_first() else {
		return Ok(Vec::new());
	};

	let Some(encoding) = TextEncoding::from_u8(encoding) else {
		decode_err!(@BAIL "ID3v2: Found an invalid text encoding");
	};

	if version == Id3v2Version::V3 && matches!(encoding, TextEncoding::UTF16BE | TextEncoding::UTF8) {
		log::warn!("Found an ID3v2.4 text encoding in an ID3v2.3 tag");
	}

	let text = decode_text(text, encoding)?;
	match version {
		Id3v2Version::V4 => Ok(text.split('\0').map(str::to_owned).collect()),
		_ => Ok(vec![text]),
	}
}

/// Encode the content of a text frame
///
/// ID3v2.4 frames are always UTF-8. ID3v2.3 frames are Latin-1 when possible, and UTF-16
/// otherwise.
pub(super) fn encode_text_frame(values: &[&str], version: Id3v2Version) -> Result<Vec<u8>> {
	let (encoding, text) = match version {
		Id3v2Version::V4 => (TextEncoding::UTF8, values.join("\0")),
		_ => {
			let text = values.join("/");
			if TextEncoding::verify_latin1(&text) {
				(TextEncoding::Latin1, text)
			} else {
				(TextEncoding::UTF16, text)
			}
		},
	};

	let mut content = vec![encoding as u8];
	content.extend(encoding.encode(&text)?);
	Ok(content)
}

pub(super) fn write_frame<W>(
	writer: &mut W,
	id: &[u8; 4],
	flags: u16,
	content: &[u8],
	version: Id3v2Version,
) -> Result<()>
where
	W: Write,
{
	let Ok(size) = u32::try_from(content.len()) else {
		err!(TooMuchData);
	};

	let size = match version {
		Id3v2Version::V4 => size.synch()?,
		_ => size,
	};

	writer.write_all(id)?;
	writer.write_u32::<BigEndian>(size)?;
	writer.write_u16::<BigEndian>(flags)?;
	writer.write_all(content)?;

	Ok(())
}
