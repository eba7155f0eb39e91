use super::atom_info::ATOM_HEADER_LEN;
use super::ilst::{build_ilst, write_size};
use super::{CREATE_META, CREATE_UDTA, ILST_ZONE};
use crate::error::Result;
use crate::macros::{encode_err, err, try_vec};
use crate::producer::{WriteResult, WriteSession, ZoneProducer, ZoneRequest};
use crate::tag::TagData;
use crate::zone::PADDING_ZONE;

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

// A metadata handler, required for `meta` atoms in `udta`
const HDLR: [u8; 33] = [
	0x00, 0x00, 0x00, 0x21, // Size
	b'h', b'd', b'l', b'r', // Identifier
	0x00, 0x00, 0x00, 0x00, // Version/flags
	0x00, 0x00, 0x00, 0x00, // Pre-defined
	b'm', b'd', b'i', b'r', // Handler type
	b'a', b'p', b'p', b'l', // Reserved
	0x00, 0x00, 0x00, 0x00, // Reserved
	0x00, 0x00, 0x00, 0x00, // Reserved
	0x00, // Name (empty)
];

/// Produces the zones of an MP4 file
///
/// The `ilst` atom is rebuilt from the tag items, keeping every non-text item (such as cover art)
/// of the original atom. When the file has no `udta` or `meta` atom, the missing hierarchy is
/// created, along with [`WriteOptions::preferred_padding`] bytes of padding in a `free` atom.
///
/// Padding is always a `free` atom directly following `ilst`.
///
/// [`WriteOptions::preferred_padding`]: crate::config::WriteOptions::preferred_padding
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp4Producer;

impl Mp4Producer {
	/// Create a new `Mp4Producer`
	pub fn new() -> Self {
		Self
	}
}

impl ZoneProducer<TagData> for Mp4Producer {
	fn produce(
		&mut self,
		out: &mut Vec<u8>,
		tag: &TagData,
		request: &ZoneRequest<'_>,
		session: &mut WriteSession,
	) -> Result<WriteResult> {
		let zone = request.zone();
		match zone.name() {
			ILST_ZONE => {
				let padding = session.options().preferred_padding.unwrap_or(0) as usize;

				let written = match zone.tag() {
					CREATE_UDTA => produce_udta(out, tag, padding)?,
					CREATE_META => produce_meta(out, tag, padding)?,
					_ => build_ilst(out, tag, ilst_content(request.original()))?,
				};

				if written == 0 {
					out.clear();
				}

				Ok(WriteResult::replace(written))
			},
			PADDING_ZONE => {
				let padding = request.padding_size().unwrap_or(0) as usize;
				if padding < ATOM_HEADER_LEN as usize {
					return Ok(WriteResult::replace(0));
				}

				write_free(out, padding)?;
				Ok(WriteResult::replace(1))
			},
			_ => encode_err!(@BAIL Mp4, "Asked to produce an unknown zone"),
		}
	}
}

// The children of the original `ilst`, if there was one
fn ilst_content(original: &[u8]) -> &[u8] {
	let header_len = match original.get(..4) {
		Some([0, 0, 0, 1]) => ATOM_HEADER_LEN as usize + 8,
		_ => ATOM_HEADER_LEN as usize,
	};

	original.get(header_len..).unwrap_or_default()
}

fn write_free(out: &mut Vec<u8>, len: usize) -> Result<()> {
	let Ok(size) = u32::try_from(len) else {
		err!(TooMuchData);
	};

	out.write_u32::<BigEndian>(size)?;
	out.write_all(b"free")?;
	out.extend(try_vec![0; len - ATOM_HEADER_LEN as usize]);

	Ok(())
}

fn produce_meta(out: &mut Vec<u8>, tag: &TagData, padding: usize) -> Result<u32> {
	let mut ilst = Vec::new();
	let written = build_ilst(&mut ilst, tag, &[])?;
	if written == 0 {
		return Ok(0);
	}

	log::debug!("Creating a \"meta\" atom ({written} items, {padding} bytes of padding)");

	let start = out.len();
	out.write_u32::<BigEndian>(0)?;
	out.write_all(b"meta")?;
	// Version/flags
	out.write_u32::<BigEndian>(0)?;
	out.write_all(&HDLR)?;
	out.extend(ilst);

	if padding >= ATOM_HEADER_LEN as usize {
		write_free(out, padding)?;
	}

	write_size(out, start)?;
	Ok(written)
}

fn produce_udta(out: &mut Vec<u8>, tag: &TagData, padding: usize) -> Result<u32> {
	let start = out.len();
	out.write_u32::<BigEndian>(0)?;
	out.write_all(b"udta")?;

	let written = produce_meta(out, tag, padding)?;
	if written == 0 {
		out.truncate(start);
		return Ok(0);
	}

	write_size(out, start)?;
	Ok(written)
}

#[cfg(test)]
mod tests {
	use super::{HDLR, ilst_content, produce_udta, write_free};
	use crate::tag::TagData;

	#[test_log::test]
	fn hdlr_size() {
		assert_eq!(HDLR.len(), 33);
		assert_eq!(HDLR[3] as usize, HDLR.len());
	}

	#[test_log::test]
	fn extended_ilst_header() {
		assert_eq!(ilst_content(b"\0\0\0\x0Cilstabcd"), b"abcd");
		assert_eq!(
			ilst_content(b"\0\0\0\x01ilst\0\0\0\0\0\0\0\x14abcd"),
			b"abcd"
		);
		assert!(ilst_content(&[]).is_empty());
	}

	#[test_log::test]
	fn free_atom() {
		let mut out = Vec::new();
		write_free(&mut out, 12).unwrap();
		assert_eq!(out, b"\0\0\0\x0Cfree\0\0\0\0");
	}

	#[test_log::test]
	fn udta_hierarchy() {
		let mut tag = TagData::new();
		tag.push("\u{a9}nam", "Foo");

		let mut out = Vec::new();
		let written = produce_udta(&mut out, &tag, 16).unwrap();
		assert_eq!(written, 1);

		// udta > meta (full) > hdlr, ilst, free
		let ilst_len = 8 + 8 + 16 + 3;
		let meta_len = 12 + HDLR.len() + ilst_len + 16;
		assert_eq!(out.len(), 8 + meta_len);

		assert_eq!(&out[4..8], b"udta");
		assert_eq!(u32::from_be_bytes(out[8..12].try_into().unwrap()) as usize, meta_len);
		assert_eq!(&out[12..16], b"meta");
		assert_eq!(&out[20..24], &HDLR[..4]);
		assert_eq!(&out[out.len() - 12..out.len() - 8], b"free");

		let mut empty = Vec::new();
		assert_eq!(produce_udta(&mut empty, &TagData::new(), 16).unwrap(), 0);
		assert!(empty.is_empty());
	}
}
