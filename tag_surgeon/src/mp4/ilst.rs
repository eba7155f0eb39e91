//! In-memory handling of `ilst` children

use super::atom_info::ATOM_HEADER_LEN;
use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{decode_err, err};
use crate::tag::{TagData, TagItem};
use crate::util::text::{latin1_decode, latin1_encode};

use std::io::Write;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

const DATA_HEADER_LEN: usize = ATOM_HEADER_LEN as usize + 8;

/// The `data` type indicator of UTF-8 text
const UTF8_TYPE: u32 = 1;

/// An item atom, borrowed from the `ilst` content
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ItemAtom<'a> {
	pub(super) ident: [u8; 4],
	/// The entire atom, including its header
	pub(super) raw: &'a [u8],
	/// `(type indicator, value)` of every `data` child
	pub(super) data: Vec<(u32, &'a [u8])>,
}

impl ItemAtom<'_> {
	/// Whether this atom only holds text, which is read into, and written from, the tag items
	pub(super) fn is_text(&self) -> bool {
		&self.ident != b"----"
			&& !self.data.is_empty()
			&& self.data.iter().all(|(ty, _)| *ty == UTF8_TYPE)
	}
}

/// Split an atom list into `(ident, atom bytes, content bytes)`
fn split_atoms(content: &[u8]) -> Result<Vec<([u8; 4], &[u8], &[u8])>> {
	let mut atoms = Vec::new();

	let mut pos = 0;
	while pos + ATOM_HEADER_LEN as usize <= content.len() {
		let raw_len = BigEndian::read_u32(&content[pos..]);
		let ident = [
			content[pos + 4],
			content[pos + 5],
			content[pos + 6],
			content[pos + 7],
		];

		let (len, header_len) = match raw_len {
			0 => (content.len() - pos, ATOM_HEADER_LEN as usize),
			1 => {
				if pos + 16 > content.len() {
					err!(SizeMismatch);
				}

				let len = BigEndian::read_u64(&content[pos + 8..]);
				(usize::try_from(len).unwrap_or(usize::MAX), 16)
			},
			len => (len as usize, ATOM_HEADER_LEN as usize),
		};

		if len < header_len || pos.checked_add(len).is_none_or(|end| end > content.len()) {
			decode_err!(@BAIL Mp4, "Found an `ilst` item with an invalid length");
		}

		atoms.push((ident, &content[pos..pos + len], &content[pos + header_len..pos + len]));
		pos += len;
	}

	Ok(atoms)
}

/// Parse the children of an `ilst` atom (excluding its header)
pub(super) fn parse_items(content: &[u8]) -> Result<Vec<ItemAtom<'_>>> {
	let mut items = Vec::new();
	for (ident, raw, item_content) in split_atoms(content)? {
		let mut data = Vec::new();
		for (child, _, child_content) in split_atoms(item_content)? {
			if &child != b"data" {
				continue;
			}

			if child_content.len() < DATA_HEADER_LEN - ATOM_HEADER_LEN as usize {
				decode_err!(@BAIL Mp4, "Found a `data` atom that is too short");
			}

			// Version (1), type indicator (3), locale (4)
			let ty = BigEndian::read_u32(child_content) & 0x00FF_FFFF;
			data.push((ty, &child_content[8..]));
		}

		items.push(ItemAtom { ident, raw, data });
	}

	Ok(items)
}

/// Read the text items of an `ilst` atom
pub(super) fn read_text_items(content: &[u8], parse_mode: ParsingMode) -> Result<Vec<TagItem>> {
	let mut tag_items = Vec::new();
	for item in parse_items(content)? {
		if !item.is_text() {
			continue;
		}

		let key = latin1_decode(&item.ident);
		for (_, value) in &item.data {
			match std::str::from_utf8(value) {
				Ok(value) => tag_items.push(TagItem::new(key.clone(), value)),
				Err(_) if parse_mode == ParsingMode::Relaxed => {
					log::warn!("Non UTF-8 value found in \"{key}\", discarding");
				},
				Err(_) => decode_err!(@BAIL Mp4, "Found a text item that isn't valid UTF-8"),
			}
		}
	}

	Ok(tag_items)
}

/// Build a complete `ilst` atom
///
/// Text items are written first, grouped by key. Every non-text atom of `original_content`
/// follows, untouched. Returns the number of item atoms written.
pub(super) fn build_ilst(out: &mut Vec<u8>, tag: &TagData, original_content: &[u8]) -> Result<u32> {
	log::debug!("Building `ilst` atom");

	let start = out.len();
	out.write_u32::<BigEndian>(0)?;
	out.write_all(b"ilst")?;

	let mut written = 0;

	let mut keys = Vec::new();
	for item in tag.items() {
		if !keys.contains(&item.key()) {
			keys.push(item.key());
		}
	}

	for key in keys {
		let Some(ident) = latin1_encode(key).and_then(|ident| <[u8; 4]>::try_from(ident).ok())
		else {
			log::warn!("Skipping item \"{key}\", not a valid atom identifier");
			continue;
		};

		let item_start = out.len();
		out.write_u32::<BigEndian>(0)?;
		out.write_all(&ident)?;

		for value in tag.get_all(key) {
			let Ok(data_len) = u32::try_from(DATA_HEADER_LEN + value.len()) else {
				err!(TooMuchData);
			};

			out.write_u32::<BigEndian>(data_len)?;
			out.write_all(b"data")?;
			out.write_u32::<BigEndian>(UTF8_TYPE)?;
			// Locale
			out.write_u32::<BigEndian>(0)?;
			out.write_all(value.as_bytes())?;
		}

		write_size(out, item_start)?;
		written += 1;
	}

	for item in parse_items(original_content)? {
		if item.is_text() {
			continue;
		}

		out.write_all(item.raw)?;
		written += 1;
	}

	write_size(out, start)?;
	Ok(written)
}

/// Patch the 32-bit size of the atom starting at `start`, which ends at the end of `out`
pub(super) fn write_size(out: &mut [u8], start: usize) -> Result<()> {
	let Ok(len) = u32::try_from(out.len() - start) else {
		err!(TooMuchData);
	};

	BigEndian::write_u32(&mut out[start..start + 4], len);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::{build_ilst, parse_items, read_text_items};
	use crate::config::ParsingMode;
	use crate::tag::TagData;

	fn data_atom(ty: u8, value: &[u8]) -> Vec<u8> {
		let mut atom = ((16 + value.len()) as u32).to_be_bytes().to_vec();
		atom.extend(b"data\0\0\0");
		atom.push(ty);
		atom.extend([0; 4]);
		atom.extend(value);
		atom
	}

	fn item_atom(ident: &[u8; 4], data: &[Vec<u8>]) -> Vec<u8> {
		let content = data.concat();
		let mut atom = ((8 + content.len()) as u32).to_be_bytes().to_vec();
		atom.extend(ident);
		atom.extend(content);
		atom
	}

	#[test_log::test]
	fn text_and_binary_items() {
		let content = [
			item_atom(b"\xA9nam", &[data_atom(1, b"Foo")]),
			item_atom(b"covr", &[data_atom(13, b"\xFF\xD8")]),
			item_atom(b"\xA9ART", &[data_atom(1, b"Bar"), data_atom(1, b"Baz")]),
		]
		.concat();

		let items = parse_items(&content).unwrap();
		assert_eq!(items.len(), 3);
		assert!(items[0].is_text());
		assert!(!items[1].is_text());

		let text = read_text_items(&content, ParsingMode::Strict).unwrap();
		let text = text.iter().map(|i| (i.key(), i.value())).collect::<Vec<_>>();
		assert_eq!(
			text,
			[("\u{a9}nam", "Foo"), ("\u{a9}ART", "Bar"), ("\u{a9}ART", "Baz")]
		);
	}

	#[test_log::test]
	fn rebuild_keeps_binary_items() {
		let cover = item_atom(b"covr", &[data_atom(13, b"\xFF\xD8")]);
		let original = [item_atom(b"\xA9nam", &[data_atom(1, b"Old")]), cover.clone()].concat();

		let mut tag = TagData::new();
		tag.push("\u{a9}nam", "New");
		tag.push("toolong", "Ignored");

		let mut out = Vec::new();
		let written = build_ilst(&mut out, &tag, &original).unwrap();
		assert_eq!(written, 2);

		let expected = [
			item_atom(b"\xA9nam", &[data_atom(1, b"New")]),
			cover,
		]
		.concat();

		assert_eq!(&out[4..8], b"ilst");
		assert_eq!(out.len(), 8 + expected.len());
		assert_eq!(&out[8..], &expected[..]);
	}

	#[test_log::test]
	fn truncated_item() {
		let mut content = item_atom(b"\xA9nam", &[data_atom(1, b"Foo")]);
		content.truncate(content.len() - 1);

		assert!(parse_items(&content).is_err());
	}
}
