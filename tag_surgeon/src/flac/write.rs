use super::VORBIS_COMMENTS_ZONE;
use super::block::{
	BLOCK_HEADER_LEN, BLOCK_ID_PADDING, BLOCK_ID_VORBIS_COMMENTS, LAST_BLOCK_FLAG,
	write_block_header,
};
use super::read::is_valid_key;
use crate::error::Result;
use crate::macros::{err, try_vec};
use crate::producer::{WriteResult, WriteSession, ZoneProducer, ZoneRequest};
use crate::tag::TagData;
use crate::zone::{PADDING_ZONE, ZoneRegistry};

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Produces the zones of a FLAC file
///
/// * The Vorbis Comments block is rebuilt from the tag items, keeping its original vendor string
/// * The padding block is resized
/// * Every other block only has its header byte rewritten, to clear the "last block" flag
///
/// Once every zone is committed, the flag is set again on whichever block ended up last.
#[derive(Debug, Clone)]
pub struct FlacProducer {
	vendor: String,
}

impl Default for FlacProducer {
	fn default() -> Self {
		Self {
			vendor: String::from(FlacProducer::DEFAULT_VENDOR),
		}
	}
}

impl FlacProducer {
	/// The vendor string used when creating a Vorbis Comments block
	pub const DEFAULT_VENDOR: &'static str = "tag_surgeon";

	/// Create a new `FlacProducer`
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the vendor string used when creating a Vorbis Comments block
	///
	/// An existing block always keeps its own vendor string.
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::flac::FlacProducer;
	///
	/// let producer = FlacProducer::new().vendor("My tagger 1.0");
	/// ```
	pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
		self.vendor = vendor.into();
		self
	}

	fn produce_comments(&self, out: &mut Vec<u8>, tag: &TagData, original: &[u8]) -> Result<u32> {
		let vendor = match original_vendor(original) {
			Some(vendor) => vendor,
			None => self.vendor.as_bytes().to_vec(),
		};

		let mut content = Vec::new();
		content.write_u32::<LittleEndian>(vendor.len() as u32)?;
		content.write_all(&vendor)?;

		// Filled in once the items are written
		content.write_u32::<LittleEndian>(0)?;

		let mut count = 0_u32;
		for item in tag.items() {
			if item.value().is_empty() {
				continue;
			}

			if !is_valid_key(item.key().as_bytes()) {
				log::warn!("Skipping item \"{}\", not a valid Vorbis Comments key", item.key());
				continue;
			}

			let comment = format!("{}={}", item.key(), item.value());

			let Ok(comment_len) = u32::try_from(comment.len()) else {
				err!(TooMuchData);
			};

			content.write_u32::<LittleEndian>(comment_len)?;
			content.write_all(comment.as_bytes())?;
			count += 1;
		}

		if count == 0 {
			return Ok(0);
		}

		let count_pos = 4 + vendor.len();
		content[count_pos..count_pos + 4].copy_from_slice(&count.to_le_bytes());

		write_block_header(out, BLOCK_ID_VORBIS_COMMENTS, content.len())?;
		out.extend(content);

		Ok(count)
	}
}

fn original_vendor(original: &[u8]) -> Option<Vec<u8>> {
	let content = &mut original.get(BLOCK_HEADER_LEN as usize..)?;

	let vendor_len = content.read_u32::<LittleEndian>().ok()? as usize;
	content.get(..vendor_len).map(<[u8]>::to_vec)
}

impl ZoneProducer<TagData> for FlacProducer {
	fn produce(
		&mut self,
		out: &mut Vec<u8>,
		tag: &TagData,
		request: &ZoneRequest<'_>,
		_session: &mut WriteSession,
	) -> Result<WriteResult> {
		let zone = request.zone();
		match zone.name() {
			VORBIS_COMMENTS_ZONE => {
				let count = self.produce_comments(out, tag, request.original())?;
				Ok(WriteResult::replace(count))
			},
			PADDING_ZONE => {
				let padding = request.padding_size().unwrap_or(0) as usize;
				if padding < BLOCK_HEADER_LEN as usize {
					return Ok(WriteResult::replace(0));
				}

				let content_len = padding - BLOCK_HEADER_LEN as usize;
				write_block_header(out, BLOCK_ID_PADDING, content_len)?;
				out.extend(try_vec![0; content_len]);

				Ok(WriteResult::replace(1))
			},
			// Any other block is kept, only clearing the "last block" flag
			_ => {
				let Some(&header) = request.original().first() else {
					return Ok(WriteResult::replace(0));
				};

				out.push(header & !LAST_BLOCK_FLAG);
				Ok(WriteResult::overwrite_prefix(1))
			},
		}
	}

	fn finish<F>(&mut self, file: &mut F, registry: &ZoneRegistry) -> Result<()>
	where
		F: Read + Write + Seek,
	{
		let last = registry
			.zones()
			.filter(|zone| zone.committed_size().is_some_and(|size| size > 0))
			.last();

		let Some(last) = last else {
			log::warn!("No metadata blocks left in the file");
			return Ok(());
		};

		let Some(offset) = registry.corrected_offset(last.name()) else {
			return Ok(());
		};

		log::trace!("Marking zone \"{}\" as the last block (at {offset})", last.name());

		let offset = offset as u64;
		file.seek(SeekFrom::Start(offset))?;
		let header = file.read_u8()?;

		file.seek(SeekFrom::Start(offset))?;
		file.write_u8(header | LAST_BLOCK_FLAG)?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::{FlacProducer, original_vendor};
	use crate::tag::TagData;

	#[test_log::test]
	fn vendor_is_kept() {
		let original = b"\x84\0\0\x0C\x03\0\0\0abc\0\0\0\0";
		assert_eq!(original_vendor(original).unwrap(), b"abc");
		assert!(original_vendor(b"\x84\0").is_none());

		let mut tag = TagData::new();
		tag.push("TITLE", "Foo");
		tag.push("ARTIST", "");
		tag.push("BAD=KEY", "Bar");

		let mut out = Vec::new();
		let count = FlacProducer::new()
			.produce_comments(&mut out, &tag, original)
			.unwrap();

		assert_eq!(count, 1);
		assert_eq!(
			out,
			b"\x04\0\0\x18\x03\0\0\0abc\x01\0\0\0\x09\0\0\0TITLE=Foo"
		);
	}

	#[test_log::test]
	fn new_block_uses_default_vendor() {
		let mut tag = TagData::new();
		tag.push("TITLE", "Foo");

		let mut out = Vec::new();
		FlacProducer::new()
			.vendor("v")
			.produce_comments(&mut out, &tag, &[])
			.unwrap();

		assert_eq!(&out[4..9], b"\x01\0\0\0v");
	}

	#[test_log::test]
	fn empty_tag_removes_block() {
		let mut out = Vec::new();
		let count = FlacProducer::new()
			.produce_comments(&mut out, &TagData::new(), &[])
			.unwrap();

		assert_eq!(count, 0);
		assert!(out.is_empty());
	}
}
