use super::block::{BLOCK_ID_PADDING, BLOCK_ID_STREAMINFO, BLOCK_ID_VORBIS_COMMENTS, Block};
use super::{VORBIS_COMMENTS_ZONE, block_zone_name, padding_zone};
use crate::config::{ParseOptions, ParsingMode};
use crate::error::{ErrorKind, Result, SurgeonError};
use crate::file::{FileType, ParsedFile};
use crate::id3v2::skip_id3v2;
use crate::macros::{decode_err, err, parse_mode_choice};
use crate::tag::{TagData, TagItem};
use crate::util::alloc::read_vec;
use crate::zone::{Zone, ZoneRegistry};

use std::io::{Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};

pub(super) fn verify_flac<R>(data: &mut R) -> Result<Block>
where
	R: Read + Seek,
{
	let mut marker = [0; 4];
	data.read_exact(&mut marker)?;

	if &marker != b"fLaC" {
		decode_err!(@BAIL Flac, "File missing \"fLaC\" stream marker");
	}

	let block = Block::read(data, |_| false)?;

	if block.ty != BLOCK_ID_STREAMINFO {
		decode_err!(@BAIL Flac, "File missing mandatory STREAMINFO block");
	}

	log::debug!("File verified to be FLAC");
	Ok(block)
}

pub(crate) fn read_from<R>(data: &mut R, parse_options: ParseOptions) -> Result<ParsedFile>
where
	R: Read + Seek,
{
	let parse_mode = parse_options.parsing_mode;
	let prepare_for_writing = parse_options.prepare_for_writing;

	// It is possible for a FLAC file to contain an ID3v2 tag
	if skip_id3v2(data)?.is_some() {
		log::warn!("Encountered an ID3v2 tag. This tag cannot be rewritten to the FLAC file!");
	}

	let stream_info = verify_flac(data)?;
	if stream_info.len() < 18 {
		decode_err!(@BAIL Flac, "File has an invalid STREAMINFO block size (< 18)");
	}

	let mut tag = TagData::new();
	let mut registry = ZoneRegistry::new();

	let mut has_comments = false;
	let mut has_padding = false;

	let mut last_block = stream_info.last;
	let mut metadata_end = stream_info.end;

	if prepare_for_writing {
		registry.add_zone(block_zone(0, &stream_info))?;
	}

	let mut index = 0;
	while !last_block {
		index += 1;

		let block = Block::read(data, |ty| ty == BLOCK_ID_VORBIS_COMMENTS && !has_comments)?;

		last_block = block.last;
		metadata_end = block.end;

		let zone = match block.ty {
			BLOCK_ID_VORBIS_COMMENTS if !has_comments => {
				log::debug!("Encountered a Vorbis Comments block, parsing");
				has_comments = true;

				let (vendor, count, items) = read_comments(&block.content, parse_mode)?;
				log::trace!("Vendor string: \"{vendor}\", {count} comments");

				tag.items.extend(items);
				Zone::new(VORBIS_COMMENTS_ZONE, block.start, block.len()).with_items(count)
			},
			BLOCK_ID_VORBIS_COMMENTS => {
				if parse_mode == ParsingMode::Strict {
					return Err(SurgeonError::new(ErrorKind::UnsupportedLayout(
						"Streams are only allowed one Vorbis Comments block per stream",
					)));
				}

				log::warn!("Found multiple Vorbis Comments blocks, only the first one is editable");
				block_zone(index, &block)
			},
			BLOCK_ID_PADDING if !has_padding => {
				has_padding = true;
				padding_zone(block.start, block.len())
			},
			_ => block_zone(index, &block),
		};

		if prepare_for_writing {
			registry.add_zone(zone)?;
		}
	}

	log::debug!("Read {} metadata blocks, ending at {metadata_end}", index + 1);

	if !prepare_for_writing {
		return Ok(ParsedFile {
			file_type: FileType::Flac,
			tag,
			registry: None,
		});
	}

	// Missing structures are inserted right after the last block
	if !has_comments {
		registry.add_zone(Zone::new(VORBIS_COMMENTS_ZONE, metadata_end, 0))?;
	}

	if !has_padding {
		registry.add_zone(padding_zone(metadata_end, 0))?;
	}

	Ok(ParsedFile {
		file_type: FileType::Flac,
		tag,
		registry: Some(registry),
	})
}

fn block_zone(index: usize, block: &Block) -> Zone {
	Zone::new(block_zone_name(index), block.start, block.len()).with_tag(u32::from(block.ty))
}

/// Read the content of a Vorbis Comments block
///
/// Returns the vendor string, the number of comments in the block, and the comments that could
/// be read. Keys are uppercased.
pub(super) fn read_comments(
	content: &[u8],
	parse_mode: ParsingMode,
) -> Result<(String, u32, Vec<TagItem>)> {
	let data = &mut &*content;

	let vendor_len = data.read_u32::<LittleEndian>()?;
	if vendor_len as usize > data.len() {
		err!(SizeMismatch);
	}

	let vendor = match String::from_utf8(read_vec(data, vendor_len as usize)?) {
		Ok(vendor) => vendor,
		Err(e) => {
			if parse_mode == ParsingMode::Strict {
				return Err(e.into());
			}

			log::warn!("FLAC vendor string is not valid UTF-8");
			String::from_utf8_lossy(e.as_bytes()).into_owned()
		},
	};

	let number_of_items = data.read_u32::<LittleEndian>()?;
	if number_of_items as usize > data.len() >> 2 {
		err!(SizeMismatch);
	}

	let mut items = Vec::with_capacity(number_of_items as usize);
	for _ in 0..number_of_items {
		let comment_len = data.read_u32::<LittleEndian>()?;
		if comment_len as usize > data.len() {
			err!(SizeMismatch);
		}

		let comment = read_vec(data, comment_len as usize)?;

		// KEY=VALUE
		let mut comment_split = comment.splitn(2, |b| *b == b'=');
		let (Some(key), Some(value)) = (comment_split.next(), comment_split.next()) else {
			log::warn!("No separator found in field, discarding");
			continue;
		};

		if !is_valid_key(key) {
			parse_mode_choice!(
				parse_mode,
				STRICT: decode_err!(@BAIL Flac, "Vorbis Comments contain an invalid key"),
				DEFAULT: {
					log::warn!("Found an invalid key, discarding the field");
					continue;
				}
			);
		}

		let value = match String::from_utf8(value.to_vec()) {
			Ok(value) => value,
			Err(e) => {
				if parse_mode == ParsingMode::Relaxed {
					log::warn!("Non UTF-8 value found, discarding field");
					continue;
				}

				return Err(e.into());
			},
		};

		let key = String::from_utf8_lossy(key).to_ascii_uppercase();
		items.push(TagItem::new(key, value));
	}

	Ok((vendor, number_of_items, items))
}

/// Keys are ASCII 0x20 through 0x7D, excluding '='
pub(super) fn is_valid_key(key: &[u8]) -> bool {
	!key.is_empty() && key.iter().all(|b| (0x20..=0x7D).contains(b) && *b != b'=')
}
