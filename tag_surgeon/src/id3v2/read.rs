use super::frame::{decode_text_frame, parse_frames};
use super::header::{HEADER_LEN, Id3v2Header};
use super::{FRAMES_ZONE, TAG_ZONE};
use crate::config::{ParseOptions, ParsingMode};
use crate::dependency::Field;
use crate::error::{ErrorKind, Result, SurgeonError};
use crate::file::{FileType, ParsedFile};
use crate::tag::{TagData, TagItem};
use crate::util::alloc::read_vec;
use crate::zone::{PADDING_ZONE, Zone, ZoneRegistry};

use std::io::{Read, Seek};

pub(crate) fn read_from<R>(reader: &mut R, parse_options: ParseOptions) -> Result<ParsedFile>
where
	R: Read + Seek,
{
	let parse_mode = parse_options.parsing_mode;
	let start = reader.stream_position()?;

	let Some(header) = Id3v2Header::read(reader)? else {
		log::debug!("No ID3v2 tag found");

		let registry = if parse_options.prepare_for_writing {
			let mut registry = ZoneRegistry::new();
			registry.add_zone(Zone::new(TAG_ZONE, start, 0))?;
			Some(registry)
		} else {
			None
		};

		return Ok(ParsedFile {
			file_type: FileType::Mpeg,
			tag: TagData::new(),
			registry,
		});
	};

	if let Some(message) = header.unsupported_layout() {
		if parse_mode == ParsingMode::Strict {
			return Err(SurgeonError::new(ErrorKind::UnsupportedLayout(message)));
		}

		log::warn!("{message}, the tag will not be read");
		return Ok(ParsedFile {
			file_type: FileType::Mpeg,
			tag: TagData::new(),
			registry: None,
		});
	}

	let content = read_vec(reader, header.size as usize)?;
	let (frames, frames_len) = parse_frames(&content, header.version, parse_mode)?;

	let mut tag = TagData::new();
	let mut frame_count = 0;
	for frame in &frames {
		frame_count += 1;
		if !frame.is_editable(header.version) {
			continue;
		}

		match decode_text_frame(frame.content, header.version) {
			Ok(values) => {
				for value in values {
					tag.items.push(TagItem::new(frame.id_str(), value));
				}
			},
			Err(e) if parse_mode == ParsingMode::Relaxed => {
				log::warn!("Unable to decode frame \"{}\", discarding: {e}", frame.id_str());
			},
			Err(e) => return Err(e),
		}
	}

	log::debug!(
		"Read ID3v2.{} tag, {frame_count} frames, {} bytes of padding",
		header.version.major(),
		content.len() - frames_len
	);

	if !parse_options.prepare_for_writing {
		return Ok(ParsedFile {
			file_type: FileType::Mpeg,
			tag,
			registry: None,
		});
	}

	let frames_start = start + HEADER_LEN;
	let frames_end = frames_start + frames_len as u64;
	let tag_end = frames_start + u64::from(header.size);

	let mut registry = ZoneRegistry::new();
	registry.add_zone(
		Zone::new(FRAMES_ZONE, frames_start, frames_len as u64)
			.with_items(frame_count)
			.with_tag(u32::from(header.version.major())),
	)?;
	registry.add_zone(Zone::new(PADDING_ZONE, frames_end, tag_end - frames_end))?;

	let size_field = Field::synchsafe(start + 6);
	let dependencies = registry.dependencies_mut();
	dependencies.add_size(size_field, u64::from(header.size), FRAMES_ZONE, None);
	dependencies.add_size(size_field, u64::from(header.size), PADDING_ZONE, None);

	Ok(ParsedFile {
		file_type: FileType::Mpeg,
		tag,
		registry: Some(registry),
	})
}

#[cfg(test)]
mod tests {
	use super::read_from;
	use crate::config::{ParseOptions, ParsingMode};
	use crate::error::ErrorKind;
	use crate::id3v2::{FRAMES_ZONE, Id3v2Version, TAG_ZONE};
	use crate::id3v2::frame::write_frame;
	use crate::zone::PADDING_ZONE;

	use std::io::Cursor;

	fn tag(version: Id3v2Version, frames: &[(&[u8; 4], &[u8])], padding: usize) -> Vec<u8> {
		let mut content = Vec::new();
		for (id, frame) in frames {
			write_frame(&mut content, id, 0, frame, version).unwrap();
		}
		content.extend(std::iter::repeat_n(0, padding));

		let mut tag = vec![b'I', b'D', b'3', version.major(), 0, 0, 0, 0];
		tag.extend([(content.len() >> 7) as u8 & 0x7F, content.len() as u8 & 0x7F]);
		tag.extend(content);
		tag.extend(b"\xFF\xFB\x90\x00");
		tag
	}

	#[test_log::test]
	fn zones_and_size() {
		let file = tag(
			Id3v2Version::V4,
			&[(b"TIT2", b"\x03Foo"), (b"TPE1", b"\x03Bar\0Baz"), (b"COMM", b"\0eng\0Qux")],
			50,
		);

		let parsed = read_from(
			&mut Cursor::new(file),
			ParseOptions::new().prepare_for_writing(true),
		)
		.unwrap();

		let items = parsed.tag.items().map(|i| (i.key(), i.value())).collect::<Vec<_>>();
		assert_eq!(items, [("TIT2", "Foo"), ("TPE1", "Bar"), ("TPE1", "Baz")]);

		let registry = parsed.registry.unwrap();
		let frames = registry.get_zone(FRAMES_ZONE).unwrap();
		assert_eq!(frames.offset(), 10);
		assert_eq!(frames.items(), 3);
		assert_eq!(frames.tag(), 4);

		let padding = registry.get_zone(PADDING_ZONE).unwrap();
		assert_eq!(padding.offset(), frames.end());
		assert_eq!(padding.size(), 50);

		let size = registry.dependencies().sizes().next().unwrap();
		assert_eq!(size.field().location(), 6);
		assert_eq!(size.original(), frames.size() + 50);
		assert_eq!(size.zones(), [FRAMES_ZONE, PADDING_ZONE]);
	}

	#[test_log::test]
	fn missing_tag_is_virtual() {
		let parsed = read_from(
			&mut Cursor::new(b"\xFF\xFB\x90\x00".to_vec()),
			ParseOptions::new().prepare_for_writing(true),
		)
		.unwrap();

		assert!(parsed.tag.is_empty());

		let registry = parsed.registry.unwrap();
		assert!(registry.get_zone(TAG_ZONE).unwrap().is_virtual());
	}

	#[test_log::test]
	fn unsupported_layouts() {
		let mut file = tag(Id3v2Version::V3, &[(b"TIT2", b"\0Foo")], 0);
		file[5] = 0x80;

		let err = read_from(
			&mut Cursor::new(file.clone()),
			ParseOptions::new()
				.parsing_mode(ParsingMode::Strict)
				.prepare_for_writing(true),
		)
		.unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::UnsupportedLayout(_)));

		let parsed = read_from(
			&mut Cursor::new(file),
			ParseOptions::new().prepare_for_writing(true),
		)
		.unwrap();
		assert!(parsed.registry.is_none());
	}

	#[test_log::test]
	fn relaxed_discards_bad_text() {
		let file = tag(Id3v2Version::V3, &[(b"TIT2", b"\x01\x00\x61"), (b"TALB", b"\0Foo")], 0);

		assert!(read_from(&mut Cursor::new(file.clone()), ParseOptions::new()).is_err());

		let parsed = read_from(
			&mut Cursor::new(file),
			ParseOptions::new().parsing_mode(ParsingMode::Relaxed),
		)
		.unwrap();
		assert_eq!(parsed.tag.len(), 1);
		assert_eq!(parsed.tag.get("TALB"), Some("Foo"));
	}
}
