use crate::util::{contents, temp_file, verify_items};

use std::io::Write as _;

use tag_surgeon::config::{ParseOptions, ParsingMode, WriteOptions};
use tag_surgeon::error::ErrorKind;
use tag_surgeon::file::{FileType, read_from, read_from_path, write_to_path};
use tag_surgeon::id3v2::{self, FRAMES_ZONE, TAG_ZONE};
use tag_surgeon::tag::TagData;
use tag_surgeon::zone::PADDING_ZONE;

const AUDIO: &[u8] = b"\xFF\xFB\x90\x64 mpeg frame data";
const PICTURE: &[u8] = b"\0image/png\0\x03\0not really a png";

fn synch(n: u32) -> u32 {
	(n & 0x7F) | ((n & 0x3F80) << 1) | ((n & 0x1F_C000) << 2) | ((n & 0x0FE0_0000) << 3)
}

fn unsynch(n: u32) -> u32 {
	(n & 0x7F) | ((n & 0x7F00) >> 1) | ((n & 0x7F_0000) >> 2) | ((n & 0x7F00_0000) >> 3)
}

fn frame(id: &[u8; 4], content: &[u8], version: u8) -> Vec<u8> {
	let size = content.len() as u32;
	let size = if version == 4 { synch(size) } else { size };

	let mut frame = id.to_vec();
	frame.extend(size.to_be_bytes());
	frame.extend([0, 0]);
	frame.extend(content);
	frame
}

// UTF-8 for ID3v2.4, Latin-1 (ASCII only here) for ID3v2.3
fn text_frame(id: &[u8; 4], value: &str, version: u8) -> Vec<u8> {
	let encoding = if version == 4 { 3 } else { 0 };

	let mut content = vec![encoding];
	content.extend(value.as_bytes());
	frame(id, &content, version)
}

fn build(version: u8, flags: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
	let mut content = frames.concat();
	content.resize(content.len() + padding, 0);

	let mut file = b"ID3".to_vec();
	file.extend([version, 0, flags]);
	file.extend(synch(content.len() as u32).to_be_bytes());
	file.extend(content);
	file.extend(AUDIO);
	file
}

fn tag_size(content: &[u8]) -> u32 {
	unsynch(u32::from_be_bytes(content[6..10].try_into().unwrap()))
}

fn writing() -> ParseOptions {
	ParseOptions::new().prepare_for_writing(true)
}

fn verify_file(content: &[u8]) -> TagData {
	assert!(content.ends_with(AUDIO));
	assert_eq!(tag_size(content) as usize, content.len() - 10 - AUDIO.len());

	let mut file = temp_file(content);
	id3v2::read_from(&mut file, ParseOptions::new().parsing_mode(ParsingMode::Strict))
		.unwrap()
		.tag
}

#[test_log::test]
fn read_text_frames() {
	let mut file = temp_file(&build(
		4,
		0,
		&[
			text_frame(b"TIT2", "Foo", 4),
			text_frame(b"TPE1", "Bar\0Baz", 4),
			frame(b"APIC", PICTURE, 4),
		],
		100,
	));

	let parsed = read_from(&mut file, writing()).unwrap();
	assert_eq!(parsed.file_type, FileType::Mpeg);
	verify_items(&parsed.tag, &[("TIT2", "Foo"), ("TPE1", "Bar"), ("TPE1", "Baz")]);

	let registry = parsed.registry.unwrap();
	let names = registry.zones().map(|zone| zone.name()).collect::<Vec<_>>();
	assert_eq!(names, [FRAMES_ZONE, PADDING_ZONE]);
	assert_eq!(registry.get_zone(FRAMES_ZONE).unwrap().items(), 3);
	assert_eq!(registry.get_zone(PADDING_ZONE).unwrap().size(), 100);

	let sizes = registry.dependencies().sizes().collect::<Vec<_>>();
	assert_eq!(sizes.len(), 1);
	assert_eq!(sizes[0].field().location(), 6);
	assert_eq!(sizes[0].zones(), [FRAMES_ZONE, PADDING_ZONE]);
}

#[test_log::test]
fn growth_absorbed_by_padding() {
	let original = build(
		4,
		0,
		&[text_frame(b"TIT2", "Foo", 4), frame(b"APIC", PICTURE, 4)],
		100,
	);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("TIT2", "A longer title");
	tag.push("TPE1", "Foo artist");

	let report = id3v2::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.shifts(), 0);

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len());
	assert_eq!(content[6..10], original[6..10]);

	let tag = verify_file(&content);
	verify_items(&tag, &[("TIT2", "A longer title"), ("TPE1", "Foo artist")]);
	assert!(content.windows(PICTURE.len()).any(|window| window == PICTURE));
}

#[test_log::test]
fn growth_past_padding_resizes_tag() {
	let original = build(4, 0, &[text_frame(b"TIT2", "Foo", 4)], 4);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("TIT2", "A much, much longer title");

	let report = id3v2::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.shifts(), 1);

	let content = contents(&mut file);
	assert!(content.len() > original.len());

	let tag = verify_file(&content);
	verify_items(&tag, &[("TIT2", "A much, much longer title")]);
}

#[test_log::test]
fn id3v23_tag() {
	let original = build(3, 0, &[text_frame(b"TIT2", "Foo", 3)], 32);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("TIT2", "Bär");

	id3v2::write_to(&mut file, &tag, WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert_eq!(content[3], 3);

	let tag = verify_file(&content);
	verify_items(&tag, &[("TIT2", "Bär")]);
}

#[test_log::test]
fn create_tag() {
	let mut file = temp_file(AUDIO);

	let parsed = read_from(&mut file, writing()).unwrap();
	assert_eq!(parsed.file_type, FileType::Mpeg);
	assert!(parsed.registry.unwrap().get_zone(TAG_ZONE).unwrap().is_virtual());

	let mut tag = TagData::new();
	tag.push("TIT2", "Foo");

	id3v2::write_to(&mut file, &tag, WriteOptions::new().preferred_padding(64)).unwrap();

	let content = contents(&mut file);
	assert!(content.starts_with(b"ID3\x04\0\0"));

	// Header, a single frame, and the padding
	assert_eq!(content.len(), 10 + (10 + 4) + 64 + AUDIO.len());

	let tag = verify_file(&content);
	verify_items(&tag, &[("TIT2", "Foo")]);

	let parsed = id3v2::read_from(&mut temp_file(&content), writing()).unwrap();
	assert_eq!(parsed.registry.unwrap().get_zone(PADDING_ZONE).unwrap().size(), 64);
}

#[test_log::test]
fn empty_tag_creates_nothing() {
	let mut file = temp_file(AUDIO);

	id3v2::write_to(&mut file, &TagData::new(), WriteOptions::default()).unwrap();
	assert_eq!(contents(&mut file), AUDIO);
}

#[test_log::test]
fn remove_all_frames() {
	let original = build(
		4,
		0,
		&[text_frame(b"TIT2", "Foo", 4), text_frame(b"TALB", "Bar", 4)],
		10,
	);
	let mut file = temp_file(&original);

	id3v2::write_to(&mut file, &TagData::new(), WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len());

	let tag = verify_file(&content);
	assert!(tag.is_empty());
}

#[test_log::test]
fn unsupported_layouts() {
	// Unsynchronised
	let original = build(4, 0x80, &[text_frame(b"TIT2", "Foo", 4)], 10);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("TIT2", "Bar");

	let err = id3v2::write_to(&mut file, &tag, WriteOptions::default()).unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::UnsupportedLayout(_)));
	assert_eq!(contents(&mut file), original);

	let parsed = id3v2::read_from(&mut file, writing()).unwrap();
	assert!(parsed.tag.is_empty());
	assert!(parsed.registry.is_none());
}

#[test_log::test]
fn second_write_is_identical() {
	let mut file = temp_file(&build(4, 0, &[text_frame(b"TIT2", "Foo", 4)], 0));

	let mut tag = TagData::new();
	tag.push("TIT2", "Bar baz");
	tag.push("TPE1", "Qux");

	id3v2::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	let first = contents(&mut file);

	let report = id3v2::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.bytes_moved(), 0);
	assert_eq!(contents(&mut file), first);
}

#[test_log::test]
fn path_round_trip() {
	let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
	file.write_all(&build(4, 0, &[text_frame(b"TIT2", "Foo", 4)], 64))
		.unwrap();
	file.flush().unwrap();

	let mut parsed = read_from_path(file.path(), ParseOptions::new()).unwrap();
	verify_items(&parsed.tag, &[("TIT2", "Foo")]);

	parsed.tag.insert("TIT2", "Bar");
	write_to_path(file.path(), &parsed.tag, WriteOptions::default()).unwrap();

	let parsed = read_from_path(file.path(), ParseOptions::new()).unwrap();
	verify_items(&parsed.tag, &[("TIT2", "Bar")]);
}
