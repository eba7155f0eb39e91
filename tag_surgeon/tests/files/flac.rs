use crate::util::{contents, temp_file, verify_items};

use std::io::Write as _;

use tag_surgeon::config::{ParseOptions, ParsingMode, WriteOptions};
use tag_surgeon::error::ErrorKind;
use tag_surgeon::file::{FileType, read_from_path, write_to_path};
use tag_surgeon::flac::{self, FlacProducer, VORBIS_COMMENTS_ZONE};
use tag_surgeon::tag::TagData;
use tag_surgeon::zone::PADDING_ZONE;

const AUDIO: &[u8] = b"\xFF\xF8AUDIO FRAMES";

const STREAMINFO: u8 = 0;
const PADDING: u8 = 1;
const APPLICATION: u8 = 2;
const VORBIS_COMMENTS: u8 = 4;

fn build(blocks: &[(u8, Vec<u8>)]) -> Vec<u8> {
	let mut file = b"fLaC".to_vec();
	for (index, (ty, content)) in blocks.iter().enumerate() {
		let last = if index == blocks.len() - 1 { 0x80 } else { 0 };
		file.push(ty | last);
		file.extend(&(content.len() as u32).to_be_bytes()[1..]);
		file.extend(content);
	}

	file.extend(AUDIO);
	file
}

fn stream_info() -> (u8, Vec<u8>) {
	(STREAMINFO, vec![0; 34])
}

fn comments(vendor: &str, fields: &[&str]) -> (u8, Vec<u8>) {
	let mut content = (vendor.len() as u32).to_le_bytes().to_vec();
	content.extend(vendor.as_bytes());
	content.extend((fields.len() as u32).to_le_bytes());
	for field in fields {
		content.extend((field.len() as u32).to_le_bytes());
		content.extend(field.as_bytes());
	}

	(VORBIS_COMMENTS, content)
}

fn padding(len: usize) -> (u8, Vec<u8>) {
	(PADDING, vec![0; len])
}

fn writing() -> ParseOptions {
	ParseOptions::new().prepare_for_writing(true)
}

// The metadata blocks must still chain up to the audio
fn verify_stream(content: &[u8]) {
	let mut file = temp_file(content);
	flac::read_from(&mut file, ParseOptions::new().parsing_mode(ParsingMode::Strict)).unwrap();

	assert!(content.ends_with(AUDIO));
}

#[test_log::test]
fn read_vorbis_comments() {
	let mut file = temp_file(&build(&[
		stream_info(),
		comments("vendor", &["title=Foo", "ARTIST=Bar"]),
		padding(100),
	]));

	let parsed = flac::read_from(&mut file, writing()).unwrap();
	assert_eq!(parsed.file_type, FileType::Flac);
	verify_items(&parsed.tag, &[("TITLE", "Foo"), ("ARTIST", "Bar")]);

	let registry = parsed.registry.unwrap();
	let names = registry.zones().map(|zone| zone.name()).collect::<Vec<_>>();
	assert_eq!(names, ["block.0", VORBIS_COMMENTS_ZONE, PADDING_ZONE]);
	assert_eq!(registry.get_zone(VORBIS_COMMENTS_ZONE).unwrap().items(), 2);
	assert!(registry.dependencies().is_empty());

	// A block header, and the largest 24-bit length
	assert_eq!(registry.get_zone(PADDING_ZONE).unwrap().max_size(), Some(4 + 0xFF_FFFF));
}

#[test_log::test]
fn read_without_registry() {
	let mut file = temp_file(&build(&[stream_info(), comments("", &["TITLE=Foo"])]));

	let parsed = flac::read_from(&mut file, ParseOptions::new()).unwrap();
	verify_items(&parsed.tag, &[("TITLE", "Foo")]);
	assert!(parsed.registry.is_none());
}

#[test_log::test]
fn growth_absorbed_by_padding() {
	let original = build(&[
		stream_info(),
		comments("vendor", &["TITLE=Foo"]),
		padding(100),
	]);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.insert("TITLE", "A much longer title");
	tag.push("ALBUM", "Baz");

	let report = flac::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.shifts(), 0);

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len());
	verify_stream(&content);

	let parsed = flac::read_from(&mut file, writing()).unwrap();
	verify_items(&parsed.tag, &[("TITLE", "A much longer title"), ("ALBUM", "Baz")]);

	// The padding block is still the last one
	let registry = parsed.registry.unwrap();
	let padding = registry.get_zone(PADDING_ZONE).unwrap();
	assert_eq!(content[padding.offset() as usize], 0x80 | PADDING);
	assert_eq!(content[4], STREAMINFO);
}

#[test_log::test]
fn growth_without_padding_shifts() {
	let original = build(&[stream_info(), comments("vendor", &["TITLE=Foo"])]);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.insert("TITLE", "Foo bar");

	let report = flac::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.shifts(), 1);
	assert_eq!(report.final_len(), original.len() as u64 + 4);

	let content = contents(&mut file);
	verify_stream(&content);

	let parsed = flac::read_from(&mut file, writing()).unwrap();
	verify_items(&parsed.tag, &[("TITLE", "Foo bar")]);

	let registry = parsed.registry.unwrap();
	let comments = registry.get_zone(VORBIS_COMMENTS_ZONE).unwrap();
	assert_eq!(content[comments.offset() as usize], 0x80 | VORBIS_COMMENTS);
	assert!(registry.get_zone(PADDING_ZONE).unwrap().is_virtual());
}

#[test_log::test]
fn vendor_is_retained() {
	let mut file = temp_file(&build(&[
		stream_info(),
		comments("Lavf58.76.100", &["TITLE=Foo"]),
		padding(64),
	]));

	let mut tag = TagData::new();
	tag.push("ARTIST", "Foo artist");

	flac::write_to(&mut file, &tag, WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert!(content.windows(13).any(|window| window == b"Lavf58.76.100"));
}

#[test_log::test]
fn create_comments_in_padding() {
	let original = build(&[stream_info(), padding(200)]);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("TITLE", "Foo");

	flac::write_to(&mut file, &tag, WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len());
	verify_stream(&content);

	let parsed = flac::read_from(&mut file, writing()).unwrap();
	verify_items(&parsed.tag, &[("TITLE", "Foo")]);

	// The new block lands after the padding, and becomes the last block
	let registry = parsed.registry.unwrap();
	let comments = registry.get_zone(VORBIS_COMMENTS_ZONE).unwrap();
	let padding = registry.get_zone(PADDING_ZONE).unwrap();
	assert!(padding.offset() < comments.offset());
	assert_eq!(content[comments.offset() as usize], 0x80 | VORBIS_COMMENTS);
	assert!(content.windows(11).any(|window| window == FlacProducer::DEFAULT_VENDOR.as_bytes()));
}

#[test_log::test]
fn remove_all_items() {
	let original = build(&[
		stream_info(),
		comments("vendor", &["TITLE=Foo", "ARTIST=Bar"]),
		padding(10),
	]);
	let mut file = temp_file(&original);

	flac::write_to(&mut file, &TagData::new(), WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len());
	verify_stream(&content);

	let parsed = flac::read_from(&mut file, writing()).unwrap();
	assert!(parsed.tag.is_empty());

	let registry = parsed.registry.unwrap();
	assert!(registry.get_zone(VORBIS_COMMENTS_ZONE).unwrap().is_virtual());

	// STREAMINFO header, followed by a padding block covering everything up to the audio
	let padding = registry.get_zone(PADDING_ZONE).unwrap();
	assert_eq!(padding.offset(), 4 + 4 + 34);
	assert_eq!(padding.end(), (original.len() - AUDIO.len()) as u64);
}

#[test_log::test]
fn other_blocks_are_kept() {
	let original = build(&[
		stream_info(),
		(APPLICATION, b"abcdsome application data".to_vec()),
		comments("vendor", &["TITLE=Foo"]),
	]);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("TITLE", "Foo");
	tag.push("TITLE", "Bar");

	flac::write_to(&mut file, &tag, WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	verify_stream(&content);

	let parsed = flac::read_from(&mut file, writing()).unwrap();
	verify_items(&parsed.tag, &[("TITLE", "Foo"), ("TITLE", "Bar")]);

	let registry = parsed.registry.unwrap();
	let application = registry.get_zone("block.1").unwrap();
	assert_eq!(application.tag(), u32::from(APPLICATION));
	assert_eq!(content[application.offset() as usize], APPLICATION);
	assert!(content.windows(25).any(|window| window == b"abcdsome application data"));
}

#[test_log::test]
fn second_write_is_identical() {
	let mut file = temp_file(&build(&[
		stream_info(),
		comments("vendor", &["TITLE=Foo"]),
		padding(16),
	]));

	let mut tag = TagData::new();
	tag.push("TITLE", "A title that doesn't fit in the padding");

	flac::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	let first = contents(&mut file);

	let report = flac::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.bytes_moved(), 0);
	assert_eq!(contents(&mut file), first);
}

#[test_log::test]
fn multiple_vorbis_comments() {
	let mut file = temp_file(&build(&[
		stream_info(),
		comments("", &["ARTIST=Artist 1"]),
		comments("", &["ARTIST=Artist 2"]),
	]));

	// Only one block is allowed
	let err = flac::read_from(
		&mut file,
		writing().parsing_mode(ParsingMode::Strict),
	)
	.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::UnsupportedLayout(_)));

	file = temp_file(&contents(&mut file));

	// But by default, the first block is editable and the second one is kept
	let parsed = flac::read_from(&mut file, writing()).unwrap();
	verify_items(&parsed.tag, &[("ARTIST", "Artist 1")]);
	assert!(parsed.registry.unwrap().get_zone("block.2").is_some());
}

#[test_log::test]
fn path_round_trip() {
	let mut file = tempfile::Builder::new().suffix(".flac").tempfile().unwrap();
	file.write_all(&build(&[
		stream_info(),
		comments("vendor", &["TITLE=Foo"]),
		padding(32),
	]))
	.unwrap();
	file.flush().unwrap();

	let mut parsed = read_from_path(file.path(), ParseOptions::new()).unwrap();
	assert_eq!(parsed.file_type, FileType::Flac);

	parsed.tag.insert("TITLE", "Bar");
	parsed.tag.push("GENRE", "Baz");
	write_to_path(file.path(), &parsed.tag, WriteOptions::default()).unwrap();

	let parsed = read_from_path(file.path(), ParseOptions::new()).unwrap();
	verify_items(&parsed.tag, &[("TITLE", "Bar"), ("GENRE", "Baz")]);
}
