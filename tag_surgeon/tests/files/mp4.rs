use crate::util::{contents, find, read_u32, temp_file, verify_items};

use tag_surgeon::config::{ParseOptions, ParsingMode, WriteOptions};
use tag_surgeon::file::{FileType, read_from};
use tag_surgeon::mp4::{self, ILST_ZONE};
use tag_surgeon::tag::TagData;
use tag_surgeon::zone::PADDING_ZONE;

const MEDIA: &[u8] = b"media data, chunk 1 | chunk 2";
const COVER: &[u8] = b"\xFF\xD8\xFF\xE0 not really a jpeg";

fn atom(ident: &[u8; 4], content: &[u8]) -> Vec<u8> {
	let mut atom = ((8 + content.len()) as u32).to_be_bytes().to_vec();
	atom.extend(ident);
	atom.extend(content);
	atom
}

// The same atom, with a 64-bit size
fn extended(ident: &[u8; 4], content: &[u8]) -> Vec<u8> {
	let mut atom = 1_u32.to_be_bytes().to_vec();
	atom.extend(ident);
	atom.extend((16 + content.len() as u64).to_be_bytes());
	atom.extend(content);
	atom
}

fn data_item(ident: &[u8; 4], ty: u8, value: &[u8]) -> Vec<u8> {
	let mut data = vec![0, 0, 0, ty, 0, 0, 0, 0];
	data.extend(value);
	atom(ident, &atom(b"data", &data))
}

fn text_item(ident: &[u8; 4], value: &str) -> Vec<u8> {
	data_item(ident, 1, value.as_bytes())
}

fn cover() -> Vec<u8> {
	data_item(b"covr", 13, COVER)
}

fn udta(items: &[Vec<u8>], free: usize) -> Vec<u8> {
	let mut hdlr = vec![0; 8];
	hdlr.extend(b"mdirappl");
	hdlr.extend([0; 9]);

	let mut meta = vec![0; 4];
	meta.extend(atom(b"hdlr", &hdlr));
	meta.extend(atom(b"ilst", &items.concat()));
	if free > 0 {
		meta.extend(atom(b"free", &vec![0; free - 8]));
	}

	atom(b"udta", &atom(b"meta", &meta))
}

fn trak() -> Vec<u8> {
	// Two chunks, patched once the position of the media is known
	let mut stco = vec![0; 4];
	stco.extend(2_u32.to_be_bytes());
	stco.extend([0; 8]);

	atom(
		b"trak",
		&atom(b"mdia", &atom(b"minf", &atom(b"stbl", &atom(b"stco", &stco)))),
	)
}

fn build(udta: Option<Vec<u8>>, moov_first: bool, extended_moov: bool) -> Vec<u8> {
	let ftyp = atom(b"ftyp", b"M4A \0\0\0\0M4A isom");

	let mut moov_content = atom(b"mvhd", &[0; 100]);
	moov_content.extend(trak());
	if let Some(udta) = udta {
		moov_content.extend(udta);
	}

	let moov = if extended_moov {
		extended(b"moov", &moov_content)
	} else {
		atom(b"moov", &moov_content)
	};
	let mdat = atom(b"mdat", MEDIA);

	let mut file = if moov_first {
		[ftyp, moov, mdat].concat()
	} else {
		[ftyp, mdat, moov].concat()
	};

	let media = (find(&file, b"mdat") + 4) as u32;
	let entries = find(&file, b"stco") + 12;
	file[entries..entries + 4].copy_from_slice(&media.to_be_bytes());
	file[entries + 4..entries + 8].copy_from_slice(&(media + 12).to_be_bytes());

	file
}

fn writing() -> ParseOptions {
	ParseOptions::new().prepare_for_writing(true)
}

// Every atom size must still add up, and the chunk offsets must still point at the media
fn verify_file(content: &[u8]) -> TagData {
	let mut file = temp_file(content);
	let parsed = mp4::read_from(&mut file, ParseOptions::new().parsing_mode(ParsingMode::Strict)).unwrap();

	let media = find(content, b"mdat") + 4;
	let entries = find(content, b"stco") + 12;
	assert_eq!(read_u32(content, entries), media as u32);
	assert_eq!(read_u32(content, entries + 4), media as u32 + 12);
	assert_eq!(&content[media..media + MEDIA.len()], MEDIA);

	parsed.tag
}

#[test_log::test]
fn read_text_items() {
	let mut file = temp_file(&build(
		Some(udta(
			&[text_item(b"\xA9nam", "Foo"), cover(), text_item(b"\xA9ART", "Bar")],
			64,
		)),
		true,
		false,
	));

	let parsed = read_from(&mut file, writing()).unwrap();
	assert_eq!(parsed.file_type, FileType::Mp4);
	verify_items(&parsed.tag, &[("\u{a9}nam", "Foo"), ("\u{a9}ART", "Bar")]);

	let registry = parsed.registry.unwrap();
	let names = registry.zones().map(|zone| zone.name()).collect::<Vec<_>>();
	assert_eq!(names, [ILST_ZONE, PADDING_ZONE, "mdat.0"]);
	assert_eq!(registry.get_zone(ILST_ZONE).unwrap().items(), 3);
	assert_eq!(registry.get_zone(PADDING_ZONE).unwrap().size(), 64);

	// moov, udta and meta sizes, plus two chunk offsets
	assert_eq!(registry.dependencies().sizes().count(), 3);
	assert_eq!(registry.dependencies().post_processing_indices().count(), 2);
}

#[test_log::test]
fn growth_absorbed_by_free() {
	let original = build(
		Some(udta(&[text_item(b"\xA9nam", "Foo"), cover()], 64)),
		true,
		false,
	);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.insert("\u{a9}nam", "Foo bar baz");

	let report = mp4::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.shifts(), 0);

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len());
	assert_eq!(find(&content, b"mdat"), find(&original, b"mdat"));

	let tag = verify_file(&content);
	verify_items(&tag, &[("\u{a9}nam", "Foo bar baz")]);

	// Binary items are kept
	assert!(content.windows(COVER.len()).any(|window| window == COVER));
}

#[test_log::test]
fn growth_past_free_moves_media() {
	let original = build(Some(udta(&[text_item(b"\xA9nam", "Foo")], 16)), true, false);
	let mut file = temp_file(&original);

	let title = "A".repeat(100);
	let mut tag = TagData::new();
	tag.push("\u{a9}nam", title.as_str());
	tag.push("\u{a9}alb", "Album");

	let report = mp4::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.shifts(), 1);

	let content = contents(&mut file);
	assert!(find(&content, b"mdat") > find(&original, b"mdat"));

	let tag = verify_file(&content);
	verify_items(&tag, &[("\u{a9}nam", title.as_str()), ("\u{a9}alb", "Album")]);
}

#[test_log::test]
fn extended_moov_size() {
	let original = build(Some(udta(&[text_item(b"\xA9nam", "Foo")], 0)), true, true);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("\u{a9}nam", "Foo bar");

	mp4::write_to(&mut file, &tag, WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len() + 4);

	// The 32-bit size is untouched, the 64-bit size follows the identifier
	let moov = find(&content, b"moov") - 4;
	assert_eq!(read_u32(&content, moov), 1);
	let moov_len = u64::from_be_bytes(content[moov + 8..moov + 16].try_into().unwrap());
	assert_eq!(moov_len as usize, content.len() - moov - (8 + MEDIA.len()));

	let tag = verify_file(&content);
	verify_items(&tag, &[("\u{a9}nam", "Foo bar")]);
}

#[test_log::test]
fn media_before_moov() {
	let original = build(Some(udta(&[text_item(b"\xA9nam", "Foo")], 0)), false, false);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("\u{a9}nam", "A longer title");

	mp4::write_to(&mut file, &tag, WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert_eq!(find(&content, b"mdat"), find(&original, b"mdat"));

	let tag = verify_file(&content);
	verify_items(&tag, &[("\u{a9}nam", "A longer title")]);
}

#[test_log::test]
fn create_udta() {
	let original = build(None, true, false);
	let mut file = temp_file(&original);

	let parsed = mp4::read_from(&mut file, writing()).unwrap();
	assert!(parsed.registry.unwrap().get_zone(ILST_ZONE).unwrap().is_virtual());

	let mut tag = TagData::new();
	tag.push("\u{a9}nam", "Foo");

	mp4::write_to(&mut file, &tag, WriteOptions::new().preferred_padding(256)).unwrap();

	let content = contents(&mut file);

	// udta, meta (full), hdlr, ilst with a single item, and the padding
	let ilst_len = 8 + 8 + 16 + 3;
	assert_eq!(content.len(), original.len() + 8 + 12 + 33 + ilst_len + 256);

	let tag = verify_file(&content);
	verify_items(&tag, &[("\u{a9}nam", "Foo")]);

	// The new padding is picked up on the next read
	let parsed = mp4::read_from(&mut temp_file(&content), writing()).unwrap();
	assert_eq!(parsed.registry.unwrap().get_zone(PADDING_ZONE).unwrap().size(), 256);
}

#[test_log::test]
fn create_meta() {
	let original = build(Some(atom(b"udta", &atom(b"name", b"Track"))), true, false);
	let mut file = temp_file(&original);

	let mut tag = TagData::new();
	tag.push("\u{a9}ART", "Foo");

	mp4::write_to(&mut file, &tag, WriteOptions::new().preferred_padding(0)).unwrap();

	let content = contents(&mut file);
	let tag = verify_file(&content);
	verify_items(&tag, &[("\u{a9}ART", "Foo")]);

	// The existing child of udta comes first
	assert!(find(&content, b"name") < find(&content, b"meta"));
}

#[test_log::test]
fn empty_tag_writes_nothing_new() {
	let original = build(None, true, false);
	let mut file = temp_file(&original);

	let report = mp4::write_to(&mut file, &TagData::new(), WriteOptions::default()).unwrap();
	assert_eq!(report.bytes_moved(), 0);
	assert_eq!(contents(&mut file), original);
}

#[test_log::test]
fn remove_text_items() {
	let original = build(
		Some(udta(&[text_item(b"\xA9nam", "Foo"), cover()], 32)),
		true,
		false,
	);
	let mut file = temp_file(&original);

	mp4::write_to(&mut file, &TagData::new(), WriteOptions::default()).unwrap();

	let content = contents(&mut file);
	assert_eq!(content.len(), original.len());

	let tag = verify_file(&content);
	assert!(tag.is_empty());
	assert!(content.windows(COVER.len()).any(|window| window == COVER));
}

#[test_log::test]
fn second_write_is_identical() {
	let mut file = temp_file(&build(Some(udta(&[text_item(b"\xA9nam", "Foo")], 0)), true, false));

	let mut tag = TagData::new();
	tag.push("\u{a9}nam", "Bar");
	tag.push("\u{a9}day", "2024");

	mp4::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	let first = contents(&mut file);

	let report = mp4::write_to(&mut file, &tag, WriteOptions::default()).unwrap();
	assert_eq!(report.bytes_moved(), 0);
	assert_eq!(contents(&mut file), first);
}
