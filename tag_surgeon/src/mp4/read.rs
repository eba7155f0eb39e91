use super::atom_info::{ATOM_HEADER_LEN, AtomInfo, FULL_ATOM_SIZE};
use super::ilst::{parse_items, read_text_items};
use super::{CREATE_META, CREATE_UDTA, EMPTY_FREE, EMPTY_ILST, ILST_ZONE};
use crate::config::{ParseOptions, ParsingMode};
use crate::dependency::Field;
use crate::error::{ErrorKind, Result, SurgeonError};
use crate::file::{FileType, ParsedFile};
use crate::macros::decode_err;
use crate::tag::TagData;
use crate::util::alloc::read_vec;
use crate::util::io::SeekStreamLen;
use crate::zone::{PADDING_ZONE, Zone, ZoneRegistry};

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

// Atoms that need to be descended into to find chunk offsets
const OFFSET_CONTAINERS: [&[u8; 4]; 6] = [b"trak", b"mdia", b"minf", b"stbl", b"moof", b"traf"];

// `tfhd` flag signalling a base data offset
const BASE_DATA_OFFSET_PRESENT: u32 = 0x01;

#[derive(Default)]
struct Layout {
	moov: Option<AtomInfo>,
	udta: Option<AtomInfo>,
	meta: Option<AtomInfo>,
	ilst: Option<AtomInfo>,
	ilst_items: u32,
	// A `free` atom directly following `ilst`
	free: Option<AtomInfo>,
	// `mdat` and `moof` atoms, which media offsets point into
	anchors: Vec<(String, AtomInfo)>,
	// Chunk offsets and base data offsets, with their original values
	offsets: Vec<(Field, u64)>,
}

pub(crate) fn read_from<R>(data: &mut R, parse_options: ParseOptions) -> Result<ParsedFile>
where
	R: Read + Seek,
{
	let parse_mode = parse_options.parsing_mode;

	let file_end = data.stream_len_hack()?;

	let Some(ftyp) = AtomInfo::read(data, file_end, parse_mode)? else {
		decode_err!(@BAIL Mp4, "File missing \"ftyp\" atom");
	};

	if &ftyp.ident != b"ftyp" {
		decode_err!(@BAIL Mp4, "File missing \"ftyp\" atom");
	}

	log::debug!("File verified to be MP4");
	data.seek(SeekFrom::Start(ftyp.end()))?;

	let mut tag = TagData::new();
	let mut layout = Layout::default();

	let mut mdat_count = 0;
	let mut moof_count = 0;
	while let Some(atom) = AtomInfo::read(data, file_end, parse_mode)? {
		match &atom.ident {
			b"moov" if layout.moov.is_none() => {
				read_moov(data, &atom, &mut layout, &mut tag, parse_mode)?;
				layout.moov = Some(atom.clone());
			},
			b"moov" => log::warn!("Found multiple \"moov\" atoms, only the first one is used"),
			b"mdat" => {
				layout
					.anchors
					.push((format!("mdat.{mdat_count}"), atom.clone()));
				mdat_count += 1;
			},
			b"moof" => {
				read_offsets(data, &atom, &mut layout.offsets, parse_mode)?;
				layout
					.anchors
					.push((format!("moof.{moof_count}"), atom.clone()));
				moof_count += 1;
			},
			_ => {},
		}

		data.seek(SeekFrom::Start(atom.end()))?;
	}

	let Some(moov) = layout.moov.clone() else {
		decode_err!(@BAIL Mp4, "No \"moov\" atom found");
	};

	if !parse_options.prepare_for_writing {
		return Ok(ParsedFile {
			file_type: FileType::Mp4,
			tag,
			registry: None,
		});
	}

	let registry = match build_registry(&layout, &moov) {
		Ok(registry) => Some(registry),
		Err(e)
			if matches!(e.kind(), ErrorKind::UnsupportedLayout(_))
				&& parse_mode != ParsingMode::Strict =>
		{
			log::warn!("The file can't be edited in place: {e}");
			None
		},
		Err(e) => return Err(e),
	};

	Ok(ParsedFile {
		file_type: FileType::Mp4,
		tag,
		registry,
	})
}

// Collect the children of an atom, leaving the reader at an unspecified position
fn children<R>(
	data: &mut R,
	content_start: u64,
	parent_end: u64,
	parse_mode: ParsingMode,
) -> Result<Vec<AtomInfo>>
where
	R: Read + Seek,
{
	let mut atoms = Vec::new();

	data.seek(SeekFrom::Start(content_start))?;
	while let Some(atom) = AtomInfo::read(data, parent_end, parse_mode)? {
		data.seek(SeekFrom::Start(atom.end()))?;
		atoms.push(atom);
	}

	Ok(atoms)
}

fn read_moov<R>(
	data: &mut R,
	moov: &AtomInfo,
	layout: &mut Layout,
	tag: &mut TagData,
	parse_mode: ParsingMode,
) -> Result<()>
where
	R: Read + Seek,
{
	for atom in children(data, moov.content_start(), moov.end(), parse_mode)? {
		match &atom.ident {
			b"udta" if layout.udta.is_none() => {
				read_udta(data, &atom, layout, tag, parse_mode)?;
				layout.udta = Some(atom);
			},
			b"trak" => read_offsets(data, &atom, &mut layout.offsets, parse_mode)?,
			_ => {},
		}
	}

	Ok(())
}

fn read_udta<R>(
	data: &mut R,
	udta: &AtomInfo,
	layout: &mut Layout,
	tag: &mut TagData,
	parse_mode: ParsingMode,
) -> Result<()>
where
	R: Read + Seek,
{
	let atoms = children(data, udta.content_start(), udta.end(), parse_mode)?;
	if let Some(meta) = atoms.into_iter().find(|atom| &atom.ident == b"meta") {
		read_meta(data, &meta, layout, tag, parse_mode)?;
		layout.meta = Some(meta);
	}

	Ok(())
}

fn read_meta<R>(
	data: &mut R,
	meta: &AtomInfo,
	layout: &mut Layout,
	tag: &mut TagData,
	parse_mode: ParsingMode,
) -> Result<()>
where
	R: Read + Seek,
{
	let content_start = if meta_is_full(data, meta)? {
		meta.content_start() + (FULL_ATOM_SIZE - ATOM_HEADER_LEN)
	} else {
		log::warn!("Found a \"meta\" atom without version and flags");
		meta.content_start()
	};

	let atoms = children(data, content_start, meta.end(), parse_mode)?;
	let Some(position) = atoms.iter().position(|atom| &atom.ident == b"ilst") else {
		return Ok(());
	};

	let ilst = &atoms[position];

	data.seek(SeekFrom::Start(ilst.content_start()))?;
	let content = read_vec(data, (ilst.end() - ilst.content_start()) as usize)?;

	let items = read_text_items(&content, parse_mode)?;
	log::debug!("Read {} text items from \"ilst\"", items.len());
	tag.items.extend(items);

	layout.ilst_items = parse_items(&content)?.len() as u32;

	if let Some(next) = atoms.get(position + 1) {
		if &next.ident == b"free" && next.start == ilst.end() {
			layout.free = Some(next.clone());
		}
	}

	layout.ilst = Some(ilst.clone());
	Ok(())
}

// `meta` is a full atom, though QuickTime files omit the version and flags
fn meta_is_full<R>(data: &mut R, meta: &AtomInfo) -> Result<bool>
where
	R: Read + Seek,
{
	if meta.end() < meta.content_start() + 4 {
		return Ok(false);
	}

	data.seek(SeekFrom::Start(meta.content_start()))?;
	Ok(data.read_u32::<BigEndian>()? == 0)
}

fn read_offsets<R>(
	data: &mut R,
	parent: &AtomInfo,
	offsets: &mut Vec<(Field, u64)>,
	parse_mode: ParsingMode,
) -> Result<()>
where
	R: Read + Seek,
{
	for atom in children(data, parent.content_start(), parent.end(), parse_mode)? {
		match &atom.ident {
			b"stco" => read_chunk_offsets(data, &atom, Field::u32_be, 4, offsets)?,
			b"co64" => read_chunk_offsets(data, &atom, Field::u64_be, 8, offsets)?,
			b"tfhd" => read_base_data_offset(data, &atom, offsets)?,
			ident if OFFSET_CONTAINERS.contains(&ident) => {
				read_offsets(data, &atom, offsets, parse_mode)?;
			},
			_ => {},
		}
	}

	Ok(())
}

fn read_chunk_offsets<R>(
	data: &mut R,
	atom: &AtomInfo,
	field: fn(u64) -> Field,
	width: u64,
	offsets: &mut Vec<(Field, u64)>,
) -> Result<()>
where
	R: Read + Seek,
{
	// Version (1), flags (3), entry count (4)
	let entries_start = atom.content_start() + 8;
	if entries_start > atom.end() {
		decode_err!(@BAIL Mp4, "Found a chunk offset table that is too short");
	}

	data.seek(SeekFrom::Start(atom.content_start() + 4))?;
	let count = u64::from(data.read_u32::<BigEndian>()?);

	if entries_start + count * width > atom.end() {
		decode_err!(@BAIL Mp4, "Found a chunk offset table with too many entries");
	}

	log::trace!(
		"Found {count} chunk offsets in \"{}\"",
		atom.ident.escape_ascii()
	);

	for index in 0..count {
		let field = field(entries_start + index * width);
		let value = field.format().read_from(data)?;
		offsets.push((field, value));
	}

	Ok(())
}

fn read_base_data_offset<R>(
	data: &mut R,
	atom: &AtomInfo,
	offsets: &mut Vec<(Field, u64)>,
) -> Result<()>
where
	R: Read + Seek,
{
	if atom.content_start() + 4 > atom.end() {
		decode_err!(@BAIL Mp4, "Found a \"tfhd\" atom that is too short");
	}

	data.seek(SeekFrom::Start(atom.content_start()))?;
	let flags = data.read_u32::<BigEndian>()? & 0x00FF_FFFF;
	if flags & BASE_DATA_OFFSET_PRESENT == 0 {
		return Ok(());
	}

	// Version and flags (4), track ID (4)
	let location = atom.content_start() + 8;
	if location + 8 > atom.end() {
		decode_err!(@BAIL Mp4, "Found a \"tfhd\" atom that is too short");
	}

	data.seek(SeekFrom::Start(location))?;

	let field = Field::u64_be(location);
	let value = field.format().read_from(data)?;
	offsets.push((field, value));

	Ok(())
}

fn size_field(atom: &AtomInfo) -> Field {
	if atom.extended {
		return Field::u64_be(atom.start + 8);
	}

	Field::u32_be(atom.start)
}

fn build_registry(layout: &Layout, moov: &AtomInfo) -> Result<ZoneRegistry> {
	let mut ancestors = vec![("moov", moov)];
	if let Some(udta) = &layout.udta {
		ancestors.push(("udta", udta));

		if let Some(meta) = &layout.meta {
			ancestors.push(("meta", meta));
		}
	}

	if ancestors.iter().any(|(_, atom)| atom.to_eof) {
		return Err(SurgeonError::new(ErrorKind::UnsupportedLayout(
			"Atoms extending to the end of the file can't be resized",
		)));
	}

	let mut registry = ZoneRegistry::new();

	let has_padding = match (&layout.udta, &layout.meta, &layout.ilst) {
		(_, _, Some(ilst)) => {
			registry.add_zone(
				Zone::new(ILST_ZONE, ilst.start, ilst.len)
					.with_items(layout.ilst_items)
					.with_core_signature(EMPTY_ILST),
			)?;

			let padding = match &layout.free {
				Some(free) => Zone::new(PADDING_ZONE, free.start, free.len),
				None => Zone::new(PADDING_ZONE, ilst.end(), 0),
			};
			registry.add_zone(padding.with_core_signature(EMPTY_FREE))?;
			true
		},
		(_, Some(meta), None) => {
			log::debug!("No \"ilst\" atom found, it will be created in \"meta\"");
			registry.add_zone(Zone::new(ILST_ZONE, meta.end(), 0))?;
			registry.add_zone(Zone::new(PADDING_ZONE, meta.end(), 0).with_core_signature(EMPTY_FREE))?;
			true
		},
		(Some(udta), None, None) => {
			log::debug!("No \"meta\" atom found, it will be created in \"udta\"");
			registry.add_zone(Zone::new(ILST_ZONE, udta.end(), 0).with_tag(CREATE_META))?;
			false
		},
		(None, _, None) => {
			log::debug!("No \"udta\" atom found, it will be created in \"moov\"");
			registry.add_zone(Zone::new(ILST_ZONE, moov.end(), 0).with_tag(CREATE_UDTA))?;
			false
		},
	};

	for (name, atom) in &layout.anchors {
		registry.add_zone(Zone::new(name.clone(), atom.start, atom.len).anchor())?;
	}

	let dependencies = registry.dependencies_mut();
	for (key, atom) in &ancestors {
		let field = size_field(atom);

		dependencies.add_size(field, atom.len, ILST_ZONE, Some(key));
		if has_padding {
			dependencies.add_size(field, atom.len, PADDING_ZONE, Some(key));
		}
	}

	for (field, value) in &layout.offsets {
		let Some((target, _)) = layout
			.anchors
			.iter()
			.find(|(_, atom)| atom.start <= *value && *value < atom.end())
		else {
			log::error!("Media offset {value} (at {}) points outside of the media data", field.location());
			return Err(SurgeonError::new(ErrorKind::UnsupportedLayout(
				"Found a media offset outside of any \"mdat\" or \"moof\" atom",
			)));
		};

		dependencies.add_post_processing_index(*field, *value, false, target.clone(), ILST_ZONE, None, None);
	}

	Ok(registry)
}
