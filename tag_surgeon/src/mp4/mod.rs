//! MP4 collaborator
//!
//! Only the metadata item list is editable, through the following zones:
//!
//! * [`ILST_ZONE`] - The `moov.udta.meta.ilst` atom
//! * [`PADDING_ZONE`](crate::zone::PADDING_ZONE) - A `free` atom directly following `ilst`
//! * `mdat.N` and `moof.N` - Anchors for the media data, never rewritten
//!
//! Growing or shrinking `ilst` changes the size of every atom above it, and moves the media data
//! when `moov` comes first. The chunk offsets (`stco`/`co64`) and fragment base data offsets
//! (`tfhd`) pointing into the media are tracked, and corrected once everything is written.
//!
//! When the file has no `ilst`, `meta` or `udta` atom, the missing atoms are created.
//!
//! ## File notes
//!
//! * Only text items are read, every other item is kept as is when writing
//! * Item keys are the atom identifiers, decoded as Latin-1 (`©nam`, `aART`, ...)
//! * Freeform (`----`) items are never editable

mod atom_info;
mod ilst;
mod read;
mod write;

pub use write::Mp4Producer;

use crate::config::{ParseOptions, ParsingMode, WriteOptions};
use crate::error::{Result, SurgeonError};
use crate::file::ParsedFile;
use crate::macros::err;
use crate::surgeon::{FileSurgeon, WriteReport};
use crate::tag::TagData;
use crate::util::io::{FileLike, Length, Truncate};

use std::io::{Read, Seek};

/// The zone holding the `ilst` atom
pub const ILST_ZONE: &str = "ilst";

// Zone tags of a virtual `ilst`, marking the atoms that need to be created around it
const CREATE_META: u32 = 1;
const CREATE_UDTA: u32 = 2;

// The smallest possible `ilst` and `free` atoms
const EMPTY_ILST: [u8; 8] = *b"\0\0\0\x08ilst";
const EMPTY_FREE: [u8; 8] = *b"\0\0\0\x08free";

/// Read an MP4 file
///
/// # Errors
///
/// * The file is malformed, or has no `moov` atom
/// * With [`ParsingMode::Strict`], a media offset points outside of the media data
///   ([`ErrorKind::UnsupportedLayout`](crate::error::ErrorKind::UnsupportedLayout)). Other modes
///   read the file, without a registry.
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> tag_surgeon::error::Result<()> {
/// use tag_surgeon::config::ParseOptions;
/// use tag_surgeon::mp4;
///
/// let mut file = std::fs::File::open("song.m4a")?;
/// let parsed = mp4::read_from(&mut file, ParseOptions::new())?;
///
/// if let Some(title) = parsed.tag.get("\u{a9}nam") {
/// 	println!("Title: {title}");
/// }
/// # Ok(()) }
/// ```
pub fn read_from<R>(reader: &mut R, parse_options: ParseOptions) -> Result<ParsedFile>
where
	R: Read + Seek,
{
	read::read_from(reader, parse_options)
}

/// Write `tag` to an MP4 file
///
/// # Errors
///
/// * See [`read_from`], the file is always parsed with [`ParsingMode::Strict`]
/// * See [`FileSurgeon::rewrite`]
pub fn write_to<F>(file: &mut F, tag: &TagData, write_options: WriteOptions) -> Result<WriteReport>
where
	F: FileLike,
	SurgeonError: From<<F as Truncate>::Error>,
	SurgeonError: From<<F as Length>::Error>,
{
	file.rewind()?;

	let parsed = read_from(
		file,
		ParseOptions::new()
			.parsing_mode(ParsingMode::Strict)
			.prepare_for_writing(true),
	)?;

	let Some(registry) = parsed.registry else {
		err!(UnsupportedLayout("The MP4 file can't be edited in place"));
	};

	FileSurgeon::new(write_options).rewrite(file, registry, &mut Mp4Producer::new(), tag)
}
