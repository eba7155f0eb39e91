//! Generic file handling utilities

mod file_type;

pub use file_type::{EXTENSIONS, FileType};

use crate::config::{ParseOptions, WriteOptions};
use crate::error::Result;
use crate::flac::{self, FlacProducer};
use crate::id3v2::{self, Id3v2Producer};
use crate::macros::err;
use crate::mp4::{self, Mp4Producer};
use crate::surgeon::{FileSurgeon, WriteReport};
use crate::tag::TagData;
use crate::zone::ZoneRegistry;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// The result of parsing a file with one of the format collaborators
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ParsedFile {
	/// The format of the file
	pub file_type: FileType,
	/// The tag items read from the file
	pub tag: TagData,
	/// The zones of the file, only available with [`ParseOptions::prepare_for_writing`]
	///
	/// This is `None` if the file uses a layout that can't be edited in place.
	pub registry: Option<ZoneRegistry>,
}

/// Read a file with the collaborator matching its [`FileType`]
///
/// # Errors
///
/// * The file type can't be determined
/// * The file is malformed, see the `read_from` function of each format
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> tag_surgeon::error::Result<()> {
/// use tag_surgeon::config::ParseOptions;
/// use tag_surgeon::file::read_from;
///
/// let mut file = std::fs::File::open("song.flac")?;
/// let parsed = read_from(&mut file, ParseOptions::new())?;
/// # Ok(()) }
/// ```
pub fn read_from<R>(reader: &mut R, parse_options: ParseOptions) -> Result<ParsedFile>
where
	R: Read + Seek,
{
	let start = reader.stream_position()?;

	let mut buffer = [0; 12];
	let read = reader.read(&mut buffer)?;
	reader.seek(std::io::SeekFrom::Start(start))?;

	let Some(file_type) = FileType::from_buffer(&buffer[..read]) else {
		err!(UnknownFormat);
	};

	read_as(reader, file_type, parse_options)
}

fn read_as<R>(reader: &mut R, file_type: FileType, parse_options: ParseOptions) -> Result<ParsedFile>
where
	R: Read + Seek,
{
	log::debug!("Reading file as {file_type:?}");

	match file_type {
		FileType::Flac => flac::read_from(reader, parse_options),
		FileType::Mp4 => mp4::read_from(reader, parse_options),
		FileType::Mpeg => id3v2::read_from(reader, parse_options),
	}
}

/// Read the file at `path`
///
/// The file type is determined by the extension, falling back to the content of the file.
///
/// # Errors
///
/// See [`read_from`]
pub fn read_from_path(path: impl AsRef<Path>, parse_options: ParseOptions) -> Result<ParsedFile> {
	let path = path.as_ref();
	let mut reader = BufReader::new(File::open(path)?);

	match FileType::from_path(path) {
		Some(file_type) => read_as(&mut reader, file_type, parse_options),
		None => read_from(&mut reader, parse_options),
	}
}

/// Write `tag` to the file at `path`
///
/// The file is parsed with [`ParsingMode::Strict`](crate::config::ParsingMode::Strict), and then
/// rewritten through a staged copy, see [`FileSurgeon::rewrite_path`].
///
/// # Errors
///
/// * See [`read_from_path`]
/// * The file uses a layout that can't be edited in place
/// * See [`FileSurgeon::rewrite_path`]
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> tag_surgeon::error::Result<()> {
/// use tag_surgeon::config::{ParseOptions, WriteOptions};
/// use tag_surgeon::file::{read_from_path, write_to_path};
///
/// let mut parsed = read_from_path("song.m4a", ParseOptions::new())?;
/// parsed.tag.insert("\u{a9}nam", "New title");
///
/// write_to_path("song.m4a", &parsed.tag, WriteOptions::default())?;
/// # Ok(()) }
/// ```
pub fn write_to_path(
	path: impl AsRef<Path>,
	tag: &TagData,
	write_options: WriteOptions,
) -> Result<WriteReport> {
	let path = path.as_ref();

	let parsed = read_from_path(
		path,
		ParseOptions::new()
			.parsing_mode(crate::config::ParsingMode::Strict)
			.prepare_for_writing(true),
	)?;

	let Some(registry) = parsed.registry else {
		err!(UnsupportedLayout("The file can't be edited in place"));
	};

	let mut surgeon = FileSurgeon::new(write_options);
	match parsed.file_type {
		FileType::Flac => surgeon.rewrite_path(path, registry, &mut FlacProducer::new(), tag),
		FileType::Mp4 => surgeon.rewrite_path(path, registry, &mut Mp4Producer::new(), tag),
		FileType::Mpeg => surgeon.rewrite_path(path, registry, &mut Id3v2Producer::new(), tag),
	}
}
