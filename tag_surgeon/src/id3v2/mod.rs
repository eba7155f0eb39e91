//! ID3v2 collaborator
//!
//! The tag is split into two zones:
//!
//! * [`FRAMES_ZONE`] - Every frame of the tag
//! * [`PADDING_ZONE`](crate::zone::PADDING_ZONE) - The zeros following the frames
//!
//! The synchsafe tag size in the header depends on both. When a file has no tag, a single virtual
//! [`TAG_ZONE`] is registered at the start of the file, which creates a complete tag.
//!
//! Only ID3v2.3 and ID3v2.4 tags without unsynchronisation, an extended header, or a footer can
//! be edited in place.
//!
//! Tag items are keyed by frame ID (`TIT2`, `TPE1`, ...). Only text frames are read into a
//! [`TagData`], other frames are carried over untouched when writing.

mod frame;
mod header;
mod read;
mod write;

pub use header::Id3v2Version;
pub use write::Id3v2Producer;

pub(crate) use header::skip_id3v2;

use crate::config::{ParseOptions, ParsingMode, WriteOptions};
use crate::error::{Result, SurgeonError};
use crate::file::ParsedFile;
use crate::macros::err;
use crate::surgeon::{FileSurgeon, WriteReport};
use crate::tag::TagData;
use crate::util::io::{FileLike, Length, Truncate};

use std::io::{Read, Seek};

/// The zone holding every frame of an existing tag
pub const FRAMES_ZONE: &str = "id3v2.frames";

/// The virtual zone creating a tag in a file that has none
pub const TAG_ZONE: &str = "id3v2";

/// Read the ID3v2 tag at the current position of `reader`
///
/// # Errors
///
/// * The tag is malformed
/// * The tag can't be edited in place, with [`ParsingMode::Strict`]
///   ([`ErrorKind::UnsupportedLayout`](crate::error::ErrorKind::UnsupportedLayout))
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> tag_surgeon::error::Result<()> {
/// use tag_surgeon::config::ParseOptions;
/// use tag_surgeon::id3v2;
///
/// let mut file = std::fs::File::open("song.mp3")?;
/// let parsed = id3v2::read_from(&mut file, ParseOptions::new())?;
///
/// if let Some(title) = parsed.tag.get("TIT2") {
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

/// Write `tag` to the start of `file`
///
/// The file is parsed again to find its zones, so `file` may be at any position.
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
		err!(UnsupportedLayout("The ID3v2 tag can't be edited in place"));
	};

	FileSurgeon::new(write_options).rewrite(file, registry, &mut Id3v2Producer::new(), tag)
}
