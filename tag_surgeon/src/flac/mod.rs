//! FLAC collaborator
//!
//! Every metadata block of the file is a zone:
//!
//! * [`VORBIS_COMMENTS_ZONE`] - The Vorbis Comments block
//! * [`PADDING_ZONE`](crate::zone::PADDING_ZONE) - The first padding block
//! * `block.N` - Every other block, where `N` is the index of the block in the stream
//!
//! When the file has no Vorbis Comments or padding block, a virtual zone is registered right after
//! the last block. Since every block is part of the same run of zones, the padding block can
//! absorb size changes from anywhere in the metadata.
//!
//! FLAC has no dependent fields, block sizes are part of the zones themselves. The only thing
//! left to fix up is the "last block" flag, see [`FlacProducer`].
//!
//! ## File notes
//!
//! * A leading ID3v2 tag is skipped, and can't be edited through this module
//! * Only the first Vorbis Comments block can be edited

mod block;
mod read;
mod write;

pub use write::FlacProducer;

use crate::config::{ParseOptions, ParsingMode, WriteOptions};
use crate::error::{Result, SurgeonError};
use crate::file::ParsedFile;
use crate::macros::err;
use crate::surgeon::{FileSurgeon, WriteReport};
use crate::tag::TagData;
use crate::util::io::{FileLike, Length, Truncate};
use crate::zone::{PADDING_ZONE, Zone};

use std::io::{Read, Seek};

/// The zone holding the Vorbis Comments block
pub const VORBIS_COMMENTS_ZONE: &str = "vorbis_comments";

// A padding block header, the smallest possible padding
const PADDING_SIGNATURE: [u8; 4] = [1, 0, 0, 0];

// A padding block can't describe more than a 24-bit length
fn padding_zone(offset: u64, size: u64) -> Zone {
	Zone::new(PADDING_ZONE, offset, size)
		.with_core_signature(PADDING_SIGNATURE)
		.with_max_size(block::BLOCK_HEADER_LEN + block::MAX_BLOCK_LEN as u64)
}

fn block_zone_name(index: usize) -> String {
	format!("block.{index}")
}

/// Read a FLAC stream
///
/// Tag items are keyed by their Vorbis Comments field name, which are always uppercase.
///
/// # Errors
///
/// * The stream is malformed
/// * The stream has multiple Vorbis Comments blocks, with [`ParsingMode::Strict`]
///   ([`ErrorKind::UnsupportedLayout`](crate::error::ErrorKind::UnsupportedLayout))
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> tag_surgeon::error::Result<()> {
/// use tag_surgeon::config::ParseOptions;
/// use tag_surgeon::flac;
///
/// let mut file = std::fs::File::open("song.flac")?;
/// let parsed = flac::read_from(&mut file, ParseOptions::new().prepare_for_writing(true))?;
///
/// let registry = parsed.registry.expect("registry was requested");
/// assert!(registry.get_zone(flac::VORBIS_COMMENTS_ZONE).is_some());
/// # Ok(()) }
/// ```
pub fn read_from<R>(reader: &mut R, parse_options: ParseOptions) -> Result<ParsedFile>
where
	R: Read + Seek,
{
	read::read_from(reader, parse_options)
}

/// Write `tag` to a FLAC stream
///
/// # Errors
///
/// * See [`read_from`], the stream is always parsed with [`ParsingMode::Strict`]
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
		err!(UnsupportedLayout("The FLAC stream can't be edited in place"));
	};

	FileSurgeon::new(write_options).rewrite(file, registry, &mut FlacProducer::new(), tag)
}
