//! Zone-based, in place rewriting of metadata in audio files.
//!
//! Rewriting a tag usually means rewriting the entire file. `tag_surgeon` instead describes a file
//! as a set of **zones**, the byte ranges that may change, along with every **dependent field**
//! (sizes, item counters, offsets) whose value is derived from them. Only the zones are rewritten,
//! the rest of the file is shifted when, and only when, a zone changes size.
//!
//! # Overview
//!
//! * [`zone::ZoneRegistry`] - The zones of a single file, in physical order
//! * [`dependency::DependencyTracker`] - The dependent fields, resolved as zones are committed
//! * [`producer::ZoneProducer`] - Serializes the new content of each zone
//! * [`surgeon::FileSurgeon`] - Produces, commits, shifts, and patches
//!
//! A padding zone, when available, absorbs size changes so the rest of the file doesn't have to
//! move.
//!
//! # Supported formats
//!
//! Three collaborators are bundled, each providing a reader that populates a registry and a
//! producer:
//!
//! | Format | Module     | Editable region           | Dependent fields                      |
//! |--------|------------|---------------------------|---------------------------------------|
//! | FLAC   | [`flac`]   | Vorbis Comments, padding  | None (the "last block" flag)          |
//! | MP4    | [`mp4`]    | `ilst`, `free` padding    | Atom sizes, chunk offsets             |
//! | MP3    | [`id3v2`]  | ID3v2 frames, padding     | The tag size                          |
//!
//! # Examples
//!
//! ## Editing a file
//!
//! ```rust,no_run
//! # fn main() -> tag_surgeon::error::Result<()> {
//! use tag_surgeon::config::{ParseOptions, WriteOptions};
//! use tag_surgeon::file::{read_from_path, write_to_path};
//!
//! let mut parsed = read_from_path("song.flac", ParseOptions::new())?;
//! parsed.tag.insert("TITLE", "Foo title");
//!
//! let report = write_to_path("song.flac", &parsed.tag, WriteOptions::default())?;
//! println!("Moved {} bytes", report.bytes_moved());
//! # Ok(()) }
//! ```
//!
//! ## Using the engine directly
//!
//! ```rust
//! # fn main() -> tag_surgeon::error::Result<()> {
//! use tag_surgeon::config::WriteOptions;
//! use tag_surgeon::dependency::Field;
//! use tag_surgeon::producer::{WriteResult, produce_fn};
//! use tag_surgeon::surgeon::FileSurgeon;
//! use tag_surgeon::zone::{PADDING_ZONE, Zone, ZoneRegistry};
//!
//! use std::io::Cursor;
//!
//! // A size field covering a text region and some padding, followed by data
//! let mut file = Cursor::new(b"\0\0\0\x08abc\0\0\0\0\0DATA".to_vec());
//!
//! let mut registry = ZoneRegistry::new();
//! registry.add_zone(Zone::new("text", 4, 3))?;
//! registry.add_zone(Zone::new(PADDING_ZONE, 7, 5))?;
//! registry.dependencies_mut().add_size(Field::u32_be(0), 8, "text", None);
//! registry.dependencies_mut().add_size(Field::u32_be(0), 8, PADDING_ZONE, None);
//!
//! let mut producer = produce_fn(|out: &mut Vec<u8>, text: &str, request, _session| {
//! 	match request.padding_size() {
//! 		Some(padding) => out.resize(padding as usize, 0),
//! 		None => out.extend_from_slice(text.as_bytes()),
//! 	}
//! 	Ok(WriteResult::replace(1))
//! });
//!
//! let report = FileSurgeon::new(WriteOptions::default()).rewrite(&mut file, registry, &mut producer, "abcdef")?;
//!
//! // The padding shrank, nothing after it had to move
//! assert_eq!(report.bytes_moved(), 0);
//! assert_eq!(file.into_inner(), b"\0\0\0\x08abcdef\0\0DATA");
//! # Ok(()) }
//! ```
//!
//! # Important format-specific notes
//!
//! All formats have their own quirks that may produce unexpected results.
//! Be sure to read the module documentation of each format to see important notes and warnings.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod dependency;
pub mod error;
pub mod file;
pub(crate) mod macros;
pub mod producer;
pub mod surgeon;
pub mod tag;
pub mod zone;
mod util;

pub mod flac;
pub mod id3v2;
pub mod mp4;

pub use util::io;
