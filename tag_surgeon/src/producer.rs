//! The contract between the engine and the format collaborators
//!
//! A [`ZoneProducer`] serializes the new content of each zone. The engine doesn't know anything
//! about the tag being written, it simply hands it back to the producer along with the zone being
//! processed.
//!
//! # Examples
//!
//! ```rust
//! use tag_surgeon::producer::{WriteResult, produce_fn};
//!
//! // A producer writing a single string into every zone
//! let producer = produce_fn(|out: &mut Vec<u8>, text: &str, _request, _session| {
//! 	out.extend_from_slice(text.as_bytes());
//! 	Ok(WriteResult::replace(1))
//! });
//! ```

use crate::config::WriteOptions;
use crate::error::Result;
use crate::zone::{Zone, ZoneRegistry};

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

/// How the bytes produced for a zone are applied
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WriteMode {
	/// The produced bytes replace the entire zone, which may change size
	Replace,
	/// The produced bytes overwrite the start of the zone, the rest is kept as is
	///
	/// The zone never changes size, so the producer may write at most the original zone size.
	OverwritePrefix,
}

/// The outcome of producing a single zone
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WriteResult {
	pub(crate) mode: WriteMode,
	pub(crate) items_written: u32,
}

impl WriteResult {
	/// The zone is replaced by the produced bytes
	///
	/// Writing 0 items collapses the zone to its [core signature](Zone::core_signature),
	/// regardless of the bytes produced. A [virtual](Zone::is_virtual) zone stays absent.
	pub const fn replace(items_written: u32) -> Self {
		Self {
			mode: WriteMode::Replace,
			items_written,
		}
	}

	/// The start of the zone is overwritten by the produced bytes
	pub const fn overwrite_prefix(items_written: u32) -> Self {
		Self {
			mode: WriteMode::OverwritePrefix,
			items_written,
		}
	}

	/// How the bytes are applied
	pub fn mode(&self) -> WriteMode {
		self.mode
	}

	/// The number of logical items written
	pub fn items_written(&self) -> u32 {
		self.items_written
	}
}

/// Everything a producer gets to know about the zone it is producing
#[derive(Debug, Copy, Clone)]
pub struct ZoneRequest<'a> {
	pub(crate) zone: &'a Zone,
	pub(crate) original: &'a [u8],
	pub(crate) corrected_offset: u64,
	pub(crate) padding_size: Option<u64>,
}

impl<'a> ZoneRequest<'a> {
	/// The zone being produced
	pub fn zone(&self) -> &'a Zone {
		self.zone
	}

	/// The original content of the zone
	pub fn original(&self) -> &'a [u8] {
		self.original
	}

	/// The offset the zone will be written at
	///
	/// This accounts for every zone produced so far. The padding zone is produced after the rest
	/// of its run of adjacent zones, so only the zones following it within that same run assume
	/// it keeps its size. Zones in later runs see its final size.
	pub fn corrected_offset(&self) -> u64 {
		self.corrected_offset
	}

	/// The exact number of bytes to produce for the padding zone
	///
	/// This is only set for the [padding zone](crate::zone::PADDING_ZONE).
	pub fn padding_size(&self) -> Option<u64> {
		self.padding_size
	}
}

/// The running state of a single write
///
/// This allows producers to stay stateless across zones.
#[derive(Debug, Clone)]
pub struct WriteSession {
	options: WriteOptions,
	indices: HashMap<String, u32>,
}

impl WriteSession {
	/// Create a new `WriteSession`
	pub fn new(options: WriteOptions) -> Self {
		Self {
			options,
			indices: HashMap::new(),
		}
	}

	/// The options of the current write
	pub fn options(&self) -> WriteOptions {
		self.options
	}

	/// Get the next value of a named running index, starting at 0
	///
	/// The bundled format producers derive everything from the zone they are handed, this is for
	/// producers that number the structures they emit across zones (pictures, chapters, etc.).
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::config::WriteOptions;
	/// use tag_surgeon::producer::WriteSession;
	///
	/// let mut session = WriteSession::new(WriteOptions::default());
	///
	/// assert_eq!(session.next_index("picture"), 0);
	/// assert_eq!(session.next_index("picture"), 1);
	/// assert_eq!(session.next_index("chapter"), 0);
	/// ```
	pub fn next_index(&mut self, key: &str) -> u32 {
		let index = self.indices.entry(key.to_owned()).or_insert(0);
		let current = *index;
		*index += 1;
		current
	}
}

/// Serializes the content of zones
///
/// `T` is the tag being written, which is opaque to the engine.
pub trait ZoneProducer<T: ?Sized> {
	/// Write the new content of a dynamic zone to `out`
	///
	/// `out` is always empty when this is called.
	///
	/// # Errors
	///
	/// Any error aborts the write before a single byte of the file is modified.
	fn produce(
		&mut self,
		out: &mut Vec<u8>,
		tag: &T,
		request: &ZoneRequest<'_>,
		session: &mut WriteSession,
	) -> Result<WriteResult>;

	/// Called once every zone has been committed, and every reference resolved
	///
	/// This is the place to fix up anything the engine can't know about, such as flags stored
	/// outside of the zones.
	///
	/// # Errors
	///
	/// Depends on the implementor
	fn finish<F>(&mut self, file: &mut F, registry: &ZoneRegistry) -> Result<()>
	where
		F: Read + Write + Seek,
	{
		let _ = (file, registry);
		Ok(())
	}
}

/// A [`ZoneProducer`] created from a closure, see [`produce_fn`]
#[derive(Debug, Clone, Copy)]
pub struct FnProducer<F> {
	f: F,
}

/// Create a [`ZoneProducer`] from a closure
pub fn produce_fn<T, F>(f: F) -> FnProducer<F>
where
	T: ?Sized,
	F: FnMut(&mut Vec<u8>, &T, &ZoneRequest<'_>, &mut WriteSession) -> Result<WriteResult>,
{
	FnProducer { f }
}

impl<T, F> ZoneProducer<T> for FnProducer<F>
where
	T: ?Sized,
	F: FnMut(&mut Vec<u8>, &T, &ZoneRequest<'_>, &mut WriteSession) -> Result<WriteResult>,
{
	fn produce(
		&mut self,
		out: &mut Vec<u8>,
		tag: &T,
		request: &ZoneRequest<'_>,
		session: &mut WriteSession,
	) -> Result<WriteResult> {
		(self.f)(out, tag, request, session)
	}
}
