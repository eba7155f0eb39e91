//! The zone-based rewriting engine
//!
//! A [`FileSurgeon`] takes a populated [`ZoneRegistry`] and a [`ZoneProducer`], and edits the
//! file in place:
//!
//! 1. Every dynamic zone is produced, in physical order, before anything is written. The
//!    [padding zone](crate::zone::PADDING_ZONE) is produced after the rest of its run of adjacent
//!    zones, once it is known how much of their size change it can absorb.
//! 2. Runs of adjacent dynamic zones are committed one at a time. The bytes following the run are
//!    shifted only if its total size changed.
//! 3. Sizes, counters and pointers are patched as soon as the zones they depend on are committed.
//! 4. Post-processing indices are patched once every zone is committed.
//! 5. The producer gets a final look at the file with [`ZoneProducer::finish`].
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> tag_surgeon::error::Result<()> {
//! use tag_surgeon::config::WriteOptions;
//! use tag_surgeon::dependency::Field;
//! use tag_surgeon::producer::{WriteResult, produce_fn};
//! use tag_surgeon::surgeon::FileSurgeon;
//! use tag_surgeon::zone::{Zone, ZoneRegistry};
//!
//! use std::io::Cursor;
//!
//! // A 4 byte big endian size, followed by a text region
//! let mut file = Cursor::new(b"\0\0\0\x05hello, world".to_vec());
//!
//! let mut registry = ZoneRegistry::new();
//! registry.add_zone(Zone::new("text", 4, 5))?;
//! registry.dependencies_mut().add_size(Field::u32_be(0), 5, "text", None);
//!
//! let mut producer = produce_fn(|out: &mut Vec<u8>, text: &str, _request, _session| {
//! 	out.extend_from_slice(text.as_bytes());
//! 	Ok(WriteResult::replace(1))
//! });
//!
//! FileSurgeon::new(WriteOptions::default()).rewrite(&mut file, registry, &mut producer, "goodbye")?;
//!
//! assert_eq!(file.into_inner(), b"\0\0\0\x07goodbye, world");
//! # Ok(()) }
//! ```

#[cfg(feature = "async")]
mod asynchronous;
mod padding;
mod resolve;
mod shift;

#[cfg(feature = "async")]
pub use asynchronous::rewrite_path_async;

use crate::config::WriteOptions;
use crate::error::{ErrorKind, Result, SurgeonError};
use crate::macros::err;
use crate::producer::{WriteMode, WriteSession, ZoneProducer, ZoneRequest};
use crate::util::alloc::read_vec;
use crate::util::io::{FileLike, Length, Truncate};
use crate::zone::{PADDING_ZONE, ZoneRegistry};

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives progress notifications during a write, and may cancel it
pub trait ProgressObserver {
	/// Called after each zone is committed
	///
	/// `committed` counts the zones committed so far, out of `total`.
	fn on_zone_committed(&mut self, zone: &str, committed: usize, total: usize) {
		let _ = (zone, committed, total);
	}

	/// Whether the write should stop
	///
	/// This is checked before every run of adjacent zones is committed. The zones committed up
	/// to that point stay in the file.
	fn should_cancel(&self) -> bool {
		false
	}
}

/// A shareable cancellation flag
///
/// # Examples
///
/// ```rust
/// use tag_surgeon::surgeon::{CancelFlag, ProgressObserver};
///
/// let flag = CancelFlag::new();
/// let handle = flag.clone();
///
/// handle.cancel();
/// assert!(flag.should_cancel());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
	/// Create a new, unset, `CancelFlag`
	pub fn new() -> Self {
		Self::default()
	}

	/// Request cancellation
	pub fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	/// Whether cancellation was requested
	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

impl ProgressObserver for CancelFlag {
	fn should_cancel(&self) -> bool {
		self.is_cancelled()
	}
}

/// The outcome of a successful write
#[derive(Debug, Clone)]
pub struct WriteReport {
	registry: ZoneRegistry,
	bytes_moved: u64,
	shifts: usize,
	original_len: u64,
	final_len: u64,
}

impl WriteReport {
	/// The registry, with every zone committed
	pub fn registry(&self) -> &ZoneRegistry {
		&self.registry
	}

	/// Take the registry out of the report
	pub fn into_registry(self) -> ZoneRegistry {
		self.registry
	}

	/// The number of bytes moved while shifting the file
	pub fn bytes_moved(&self) -> u64 {
		self.bytes_moved
	}

	/// The number of times the file had to be shifted
	pub fn shifts(&self) -> usize {
		self.shifts
	}

	/// The length of the file before the write
	pub fn original_len(&self) -> u64 {
		self.original_len
	}

	/// The length of the file after the write
	pub fn final_len(&self) -> u64 {
		self.final_len
	}
}

struct Produced {
	bytes: Vec<u8>,
	items: u32,
	changed: bool,
}

/// Commits the zones of a [`ZoneRegistry`] to a file
pub struct FileSurgeon<'a> {
	options: WriteOptions,
	observer: Option<&'a mut dyn ProgressObserver>,
}

impl<'a> FileSurgeon<'a> {
	/// Create a new `FileSurgeon`
	pub fn new(options: WriteOptions) -> Self {
		Self {
			options,
			observer: None,
		}
	}

	/// Attach a [`ProgressObserver`]
	pub fn observer(mut self, observer: &'a mut dyn ProgressObserver) -> Self {
		self.observer = Some(observer);
		self
	}

	/// The options used for writing
	pub fn options(&self) -> WriteOptions {
		self.options
	}

	/// Rewrite `file` in place
	///
	/// `registry` must have been built from this exact file. The `tag` is handed to the
	/// `producer` as is.
	///
	/// # Errors
	///
	/// * A reference points to a missing zone ([`ErrorKind::MalformedDependency`]), nothing is
	///   written
	/// * The producer fails, nothing is written
	/// * A new value doesn't fit in its field ([`ErrorKind::FieldOverflow`]), nothing is written
	/// * The write was cancelled ([`ErrorKind::Cancelled`])
	/// * `file` fails while shifting ([`ErrorKind::ShiftIo`]), or any other I/O error. The file
	///   may be left partially written, see [`FileSurgeon::rewrite_path`].
	pub fn rewrite<F, T, P>(
		&mut self,
		file: &mut F,
		mut registry: ZoneRegistry,
		producer: &mut P,
		tag: &T,
	) -> Result<WriteReport>
	where
		F: FileLike,
		SurgeonError: From<<F as Truncate>::Error>,
		SurgeonError: From<<F as Length>::Error>,
		T: ?Sized,
		P: ZoneProducer<T>,
	{
		log::debug!("Rewriting file, {} zones registered", registry.len());

		registry.validate()?;

		let original_len = file.len()?;
		if let Some(zone) = registry.zones().find(|zone| zone.end() > original_len) {
			log::error!(
				"Zone \"{}\" ends at {}, past the end of the file ({original_len})",
				zone.name(),
				zone.end()
			);
			err!(SizeMismatch);
		}

		let segments = segments(&registry);

		log::debug!("Producing zones");
		let produced = self.produce_all(file, &registry, &segments, producer, tag)?;

		// Compute every field up front, so an overflow aborts the write before it starts
		{
			let mut dry_run = registry.clone();
			for (index, produced) in produced.iter().enumerate() {
				let (size, items) = committed_state(&dry_run, index, produced.as_ref());
				dry_run.commit(index, size, items);
			}

			resolve::check_updates(&dry_run.resolve_ready()?)?;
			resolve::check_updates(&dry_run.resolve_deferred()?)?;
		}

		log::debug!("Committing {} segments", segments.len());

		let total = registry.len();
		let mut committed = 0;
		let mut current_len = original_len;
		let mut bytes_moved = 0;
		let mut shifts = 0;

		for segment in &segments {
			if self.observer.as_ref().is_some_and(|o| o.should_cancel()) {
				log::warn!("Write cancelled, {committed} of {total} zones committed");
				err!(Cancelled);
			}

			let start = registry.zone_at(segment.start).offset();
			let old_len = registry.zone_at(segment.end - 1).end() - start;
			let corrected_start = (start as i64 + registry.shift_at(start)) as u64;

			let changed = produced[segment.clone()]
				.iter()
				.flatten()
				.any(|produced| produced.changed);

			if changed {
				let new_len = produced[segment.clone()]
					.iter()
					.flatten()
					.map(|produced| produced.bytes.len() as u64)
					.sum::<u64>();
				let delta = new_len as i64 - old_len as i64;

				if delta != 0 {
					let from = corrected_start + old_len;
					bytes_moved += shift::shift_tail(
						file,
						from,
						delta,
						current_len,
						self.options.shift_buffer_size,
					)
					.map_err(|e| shift_error(e, registry.zone_at(segment.start).name(), from))?;

					current_len = (current_len as i64 + delta) as u64;
					shifts += 1;
				}

				file.seek(SeekFrom::Start(corrected_start))?;
				for produced in produced[segment.clone()].iter().flatten() {
					file.write_all(&produced.bytes)?;
				}
			}

			for index in segment.clone() {
				let (size, items) = committed_state(&registry, index, produced[index].as_ref());
				registry.commit(index, size, items);

				committed += 1;
				if let Some(observer) = self.observer.as_mut() {
					observer.on_zone_committed(registry.zone_at(index).name(), committed, total);
				}
			}

			resolve::write_updates(file, &registry.resolve_ready()?)?;
		}

		log::debug!("Resolving post-processing indices");
		resolve::write_updates(file, &registry.resolve_deferred()?)?;

		producer.finish(file, &registry)?;
		file.flush()?;

		log::debug!(
			"Rewrite complete ({original_len} -> {current_len} bytes, {shifts} shifts, \
			 {bytes_moved} bytes moved)"
		);

		Ok(WriteReport {
			registry,
			bytes_moved,
			shifts,
			original_len,
			final_len: current_len,
		})
	}

	/// Rewrite the file at `path`, through a staged copy
	///
	/// The file is copied to a temporary file in the same directory, which is rewritten and then
	/// persisted over the original. If anything fails, the original file is left untouched.
	///
	/// # Errors
	///
	/// * See [`FileSurgeon::rewrite`]
	/// * The temporary file can't be created, or can't replace the original
	///   ([`ErrorKind::Persist`])
	pub fn rewrite_path<T, P>(
		&mut self,
		path: impl AsRef<Path>,
		registry: ZoneRegistry,
		producer: &mut P,
		tag: &T,
	) -> Result<WriteReport>
	where
		T: ?Sized,
		P: ZoneProducer<T>,
	{
		let path = path.as_ref();
		let directory = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};

		let mut staged = tempfile::NamedTempFile::new_in(directory)?;
		log::debug!(
			"Staging {} at {}",
			path.display(),
			staged.path().display()
		);

		{
			let mut source = File::open(path)?;
			std::io::copy(&mut source, staged.as_file_mut())?;
		}

		let report = self.rewrite(staged.as_file_mut(), registry, producer, tag)?;

		let staged_file = staged.as_file();
		staged_file.sync_all()?;
		staged_file.set_permissions(std::fs::metadata(path)?.permissions())?;

		staged.persist(path)?;

		Ok(report)
	}

	fn produce_all<F, T, P>(
		&self,
		file: &mut F,
		registry: &ZoneRegistry,
		segments: &[Range<usize>],
		producer: &mut P,
		tag: &T,
	) -> Result<Vec<Option<Produced>>>
	where
		F: FileLike,
		T: ?Sized,
		P: ZoneProducer<T>,
	{
		let mut session = WriteSession::new(self.options);
		let mut produced = Vec::with_capacity(registry.len());
		let mut predicted_shift = 0i64;

		let padding_index = registry
			.index_of(PADDING_ZONE)
			.filter(|&index| registry.zone_at(index).is_dynamic());

		for segment in segments {
			let mut padding_shift = None;

			for index in segment.clone() {
				let zone = registry.zone_at(index);
				if !zone.is_dynamic() || Some(index) == padding_index {
					if Some(index) == padding_index {
						padding_shift = Some(predicted_shift);
					}

					produced.push(None);
					continue;
				}

				let original = read_original(file, zone.offset(), zone.size())?;
				let request = ZoneRequest {
					zone,
					original: &original,
					corrected_offset: (zone.offset() as i64 + predicted_shift) as u64,
					padding_size: None,
				};

				let mut out = Vec::new();
				let result = producer.produce(&mut out, tag, &request, &mut session)?;

				let bytes = match result.mode {
					// A placeholder with nothing to write stays absent
					WriteMode::Replace if result.items_written == 0 && zone.is_virtual() => {
						Vec::new()
					},
					WriteMode::Replace if result.items_written == 0 => zone.core_signature().to_vec(),
					WriteMode::Replace => out,
					WriteMode::OverwritePrefix => {
						if out.len() > original.len() {
							log::error!(
								"Producer wrote {} bytes over the {} byte zone \"{}\"",
								out.len(),
								original.len(),
								zone.name()
							);
							err!(SizeMismatch);
						}

						out.extend_from_slice(&original[out.len()..]);
						out
					},
				};

				log::trace!(
					"Produced zone \"{}\" ({} -> {} bytes, {} items)",
					zone.name(),
					zone.size(),
					bytes.len(),
					result.items_written
				);

				predicted_shift += bytes.len() as i64 - zone.size() as i64;
				produced.push(Some(Produced {
					changed: bytes != original,
					bytes,
					items: result.items_written,
				}));
			}

			// The padding is produced once the rest of its run is known, and its own size change
			// carries over to every zone after the run
			if let (Some(padding_index), Some(shift_before)) = (padding_index, padding_shift) {
				let padding = self.produce_padding(
					file,
					registry,
					segment,
					padding_index,
					shift_before,
					&produced,
					producer,
					tag,
					&mut session,
				)?;

				let original_size = registry.zone_at(padding_index).size();
				predicted_shift += padding.bytes.len() as i64 - original_size as i64;
				produced[padding_index] = Some(padding);
			}
		}

		Ok(produced)
	}

	#[allow(clippy::too_many_arguments)]
	fn produce_padding<F, T, P>(
		&self,
		file: &mut F,
		registry: &ZoneRegistry,
		segment: &Range<usize>,
		padding_index: usize,
		shift_before: i64,
		produced: &[Option<Produced>],
		producer: &mut P,
		tag: &T,
		session: &mut WriteSession,
	) -> Result<Produced>
	where
		F: FileLike,
		T: ?Sized,
		P: ZoneProducer<T>,
	{
		let padding = registry.zone_at(padding_index);
		let net_delta = segment
			.clone()
			.filter_map(|index| {
				let zone = registry.zone_at(index);
				produced[index]
					.as_ref()
					.map(|produced| produced.bytes.len() as i64 - zone.size() as i64)
			})
			.sum::<i64>();

		let target = padding::absorb(
			padding.size(),
			net_delta,
			padding.core_signature().len() as u64,
			padding.max_size(),
			&self.options,
		);

		let original = read_original(file, padding.offset(), padding.size())?;
		let (bytes, items) = if target == 0 {
			(Vec::new(), 0)
		} else {
			let request = ZoneRequest {
				zone: padding,
				original: &original,
				corrected_offset: (padding.offset() as i64 + shift_before) as u64,
				padding_size: Some(target),
			};

			let mut out = Vec::new();
			let result = producer.produce(&mut out, tag, &request, session)?;
			if out.len() as u64 != target {
				log::error!(
					"Padding producer wrote {} bytes, expected {target}",
					out.len()
				);
				err!(SizeMismatch);
			}

			(out, result.items_written)
		};

		Ok(Produced {
			changed: bytes != original,
			bytes,
			items,
		})
	}
}

/// Split the zones into runs of adjacent dynamic zones
///
/// Anchors always stand alone.
fn segments(registry: &ZoneRegistry) -> Vec<Range<usize>> {
	let mut segments = Vec::new();

	let mut start = 0;
	for index in 1..=registry.len() {
		let joined = index < registry.len() && {
			let previous = registry.zone_at(index - 1);
			let current = registry.zone_at(index);
			previous.is_dynamic() && current.is_dynamic() && previous.end() == current.offset()
		};

		if !joined {
			segments.push(start..index);
			start = index;
		}
	}

	segments
}

fn committed_state(registry: &ZoneRegistry, index: usize, produced: Option<&Produced>) -> (u64, u32) {
	match produced {
		Some(produced) => (produced.bytes.len() as u64, produced.items),
		None => {
			let zone = registry.zone_at(index);
			(zone.size(), zone.items())
		},
	}
}

fn read_original<F>(file: &mut F, offset: u64, size: u64) -> Result<Vec<u8>>
where
	F: FileLike,
{
	file.seek(SeekFrom::Start(offset))?;
	read_vec(file, size as usize)
}

fn shift_error(error: SurgeonError, zone: &str, offset: u64) -> SurgeonError {
	match error.kind {
		ErrorKind::Io(source) => SurgeonError::new(ErrorKind::ShiftIo {
			zone: zone.to_owned(),
			offset,
			source,
		}),
		kind => SurgeonError::new(kind),
	}
}
