//! The byte sinks a rewrite can go through
//!
//! [`FileSurgeon::rewrite`](crate::surgeon::FileSurgeon::rewrite) edits a [`FileLike`] in place.
//! Besides random access, committing a zone that changed size needs to know where the sink
//! currently ends, and to cut off the tail left behind once the following bytes moved backwards.
//!
//! Implemented for [`File`], `Cursor<Vec<u8>>`, and mutable references to either.

use crate::error::SurgeonError;

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};

// TODO: Replace with `Seek::stream_len` once https://github.com/rust-lang/rust/issues/59359 is stable
pub(crate) trait SeekStreamLen: Seek {
	fn stream_len_hack(&mut self) -> crate::error::Result<u64> {
		use std::io::SeekFrom;

		let current_pos = self.stream_position()?;
		let len = self.seek(SeekFrom::End(0))?;

		self.seek(SeekFrom::Start(current_pos))?;

		Ok(len)
	}
}

impl<T> SeekStreamLen for T where T: Seek {}

/// Cuts a sink down to a given length
///
/// Called after a shrinking zone pulled the rest of the file backwards. The sink must be exactly
/// `new_len` bytes long afterwards, whatever was past that point is stale.
///
/// # Examples
///
/// ```rust
/// use tag_surgeon::io::Truncate;
///
/// let mut sink = std::io::Cursor::new(vec![1u8, 2, 3, 4, 5]);
/// Truncate::truncate(&mut sink, 3).unwrap();
///
/// assert_eq!(sink.into_inner(), vec![1, 2, 3]);
/// ```
pub trait Truncate {
	/// The error type of the truncation
	type Error: Into<SurgeonError>;

	/// Cut the sink down to `new_len` bytes
	///
	/// # Errors
	///
	/// Depends on the sink, in-memory sinks can't fail.
	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error>;
}

impl Truncate for File {
	type Error = std::io::Error;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		self.set_len(new_len)
	}
}

impl Truncate for Vec<u8> {
	type Error = std::convert::Infallible;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		self.truncate(new_len as usize);
		Ok(())
	}
}

impl<T> Truncate for Cursor<T>
where
	T: Truncate,
{
	type Error = <T as Truncate>::Error;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		self.get_mut().truncate(new_len)
	}
}

impl<T> Truncate for &mut T
where
	T: Truncate,
{
	type Error = <T as Truncate>::Error;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		(**self).truncate(new_len)
	}
}

/// The current length of a sink
///
/// Zones are checked against this before anything is produced, and it is where the tail of the
/// file ends while shifting.
pub trait Length {
	/// The error type of the length query
	type Error: Into<SurgeonError>;

	/// The number of bytes in the sink
	///
	/// # Errors
	///
	/// Depends on the sink, in-memory sinks can't fail.
	fn len(&self) -> std::result::Result<u64, Self::Error>;
}

impl Length for File {
	type Error = std::io::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		self.metadata().map(|m| m.len())
	}
}

impl Length for Vec<u8> {
	type Error = std::convert::Infallible;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Ok(self.len() as u64)
	}
}

impl<T> Length for Cursor<T>
where
	T: Length,
{
	type Error = <T as Length>::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Length::len(self.get_ref())
	}
}

impl<T> Length for &T
where
	T: Length,
{
	type Error = <T as Length>::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Length::len(*self)
	}
}

impl<T> Length for &mut T
where
	T: Length,
{
	type Error = <T as Length>::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Length::len(*self)
	}
}

/// A sink the engine can rewrite in place
///
/// Blanket implemented for anything that is [`Read`], [`Write`], [`Seek`], [`Truncate`], and
/// [`Length`]. A write that fails partway through leaves the sink partially rewritten, use
/// [`FileSurgeon::rewrite_path`](crate::surgeon::FileSurgeon::rewrite_path) when that isn't
/// acceptable.
pub trait FileLike: Read + Write + Seek + Truncate + Length
where
	<Self as Truncate>::Error: Into<SurgeonError>,
	<Self as Length>::Error: Into<SurgeonError>,
{
}

impl<T> FileLike for T
where
	T: Read + Write + Seek + Truncate + Length,
	<T as Truncate>::Error: Into<SurgeonError>,
	<T as Length>::Error: Into<SurgeonError>,
{
}
