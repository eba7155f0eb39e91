//! Contains the errors that can arise within tag_surgeon
//!
//! The primary error is [`SurgeonError`]. The type of error is determined by [`ErrorKind`],
//! which can be extended at any time.

use crate::file::FileType;

use std::collections::TryReserveError;
use std::fmt::{Debug, Display, Formatter};

/// Alias for `Result<T, SurgeonError>`
pub type Result<T> = std::result::Result<T, SurgeonError>;

/// The types of errors that can occur
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	// Engine errors
	/// A reference points to a zone that doesn't exist in the registry
	///
	/// This is an internal invariant violation on the side of the format collaborator, the
	/// entire write is aborted.
	MalformedDependency(String),
	/// The byte sink failed while shifting the data following a zone
	///
	/// The file may be left partially written. The zone name and the absolute byte offset at
	/// which the shift started are provided so the caller can decide what to do with it.
	ShiftIo {
		/// The name of the first zone of the segment being committed
		zone: String,
		/// The offset at which the shift started
		offset: u64,
		/// The underlying error
		source: std::io::Error,
	},
	/// A layout was encountered that can't be expressed as a set of zones
	UnsupportedLayout(&'static str),
	/// Attempted to register a zone that overlaps an existing one
	OverlappingZones(String),
	/// Attempted to store a value that doesn't fit in a dependent field
	FieldOverflow {
		/// The absolute location of the field
		location: u64,
		/// The value that didn't fit
		value: i64,
	},
	/// The write was cancelled through a [`ProgressObserver`](crate::surgeon::ProgressObserver)
	Cancelled,

	// File data related errors
	/// Unable to guess the format
	UnknownFormat,
	/// Attempting to read/write an abnormally large amount of data
	TooMuchData,
	/// Expected the data to be a different size than provided
	///
	/// This occurs when a producer writes a zone with a size it isn't allowed to, or when a size
	/// read from a file is either too big or small to be valid within the bounds of that item.
	SizeMismatch,
	/// Errors that occur while decoding a file
	FileDecoding(FileDecodingError),
	/// Errors that occur while encoding a file
	FileEncoding(FileEncodingError),
	/// Errors that arise while decoding text
	TextDecode(&'static str),

	// Conversions for external errors
	/// Unable to convert bytes to a String
	StringFromUtf8(std::string::FromUtf8Error),
	/// Represents all cases of [`std::io::Error`].
	Io(std::io::Error),
	/// Failure to allocate enough memory
	Alloc(TryReserveError),
	/// Failure to persist a staged temporary file over the original
	Persist(tempfile::PersistError),
	/// This should **never** be encountered
	Infallible(std::convert::Infallible),
}

/// An error that arises while decoding a file
pub struct FileDecodingError {
	format: Option<FileType>,
	description: &'static str,
}

impl FileDecodingError {
	/// Create a `FileDecodingError` from a [`FileType`] and description
	#[must_use]
	pub const fn new(format: FileType, description: &'static str) -> Self {
		Self {
			format: Some(format),
			description,
		}
	}

	/// Create a `FileDecodingError` without binding it to a [`FileType`]
	pub fn from_description(description: &'static str) -> Self {
		Self {
			format: None,
			description,
		}
	}

	/// Returns the associated [`FileType`], if one exists
	pub fn format(&self) -> Option<FileType> {
		self.format
	}

	/// Returns the error description
	pub fn description(&self) -> &str {
		self.description
	}
}

impl Debug for FileDecodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {:?}", format, self.description)
		} else {
			write!(f, "{:?}", self.description)
		}
	}
}

impl Display for FileDecodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {}", format, self.description)
		} else {
			write!(f, "{}", self.description)
		}
	}
}

/// An error that arises while encoding a file
pub struct FileEncodingError {
	format: Option<FileType>,
	description: &'static str,
}

impl FileEncodingError {
	/// Create a `FileEncodingError` from a [`FileType`] and description
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::error::FileEncodingError;
	/// use tag_surgeon::file::FileType;
	///
	/// // This error is bounded to `FileType::Flac`, which will be displayed when the error is formatted
	/// let flac_error = FileEncodingError::new(FileType::Flac, "Something went wrong in the FLAC file!");
	/// ```
	#[must_use]
	pub const fn new(format: FileType, description: &'static str) -> Self {
		Self {
			format: Some(format),
			description,
		}
	}

	/// Create a `FileEncodingError` without binding it to a [`FileType`]
	pub fn from_description(description: &'static str) -> Self {
		Self {
			format: None,
			description,
		}
	}

	/// Returns the associated [`FileType`], if one exists
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::error::FileEncodingError;
	/// use tag_surgeon::file::FileType;
	///
	/// let flac_error = FileEncodingError::new(FileType::Flac, "Something went wrong in the FLAC file!");
	///
	/// assert_eq!(flac_error.format(), Some(FileType::Flac));
	/// ```
	pub fn format(&self) -> Option<FileType> {
		self.format
	}

	/// Returns the error description
	pub fn description(&self) -> &str {
		self.description
	}
}

impl Debug for FileEncodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {:?}", format, self.description)
		} else {
			write!(f, "{:?}", self.description)
		}
	}
}

impl Display for FileEncodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(format) = self.format {
			write!(f, "{:?}: {}", format, self.description)
		} else {
			write!(f, "{}", self.description)
		}
	}
}

/// Errors that could occur within tag_surgeon
pub struct SurgeonError {
	pub(crate) kind: ErrorKind,
}

impl SurgeonError {
	/// Create a `SurgeonError` from an [`ErrorKind`]
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::error::{ErrorKind, SurgeonError};
	///
	/// let cancelled = SurgeonError::new(ErrorKind::Cancelled);
	/// ```
	#[must_use]
	pub const fn new(kind: ErrorKind) -> Self {
		Self { kind }
	}

	/// Returns the [`ErrorKind`]
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::error::{ErrorKind, SurgeonError};
	///
	/// let cancelled = SurgeonError::new(ErrorKind::Cancelled);
	/// if let ErrorKind::Cancelled = cancelled.kind() {
	/// 	println!("Nothing was written past the last committed zone");
	/// }
	/// ```
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	/// Whether this error is an internal invariant violation
	///
	/// These are never caused by the file contents, and indicate a bug in the format collaborator
	/// that registered the zones.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self.kind,
			ErrorKind::MalformedDependency(_) | ErrorKind::OverlappingZones(_)
		)
	}

	pub(crate) fn malformed_dependency(zone: impl Into<String>) -> Self {
		Self::new(ErrorKind::MalformedDependency(zone.into()))
	}
}

impl std::error::Error for SurgeonError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self.kind {
			ErrorKind::ShiftIo { ref source, .. } => Some(source),
			ErrorKind::Io(ref err) => Some(err),
			_ => None,
		}
	}
}

impl Debug for SurgeonError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.kind)
	}
}

impl From<FileDecodingError> for SurgeonError {
	fn from(input: FileDecodingError) -> Self {
		Self {
			kind: ErrorKind::FileDecoding(input),
		}
	}
}

impl From<FileEncodingError> for SurgeonError {
	fn from(input: FileEncodingError) -> Self {
		Self {
			kind: ErrorKind::FileEncoding(input),
		}
	}
}

impl From<std::io::Error> for SurgeonError {
	fn from(input: std::io::Error) -> Self {
		Self {
			kind: ErrorKind::Io(input),
		}
	}
}

impl From<std::string::FromUtf8Error> for SurgeonError {
	fn from(input: std::string::FromUtf8Error) -> Self {
		Self {
			kind: ErrorKind::StringFromUtf8(input),
		}
	}
}

impl From<std::collections::TryReserveError> for SurgeonError {
	fn from(input: TryReserveError) -> Self {
		Self {
			kind: ErrorKind::Alloc(input),
		}
	}
}

impl From<tempfile::PersistError> for SurgeonError {
	fn from(input: tempfile::PersistError) -> Self {
		Self {
			kind: ErrorKind::Persist(input),
		}
	}
}

impl From<std::convert::Infallible> for SurgeonError {
	fn from(input: std::convert::Infallible) -> Self {
		Self {
			kind: ErrorKind::Infallible(input),
		}
	}
}

impl Display for SurgeonError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.kind {
			// Conversions
			ErrorKind::StringFromUtf8(ref err) => write!(f, "{err}"),
			ErrorKind::Io(ref err) => write!(f, "{err}"),
			ErrorKind::Alloc(ref err) => write!(f, "{err}"),
			ErrorKind::Persist(ref err) => write!(f, "Failed to replace the original file: {err}"),

			ErrorKind::MalformedDependency(ref zone) => write!(
				f,
				"Broken dependency: a reference points to the unregistered zone \"{zone}\""
			),
			ErrorKind::ShiftIo {
				ref zone,
				offset,
				ref source,
			} => write!(
				f,
				"Failed to shift data after zone \"{zone}\" (offset: {offset}): {source}"
			),
			ErrorKind::UnsupportedLayout(message) => write!(f, "Unsupported layout: {message}"),
			ErrorKind::OverlappingZones(ref zone) => {
				write!(f, "Zone \"{zone}\" overlaps an existing zone")
			},
			ErrorKind::FieldOverflow { location, value } => write!(
				f,
				"The value {value} does not fit in the field at offset {location}"
			),
			ErrorKind::Cancelled => write!(f, "The write was cancelled"),
			ErrorKind::TextDecode(message) => write!(f, "Text decoding: {message}"),

			// Files
			ErrorKind::UnknownFormat => write!(f, "No format could be determined from the provided file"),
			ErrorKind::TooMuchData => write!(
				f,
				"Attempted to read/write an abnormally large amount of data"
			),
			ErrorKind::SizeMismatch => write!(
				f,
				"Encountered an invalid item size, either too big or too small to be valid"
			),
			ErrorKind::FileDecoding(ref file_decode_err) => write!(f, "{file_decode_err}"),
			ErrorKind::FileEncoding(ref file_encode_err) => write!(f, "{file_encode_err}"),

			ErrorKind::Infallible(_) => write!(f, "A expected condition was not upheld"),
		}
	}
}
