use std::ffi::OsStr;
use std::path::Path;

/// List of extensions handled by the bundled format collaborators
///
/// # Examples
///
/// ```rust,no_run
/// use tag_surgeon::config::ParseOptions;
/// use tag_surgeon::file::{EXTENSIONS, read_from_path};
/// use std::fs;
///
/// # fn main() -> tag_surgeon::error::Result<()> {
/// for entry in fs::read_dir(".")? {
/// 	let entry = entry?;
///
/// 	let path = entry.path();
/// 	let Some(extension) = path.extension() else {
/// 		continue;
/// 	};
///
/// 	// Skip any unsupported extensions
/// 	if !EXTENSIONS.iter().any(|e| *e == extension) {
/// 		continue;
/// 	}
///
/// 	let parsed = read_from_path(&path, ParseOptions::new())?;
/// }
/// # Ok(()) }
/// ```
pub const EXTENSIONS: &[&str] = &[
	// Also update `FileType::from_ext()` below
	"flac", "mp3", "mp2", "mp1", "mp4", "m4a", "m4b", "m4p", "m4r", "m4v", "3gp",
];

/// The file formats with a bundled collaborator
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum FileType {
	/// FLAC, with Vorbis Comments
	Flac,
	/// MP4/Quicktime, with an `ilst` atom
	Mp4,
	/// MPEG audio (or anything else starting with an ID3v2 tag)
	Mpeg,
}

impl FileType {
	/// Attempts to extract a [`FileType`] from an extension
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::file::FileType;
	///
	/// let extension = "mp3";
	/// assert_eq!(FileType::from_ext(extension), Some(FileType::Mpeg));
	/// ```
	pub fn from_ext<E>(ext: E) -> Option<Self>
	where
		E: AsRef<OsStr>,
	{
		let ext = ext.as_ref().to_str()?.to_ascii_lowercase();

		// Also update `EXTENSIONS` above
		match ext.as_str() {
			"flac" => Some(Self::Flac),
			"mp3" | "mp2" | "mp1" => Some(Self::Mpeg),
			"mp4" | "m4a" | "m4b" | "m4p" | "m4r" | "m4v" | "3gp" => Some(Self::Mp4),
			_ => None,
		}
	}

	/// Attempts to determine a [`FileType`] from a path
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::file::FileType;
	/// use std::path::Path;
	///
	/// let path = Path::new("path/to/my.m4a");
	/// assert_eq!(FileType::from_path(path), Some(FileType::Mp4));
	/// ```
	pub fn from_path<P>(path: P) -> Option<Self>
	where
		P: AsRef<Path>,
	{
		let ext = path.as_ref().extension();
		ext.and_then(Self::from_ext)
	}

	/// Attempts to guess a [`FileType`] from the start of a file
	///
	/// A FLAC file starting with an ID3v2 tag is indistinguishable from an MPEG file this way, so
	/// prefer [`FileType::from_path`] where possible.
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::file::FileType;
	///
	/// assert_eq!(FileType::from_buffer(b"fLaC\0\0\0\x22"), Some(FileType::Flac));
	/// assert_eq!(FileType::from_buffer(b"\0\0\0\x20ftypM4A "), Some(FileType::Mp4));
	/// ```
	pub fn from_buffer(buf: &[u8]) -> Option<Self> {
		match buf {
			[b'f', b'L', b'a', b'C', ..] => Some(Self::Flac),
			[_, _, _, _, b'f', b't', b'y', b'p', ..] => Some(Self::Mp4),
			[b'I', b'D', b'3', ..] => Some(Self::Mpeg),
			// MPEG frame sync
			[0xFF, b, ..] if b >> 5 == 0b111 => Some(Self::Mpeg),
			_ => None,
		}
	}
}
