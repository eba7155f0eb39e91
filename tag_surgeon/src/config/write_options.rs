/// Options to control how a [`FileSurgeon`](crate::surgeon::FileSurgeon) commits zones
///
/// This acts as a dumping ground for all sorts of write settings, both for the engine itself and
/// for the bundled format collaborators. As such, this is best used as an application global
/// config that gets set once.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct WriteOptions {
	pub(crate) preferred_padding: Option<u32>,
	pub(crate) max_padding: Option<u32>,
	pub(crate) refill_padding: bool,
	pub(crate) shift_buffer_size: usize,
}

impl WriteOptions {
	/// Default preferred padding size in bytes
	pub const DEFAULT_PREFERRED_PADDING: u32 = 1024;

	/// Default size of the buffer used to move data around the file
	pub const DEFAULT_SHIFT_BUFFER_SIZE: usize = 64 * 1024;

	/// Creates a new `WriteOptions`, alias for `Default` implementation
	///
	/// See also: [`WriteOptions::default`]
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::config::WriteOptions;
	///
	/// let write_options = WriteOptions::new();
	/// ```
	pub const fn new() -> Self {
		Self {
			preferred_padding: Some(Self::DEFAULT_PREFERRED_PADDING),
			max_padding: None,
			refill_padding: false,
			shift_buffer_size: Self::DEFAULT_SHIFT_BUFFER_SIZE,
		}
	}

	/// Set the preferred padding size in bytes
	///
	/// This is the amount of padding written when a brand new padding area is created (for example
	/// when a tag is created from scratch), and the amount restored when
	/// [`WriteOptions::refill_padding`] is enabled.
	///
	/// NOTES:
	///
	/// * Not all tag formats support padding
	/// * The actual padding size may be different from this value, depending on tag size limitations
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::config::WriteOptions;
	///
	/// // I really don't want my files rewritten, so I'll double the padding size!
	/// let options = WriteOptions::new().preferred_padding(2048);
	///
	/// // ...Or I don't want padding under any circumstances!
	/// let options = WriteOptions::new().preferred_padding(0);
	/// ```
	pub fn preferred_padding(mut self, preferred_padding: u32) -> Self {
		match preferred_padding {
			0 => self.preferred_padding = None,
			_ => self.preferred_padding = Some(preferred_padding),
		}
		self
	}

	/// Set an upper bound for the padding zone
	///
	/// When zones shrink, the freed space is handed to the padding zone. This caps how large the
	/// padding zone may become, anything above it is given back to the file.
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::config::WriteOptions;
	///
	/// // Never keep more than 4KiB of padding around
	/// let options = WriteOptions::new().max_padding(4096);
	/// ```
	pub fn max_padding(mut self, max_padding: u32) -> Self {
		self.max_padding = Some(max_padding);
		self
	}

	/// Whether to restore the preferred padding when a shift can't be avoided
	///
	/// If the padding zone is too small to absorb a change, the file has to be shifted regardless.
	/// With this enabled, the padding zone is then reset to [`WriteOptions::preferred_padding`]
	/// rather than being drained, so the next edit is cheap again.
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::config::WriteOptions;
	///
	/// let options = WriteOptions::new().refill_padding(true);
	/// ```
	pub fn refill_padding(mut self, refill_padding: bool) -> Self {
		self.refill_padding = refill_padding;
		self
	}

	/// The size of the buffer used when moving the bytes following a zone
	///
	/// Larger buffers mean fewer reads and writes, at the cost of memory. The buffer size is
	/// clamped to at least 1 byte.
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::config::WriteOptions;
	///
	/// // I'm working with huge files on a fast disk
	/// let options = WriteOptions::new().shift_buffer_size(1024 * 1024);
	/// ```
	pub fn shift_buffer_size(mut self, shift_buffer_size: usize) -> Self {
		self.shift_buffer_size = shift_buffer_size.max(1);
		self
	}
}

impl Default for WriteOptions {
	/// The default implementation for `WriteOptions`
	///
	/// The defaults are as follows:
	///
	/// ```rust,ignore
	/// WriteOptions {
	///     preferred_padding: 1024,
	///     max_padding: None,
	///     refill_padding: false,
	///     shift_buffer_size: 65536,
	/// }
	/// ```
	fn default() -> Self {
		Self::new()
	}
}
