/// A single text item of a tag
///
/// The key is the native key of the format it was read from or will be written to: a Vorbis
/// field name (`TITLE`), an MP4 atom identifier (`©nam`), or an ID3v2 frame ID (`TIT2`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagItem {
	pub(crate) key: String,
	pub(crate) value: String,
}

impl TagItem {
	/// Create a new `TagItem`
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::tag::TagItem;
	///
	/// let item = TagItem::new("TITLE", "Foo title");
	/// assert_eq!(item.key(), "TITLE");
	/// assert_eq!(item.value(), "Foo title");
	/// ```
	pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			value: value.into(),
		}
	}

	/// Returns a reference to the key
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Returns a reference to the value
	pub fn value(&self) -> &str {
		&self.value
	}

	/// Consumes the `TagItem`, returning its key and value
	pub fn consume(self) -> (String, String) {
		(self.key, self.value)
	}
}
