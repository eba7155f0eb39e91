//! The tag content handed to the format producers
//!
//! The engine itself never looks at tags, a [`TagData`] is only meaningful to the bundled format
//! collaborators. Keys are kept in the native form of each format.

mod item;

pub use item::TagItem;

/// An ordered list of text items
///
/// # Examples
///
/// ```rust
/// use tag_surgeon::tag::TagData;
///
/// let mut tag = TagData::new();
/// tag.push("ARTIST", "Foo artist");
/// tag.push("ARTIST", "Bar artist");
/// tag.insert("TITLE", "Baz title");
///
/// assert_eq!(tag.get("ARTIST"), Some("Foo artist"));
/// assert_eq!(tag.get_all("ARTIST").count(), 2);
/// assert_eq!(tag.len(), 3);
/// ```
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TagData {
	pub(crate) items: Vec<TagItem>,
}

impl TagData {
	/// Create an empty `TagData`
	pub fn new() -> Self {
		Self::default()
	}

	/// All items, in order
	pub fn items(&self) -> impl ExactSizeIterator<Item = &TagItem> + Clone {
		self.items.iter()
	}

	/// The first value for `key`
	pub fn get(&self, key: &str) -> Option<&str> {
		self.items
			.iter()
			.find(|item| item.key == key)
			.map(TagItem::value)
	}

	/// Every value for `key`
	pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + Clone {
		self.items
			.iter()
			.filter(move |item| item.key == key)
			.map(TagItem::value)
	}

	/// Append an item, keeping any existing items with the same key
	pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.items.push(TagItem::new(key, value));
	}

	/// Set the value of `key`, replacing any existing items with the same key
	///
	/// The new item takes the place of the first item it replaces.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		let item = TagItem::new(key, value);

		match self.items.iter().position(|i| i.key == item.key) {
			Some(position) => {
				let key = item.key.clone();
				self.items[position] = item;

				let mut index = 0;
				self.items.retain(|i| {
					let keep = index <= position || i.key != key;
					index += 1;
					keep
				});
			},
			None => self.items.push(item),
		}
	}

	/// Remove every item with `key`, returning the removed values
	pub fn remove_key(&mut self, key: &str) -> Vec<String> {
		let (removed, kept) = std::mem::take(&mut self.items)
			.into_iter()
			.partition::<Vec<_>, _>(|item| item.key == key);

		self.items = kept;
		removed.into_iter().map(|item| item.value).collect()
	}

	/// Keep only the items matching `f`
	pub fn retain<F>(&mut self, f: F)
	where
		F: FnMut(&TagItem) -> bool,
	{
		self.items.retain(f);
	}

	/// The number of items
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Whether there are no items
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Remove every item
	pub fn clear(&mut self) {
		self.items.clear();
	}
}

impl IntoIterator for TagData {
	type Item = TagItem;
	type IntoIter = std::vec::IntoIter<TagItem>;

	fn into_iter(self) -> Self::IntoIter {
		self.items.into_iter()
	}
}

impl FromIterator<TagItem> for TagData {
	fn from_iter<T: IntoIterator<Item = TagItem>>(iter: T) -> Self {
		Self {
			items: iter.into_iter().collect(),
		}
	}
}
