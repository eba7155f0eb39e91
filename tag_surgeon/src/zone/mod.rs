//! Zones, the editable regions of a file
//!
//! A [`Zone`] is a named, contiguous byte range discovered while parsing a file. Format
//! collaborators register every region they want to remain editable in a [`ZoneRegistry`],
//! which is later consumed by a [`FileSurgeon`](crate::surgeon::FileSurgeon).
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> tag_surgeon::error::Result<()> {
//! use tag_surgeon::zone::{PADDING_ZONE, Zone, ZoneRegistry};
//!
//! let mut registry = ZoneRegistry::new();
//!
//! // An existing metadata block, followed by some padding
//! registry.add_zone(Zone::new("comments", 42, 120))?;
//! registry.add_zone(Zone::new(PADDING_ZONE, 162, 1024).with_core_signature([1, 0, 0, 0]))?;
//!
//! // A structure that doesn't exist yet, but may need to be created
//! registry.add_zone(Zone::new("picture.0", 1186, 0))?;
//!
//! assert_eq!(registry.len(), 3);
//! # Ok(()) }
//! ```

mod registry;

pub use registry::ZoneRegistry;

/// The name of the designated padding zone
///
/// A zone registered under this name is used by the padding absorber to cancel out the size
/// changes of the zones adjacent to it.
pub const PADDING_ZONE: &str = "padding";

/// A named region of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
	pub(crate) name: String,
	pub(crate) offset: u64,
	pub(crate) size: u64,
	pub(crate) core_signature: Vec<u8>,
	pub(crate) max_size: Option<u64>,
	pub(crate) dynamic: bool,
	pub(crate) tag: u32,
	pub(crate) items: u32,
	pub(crate) committed: Option<Committed>,
}

/// The state of a zone once it has been written
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Committed {
	pub(crate) size: u64,
	pub(crate) items: u32,
}

impl Zone {
	/// Create a new dynamic zone
	///
	/// A `size` of 0 creates a virtual zone, marking an insertion point for content that does not
	/// exist yet. Non-empty zones are assumed to hold a single item, see [`Zone::with_items`].
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::zone::Zone;
	///
	/// let zone = Zone::new("ilst", 1024, 300);
	/// assert_eq!(zone.end(), 1324);
	/// assert!(zone.is_dynamic());
	/// assert!(!zone.is_virtual());
	/// ```
	pub fn new(name: impl Into<String>, offset: u64, size: u64) -> Self {
		Self {
			name: name.into(),
			offset,
			size,
			core_signature: Vec::new(),
			max_size: None,
			dynamic: true,
			tag: 0,
			items: u32::from(size > 0),
			committed: None,
		}
	}

	/// Set the minimal content the zone keeps when it becomes logically empty
	///
	/// A zone with an empty core signature is removed entirely when its producer reports that it
	/// wrote no items.
	///
	/// For the [padding zone](PADDING_ZONE), the length of the core signature is the minimum size
	/// of a non-empty padding area (usually the size of its header).
	pub fn with_core_signature(mut self, core_signature: impl Into<Vec<u8>>) -> Self {
		self.core_signature = core_signature.into();
		self
	}

	/// Set the largest size the zone may be committed with
	///
	/// This only bounds the [padding zone](PADDING_ZONE), for structures whose length field can't
	/// describe more than `max_size` bytes. Whatever the padding can't absorb past it is shifted.
	pub fn with_max_size(mut self, max_size: u64) -> Self {
		self.max_size = Some(max_size);
		self
	}

	/// Mark the zone as a structural anchor
	///
	/// Anchors are never produced nor resized, they are only moved along with the rest of the
	/// file. They exist so other fields can point at them.
	pub fn anchor(mut self) -> Self {
		self.dynamic = false;
		self
	}

	/// Set the format-specific discriminator handed back to the producer
	pub fn with_tag(mut self, tag: u32) -> Self {
		self.tag = tag;
		self
	}

	/// Set the number of logical items the zone holds at parse time
	///
	/// This is used to correct the counters that depend on this zone.
	pub fn with_items(mut self, items: u32) -> Self {
		self.items = items;
		self
	}

	/// The unique name of the zone
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The original absolute offset of the zone
	pub fn offset(&self) -> u64 {
		self.offset
	}

	/// The original size of the zone
	pub fn size(&self) -> u64 {
		self.size
	}

	/// The original end offset of the zone (exclusive)
	pub fn end(&self) -> u64 {
		self.offset + self.size
	}

	/// The core signature, see [`Zone::with_core_signature`]
	pub fn core_signature(&self) -> &[u8] {
		&self.core_signature
	}

	/// The largest size the zone may be committed with, see [`Zone::with_max_size`]
	pub fn max_size(&self) -> Option<u64> {
		self.max_size
	}

	/// Whether the zone's size may change on write
	pub fn is_dynamic(&self) -> bool {
		self.dynamic
	}

	/// Whether the zone marks an insertion point (its original size is 0)
	pub fn is_virtual(&self) -> bool {
		self.size == 0
	}

	/// Whether this is the designated padding zone
	pub fn is_padding(&self) -> bool {
		self.name == PADDING_ZONE
	}

	/// The format-specific discriminator
	pub fn tag(&self) -> u32 {
		self.tag
	}

	/// The number of logical items the zone held at parse time
	pub fn items(&self) -> u32 {
		self.items
	}

	/// The size of the zone once committed, if it has been
	pub fn committed_size(&self) -> Option<u64> {
		self.committed.map(|c| c.size)
	}

	/// The number of items written to the zone, if it has been committed
	pub fn committed_items(&self) -> Option<u32> {
		self.committed.map(|c| c.items)
	}

	/// The size difference introduced by the commit of this zone (0 if not committed)
	pub fn delta(&self) -> i64 {
		match self.committed {
			Some(committed) => committed.size as i64 - self.size as i64,
			None => 0,
		}
	}

	/// The item count difference introduced by the commit of this zone (0 if not committed)
	pub(crate) fn item_delta(&self) -> i64 {
		match self.committed {
			Some(committed) => i64::from(committed.items) - i64::from(self.items),
			None => 0,
		}
	}

	// Whether `self` belongs after `other` in physical order
	fn sorts_after(&self, other: &Zone) -> bool {
		match other.offset.cmp(&self.offset) {
			std::cmp::Ordering::Less => true,
			std::cmp::Ordering::Greater => false,
			// Virtual zones mark an insertion point *before* the zone at the same offset
			std::cmp::Ordering::Equal => other.is_virtual() || !self.is_virtual(),
		}
	}

	fn overlaps(&self, other: &Zone) -> bool {
		match (self.is_virtual(), other.is_virtual()) {
			(true, true) => false,
			(true, false) => other.offset < self.offset && self.offset < other.end(),
			(false, true) => self.offset < other.offset && other.offset < self.end(),
			(false, false) => self.offset < other.end() && other.offset < self.end(),
		}
	}
}

/// The current position of the zone at `index`
///
/// Every committed zone ordered before it contributes its delta.
pub(crate) fn corrected_offset(zones: &[Zone], index: usize) -> i64 {
	zones[..index].iter().map(Zone::delta).sum::<i64>() + zones[index].offset as i64
}

/// How far the byte originally at `position` has moved
///
/// Only committed zones ending at or before `position` are taken into account.
pub(crate) fn shift_at(zones: &[Zone], position: u64) -> i64 {
	zones
		.iter()
		.filter(|zone| zone.end() <= position)
		.map(Zone::delta)
		.sum()
}
