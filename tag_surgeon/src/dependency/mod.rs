//! Tracking of the fields that depend on the zones of a file
//!
//! Whenever a zone changes size, item count or position, some other bytes of the file become
//! stale: container sizes, item counters, and offsets pointing past the zone. A
//! [`DependencyTracker`] records every such field while the file is parsed, so that the
//! [`FileSurgeon`](crate::surgeon::FileSurgeon) can patch them as zones get committed.
//!
//! All locations are **original** absolute offsets. The engine computes where each field ends up
//! after the zones before it have been resized.
//!
//! # Examples
//!
//! ```rust
//! use tag_surgeon::dependency::{DependencyTracker, Field};
//!
//! let mut tracker = DependencyTracker::new();
//!
//! // A container size covering two zones
//! tracker.add_size(Field::u32_be(0), 95, "comments", Some("container"));
//! tracker.add_size(Field::u32_be(0), 95, "padding", Some("container"));
//!
//! // An absolute pointer to the start of the audio data
//! tracker.add_index(Field::u32_be(200), 80, false, "audio");
//!
//! assert_eq!(tracker.sizes().count(), 1);
//! assert_eq!(tracker.len(), 2);
//! ```

mod field;

pub use field::{Endian, Field, FieldFormat};

use crate::error::{Result, SurgeonError};
use crate::zone::Zone;

/// A field holding the size of a container
///
/// The new value is `original + Σ deltas of the zones in the group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeReference {
	pub(crate) field: Field,
	pub(crate) original: u64,
	pub(crate) zones: Vec<String>,
	pub(crate) group_key: Option<String>,
	pub(crate) resolved: bool,
}

impl SizeReference {
	/// The location and encoding of the size
	pub fn field(&self) -> Field {
		self.field
	}

	/// The size stored in the file at parse time
	pub fn original(&self) -> u64 {
		self.original
	}

	/// The zones contained in the sized container
	pub fn zones(&self) -> &[String] {
		&self.zones
	}

	/// The key used to merge references, if any
	pub fn group_key(&self) -> Option<&str> {
		self.group_key.as_deref()
	}
}

/// A field holding the number of items in one or more zones
///
/// The new value is `original + Σ (items written - items at parse time)` over its zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterReference {
	pub(crate) field: Field,
	pub(crate) original: u64,
	pub(crate) zones: Vec<String>,
	pub(crate) resolved: bool,
}

impl CounterReference {
	/// The location and encoding of the counter
	pub fn field(&self) -> Field {
		self.field
	}

	/// The count stored in the file at parse time
	pub fn original(&self) -> u64 {
		self.original
	}

	/// The zones whose items are counted
	pub fn zones(&self) -> &[String] {
		&self.zones
	}
}

/// A field pointing at a byte position, corrected as soon as its target is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReference {
	pub(crate) field: Field,
	pub(crate) original: u64,
	pub(crate) relative: bool,
	pub(crate) target: String,
	pub(crate) resolved: bool,
}

impl IndexReference {
	/// The location and encoding of the pointer
	pub fn field(&self) -> Field {
		self.field
	}

	/// The pointer value at parse time
	pub fn original(&self) -> u64 {
		self.original
	}

	/// Whether the pointer is relative to its own location
	pub fn is_relative(&self) -> bool {
		self.relative
	}

	/// The zone the pointer points into
	pub fn target(&self) -> &str {
		&self.target
	}
}

/// A pointer that can only be corrected once every zone has been committed
///
/// These make up a relocation table, resolved in a single pass at the very end of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessingIndex {
	pub(crate) field: Field,
	pub(crate) original: u64,
	pub(crate) relative: bool,
	// Candidates in registration order, the first one still registered wins
	pub(crate) targets: Vec<String>,
	pub(crate) owner: String,
	pub(crate) group_key: Option<String>,
	pub(crate) base_offset: Option<u64>,
	pub(crate) resolved: bool,
}

impl PostProcessingIndex {
	/// The location and encoding of the pointer
	pub fn field(&self) -> Field {
		self.field
	}

	/// The pointer value at parse time
	pub fn original(&self) -> u64 {
		self.original
	}

	/// Whether the pointer is relative to [`PostProcessingIndex::base_offset`]
	pub fn is_relative(&self) -> bool {
		self.relative
	}

	/// The zones the pointer may point into, in order of preference
	pub fn targets(&self) -> &[String] {
		&self.targets
	}

	/// The zone that owns the pointer
	///
	/// Removing the owner removes the pointer.
	pub fn owner(&self) -> &str {
		&self.owner
	}

	/// The key used to merge pointers, if any
	pub fn group_key(&self) -> Option<&str> {
		self.group_key.as_deref()
	}

	/// The original offset a relative pointer is relative to
	///
	/// This defaults to the location of the pointer itself.
	pub fn base_offset(&self) -> u64 {
		self.base_offset.unwrap_or(self.field.location)
	}
}

/// A computed value, ready to be written to the file
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct FieldUpdate {
	pub(crate) field: Field,
	pub(crate) value: i64,
	/// The current physical position of the field
	pub(crate) position: u64,
}

/// The collection of every dependent field of a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTracker {
	sizes: Vec<SizeReference>,
	counters: Vec<CounterReference>,
	indices: Vec<IndexReference>,
	post_processing: Vec<PostProcessingIndex>,
}

impl DependencyTracker {
	/// Create an empty `DependencyTracker`
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a size field depending on `zone`
	///
	/// References with the same location, or the same `group_key`, are merged into a single field
	/// depending on all of their zones.
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::dependency::{DependencyTracker, Field};
	///
	/// let mut tracker = DependencyTracker::new();
	///
	/// // An ID3v2 tag size covers both the frames and the padding
	/// tracker.add_size(Field::synchsafe(6), 2048, "id3v2.frames", None);
	/// tracker.add_size(Field::synchsafe(6), 2048, "padding", None);
	///
	/// let size = tracker.sizes().next().unwrap();
	/// assert_eq!(size.zones(), ["id3v2.frames", "padding"]);
	/// ```
	pub fn add_size(
		&mut self,
		field: Field,
		original_size: u64,
		zone: impl Into<String>,
		group_key: Option<&str>,
	) {
		let zone = zone.into();

		let existing = self.sizes.iter_mut().find(|size| {
			size.field.location == field.location
				|| (group_key.is_some() && size.group_key.as_deref() == group_key)
		});

		if let Some(existing) = existing {
			if existing.field != field || existing.original != original_size {
				log::warn!(
					"Size reference at {} was re-registered with a different field or value, keeping \
					 the first one",
					existing.field.location
				);
			}

			if !existing.zones.contains(&zone) {
				existing.zones.push(zone);
			}

			if existing.group_key.is_none() {
				existing.group_key = group_key.map(str::to_owned);
			}

			return;
		}

		log::trace!(
			"Tracking size at {} ({original_size}) for zone \"{zone}\"",
			field.location
		);

		self.sizes.push(SizeReference {
			field,
			original: original_size,
			zones: vec![zone],
			group_key: group_key.map(str::to_owned),
			resolved: false,
		});
	}

	/// Register an item counter depending on `zone`
	///
	/// Counters at the same location are merged.
	pub fn add_counter(&mut self, field: Field, original_count: u64, zone: impl Into<String>) {
		let zone = zone.into();

		if let Some(existing) = self
			.counters
			.iter_mut()
			.find(|counter| counter.field.location == field.location)
		{
			if !existing.zones.contains(&zone) {
				existing.zones.push(zone);
			}
			return;
		}

		log::trace!(
			"Tracking counter at {} ({original_count}) for zone \"{zone}\"",
			field.location
		);

		self.counters.push(CounterReference {
			field,
			original: original_count,
			zones: vec![zone],
			resolved: false,
		});
	}

	/// Register a pointer into `zone`
	///
	/// A relative pointer is relative to its own location.
	pub fn add_index(
		&mut self,
		field: Field,
		original_value: u64,
		is_relative: bool,
		zone: impl Into<String>,
	) {
		let zone = zone.into();

		if self
			.indices
			.iter()
			.any(|index| index.field.location == field.location)
		{
			log::warn!(
				"Pointer at {} is already tracked, ignoring the reference to \"{zone}\"",
				field.location
			);
			return;
		}

		self.indices.push(IndexReference {
			field,
			original: original_value,
			relative: is_relative,
			target: zone,
			resolved: false,
		});
	}

	/// Register a pointer that is only corrected after every zone has been committed
	///
	/// * `owning_zone` - Removing this zone removes the pointer
	/// * `group_key` - Pointers at the same location with the same key are merged, the pointer
	///   then targets the first of their zones that is still registered
	/// * `base_offset` - The original offset a relative pointer is relative to, defaults to the
	///   location of the pointer
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::dependency::{DependencyTracker, Field};
	///
	/// let mut tracker = DependencyTracker::new();
	///
	/// // An MP4 chunk offset, pointing into the media data
	/// tracker.add_post_processing_index(Field::u32_be(1200), 4096, false, "mdat.0", "ilst", None, None);
	/// ```
	#[allow(clippy::too_many_arguments)]
	pub fn add_post_processing_index(
		&mut self,
		field: Field,
		original_value: u64,
		is_relative: bool,
		target: impl Into<String>,
		owning_zone: impl Into<String>,
		group_key: Option<&str>,
		base_offset: Option<u64>,
	) {
		let target = target.into();

		if let Some(key) = group_key {
			if let Some(existing) = self.post_processing.iter_mut().find(|index| {
				index.field.location == field.location && index.group_key.as_deref() == Some(key)
			}) {
				if !existing.targets.contains(&target) {
					existing.targets.push(target);
				}
				return;
			}
		}

		self.post_processing.push(PostProcessingIndex {
			field,
			original: original_value,
			relative: is_relative,
			targets: vec![target],
			owner: owning_zone.into(),
			group_key: group_key.map(str::to_owned),
			base_offset,
			resolved: false,
		});
	}

	/// All size references
	pub fn sizes(&self) -> impl Iterator<Item = &SizeReference> {
		self.sizes.iter()
	}

	/// All counter references
	pub fn counters(&self) -> impl Iterator<Item = &CounterReference> {
		self.counters.iter()
	}

	/// All immediate index references
	pub fn indices(&self) -> impl Iterator<Item = &IndexReference> {
		self.indices.iter()
	}

	/// All post-processing indices
	pub fn post_processing_indices(&self) -> impl Iterator<Item = &PostProcessingIndex> {
		self.post_processing.iter()
	}

	/// The total number of tracked fields
	pub fn len(&self) -> usize {
		self.sizes.len() + self.counters.len() + self.indices.len() + self.post_processing.len()
	}

	/// Whether no fields are tracked
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The number of fields that have not been written yet
	pub fn pending(&self) -> usize {
		self.sizes.iter().filter(|r| !r.resolved).count()
			+ self.counters.iter().filter(|r| !r.resolved).count()
			+ self.indices.iter().filter(|r| !r.resolved).count()
			+ self.post_processing.iter().filter(|r| !r.resolved).count()
	}

	/// Drop every reference to `zone`
	///
	/// Grouped references only lose the zone, and are dropped once their group is empty.
	pub(crate) fn detach(&mut self, zone: &str) {
		for size in &mut self.sizes {
			size.zones.retain(|z| z != zone);
		}
		self.sizes.retain(|size| !size.zones.is_empty());

		for counter in &mut self.counters {
			counter.zones.retain(|z| z != zone);
		}
		self.counters.retain(|counter| !counter.zones.is_empty());

		self.indices.retain(|index| index.target != zone);

		self.post_processing.retain(|index| index.owner != zone);
		for index in &mut self.post_processing {
			index.targets.retain(|z| z != zone);
		}
		self.post_processing.retain(|index| !index.targets.is_empty());
	}

	/// Check every reference against the zones about to be written
	///
	/// # Errors
	///
	/// * A reference names a zone that isn't registered
	/// * A field lies inside the original range of a dynamic zone
	pub(crate) fn validate(&self, zones: &[Zone]) -> Result<()> {
		let exists = |name: &str| zones.iter().any(|zone| zone.name == name);

		let mut fields = Vec::with_capacity(self.len());

		for size in &self.sizes {
			if let Some(missing) = size.zones.iter().find(|z| !exists(z)) {
				return Err(SurgeonError::malformed_dependency(missing.as_str()));
			}
			fields.push(size.field);
		}

		for counter in &self.counters {
			if let Some(missing) = counter.zones.iter().find(|z| !exists(z)) {
				return Err(SurgeonError::malformed_dependency(missing.as_str()));
			}
			fields.push(counter.field);
		}

		for index in &self.indices {
			if !exists(&index.target) {
				return Err(SurgeonError::malformed_dependency(index.target.as_str()));
			}
			fields.push(index.field);
		}

		for index in &self.post_processing {
			if !exists(&index.owner) {
				return Err(SurgeonError::malformed_dependency(index.owner.as_str()));
			}
			if let Some(missing) = index.targets.iter().find(|z| !exists(z)) {
				return Err(SurgeonError::malformed_dependency(missing.as_str()));
			}
			fields.push(index.field);
		}

		for field in fields {
			if let Some(zone) = zones.iter().find(|zone| {
				zone.dynamic
					&& !zone.is_virtual()
					&& field.location < zone.end()
					&& zone.offset < field.end()
			}) {
				log::error!(
					"Field at {} lies inside the dynamic zone \"{}\"",
					field.location,
					zone.name
				);
				return Err(SurgeonError::malformed_dependency(zone.name.as_str()));
			}
		}

		Ok(())
	}

	/// Compute the value of every size, counter and index reference that became resolvable
	///
	/// This is called after every zone commit. Returned fields are marked as resolved.
	pub(crate) fn resolve_ready(&mut self, zones: &[Zone]) -> Result<Vec<FieldUpdate>> {
		let mut updates = Vec::new();

		for size in self.sizes.iter_mut().filter(|r| !r.resolved) {
			let group = lookup_all(zones, &size.zones)?;
			if group.iter().any(|zone| zone.committed.is_none()) {
				continue;
			}

			let delta = group.iter().map(|zone| zone.delta()).sum::<i64>();
			updates.push(update(zones, size.field, size.original as i64 + delta));
			size.resolved = true;
		}

		for counter in self.counters.iter_mut().filter(|r| !r.resolved) {
			let group = lookup_all(zones, &counter.zones)?;
			if group.iter().any(|zone| zone.committed.is_none()) {
				continue;
			}

			let delta = group.iter().map(|zone| zone.item_delta()).sum::<i64>();
			updates.push(update(zones, counter.field, counter.original as i64 + delta));
			counter.resolved = true;
		}

		for index in self.indices.iter_mut().filter(|r| !r.resolved) {
			let target = lookup(zones, &index.target)?;
			if zones[target].committed.is_none() {
				continue;
			}

			// A relative pointer also needs every zone before its base to be settled
			let base = index.field.location;
			if index.relative
				&& zones
					.iter()
					.any(|zone| zone.committed.is_none() && zone.end() <= base)
			{
				continue;
			}

			let value = pointer_value(zones, target, index.original, index.relative.then_some(base));
			updates.push(update(zones, index.field, value));
			index.resolved = true;
		}

		Ok(updates)
	}

	/// Compute the value of every post-processing index
	///
	/// Every zone must have been committed at this point.
	pub(crate) fn resolve_deferred(&mut self, zones: &[Zone]) -> Result<Vec<FieldUpdate>> {
		let mut updates = Vec::with_capacity(self.post_processing.len());

		for index in self.post_processing.iter_mut().filter(|r| !r.resolved) {
			let Some(target) = index
				.targets
				.iter()
				.find_map(|name| zones.iter().position(|zone| &zone.name == name))
			else {
				let name = index.targets.first().map_or(index.owner.as_str(), String::as_str);
				return Err(SurgeonError::malformed_dependency(name));
			};

			let base = index.base_offset.unwrap_or(index.field.location);
			let value = pointer_value(zones, target, index.original, index.relative.then_some(base));

			updates.push(update(zones, index.field, value));
			index.resolved = true;
		}

		Ok(updates)
	}
}

fn lookup(zones: &[Zone], name: &str) -> Result<usize> {
	zones
		.iter()
		.position(|zone| zone.name == name)
		.ok_or_else(|| SurgeonError::malformed_dependency(name))
}

fn lookup_all<'a>(zones: &'a [Zone], names: &[String]) -> Result<Vec<&'a Zone>> {
	names
		.iter()
		.map(|name| lookup(zones, name).map(|index| &zones[index]))
		.collect()
}

fn update(zones: &[Zone], field: Field, value: i64) -> FieldUpdate {
	FieldUpdate {
		field,
		value,
		position: (field.location as i64 + crate::zone::shift_at(zones, field.location)) as u64,
	}
}

// new = original + shift(target) - shift(base)
fn pointer_value(zones: &[Zone], target: usize, original: u64, base: Option<u64>) -> i64 {
	let target_shift = crate::zone::corrected_offset(zones, target) - zones[target].offset as i64;
	let base_shift = base.map_or(0, |base| crate::zone::shift_at(zones, base));

	original as i64 + target_shift - base_shift
}

#[cfg(test)]
mod tests {
	use super::{DependencyTracker, Field};
	use crate::error::ErrorKind;
	use crate::zone::{Committed, Zone};

	fn commit(zone: &mut Zone, size: u64, items: u32) {
		zone.committed = Some(Committed { size, items });
	}

	#[test_log::test]
	fn sizes_merge_by_location_and_group() {
		let mut tracker = DependencyTracker::new();

		tracker.add_size(Field::u32_be(0), 100, "a", None);
		tracker.add_size(Field::u32_be(0), 100, "b", None);
		tracker.add_size(Field::u32_be(8), 50, "a", Some("inner"));
		tracker.add_size(Field::u32_be(8), 50, "b", Some("inner"));
		tracker.add_size(Field::u32_be(8), 50, "b", Some("inner"));

		let sizes = tracker.sizes().collect::<Vec<_>>();
		assert_eq!(sizes.len(), 2);
		assert_eq!(sizes[0].zones(), ["a", "b"]);
		assert_eq!(sizes[1].zones(), ["a", "b"]);
		assert_eq!(sizes[1].group_key(), Some("inner"));
	}

	#[test_log::test]
	fn detach_cascades() {
		let mut tracker = DependencyTracker::new();

		tracker.add_size(Field::u32_be(0), 100, "a", None);
		tracker.add_size(Field::u32_be(0), 100, "b", None);
		tracker.add_counter(Field::u32_be(4), 3, "a");
		tracker.add_index(Field::u32_be(12), 80, false, "a");
		tracker.add_post_processing_index(Field::u32_be(16), 80, false, "c", "a", None, None);
		tracker.add_post_processing_index(Field::u32_be(20), 80, false, "a", "c", Some("g"), None);
		tracker.add_post_processing_index(Field::u32_be(20), 90, false, "b", "c", Some("g"), None);

		tracker.detach("a");

		// The size only loses one zone, everything else referencing "a" is gone
		assert_eq!(tracker.sizes().next().unwrap().zones(), ["b"]);
		assert_eq!(tracker.counters().count(), 0);
		assert_eq!(tracker.indices().count(), 0);

		let deferred = tracker.post_processing_indices().collect::<Vec<_>>();
		assert_eq!(deferred.len(), 1);
		assert_eq!(deferred[0].targets(), ["b"]);
	}

	#[test_log::test]
	fn validate_missing_zone() {
		let zones = vec![Zone::new("a", 10, 20)];

		let mut tracker = DependencyTracker::new();
		tracker.add_counter(Field::u32_be(0), 1, "a");
		assert!(tracker.validate(&zones).is_ok());

		tracker.add_index(Field::u32_be(4), 10, false, "nowhere");
		let err = tracker.validate(&zones).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::MalformedDependency(zone) if zone == "nowhere"));
		assert!(err.is_fatal());
	}

	#[test_log::test]
	fn validate_field_inside_dynamic_zone() {
		let zones = vec![Zone::new("a", 10, 20), Zone::new("b", 40, 20).anchor()];

		let mut tracker = DependencyTracker::new();

		// Inside an anchor is fine, it is never regenerated
		tracker.add_size(Field::u32_be(40), 20, "a", None);
		assert!(tracker.validate(&zones).is_ok());

		// Straddling the end of a dynamic zone is not
		tracker.add_size(Field::u32_be(28), 20, "a", None);
		assert!(tracker.validate(&zones).is_err());
	}

	#[test_log::test]
	fn size_waits_for_the_last_zone() {
		let mut zones = vec![Zone::new("a", 10, 20), Zone::new("b", 30, 10)];

		let mut tracker = DependencyTracker::new();
		tracker.add_size(Field::u32_be(0), 30, "a", None);
		tracker.add_size(Field::u32_be(0), 30, "b", None);

		commit(&mut zones[0], 25, 1);
		assert!(tracker.resolve_ready(&zones).unwrap().is_empty());

		commit(&mut zones[1], 8, 1);
		let updates = tracker.resolve_ready(&zones).unwrap();
		assert_eq!(updates.len(), 1);
		assert_eq!(updates[0].value, 33);
		assert_eq!(updates[0].position, 0);
		assert_eq!(tracker.pending(), 0);

		// Never resolved twice
		assert!(tracker.resolve_ready(&zones).unwrap().is_empty());
	}

	#[test_log::test]
	fn counters_use_item_deltas() {
		let mut zones = vec![Zone::new("a", 10, 20).with_items(4)];

		let mut tracker = DependencyTracker::new();
		tracker.add_counter(Field::u32_be(0), 7, "a");

		commit(&mut zones[0], 20, 6);
		let updates = tracker.resolve_ready(&zones).unwrap();
		assert_eq!(updates[0].value, 9);
	}

	#[test_log::test]
	fn relative_pointer_waits_for_its_base() {
		// A pointer at 60 into "a", relative to itself, with "b" in between
		let mut zones = vec![
			Zone::new("a", 10, 20),
			Zone::new("b", 30, 10),
			Zone::new("c", 100, 10).anchor(),
		];

		let mut tracker = DependencyTracker::new();
		tracker.add_index(Field::u32_be(60), 40, true, "a");

		commit(&mut zones[0], 20, 1);
		assert!(tracker.resolve_ready(&zones).unwrap().is_empty());

		commit(&mut zones[1], 15, 1);
		let updates = tracker.resolve_ready(&zones).unwrap();
		assert_eq!(updates[0].value, 40 - 5);
		assert_eq!(updates[0].position, 65);
	}

	#[test_log::test]
	fn deferred_uses_first_registered_target() {
		let mut zones = vec![Zone::new("a", 10, 20), Zone::new("data", 50, 100).anchor()];

		let mut tracker = DependencyTracker::new();
		tracker.add_post_processing_index(
			Field::u32_be(200),
			60,
			false,
			"missing",
			"a",
			Some("chunks"),
			None,
		);
		tracker.add_post_processing_index(
			Field::u32_be(200),
			60,
			false,
			"data",
			"a",
			Some("chunks"),
			None,
		);
		tracker.detach("missing");

		commit(&mut zones[0], 30, 1);
		commit(&mut zones[1], 100, 1);

		let updates = tracker.resolve_deferred(&zones).unwrap();
		assert_eq!(updates.len(), 1);
		assert_eq!(updates[0].value, 70);
		assert_eq!(updates[0].position, 210);
	}

	#[test_log::test]
	fn deferred_is_wrong_on_partial_commit() {
		let mut zones = vec![
			Zone::new("a", 10, 20),
			Zone::new("b", 40, 10),
			Zone::new("data", 100, 50).anchor(),
		];

		let mut tracker = DependencyTracker::new();
		tracker.add_post_processing_index(Field::u32_be(0), 120, false, "data", "a", None, None);

		// Only "a" is settled, "b" hasn't moved the data yet
		commit(&mut zones[0], 25, 1);
		let early = tracker.clone().resolve_deferred(&zones).unwrap();

		commit(&mut zones[1], 15, 1);
		commit(&mut zones[2], 50, 1);
		let settled = tracker.resolve_deferred(&zones).unwrap();

		assert_eq!(early[0].value, 125);
		assert_eq!(settled[0].value, 130);
		assert_ne!(early[0].value, settled[0].value);
	}
}
