use super::{Committed, PADDING_ZONE, Zone, corrected_offset, shift_at};
use crate::dependency::{DependencyTracker, FieldUpdate};
use crate::error::{ErrorKind, Result, SurgeonError};

use std::collections::BTreeSet;

/// An ordered collection of [`Zone`]s, along with the fields that depend on them
///
/// Zones are kept in physical order: increasing original offset, with virtual zones placed before
/// a non-virtual zone sharing their offset.
///
/// A registry is built while reading a single file, and consumed by a single write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneRegistry {
	zones: Vec<Zone>,
	dependencies: DependencyTracker,
}

impl ZoneRegistry {
	/// Create an empty `ZoneRegistry`
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a new zone
	///
	/// Returns `false` if a zone with the same name already exists, in which case the registry is
	/// left untouched.
	///
	/// # Errors
	///
	/// The zone overlaps an existing zone ([`ErrorKind::OverlappingZones`])
	///
	/// # Examples
	///
	/// ```rust
	/// # fn main() -> tag_surgeon::error::Result<()> {
	/// use tag_surgeon::zone::{Zone, ZoneRegistry};
	///
	/// let mut registry = ZoneRegistry::new();
	///
	/// assert!(registry.add_zone(Zone::new("comments", 42, 120))?);
	///
	/// // Names are unique
	/// assert!(!registry.add_zone(Zone::new("comments", 500, 10))?);
	///
	/// // Zones can't overlap
	/// assert!(registry.add_zone(Zone::new("picture", 100, 10)).is_err());
	/// # Ok(()) }
	/// ```
	pub fn add_zone(&mut self, zone: Zone) -> Result<bool> {
		if self.get_zone(&zone.name).is_some() {
			log::warn!("Zone \"{}\" is already registered, ignoring", zone.name);
			return Ok(false);
		}

		if let Some(existing) = self.zones.iter().find(|existing| existing.overlaps(&zone)) {
			log::error!(
				"Zone \"{}\" ({}..{}) overlaps \"{}\" ({}..{})",
				zone.name,
				zone.offset,
				zone.end(),
				existing.name,
				existing.offset,
				existing.end()
			);
			return Err(SurgeonError::new(ErrorKind::OverlappingZones(zone.name)));
		}

		log::trace!(
			"Registering zone \"{}\" ({}..{}, dynamic: {})",
			zone.name,
			zone.offset,
			zone.end(),
			zone.dynamic
		);

		let position = self
			.zones
			.iter()
			.position(|existing| !zone.sorts_after(existing))
			.unwrap_or(self.zones.len());
		self.zones.insert(position, zone);

		Ok(true)
	}

	/// Remove a zone, along with every reference that targets it or is owned by it
	pub fn remove_zone(&mut self, name: &str) -> Option<Zone> {
		let index = self.index_of(name)?;

		log::debug!("Removing zone \"{name}\"");

		self.dependencies.detach(name);
		Some(self.zones.remove(index))
	}

	/// Remove every zone whose name starts with `prefix`
	///
	/// Returns the number of zones removed.
	///
	/// # Examples
	///
	/// ```rust
	/// # fn main() -> tag_surgeon::error::Result<()> {
	/// use tag_surgeon::zone::{Zone, ZoneRegistry};
	///
	/// let mut registry = ZoneRegistry::new();
	/// registry.add_zone(Zone::new("picture.0", 0, 10))?;
	/// registry.add_zone(Zone::new("picture.1", 10, 10))?;
	/// registry.add_zone(Zone::new("comments", 20, 10))?;
	///
	/// assert_eq!(registry.remove_zones_with_prefix("picture."), 2);
	/// assert_eq!(registry.len(), 1);
	/// # Ok(()) }
	/// ```
	pub fn remove_zones_with_prefix(&mut self, prefix: &str) -> usize {
		let names = self
			.zones
			.iter()
			.filter(|zone| zone.name.starts_with(prefix))
			.map(|zone| zone.name.clone())
			.collect::<Vec<_>>();

		for name in &names {
			self.remove_zone(name);
		}

		names.len()
	}

	/// Get a zone by name
	pub fn get_zone(&self, name: &str) -> Option<&Zone> {
		self.zones.iter().find(|zone| zone.name == name)
	}

	/// The names of every registered zone
	pub fn zone_names(&self) -> BTreeSet<&str> {
		self.zones.iter().map(|zone| zone.name.as_str()).collect()
	}

	/// All zones, in physical order
	pub fn zones(&self) -> impl Iterator<Item = &Zone> {
		self.zones.iter()
	}

	/// The number of registered zones
	pub fn len(&self) -> usize {
		self.zones.len()
	}

	/// Whether no zones are registered
	pub fn is_empty(&self) -> bool {
		self.zones.is_empty()
	}

	/// The designated [padding zone](PADDING_ZONE), if one is registered
	pub fn padding_zone(&self) -> Option<&Zone> {
		self.get_zone(PADDING_ZONE)
	}

	/// The current offset of a zone
	///
	/// Before a write, this is the original offset. During and after a write, this accounts for
	/// the size changes of every committed zone before it.
	///
	/// # Examples
	///
	/// ```rust
	/// # fn main() -> tag_surgeon::error::Result<()> {
	/// use tag_surgeon::zone::{Zone, ZoneRegistry};
	///
	/// let mut registry = ZoneRegistry::new();
	/// registry.add_zone(Zone::new("comments", 42, 120))?;
	///
	/// assert_eq!(registry.corrected_offset("comments"), Some(42));
	/// assert_eq!(registry.corrected_offset("nothing"), None);
	/// # Ok(()) }
	/// ```
	pub fn corrected_offset(&self, name: &str) -> Option<i64> {
		self.index_of(name)
			.map(|index| corrected_offset(&self.zones, index))
	}

	/// How far the byte originally at `position` has moved so far
	pub fn shift_at(&self, position: u64) -> i64 {
		shift_at(&self.zones, position)
	}

	/// Whether the zone has been committed
	pub fn is_committed(&self, name: &str) -> bool {
		self.get_zone(name)
			.is_some_and(|zone| zone.committed.is_some())
	}

	/// The size change introduced by a committed zone
	pub fn committed_delta(&self, name: &str) -> Option<i64> {
		self.get_zone(name)
			.filter(|zone| zone.committed.is_some())
			.map(Zone::delta)
	}

	/// The fields depending on the registered zones
	pub fn dependencies(&self) -> &DependencyTracker {
		&self.dependencies
	}

	/// Mutable access to the fields depending on the registered zones
	///
	/// # Examples
	///
	/// ```rust
	/// # fn main() -> tag_surgeon::error::Result<()> {
	/// use tag_surgeon::dependency::Field;
	/// use tag_surgeon::zone::{Zone, ZoneRegistry};
	///
	/// let mut registry = ZoneRegistry::new();
	/// registry.add_zone(Zone::new("ilst", 1024, 300))?;
	///
	/// // The `meta` atom holding the `ilst` atom
	/// registry.dependencies_mut().add_size(Field::u32_be(990), 334, "ilst", Some("meta"));
	/// # Ok(()) }
	/// ```
	pub fn dependencies_mut(&mut self) -> &mut DependencyTracker {
		&mut self.dependencies
	}

	pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
		self.zones.iter().position(|zone| zone.name == name)
	}

	pub(crate) fn zone_at(&self, index: usize) -> &Zone {
		&self.zones[index]
	}

	pub(crate) fn corrected_offset_at(&self, index: usize) -> i64 {
		corrected_offset(&self.zones, index)
	}

	pub(crate) fn commit(&mut self, index: usize, size: u64, items: u32) {
		let zone = &mut self.zones[index];

		log::trace!(
			"Committing zone \"{}\" ({} -> {size} bytes, {} -> {items} items)",
			zone.name,
			zone.size,
			zone.items
		);

		zone.committed = Some(Committed { size, items });
	}

	pub(crate) fn validate(&self) -> Result<()> {
		self.dependencies.validate(&self.zones)
	}

	pub(crate) fn resolve_ready(&mut self) -> Result<Vec<FieldUpdate>> {
		self.dependencies.resolve_ready(&self.zones)
	}

	pub(crate) fn resolve_deferred(&mut self) -> Result<Vec<FieldUpdate>> {
		self.dependencies.resolve_deferred(&self.zones)
	}
}
