use crate::dependency::FieldUpdate;
use crate::error::Result;

use std::io::{Seek, SeekFrom, Write};

/// Write computed field values at their current positions
pub(crate) fn write_updates<F>(file: &mut F, updates: &[FieldUpdate]) -> Result<()>
where
	F: Write + Seek,
{
	let mut encoded = Vec::with_capacity(8);
	for update in updates {
		encoded.clear();
		update
			.field
			.format
			.write_to(&mut encoded, update.field.location, update.value)?;

		log::trace!(
			"Patching field at {} (now at {}) with {}",
			update.field.location,
			update.position,
			update.value
		);

		file.seek(SeekFrom::Start(update.position))?;
		file.write_all(&encoded)?;
	}

	Ok(())
}

/// Make sure every value fits in its field, without touching the file
pub(crate) fn check_updates(updates: &[FieldUpdate]) -> Result<()> {
	let mut scratch = Vec::with_capacity(8);
	for update in updates {
		scratch.clear();
		update
			.field
			.format
			.write_to(&mut scratch, update.field.location, update.value)?;
	}

	Ok(())
}
