use crate::config::WriteOptions;

/// Decide the new size of the padding zone
///
/// * `current` - The original padding size
/// * `net_delta` - The combined size change of the other zones adjacent to the padding
/// * `min_size` - The smallest non-empty padding (the length of its core signature)
/// * `max_size` - The largest padding the format can describe
///
/// Whatever part of `net_delta` the padding can't cancel out ends up as a shift of the file.
pub(crate) fn absorb(
	current: u64,
	net_delta: i64,
	min_size: u64,
	max_size: Option<u64>,
	options: &WriteOptions,
) -> u64 {
	if net_delta == 0 {
		return current;
	}

	let mut upper = match options.max_padding {
		Some(max) => u64::from(max).max(current),
		None => u64::MAX,
	};
	if let Some(max_size) = max_size {
		upper = upper.min(max_size);
	}

	let mut target = (current as i64 - net_delta).clamp(0, upper.min(i64::MAX as u64) as i64) as u64;

	// Too small to hold the padding header
	if target > 0 && target < min_size {
		target = 0;
	}

	let spilled = current as i64 - net_delta != target as i64;
	if spilled && net_delta > 0 && options.refill_padding {
		if let Some(preferred) = options.preferred_padding {
			let preferred = u64::from(preferred).max(min_size).min(upper);
			log::debug!("Padding exhausted, refilling it to {preferred} bytes");
			target = preferred;
		}
	}

	log::trace!("Padding: {current} -> {target} bytes (net delta of other zones: {net_delta})");

	target
}
