use crate::error::{Result, SurgeonError};
use crate::macros::try_vec;
use crate::util::io::{FileLike, Length, Truncate};

use std::io::{Seek, SeekFrom};

/// Move every byte from `from` to the end of the file by `delta` bytes
///
/// Growing copies backwards from the end of the file so nothing gets overwritten before it is
/// moved, shrinking copies forwards and truncates the leftover tail. Only `buffer_size` bytes are
/// held in memory at any time.
///
/// Returns the number of bytes moved.
pub(crate) fn shift_tail<F>(
	file: &mut F,
	from: u64,
	delta: i64,
	file_len: u64,
	buffer_size: usize,
) -> Result<u64>
where
	F: FileLike,
	SurgeonError: From<<F as Truncate>::Error>,
	SurgeonError: From<<F as Length>::Error>,
{
	let tail_len = file_len.saturating_sub(from);

	log::trace!("Shifting {tail_len} bytes at {from} by {delta}");

	if delta == 0 {
		return Ok(0);
	}

	let mut buffer = try_vec![0; buffer_size.min(tail_len as usize).max(1)];

	if delta > 0 {
		let delta = delta as u64;

		let mut position = file_len;
		while position > from {
			let chunk = (position - from).min(buffer.len() as u64);
			position -= chunk;

			let chunk = &mut buffer[..chunk as usize];
			file.seek(SeekFrom::Start(position))?;
			file.read_exact(chunk)?;
			file.seek(SeekFrom::Start(position + delta))?;
			file.write_all(chunk)?;
		}

		return Ok(tail_len);
	}

	let delta = delta.unsigned_abs();
	if delta > from {
		return Err(SurgeonError::new(crate::error::ErrorKind::SizeMismatch));
	}

	let mut position = from;
	while position < file_len {
		let chunk = (file_len - position).min(buffer.len() as u64);

		let chunk_buf = &mut buffer[..chunk as usize];
		file.seek(SeekFrom::Start(position))?;
		file.read_exact(chunk_buf)?;
		file.seek(SeekFrom::Start(position - delta))?;
		file.write_all(chunk_buf)?;

		position += chunk;
	}

	file.truncate(file_len - delta)?;

	Ok(tail_len)
}
