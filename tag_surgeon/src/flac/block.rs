use crate::error::Result;
use crate::macros::{err, try_vec};

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

pub(in crate::flac) const BLOCK_ID_STREAMINFO: u8 = 0;
pub(in crate::flac) const BLOCK_ID_PADDING: u8 = 1;
pub(in crate::flac) const BLOCK_ID_VORBIS_COMMENTS: u8 = 4;

pub(in crate::flac) const BLOCK_HEADER_LEN: u64 = 4;
pub(in crate::flac) const LAST_BLOCK_FLAG: u8 = 0x80;

pub(in crate::flac) const MAX_BLOCK_LEN: usize = 0xFF_FFFF;

pub(crate) struct Block {
	pub(super) ty: u8,
	pub(super) last: bool,
	pub(crate) content: Vec<u8>,
	pub(super) start: u64,
	pub(super) end: u64,
}

impl Block {
	pub(crate) fn read<R, P>(data: &mut R, mut predicate: P) -> Result<Self>
	where
		R: Read + Seek,
		P: FnMut(u8) -> bool,
	{
		let start = data.stream_position()?;

		let byte = data.read_u8()?;
		let last = (byte & LAST_BLOCK_FLAG) != 0;
		let ty = byte & !LAST_BLOCK_FLAG;

		let size = data.read_u24::<BigEndian>()?;
		log::trace!("Reading FLAC block, type: {ty}, size: {size}");

		let mut content;
		if predicate(ty) {
			content = try_vec![0; size as usize];
			data.read_exact(&mut content)?;
		} else {
			content = Vec::new();
			data.seek(SeekFrom::Current(i64::from(size)))?;
		}

		let end = data.stream_position()?;

		Ok(Self {
			ty,
			last,
			content,
			start,
			end,
		})
	}

	pub(super) fn len(&self) -> u64 {
		self.end - self.start
	}
}

/// Write a block header, the "last block" bit is always cleared
pub(super) fn write_block_header<W>(writer: &mut W, ty: u8, content_len: usize) -> Result<()>
where
	W: Write,
{
	if content_len > MAX_BLOCK_LEN {
		log::error!("FLAC block (type: {ty}) is too large ({content_len} bytes)");
		err!(TooMuchData);
	}

	writer.write_u8(ty & !LAST_BLOCK_FLAG)?;
	writer.write_u24::<BigEndian>(content_len as u32)?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::{Block, write_block_header};

	use std::io::Cursor;

	#[test_log::test]
	fn read_skipped_block() {
		let mut data = Cursor::new(b"\x81\0\0\x03\0\0\0\x04".to_vec());

		let block = Block::read(&mut data, |_| false).unwrap();
		assert!(block.last);
		assert_eq!(block.ty, 1);
		assert!(block.content.is_empty());
		assert_eq!(block.len(), 7);
	}

	#[test_log::test]
	fn header_size_limit() {
		let mut out = Vec::new();
		write_block_header(&mut out, 4, 0x10203).unwrap();
		assert_eq!(out, [4, 0x01, 0x02, 0x03]);

		assert!(write_block_header(&mut Vec::new(), 4, 0x100_0000).is_err());
	}
}
