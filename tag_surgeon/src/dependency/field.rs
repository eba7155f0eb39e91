use crate::error::{ErrorKind, Result, SurgeonError};
use crate::util::synchsafe::SynchsafeInteger;

use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

/// The byte order of an integer field
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endian {
	/// Most significant byte first
	Big,
	/// Least significant byte first
	Little,
}

/// How the integer stored in a dependent field is encoded
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldFormat {
	/// A single byte
	U8,
	/// A 16-bit integer
	U16(Endian),
	/// A 24-bit integer (FLAC block sizes)
	U24(Endian),
	/// A 32-bit integer
	U32(Endian),
	/// A 64-bit integer
	U64(Endian),
	/// A 28-bit synchsafe integer stored in 4 bytes (ID3v2 sizes)
	Synchsafe32,
	/// An EBML variable size integer with a fixed octet length (1..=8)
	///
	/// The field keeps its original length, so the marker bit never moves.
	Vint(u8),
}

impl FieldFormat {
	/// The number of bytes the field occupies
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::dependency::{Endian, FieldFormat};
	///
	/// assert_eq!(FieldFormat::U24(Endian::Big).width(), 3);
	/// assert_eq!(FieldFormat::Synchsafe32.width(), 4);
	/// assert_eq!(FieldFormat::Vint(2).width(), 2);
	/// ```
	pub fn width(self) -> u8 {
		match self {
			Self::U8 => 1,
			Self::U16(_) => 2,
			Self::U24(_) => 3,
			Self::U32(_) | Self::Synchsafe32 => 4,
			Self::U64(_) => 8,
			Self::Vint(width) => width,
		}
	}

	/// The largest value the field can hold
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::dependency::FieldFormat;
	///
	/// assert_eq!(FieldFormat::Synchsafe32.max_value(), 0x0FFF_FFFF);
	///
	/// // All ones is reserved for "unknown" sizes
	/// assert_eq!(FieldFormat::Vint(1).max_value(), 0x7E);
	/// ```
	pub fn max_value(self) -> u64 {
		match self {
			Self::U8 => u64::from(u8::MAX),
			Self::U16(_) => u64::from(u16::MAX),
			Self::U24(_) => 0xFF_FFFF,
			Self::U32(_) => u64::from(u32::MAX),
			Self::U64(_) => u64::MAX,
			Self::Synchsafe32 => 0x0FFF_FFFF,
			Self::Vint(width) => (1u64 << (7 * u32::from(width.clamp(1, 8)))) - 2,
		}
	}

	/// Read the value of a field
	///
	/// # Errors
	///
	/// * `reader` does not contain enough data
	/// * [`FieldFormat::Vint`] has an invalid length, or its marker bit is missing
	pub fn read_from<R>(self, reader: &mut R) -> Result<u64>
	where
		R: Read,
	{
		let value = match self {
			Self::U8 => u64::from(reader.read_u8()?),
			Self::U16(Endian::Big) => u64::from(reader.read_u16::<BigEndian>()?),
			Self::U16(Endian::Little) => u64::from(reader.read_u16::<LittleEndian>()?),
			Self::U24(Endian::Big) => u64::from(reader.read_u24::<BigEndian>()?),
			Self::U24(Endian::Little) => u64::from(reader.read_u24::<LittleEndian>()?),
			Self::U32(Endian::Big) => u64::from(reader.read_u32::<BigEndian>()?),
			Self::U32(Endian::Little) => u64::from(reader.read_u32::<LittleEndian>()?),
			Self::U64(Endian::Big) => reader.read_u64::<BigEndian>()?,
			Self::U64(Endian::Little) => reader.read_u64::<LittleEndian>()?,
			Self::Synchsafe32 => u64::from(reader.read_u32::<BigEndian>()?.unsynch()),
			Self::Vint(width) => {
				if !(1..=8).contains(&width) {
					return Err(SurgeonError::new(ErrorKind::SizeMismatch));
				}

				let raw = reader.read_uint::<BigEndian>(usize::from(width))?;
				let marker = 1u64 << (7 * u32::from(width));
				if raw & marker == 0 || raw >= marker << 1 {
					return Err(SurgeonError::new(ErrorKind::SizeMismatch));
				}

				raw ^ marker
			},
		};

		Ok(value)
	}

	/// Write a value to a field
	///
	/// `location` is only used for error reporting.
	///
	/// # Errors
	///
	/// * `value` doesn't fit in the field ([`ErrorKind::FieldOverflow`])
	/// * `writer` fails to write
	pub fn write_to<W>(self, writer: &mut W, location: u64, value: i64) -> Result<()>
	where
		W: Write,
	{
		let Ok(unsigned) = u64::try_from(value) else {
			return Err(SurgeonError::new(ErrorKind::FieldOverflow { location, value }));
		};

		if unsigned > self.max_value() || (matches!(self, Self::Vint(w) if !(1..=8).contains(&w))) {
			return Err(SurgeonError::new(ErrorKind::FieldOverflow { location, value }));
		}

		match self {
			Self::U8 => writer.write_u8(unsigned as u8)?,
			Self::U16(Endian::Big) => writer.write_u16::<BigEndian>(unsigned as u16)?,
			Self::U16(Endian::Little) => writer.write_u16::<LittleEndian>(unsigned as u16)?,
			Self::U24(Endian::Big) => writer.write_u24::<BigEndian>(unsigned as u32)?,
			Self::U24(Endian::Little) => writer.write_u24::<LittleEndian>(unsigned as u32)?,
			Self::U32(Endian::Big) => writer.write_u32::<BigEndian>(unsigned as u32)?,
			Self::U32(Endian::Little) => writer.write_u32::<LittleEndian>(unsigned as u32)?,
			Self::U64(Endian::Big) => writer.write_u64::<BigEndian>(unsigned)?,
			Self::U64(Endian::Little) => writer.write_u64::<LittleEndian>(unsigned)?,
			Self::Synchsafe32 => writer.write_u32::<BigEndian>((unsigned as u32).synch()?)?,
			Self::Vint(width) => {
				let marker = 1u64 << (7 * u32::from(width));
				writer.write_uint::<BigEndian>(unsigned | marker, usize::from(width))?
			},
		}

		Ok(())
	}
}

/// The location and encoding of a dependent field
///
/// The location is the **original** absolute offset of the field, as found while parsing. The
/// engine keeps track of where the field ends up as the file is modified.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
	pub(crate) location: u64,
	pub(crate) format: FieldFormat,
}

impl Field {
	/// Create a new `Field`
	///
	/// # Examples
	///
	/// ```rust
	/// use tag_surgeon::dependency::{Endian, Field, FieldFormat};
	///
	/// let flac_block_size = Field::new(42, FieldFormat::U24(Endian::Big));
	/// assert_eq!(flac_block_size.location(), 42);
	/// ```
	pub const fn new(location: u64, format: FieldFormat) -> Self {
		Self { location, format }
	}

	/// A big endian 32-bit field (MP4 atom sizes and chunk offsets)
	pub const fn u32_be(location: u64) -> Self {
		Self::new(location, FieldFormat::U32(Endian::Big))
	}

	/// A big endian 64-bit field (MP4 extended sizes and chunk offsets)
	pub const fn u64_be(location: u64) -> Self {
		Self::new(location, FieldFormat::U64(Endian::Big))
	}

	/// A little endian 32-bit field (RIFF/ASF style sizes and counters)
	pub const fn u32_le(location: u64) -> Self {
		Self::new(location, FieldFormat::U32(Endian::Little))
	}

	/// An ID3v2 synchsafe size
	pub const fn synchsafe(location: u64) -> Self {
		Self::new(location, FieldFormat::Synchsafe32)
	}

	/// The original absolute location of the field
	pub fn location(&self) -> u64 {
		self.location
	}

	/// The encoding of the field
	pub fn format(&self) -> FieldFormat {
		self.format
	}

	/// The original end of the field (exclusive)
	pub fn end(&self) -> u64 {
		self.location + u64::from(self.format.width())
	}
}
