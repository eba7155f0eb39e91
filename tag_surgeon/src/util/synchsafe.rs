//! Synchsafe integers, as used by ID3v2 sizes
//!
//! A synchsafe integer only uses the lower 7 bits of every byte, so it never contains a byte
//! sequence that could be mistaken for an MPEG frame sync.

use crate::error::Result;
use crate::macros::err;

/// Conversions to and from synchsafe integers
pub(crate) trait SynchsafeInteger: Sized {
	/// Create a synchsafe integer from a plain one
	///
	/// # Errors
	///
	/// The integer doesn't fit in the available bits (28 for a `u32`)
	fn synch(self) -> Result<Self>;

	/// Get the plain integer back out of a synchsafe one
	fn unsynch(self) -> Self;
}

impl SynchsafeInteger for u32 {
	fn synch(self) -> Result<Self> {
		// 7 bits are available per byte, shave off 1 bit per byte
		const MAXIMUM_INTEGER: u32 = u32::MAX >> 4;

		if self > MAXIMUM_INTEGER {
			err!(TooMuchData);
		}

		Ok((self & 0x7F)
			| ((self & (0x7F << 7)) << 1)
			| ((self & (0x7F << 14)) << 2)
			| ((self & (0x7F << 21)) << 3))
	}

	fn unsynch(self) -> Self {
		((self & 0x7F00_0000) >> 3) | ((self & 0x7F_0000) >> 2) | ((self & 0x7F00) >> 1) | (self & 0x7F)
	}
}

#[cfg(test)]
mod tests {
	use super::SynchsafeInteger;

	#[test_log::test]
	fn u32_synch() {
		assert_eq!(0x0FFF_FFFF_u32.synch().unwrap(), 0x7F7F_7F7F);
		assert_eq!(0x0A2B_3C4D_u32.synch().unwrap(), 0x512C_784D);
		assert!(0x1000_0000_u32.synch().is_err());
	}

	#[test_log::test]
	fn u32_unsynch() {
		assert_eq!(0x7F7F_7F7F_u32.unsynch(), 0x0FFF_FFFF);
		assert_eq!(0x512C_784D_u32.unsynch(), 0x0A2B_3C4D);
	}
}
