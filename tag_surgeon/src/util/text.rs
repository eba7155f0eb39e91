use crate::error::{ErrorKind, Result, SurgeonError};
use crate::macros::err;

/// The text encodings used by ID3v2 text frames
#[derive(Debug, Clone, Eq, PartialEq, Copy, Hash)]
#[repr(u8)]
pub(crate) enum TextEncoding {
	/// ISO-8859-1
	Latin1 = 0,
	/// UTF-16 with a byte order mark
	UTF16 = 1,
	/// UTF-16 big endian (ID3v2.4 only)
	UTF16BE = 2,
	/// UTF-8 (ID3v2.4 only)
	UTF8 = 3,
}

impl TextEncoding {
	pub(crate) fn from_u8(byte: u8) -> Option<Self> {
		match byte {
			0 => Some(Self::Latin1),
			1 => Some(Self::UTF16),
			2 => Some(Self::UTF16BE),
			3 => Some(Self::UTF8),
			_ => None,
		}
	}

	pub(crate) fn verify_latin1(text: &str) -> bool {
		text.chars().all(|c| c as u32 <= 255)
	}

	/// Encode `text`, without a terminator
	///
	/// Text that can't be represented in Latin-1 is an error.
	pub(crate) fn encode(self, text: &str) -> Result<Vec<u8>> {
		match self {
			TextEncoding::Latin1 => latin1_encode(text)
				.ok_or_else(|| SurgeonError::new(ErrorKind::TextDecode("Text is not valid Latin-1"))),
			TextEncoding::UTF16 => Ok(utf16_encode(text, u16::to_le_bytes, true)),
			TextEncoding::UTF16BE => Ok(utf16_encode(text, u16::to_be_bytes, false)),
			TextEncoding::UTF8 => Ok(text.as_bytes().to_vec()),
		}
	}
}

/// Decode an entire buffer, trimming any trailing nulls
pub(crate) fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String> {
	let mut text = match encoding {
		TextEncoding::Latin1 => latin1_decode(bytes),
		TextEncoding::UTF16 => {
			if bytes.is_empty() {
				return Ok(String::new());
			}

			if bytes.len() < 2 {
				err!(TextDecode("UTF-16 string has an invalid length (< 2)"));
			}

			match [bytes[0], bytes[1]] {
				[0xFE, 0xFF] => utf16_decode_bytes(&bytes[2..], u16::from_be_bytes)?,
				[0xFF, 0xFE] => utf16_decode_bytes(&bytes[2..], u16::from_le_bytes)?,
				_ => err!(TextDecode("UTF-16 string has an invalid byte order mark")),
			}
		},
		TextEncoding::UTF16BE => utf16_decode_bytes(bytes, u16::from_be_bytes)?,
		TextEncoding::UTF8 => String::from_utf8(bytes.to_vec())?,
	};

	trim_end_nulls(&mut text);
	Ok(text)
}

pub(crate) fn latin1_decode(bytes: &[u8]) -> String {
	bytes.iter().map(|c| char::from(*c)).collect::<String>()
}

pub(crate) fn latin1_encode(text: &str) -> Option<Vec<u8>> {
	text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

fn utf16_decode_bytes(bytes: &[u8], endianness: fn([u8; 2]) -> u16) -> Result<String> {
	if bytes.len() % 2 != 0 {
		err!(TextDecode("UTF-16 string has an odd length"));
	}

	let words = bytes
		.chunks_exact(2)
		// Multiple values may be separated by nulls, each with their own BOM
		.filter_map(|c| match c {
			[0xFF, 0xFE] | [0xFE, 0xFF] => None,
			[a, b] => Some(endianness([*a, *b])),
			_ => None,
		})
		.collect::<Vec<u16>>();

	String::from_utf16(&words)
		.map_err(|_| SurgeonError::new(ErrorKind::TextDecode("Given an invalid UTF-16 string")))
}

fn utf16_encode(text: &str, endianness: fn(u16) -> [u8; 2], bom: bool) -> Vec<u8> {
	let mut encoded = Vec::<u8>::new();

	if bom {
		encoded.extend_from_slice(&endianness(0xFEFF_u16));
	}

	for ch in text.encode_utf16() {
		encoded.extend_from_slice(&endianness(ch));
	}

	encoded
}

fn trim_end_nulls(text: &mut String) {
	if text.ends_with('\0') {
		let new_len = text.trim_end_matches('\0').len();
		text.truncate(new_len);
	}
}
