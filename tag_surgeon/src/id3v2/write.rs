use super::frame::{encode_text_frame, is_text_frame_id, parse_frames, write_frame};
use super::header::Id3v2Version;
use super::{FRAMES_ZONE, TAG_ZONE};
use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{encode_err, err};
use crate::producer::{WriteResult, WriteSession, ZoneProducer, ZoneRequest};
use crate::tag::TagData;
use crate::util::synchsafe::SynchsafeInteger;
use crate::zone::PADDING_ZONE;

use byteorder::{BigEndian, WriteBytesExt};

/// Produces the zones of an ID3v2 tag
///
/// Text items are written as text frames, grouped by key. Every other frame of the original tag
/// is kept as is.
///
/// New tags are written as ID3v2.4, with [`WriteOptions::preferred_padding`] bytes of padding.
///
/// [`WriteOptions::preferred_padding`]: crate::config::WriteOptions::preferred_padding
#[derive(Debug, Clone, Copy, Default)]
pub struct Id3v2Producer;

impl Id3v2Producer {
	/// Create a new `Id3v2Producer`
	pub fn new() -> Self {
		Self
	}
}

impl ZoneProducer<TagData> for Id3v2Producer {
	fn produce(
		&mut self,
		out: &mut Vec<u8>,
		tag: &TagData,
		request: &ZoneRequest<'_>,
		session: &mut WriteSession,
	) -> Result<WriteResult> {
		let zone = request.zone();
		match zone.name() {
			FRAMES_ZONE => {
				let Some(version) = u8::try_from(zone.tag())
					.ok()
					.and_then(Id3v2Version::from_major)
				else {
					encode_err!(@BAIL "ID3v2: Frame zone has no valid version");
				};

				let written = produce_frames(out, tag, request.original(), version)?;
				Ok(WriteResult::replace(written))
			},
			PADDING_ZONE => {
				let padding = request.padding_size().unwrap_or(0);
				out.resize(padding as usize, 0);
				Ok(WriteResult::replace(1))
			},
			TAG_ZONE => {
				let mut frames = Vec::new();
				let written = produce_frames(&mut frames, tag, &[], Id3v2Version::V4)?;
				if written == 0 {
					return Ok(WriteResult::replace(0));
				}

				let padding = session.options().preferred_padding.unwrap_or(0) as usize;

				let Ok(size) = u32::try_from(frames.len() + padding) else {
					err!(TooMuchData);
				};

				log::debug!("Creating an ID3v2.4 tag ({written} frames, {padding} bytes of padding)");

				out.extend_from_slice(b"ID3\x04\0\0");
				out.write_u32::<BigEndian>(size.synch()?)?;
				out.extend_from_slice(&frames);
				out.resize(out.len() + padding, 0);

				Ok(WriteResult::replace(written))
			},
			_ => encode_err!(@BAIL "ID3v2: Asked to produce an unknown zone"),
		}
	}
}

fn produce_frames(
	out: &mut Vec<u8>,
	tag: &TagData,
	original: &[u8],
	version: Id3v2Version,
) -> Result<u32> {
	let mut written = 0;

	let mut keys = Vec::new();
	for item in tag.items() {
		if !keys.contains(&item.key()) {
			keys.push(item.key());
		}
	}

	for key in keys {
		if !is_text_frame_id(key) {
			log::warn!("Skipping item \"{key}\", it isn't an ID3v2 text frame");
			continue;
		}

		let values = tag.get_all(key).collect::<Vec<_>>();
		let content = encode_text_frame(&values, version)?;

		let mut id = [0; 4];
		id.copy_from_slice(key.as_bytes());

		write_frame(out, &id, 0, &content, version)?;
		written += 1;
	}

	// The original frames were already validated while reading
	let (frames, _) = parse_frames(original, version, ParsingMode::BestAttempt)?;
	for frame in frames.iter().filter(|frame| !frame.is_editable(version)) {
		write_frame(out, &frame.id, frame.flags, frame.content, version)?;
		written += 1;
	}

	Ok(written)
}
