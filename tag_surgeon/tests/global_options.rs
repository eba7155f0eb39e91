#![allow(missing_docs)]

use tag_surgeon::config::{GlobalOptions, WriteOptions, apply_global_options};
use tag_surgeon::error::ErrorKind;
use tag_surgeon::producer::{WriteResult, produce_fn};
use tag_surgeon::surgeon::FileSurgeon;
use tag_surgeon::zone::{Zone, ZoneRegistry};

use std::io::Cursor;

use rusty_fork::rusty_fork_test;

fn rewrite(zone_size: usize) -> tag_surgeon::error::Result<Vec<u8>> {
	let mut file = Cursor::new(vec![b'a'; zone_size + 4]);

	let mut registry = ZoneRegistry::new();
	registry.add_zone(Zone::new("zone", 0, zone_size as u64))?;

	let mut producer = produce_fn(|out: &mut Vec<u8>, text: &str, _request, _session| {
		out.extend_from_slice(text.as_bytes());
		Ok(WriteResult::replace(1))
	});

	FileSurgeon::new(WriteOptions::default()).rewrite(&mut file, registry, &mut producer, "b")?;
	Ok(file.into_inner())
}

rusty_fork_test! {
	#[test_log::test]
	fn zone_over_allocation_limit() {
		apply_global_options(GlobalOptions::new().allocation_limit(64));

		assert_eq!(rewrite(64).unwrap(), b"baaaa");

		let err = rewrite(65).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::TooMuchData));
	}
}
