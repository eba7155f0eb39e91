use std::fs::File;
use std::io::{Read as _, Seek as _, Write as _};

/// Create a new temporary file holding `content`
pub fn temp_file(content: &[u8]) -> File {
	let mut file = tempfile::tempfile().unwrap();
	file.write_all(content).unwrap();
	file.rewind().unwrap();

	file
}

/// Read the entire file, leaving it rewound
pub fn contents(file: &mut File) -> Vec<u8> {
	file.rewind().unwrap();

	let mut content = Vec::new();
	file.read_to_end(&mut content).unwrap();
	file.rewind().unwrap();

	content
}

/// The position of the first occurrence of `needle` in `haystack`
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
	haystack
		.windows(needle.len())
		.position(|window| window == needle)
		.unwrap_or_else(|| panic!("{:?} not found", needle.escape_ascii().to_string()))
}

pub fn read_u32(content: &[u8], at: usize) -> u32 {
	u32::from_be_bytes(content[at..at + 4].try_into().unwrap())
}

/// Verify that `items` holds exactly the `(key, value)` pairs of `expected`, in order
pub fn verify_items(tag: &tag_surgeon::tag::TagData, expected: &[(&str, &str)]) {
	let items = tag
		.items()
		.map(|item| (item.key(), item.value()))
		.collect::<Vec<_>>();

	assert_eq!(items, expected);
}
