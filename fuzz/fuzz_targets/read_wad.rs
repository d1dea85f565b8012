#![no_main]
use libfuzzer_sys::fuzz_target;

use std::io::Cursor;

use quake_wad::WadArchive;

fuzz_target!(|data: &[u8]| {
	let mut cursor = Cursor::new(data);
	let wad = WadArchive::read_from(&mut cursor);

	if let Ok(wad) = wad {
		let _ = wad.to_bytes();
	};
});
