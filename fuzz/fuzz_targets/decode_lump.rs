#![no_main]
use libfuzzer_sys::fuzz_target;

use quake_wad::{Lump, LumpType};

fuzz_target!(|input: (u8, &[u8])| {
	let (code, data) = input;
	let _ = Lump::decode(LumpType::from(code), data);
});
