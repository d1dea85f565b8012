use std::io::BufReader;

use quake_wad::*;
use anyhow::{Context, Result as AnyhowResult};


pub fn command_info(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let brief = matches.is_present("brief");

	let mut result = Ok(());

	for path in matches.values_of("input").expect("INPUT required") {
		let result_now = wad_path_info(path, brief);

		if let Err(ref e) = result_now {
			tracing::error!("{:?}", e);
			result = result_now;
		};
	};

	result
}


fn wad_path_info(path: &str, brief: bool) -> AnyhowResult<()> {
	let brief_prefix = if brief {
		"".to_string()
	}
	else {
		format!("{}: ", path)
	};

	let file = std::fs::File::open(path).with_context(|| format!("Could not open file: {path}"))?;
	let filesize = file.metadata().with_context(|| format!("Could not read metadata to determine size: {path}"))?.len();
	let wad = WadArchive::read_from(&mut BufReader::new(file)).with_context(|| format!("Could not read WadArchive: {path}"))?;

	println!("{brief_prefix}File size: {filesize} (0x{filesize:X})");
	println!("{brief_prefix}Lumps: {}", wad.lumps.len());

	let decoder = WadDecoder::with_wad(wad);

	for (pos, lump) in decoder.wad().lumps.iter().enumerate() {
		let lump = match lump {
			Ok(lump) => lump,
			Err(e) => {
				println!("{brief_prefix}Lump #{} ERROR {e}", pos+1);
				continue;
			},
		};

		let name = lump.name_lossy();

		match decoder.decode_nth(pos) {
			Ok(decoded) => {
				let (width, height) = decoded.image().dimensions();
				let kind = TextureKind::from_name(&lump.name);
				println!("{brief_prefix}Lump #{} {name:?} [{}], {width}x{height}, {kind}, size={}",
					pos+1,
					lump.lump_type,
					lump.data.len());
			},
			Err(WadError::UnsupportedLump(_)) => {
				println!("{brief_prefix}Lump #{} {name:?} [{}], raw, size={}",
					pos+1,
					lump.lump_type,
					lump.data.len());
			},
			Err(e) => {
				println!("{brief_prefix}Lump #{} {name:?} [{}] ERROR {e}", pos+1, lump.lump_type);
			},
		};
	};

	Ok(())
}
