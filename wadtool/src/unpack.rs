use quake_wad::*;
use anyhow::{Context, Result as AnyhowResult};


pub fn command_unpack(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let wad_path = matches.value_of("wad").expect("WAD required");
	let dir = matches.value_of("dir").expect("DIR required");

	let extracted = open(wad_path, dir)
		.with_context(|| format!("Could not unpack {wad_path} into {dir}"))?;

	for lump in &extracted {
		let kind = if lump.is_image() { "image" } else { "raw" };
		println!("{} [{}, {kind}] -> {}", lump.display_name, lump.lump_type, lump.path.display());
	};

	Ok(())
}
