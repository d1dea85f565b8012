use std::path::Path;

use quake_wad::*;
use anyhow::{Context, Result as AnyhowResult};


fn input_paths<'a>(matches: &'a clap::ArgMatches, name: &str) -> Vec<&'a Path> {
	matches.values_of(name)
		.map(|values| values.map(Path::new).collect())
		.unwrap_or_default()
}


pub fn command_pack(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let wad_path = matches.value_of("wad").expect("WAD required");
	let inputs = input_paths(matches, "png");

	tracing::debug!("Packing {} files with {}", inputs.len(), EncodingSettings::default());

	write(&inputs, wad_path)
		.with_context(|| format!("Could not write WAD file: {wad_path}"))?;

	Ok(())
}


pub fn command_import(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let dir = matches.value_of("dir").expect("DIR required");
	let inputs = input_paths(matches, "img");

	let imported = import_textures(&inputs, Path::new(dir), &EncodingSettings::default())
		.with_context(|| format!("Could not import into {dir}"))?;

	for path in &imported {
		println!("{}", path.display());
	};

	if imported.len() < inputs.len() {
		tracing::warn!("Imported {} of {} images", imported.len(), inputs.len());
	};

	Ok(())
}
