use std::path::Path;

use quake_wad::*;
use anyhow::{anyhow, Context, Result as AnyhowResult};
use tap::prelude::*;


/// Apply `op` to every PNG argument, logging failures and reporting the last one.
fn for_each_png<F>(matches: &clap::ArgMatches, op: F) -> AnyhowResult<()>
where
	F: Fn(&Path) -> WadResult<()>,
{
	let mut result = Ok(());

	for path in matches.values_of("png").expect("PNG required").map(Path::new) {
		let result_now = op(path)
			.with_context(|| format!("{}: edit failed", path.display()));

		if let Err(ref e) = result_now {
			tracing::error!("{:?}", e);
			result = result_now;
		};
	};

	result
}


pub fn command_flip(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let axis = if matches.is_present("mirror") { FlipAxis::Horizontal } else { FlipAxis::Vertical };
	for_each_png(matches, |path| flip(path, axis))
}


pub fn command_rotate(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let direction_str = matches.value_of("direction").unwrap_or("right");
	let direction = direction_str
		.parse::<RotateDirection>()
		.map_err(|_| anyhow!("Unknown rotation direction: {direction_str}"))?;

	for_each_png(matches, |path| rotate(path, direction))
}


pub fn command_resize(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let parse = |name: &str| -> AnyhowResult<u32> {
		let s = matches.value_of(name).expect("dimension required");
		s.parse::<u32>().with_context(|| format!("Could not parse {name} from \"{s}\""))
	};

	let width = parse("width")?;
	let height = parse("height")?;

	for_each_png(matches, |path| resize(path, width, height))
}


pub fn command_dfb(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let overwrite = matches.is_present("overwrite");
	let inputs = matches.values_of("png").expect("PNG required").collect::<Vec<&str>>();

	let written = defullbright(&inputs, overwrite)
		.tap(|w| tracing::debug!("Wrote {} of {} files", w.len(), inputs.len()));

	for path in &written {
		println!("{}", path.display());
	};

	if written.len() < inputs.len() {
		return Err(anyhow!("{} of {} files could not be converted", inputs.len() - written.len(), inputs.len()));
	};

	Ok(())
}


pub fn command_rename(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let png = matches.value_of("png").expect("PNG required");
	let name = matches.value_of("name").expect("NAME required");

	let renamed = rename(Path::new(png), name)
		.with_context(|| format!("Could not rename {png} to {name}"))?;

	println!("{}", renamed.display());

	Ok(())
}
