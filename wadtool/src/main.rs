#![allow(deprecated)]


use anyhow::{Context, Result as AnyhowResult};

mod unpack;
mod pack;
mod edit;
mod info;


fn construct_app() -> clap::Command<'static> {
	clap::Command::new("wadtool")
		.version(clap::crate_version!())
		.setting(clap::AppSettings::DeriveDisplayOrder)
		.arg(clap::arg!(loglevel: -L "Global log verbosity level")
			.ignore_case(true)
			.possible_values(["Error", "Warn", "Info", "Debug", "Trace"])
			.default_value("Info"))
		.subcommand(clap::Command::new("unpack")
			.about("Extract every lump of a WAD2 file into a directory")
			.arg(clap::arg!(wad: <WAD> "WAD input file"))
			.arg(clap::arg!(dir: <DIR> "Output directory")))
		.subcommand(clap::Command::new("pack")
			.about("Pack PNG files into a new WAD2 file as miptextures")
			.arg(clap::arg!(wad: <WAD> "WAD output path"))
			.arg(clap::arg!(png: <PNG> ... "PNG input files").required(false)))
		.subcommand(clap::Command::new("import")
			.about("Resize and quantize arbitrary images into texture-ready PNG files")
			.arg(clap::arg!(dir: <DIR> "Output directory"))
			.arg(clap::arg!(img: <IMG> ... "Image input files")))
		.subcommand(clap::Command::new("flip")
			.about("Flip textures in place (vertically unless --mirror)")
			.arg(clap::arg!(mirror: -m --mirror "Mirror left to right instead").takes_value(false))
			.arg(clap::arg!(png: <PNG> ... "Texture files")))
		.subcommand(clap::Command::new("rotate")
			.about("Rotate textures by 90 degrees in place")
			.arg(clap::arg!(direction: -d --direction <DIRECTION> "Rotation direction")
				.required(false)
				.ignore_case(true)
				.possible_values(["left", "right"])
				.default_value("right"))
			.arg(clap::arg!(png: <PNG> ... "Texture files")))
		.subcommand(clap::Command::new("resize")
			.about("Resample textures in place")
			.arg(clap::arg!(width: <WIDTH> "New width in pixels"))
			.arg(clap::arg!(height: <HEIGHT> "New height in pixels"))
			.arg(clap::arg!(png: <PNG> ... "Texture files")))
		.subcommand(clap::Command::new("dfb")
			.about("Remove fullbright colors from textures")
			.arg(clap::arg!(overwrite: -o --overwrite "Replace the input instead of writing <NAME>-dfb.png").takes_value(false))
			.arg(clap::arg!(png: <PNG> ... "Texture files")))
		.subcommand(clap::Command::new("rename")
			.about("Rename a texture file, enforcing the 16-byte lump name limit")
			.arg(clap::arg!(png: <PNG> "Texture file"))
			.arg(clap::arg!(name: <NAME> "New texture name")))
		.subcommand(clap::Command::new("info")
			.about("Parse a WAD2 file and list its lumps")
			.arg(clap::arg!(brief: -b --brief "Do not prepend file name to output").takes_value(false))
			.arg(clap::arg!(input: <INPUT> ... "WAD file to parse")))
}


fn wadtool() -> AnyhowResult<()> {
	let matches = construct_app().get_matches_from(wild::args());
	let loglevel_str = matches.value_of("loglevel")
		.unwrap_or("Info");
	let loglevel = loglevel_str
		.parse::<tracing::Level>()
		.with_context(|| format!("Failed to parse loglevel from -L{}", loglevel_str))?;

	tracing_subscriber::fmt()
		.with_max_level(loglevel)
		.init();

	tracing::trace!("Global loglevel set to {:?}", loglevel);

	match matches.subcommand() {
		Some(("unpack", matches)) => {
			unpack::command_unpack(matches)
		},

		Some(("pack", matches)) => {
			pack::command_pack(matches)
		},

		Some(("import", matches)) => {
			pack::command_import(matches)
		},

		Some(("flip", matches)) => {
			edit::command_flip(matches)
		},

		Some(("rotate", matches)) => {
			edit::command_rotate(matches)
		},

		Some(("resize", matches)) => {
			edit::command_resize(matches)
		},

		Some(("dfb", matches)) => {
			edit::command_dfb(matches)
		},

		Some(("rename", matches)) => {
			edit::command_rename(matches)
		},

		Some(("info", matches)) => {
			info::command_info(matches)
		},

		Some((&_, _)) => unreachable!(),

		None => {
			let _ = construct_app().print_help();
			Ok(())
		},
	}
}


fn main() {
	if let Err(e) = wadtool() {
		tracing::error!("{:?}", e);
		std::process::exit(1);
	};
}


#[test]
fn app_is_consistent() {
	construct_app().debug_assert();
}
