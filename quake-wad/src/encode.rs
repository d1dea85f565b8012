use crate::macros;

use crate::{WadResult, WadArchive, WadLump, LumpType, NAME_LEN};
use crate::WadError::*;
use crate::{Palette, QUAKE_PALETTE, MipTexture, Quantizer};
use crate::{lump_name_from_path, disambiguate_lump_name};

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;
use tap::prelude::*;


/// Quantizes images and packs them into a [`WadArchive`]
#[derive(Debug, Clone)]
pub struct WadEncoder {
	settings: EncodingSettings,
	palette: Palette,
}


impl WadEncoder {
	/// Creates a new encoder quantizing against the Quake palette.
	pub fn with_settings(settings: EncodingSettings) -> Self {
		Self { settings, palette: QUAKE_PALETTE.clone() }
	}


	/// Encode `image` as a miptexture lump named `name`.
	///
	/// Pixels are alpha-composited onto the transparent color and mapped to
	/// the nearest palette entry; the three smaller levels are regenerated.
	///
	/// # Errors
	/// - [`NameTooLong`]: `name` is longer than 16 bytes.
	/// - [`InvalidDimensions`]: `image` is empty.
	pub fn encode_image(&self, name: &[u8], image: &RgbaImage) -> WadResult<WadLump> {
		let indexed = Quantizer::with_palette(&self.palette).quantize(image)?;
		let data = MipTexture::with_name_and_image(name, indexed)?
			.encode(&self.palette, self.settings.mipmap_filter)?;

		Ok(WadLump::new(name, LumpType::MipTexture, data))
	}


	/// Load the image at `path` and encode it as a miptexture named `name`.
	///
	/// # Errors
	/// - [`ImageError`], [`UnexpectedIoError`]: The image could not be loaded.
	/// - other: See [`Self::encode_image`].
	pub fn encode_file(&self, name: &[u8], path: &Path) -> WadResult<WadLump> {
		let image = image::open(path)?.into_rgba8();
		self.encode_image(name, &image)
	}


	/// Encode every `.png` file in `paths` in order, naming each lump after
	/// its file stem, see [`lump_name_from_path`].
	///
	/// Other files, inputs whose name exceeds 16 bytes and images that fail
	/// to load are logged and skipped. Repeated names get a ` (n)` suffix.
	pub fn encode_files<P: AsRef<Path>>(&self, paths: &[P]) -> WadArchive {
		let mut taken: HashSet<Vec<u8>> = HashSet::with_capacity(paths.len());
		let mut lumps = Vec::with_capacity(paths.len());

		for path in paths.iter().map(AsRef::as_ref) {
			if !has_png_extension(path) {
				macros::log!(warn, "Skipping {}: not a PNG file", path.display());
				continue;
			};

			let name = match lump_name_from_path(path) {
				Some(name) => name,
				None => {
					macros::log!(error, "Skipping {}: no usable file name", path.display());
					continue;
				},
			};

			if name.len() > NAME_LEN {
				macros::log!(error, "Skipping {}: {}", path.display(), NameTooLong(String::from_utf8_lossy(&name).into_owned()));
				continue;
			};

			let unique = disambiguate_lump_name(&name, &mut taken);

			match self.encode_file(&unique, path) {
				Ok(lump) => {
					macros::log!(info, "Adding {} as {:?}", path.display(), lump.name);
					lumps.push(lump);
				},
				Err(e) => {
					macros::log!(error, "Skipping {}: {}", path.display(), e);
					taken.remove(&unique);
				},
			};
		};

		WadArchive::with_lumps(lumps)
	}


	/// Encode `paths` with [`Self::encode_files`] and write the archive to
	/// `output`, creating its parent directory if needed.
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: The parent directory could not be created, or
	///   `output` could not be opened or written.
	/// - [`UnexpectedTryFromIntError`][crate::WadError::UnexpectedTryFromIntError],
	///   [`ArithmeticOverflow`]: The archive would exceed 4 GiB.
	pub fn write<P: AsRef<Path>>(&self, paths: &[P], output: &Path) -> WadResult<()> {
		if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)?;
		};

		let mut writer = File::create(output)?.pipe(BufWriter::new);

		let archive = self.encode_files(paths);
		archive.write_to(&mut writer)?;
		writer.flush()?;

		macros::log!(info, "Wrote {} lumps to {}", archive.lumps.len(), output.display());

		Ok(())
	}
}


impl Default for WadEncoder {
	fn default() -> Self {
		Self::with_settings(EncodingSettings::default())
	}
}


fn has_png_extension(path: &Path) -> bool {
	path.extension().map_or(false, |e| e.eq_ignore_ascii_case("png"))
}


/// Write the images in `paths` as miptextures into a new archive at
/// `output`, see [`WadEncoder::write`].
///
/// # Errors
/// See [`WadEncoder::write`].
pub fn write<P: AsRef<Path>, Q: AsRef<Path>>(paths: &[P], output: Q) -> WadResult<()> {
	WadEncoder::default().write(paths, output.as_ref())
}


/// Resampling filters and size limits used when encoding and importing
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct EncodingSettings {
	/// Filter used to build mip levels 1 to 3.
	pub mipmap_filter: FilterType,
	/// Filter used to fit imported images to the size constraints.
	pub import_filter: FilterType,
	/// Imported dimensions are floored to a multiple of this.
	pub import_step: u32,
	/// Largest imported dimension.
	pub import_max: u32,
}


impl Default for EncodingSettings {
	fn default() -> Self {
		Self {
			mipmap_filter: FilterType::Triangle,
			import_filter: FilterType::Lanczos3,
			import_step: 16,
			import_max: 512,
		}
	}
}


impl std::fmt::Display for EncodingSettings {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "<mipmaps={:?}, import={:?}, step={}, max={}>",
			self.mipmap_filter, self.import_filter, self.import_step, self.import_max)
	}
}


#[test]
fn settings_traits() {
	static_assertions::assert_impl_all!(EncodingSettings: Copy, PartialEq, std::fmt::Debug, std::fmt::Display, Default);
	assert_eq!(EncodingSettings::default().to_string(), "<mipmaps=Triangle, import=Lanczos3, step=16, max=512>");
}


#[cfg(test)]
fn save_solid(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
	RgbaImage::from_pixel(width, height, image::Rgba(rgba)).save(path).unwrap();
}


#[test]
fn pack_and_unpack() {
	use crate::{open, WadDecoder};

	let dir = tempfile::tempdir().unwrap();
	let red = dir.path().join("red.png");
	let white = dir.path().join("+0white.v1.png");
	let long = dir.path().join("this_name_is_far_too_long.png");
	let jpeg = dir.path().join("photo.jpg");
	let missing = dir.path().join("missing.png");

	save_solid(&red, 32, 16, [255, 0, 0, 255]);
	save_solid(&white, 16, 16, [255, 255, 255, 255]);
	save_solid(&long, 16, 16, [0, 0, 0, 255]);
	std::fs::write(&jpeg, b"JFIF").unwrap();

	let out = dir.path().join("nested/dir/out.wad");
	write(&[&red, &long, &jpeg, &missing, &white], &out).unwrap();

	let bytes = std::fs::read(&out).unwrap();
	let archive = WadArchive::from_bytes(&bytes).unwrap();
	let names = archive.lumps.iter().map(|l| l.as_ref().unwrap().name.to_string()).collect::<Vec<_>>();
	assert_eq!(names, vec!["red", "+0white"]);

	let decoder = WadDecoder::with_wad(archive);
	let red_rgba = decoder.decode_nth_rgba(0).unwrap();
	assert_eq!(red_rgba.dimensions(), (32, 16));
	assert!(red_rgba.pixels().all(|p| p.0 == [255, 0, 0, 255]));

	let extracted = open(&out, dir.path().join("unpacked")).unwrap();
	assert_eq!(extracted.len(), 2);
	assert_eq!(extracted[1].display_name, "+0white");
}


#[test]
fn pack_nothing() {
	let dir = tempfile::tempdir().unwrap();
	let out = dir.path().join("empty.wad");
	write::<&Path, _>(&[], &out).unwrap();
	assert_eq!(std::fs::read(&out).unwrap(), b"WAD2\0\0\0\0\x0C\0\0\0");
}


#[test]
fn pack_duplicate_names() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::create_dir(dir.path().join("a")).unwrap();
	std::fs::create_dir(dir.path().join("b")).unwrap();

	let first = dir.path().join("a/wall.png");
	let second = dir.path().join("b/wall.png");
	save_solid(&first, 16, 16, [0, 0, 0, 255]);
	save_solid(&second, 16, 16, [0, 0, 0, 255]);

	let archive = WadEncoder::default().encode_files(&[&first, &second]);
	let names = archive.lumps.iter().map(|l| l.as_ref().unwrap().name.to_string()).collect::<Vec<_>>();
	assert_eq!(names, vec!["wall", "wall (1)"]);
}


#[test]
fn pack_roundtrip_is_exact() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("ramp.png");

	let image = RgbaImage::from_fn(16, 16, |x, y| QUAKE_PALETTE.rgba((y * 16 + x) as u8));
	image.save(&path).unwrap();

	let out = dir.path().join("ramp.wad");
	write(&[&path], &out).unwrap();

	let unpacked = dir.path().join("unpacked");
	crate::open(&out, &unpacked).unwrap();
	let back = image::open(unpacked.join("ramp.png")).unwrap().into_rgba8();
	assert_eq!(back, image);
}


#[test]
fn encode_transparent_pixels() {
	let image = RgbaImage::from_pixel(16, 16, image::Rgba([0, 0, 0, 0]));
	let lump = WadEncoder::default().encode_image(b"{grate", &image).unwrap();
	let texture = MipTexture::decode(&lump.data).unwrap();
	assert!(texture.image.indices().iter().all(|i| *i == 255));
}


#[test]
fn open_then_write_is_byte_identical() {
	let dir = tempfile::tempdir().unwrap();
	let ramp = dir.path().join("ramp.png");
	let bars = dir.path().join("+0bars.png");

	RgbaImage::from_fn(32, 16, |x, y| QUAKE_PALETTE.rgba((y * 32 + x) as u8)).save(&ramp).unwrap();
	RgbaImage::from_fn(24, 40, |x, _| if x % 3 == 0 { image::Rgba([255, 255, 255, 255]) } else { image::Rgba([40, 90, 20, 255]) })
		.save(&bars)
		.unwrap();

	let first = dir.path().join("first.wad");
	write(&[&ramp, &bars], &first).unwrap();

	let extracted = crate::open(&first, dir.path().join("unpacked")).unwrap();
	let paths = extracted.iter().map(|e| e.path.as_path()).collect::<Vec<&Path>>();

	let second = dir.path().join("second.wad");
	write(&paths, &second).unwrap();

	assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}


#[test]
fn open_then_write_keeps_lump_names() {
	let dir = tempfile::tempdir().unwrap();
	let image = RgbaImage::from_pixel(16, 16, image::Rgba([40, 90, 20, 255]));
	let encoder = WadEncoder::default();
	let names: [&[u8]; 3] = [b"wall.v2", b"caf\xE9", b"50%/off"];

	let lumps = names.iter().map(|name| encoder.encode_image(name, &image).unwrap()).collect();
	let first = dir.path().join("first.wad");
	WadArchive::with_lumps(lumps).write_to(&mut File::create(&first).unwrap()).unwrap();

	let extracted = crate::open(&first, dir.path().join("unpacked")).unwrap();
	assert_eq!(extracted.len(), 3);
	let paths = extracted.iter().map(|e| e.path.as_path()).collect::<Vec<&Path>>();

	let second = dir.path().join("second.wad");
	write(&paths, &second).unwrap();

	let archive = WadArchive::read_from(&mut File::open(&second).unwrap()).unwrap();
	let written = archive.lumps.into_iter().map(|l| l.unwrap().name.to_vec()).collect::<Vec<Vec<u8>>>();
	assert_eq!(written, names.iter().map(|n| n.to_vec()).collect::<Vec<Vec<u8>>>());
}
