use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::{WadResult, EncodingSettings, QUAKE_PALETTE, Quantizer};
use crate::imageops::{has_transparency, normalize_for_import};
use crate::unique_path;
use crate::macros;


/// Prepare one image for packing: fit it to the texture size constraints
/// and map it onto the Quake palette.
///
/// Returns the expanded RGBA raster and whether the source had any
/// non-opaque pixel.
///
/// # Errors
/// - [`InvalidDimensions`][crate::WadError::InvalidDimensions]: Should not happen after normalization.
pub fn prepare_texture(image: RgbaImage, settings: &EncodingSettings) -> WadResult<(RgbaImage, bool)> {
	let transparent = has_transparency(&image);
	let image = normalize_for_import(image, settings.import_step, settings.import_max, settings.import_filter);

	let indexed = Quantizer::with_palette(&QUAKE_PALETTE).quantize(&image)?;
	let image = indexed.to_rgba(&QUAKE_PALETTE)?;

	Ok((image, transparent))
}


/// Import arbitrary images into `dest_dir` as texture-ready PNG files.
///
/// Each image is resized with [`normalize_for_import`], quantized against
/// the Quake palette and saved as `<stem>.png`, where `<stem>` is the file
/// name without its last extension, prefixed with `{` if the source had
/// transparent pixels. Existing names get a ` (n)` suffix. Files that fail
/// to load or save are logged and skipped.
///
/// # Errors
/// - [`UnexpectedIoError`][crate::WadError::UnexpectedIoError]: `dest_dir` could not be created.
pub fn import_textures<P: AsRef<Path>>(paths: &[P], dest_dir: &Path, settings: &EncodingSettings) -> WadResult<Vec<PathBuf>> {
	std::fs::create_dir_all(dest_dir)?;

	let mut imported = Vec::with_capacity(paths.len());

	for path in paths.iter().map(AsRef::as_ref) {
		match import_one(path, dest_dir, settings) {
			Ok(new_path) => {
				macros::log!(info, "Imported {} as {}", path.display(), new_path.display());
				imported.push(new_path);
			},
			Err(e) => {
				macros::log!(error, "Skipping {}: {}", path.display(), e);
			},
		};
	};

	Ok(imported)
}


fn import_one(path: &Path, dest_dir: &Path, settings: &EncodingSettings) -> WadResult<PathBuf> {
	let source = image::open(path)?.into_rgba8();
	let (image, transparent) = prepare_texture(source, settings)?;

	let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
	let stem = if transparent { format!("{{{}", stem) } else { stem };

	let new_path = unique_path(dest_dir, &stem, Some("png"));
	image.save(&new_path)?;

	Ok(new_path)
}


#[test]
fn import_resizes_and_deduplicates() {
	let dir = tempfile::tempdir().unwrap();
	let first = dir.path().join("wall.png");
	let second = dir.path().join("wall.bmp");

	RgbaImage::from_pixel(500, 130, image::Rgba([200, 10, 10, 255])).save(&first).unwrap();
	image::RgbImage::from_pixel(40, 20, image::Rgb([0, 0, 0])).save(&second).unwrap();

	let dest = dir.path().join("textures");
	let imported = import_textures(&[&first, &second], &dest, &EncodingSettings::default()).unwrap();
	assert_eq!(imported, vec![dest.join("wall.png"), dest.join("wall (1).png")]);

	let (w, h) = image::image_dimensions(&imported[0]).unwrap();
	assert_eq!((w, h), (496, 128));
	assert_eq!(image::image_dimensions(&imported[1]).unwrap(), (32, 16));
}


#[test]
fn import_large_and_transparent() {
	let dir = tempfile::tempdir().unwrap();
	let big = dir.path().join("big.png");
	let grate = dir.path().join("grate.png");

	RgbaImage::from_pixel(1024, 1024, image::Rgba([0, 0, 255, 255])).save(&big).unwrap();
	let mut holes = RgbaImage::from_pixel(16, 16, image::Rgba([255, 255, 255, 255]));
	holes.put_pixel(3, 3, image::Rgba([0, 0, 0, 0]));
	holes.save(&grate).unwrap();

	let missing = dir.path().join("missing.png");
	let imported = import_textures(&[&big, &missing, &grate], dir.path(), &EncodingSettings::default()).unwrap();
	assert_eq!(imported, vec![dir.path().join("big (1).png"), dir.path().join("{grate.png")]);

	assert_eq!(image::image_dimensions(&imported[0]).unwrap(), (512, 512));

	let grate = image::open(&imported[1]).unwrap().into_rgba8();
	assert_eq!(grate.get_pixel(3, 3).0, [159, 91, 83, 255]);
	assert_eq!(grate.get_pixel(0, 0).0, [255, 255, 255, 255]);
}
