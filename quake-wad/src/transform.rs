use std::path::{Path, PathBuf};

use enum_utils::FromStr;
use image::imageops::FilterType;

use crate::{WadResult, NAME_LEN, QUAKE_PALETTE, Quantizer};
use crate::WadError::*;
use crate::unique_path;
use crate::macros;


/// Mirror axis for [`flip`]
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromStr)]
#[enumeration(case_insensitive)]
pub enum FlipAxis {
	/// Swap left and right.
	Horizontal,
	/// Swap top and bottom.
	Vertical,
}


/// Direction for [`rotate`]
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromStr)]
#[enumeration(case_insensitive)]
pub enum RotateDirection {
	/// 90 degrees counter-clockwise.
	Left,
	/// 90 degrees clockwise.
	Right,
}


fn load_rgba(path: &Path) -> WadResult<image::RgbaImage> {
	Ok(image::open(path)?.into_rgba8())
}


/// Mirror the image at `path` in place.
///
/// # Errors
/// - [`ImageError`], [`UnexpectedIoError`]: The file could not be loaded or saved.
pub fn flip(path: &Path, axis: FlipAxis) -> WadResult<()> {
	let mut image = load_rgba(path)?;

	match axis {
		FlipAxis::Horizontal => image::imageops::flip_horizontal_in_place(&mut image),
		FlipAxis::Vertical => image::imageops::flip_vertical_in_place(&mut image),
	};

	image.save(path)?;
	Ok(())
}


/// Rotate the image at `path` by 90 degrees in place; width and height swap.
///
/// # Errors
/// - [`ImageError`], [`UnexpectedIoError`]: The file could not be loaded or saved.
pub fn rotate(path: &Path, direction: RotateDirection) -> WadResult<()> {
	let image = load_rgba(path)?;

	let rotated = match direction {
		RotateDirection::Left => image::imageops::rotate270(&image),
		RotateDirection::Right => image::imageops::rotate90(&image),
	};

	rotated.save(path)?;
	Ok(())
}


/// Resample the image at `path` to `width` x `height` in place.
///
/// # Errors
/// - [`InvalidDimensions`]: Either dimension is 0.
/// - [`ImageError`], [`UnexpectedIoError`]: The file could not be loaded or saved.
pub fn resize(path: &Path, width: u32, height: u32) -> WadResult<()> {
	if width == 0 || height == 0 {
		return Err(InvalidDimensions(width, height));
	};

	let image = load_rgba(path)?;
	image::imageops::resize(&image, width, height, FilterType::CatmullRom).save(path)?;
	Ok(())
}


/// Re-quantize each image against the palette without fullbright colors.
///
/// With `overwrite` the result replaces the input; otherwise it is written
/// next to it as `<stem>-dfb.png` (with a ` (n)` suffix if taken). Files that
/// fail to load or save are logged and skipped. Returns the written paths.
pub fn defullbright<P: AsRef<Path>>(paths: &[P], overwrite: bool) -> Vec<PathBuf> {
	let reduced = QUAKE_PALETTE.without_fullbrights();
	let mut quantizer = Quantizer::with_palette(&reduced);
	let mut written = Vec::with_capacity(paths.len());

	for path in paths.iter().map(AsRef::as_ref) {
		let result = load_rgba(path)
			.and_then(|image| quantizer.quantize(&image))
			.and_then(|indexed| indexed.to_rgba(&reduced))
			.and_then(|image| {
				let target = if overwrite {
					path.to_path_buf()
				}
				else {
					let dir = path.parent().unwrap_or_else(|| Path::new(""));
					let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
					unique_path(dir, &format!("{}-dfb", stem), Some("png"))
				};

				image.save(&target)?;
				Ok(target)
			});

		match result {
			Ok(target) => {
				macros::log!(info, "Removed fullbrights from {} into {}", path.display(), target.display());
				written.push(target);
			},
			Err(e) => {
				macros::log!(error, "Skipping {}: {}", path.display(), e);
			},
		};
	};

	written
}


/// Rename the texture file at `path` to `<new_name>.<ext>` in the same
/// directory, keeping its extension.
///
/// # Errors
/// - [`NameTooLong`]: `new_name` is longer than 16 bytes.
/// - [`PathExists`]: The target file already exists.
/// - [`UnexpectedIoError`]: The rename failed.
pub fn rename(path: &Path, new_name: &str) -> WadResult<PathBuf> {
	if new_name.len() > NAME_LEN {
		return Err(NameTooLong(new_name.to_owned()));
	};

	let file_name = match path.extension() {
		Some(ext) => format!("{}.{}", new_name, ext.to_string_lossy()),
		None => new_name.to_owned(),
	};

	let target = path.with_file_name(file_name);

	if target.exists() {
		return Err(PathExists(target.display().to_string()));
	};

	std::fs::rename(path, &target)?;
	Ok(target)
}


/// Dimensions of the image at `path`, read from its header.
///
/// # Errors
/// - [`ImageError`], [`UnexpectedIoError`]: The file could not be read.
pub fn texture_size(path: &Path) -> WadResult<(u32, u32)> {
	Ok(image::image_dimensions(path)?)
}


#[cfg(test)]
fn corner_image(dir: &Path) -> PathBuf {
	let path = dir.join("corner.png");
	let mut image = image::RgbaImage::from_pixel(32, 16, image::Rgba([0, 0, 0, 255]));
	image.put_pixel(0, 0, image::Rgba([255, 255, 255, 255]));
	image.save(&path).unwrap();
	path
}


#[test]
fn test_flip() {
	let dir = tempfile::tempdir().unwrap();
	let path = corner_image(dir.path());

	flip(&path, FlipAxis::Horizontal).unwrap();
	let image = image::open(&path).unwrap().into_rgba8();
	assert_eq!(image.get_pixel(31, 0).0, [255, 255, 255, 255]);

	flip(&path, FlipAxis::Vertical).unwrap();
	let image = image::open(&path).unwrap().into_rgba8();
	assert_eq!(image.get_pixel(31, 15).0, [255, 255, 255, 255]);
}


#[test]
fn test_rotate() {
	let dir = tempfile::tempdir().unwrap();
	let path = corner_image(dir.path());

	rotate(&path, RotateDirection::Right).unwrap();
	let image = image::open(&path).unwrap().into_rgba8();
	assert_eq!(image.dimensions(), (16, 32));
	assert_eq!(image.get_pixel(15, 0).0, [255, 255, 255, 255]);

	rotate(&path, RotateDirection::Left).unwrap();
	let image = image::open(&path).unwrap().into_rgba8();
	assert_eq!(image.dimensions(), (32, 16));
	assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
}


#[test]
fn test_resize_and_size() {
	let dir = tempfile::tempdir().unwrap();
	let path = corner_image(dir.path());

	assert_eq!(texture_size(&path).unwrap(), (32, 16));
	resize(&path, 64, 48).unwrap();
	assert_eq!(texture_size(&path).unwrap(), (64, 48));
	assert_eq!(resize(&path, 0, 48).unwrap_err(), InvalidDimensions(0, 48));
	assert!(texture_size(&dir.path().join("missing.png")).is_err());
}


#[test]
fn test_defullbright() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("lamp.png");
	// 254 is fullbright white
	image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 255, 255, 255])).save(&path).unwrap();

	let written = defullbright(&[&path, &dir.path().join("missing.png")], false);
	assert_eq!(written, vec![dir.path().join("lamp-dfb.png")]);

	let written = defullbright(&[&path], false);
	assert_eq!(written, vec![dir.path().join("lamp-dfb (1).png")]);
	assert_eq!(image::open(&path).unwrap().into_rgba8(), image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 255, 255, 255])));

	let reduced = QUAKE_PALETTE.without_fullbrights();
	let image = image::open(&written[0]).unwrap().into_rgba8();
	let [r, g, b, _] = image.get_pixel(0, 0).0;
	let index = QUAKE_PALETTE.nearest([r, g, b]);
	assert!(usize::from(index) < crate::FULLBRIGHT_START);
	assert_eq!(reduced.color(index), [r, g, b]);

	let written = defullbright(&[&path], true);
	assert_eq!(written, vec![path.clone()]);
	assert_eq!(image::open(&path).unwrap().into_rgba8(), image);
}


#[test]
fn test_rename() {
	let dir = tempfile::tempdir().unwrap();
	let path = corner_image(dir.path());

	assert!(matches!(rename(&path, "a_name_that_is_too_long"), Err(NameTooLong(_))));

	assert_eq!(rename(&path, "corner").unwrap_err(), PathExists(path.display().to_string()));

	let renamed = rename(&path, "+0corner").unwrap();
	assert_eq!(renamed, dir.path().join("+0corner.png"));
	assert!(renamed.exists());
	assert!(!path.exists());
}


#[test]
fn parse_directions() {
	assert_eq!("horizontal".parse::<FlipAxis>(), Ok(FlipAxis::Horizontal));
	assert_eq!("VERTICAL".parse::<FlipAxis>(), Ok(FlipAxis::Vertical));
	assert_eq!("Left".parse::<RotateDirection>(), Ok(RotateDirection::Left));
	assert!("up".parse::<RotateDirection>().is_err());
}
