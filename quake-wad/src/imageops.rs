use image::imageops::FilterType;
use image::RgbaImage;

use crate::macros;


/// Blend `pixel` over the opaque `background` by its alpha, rounding to
/// nearest.
pub(crate) fn composite_over(pixel: [u8; 4], background: [u8; 3]) -> [u8; 3] {
	let [r, g, b, a] = pixel;

	if a == 0xFF {
		return [r, g, b];
	};

	let a = u32::from(a);
	let blend = |c: u8, bg: u8| -> u8 {
		#[allow(clippy::cast_possible_truncation)]
		let v = ((u32::from(c) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8;
		v
	};

	[blend(r, background[0]), blend(g, background[1]), blend(b, background[2])]
}


#[test]
fn test_composite_over() {
	let bg = [159, 91, 83];
	assert_eq!(composite_over([1, 2, 3, 255], bg), [1, 2, 3]);
	assert_eq!(composite_over([1, 2, 3, 0], bg), bg);
	assert_eq!(composite_over([255, 255, 255, 128], [0, 0, 0]), [128, 128, 128]);
}


/// Whether any pixel is not fully opaque.
pub(crate) fn has_transparency(image: &RgbaImage) -> bool {
	image.pixels().any(|p| p.0[3] != 0xFF)
}


/// Build a mipmap chain of exactly `levels` images by repeatedly halving
/// (never below 1x1) from `image`, which becomes the first element.
pub(crate) fn construct_mipmap_series(image: RgbaImage, levels: usize, filter: FilterType) -> Vec<RgbaImage> {
	let mut result = Vec::with_capacity(levels);
	let mut current = image;

	for _ in 1..levels {
		let (width, height) = current.dimensions();
		let next = image::imageops::resize(&current, (width / 2).max(1), (height / 2).max(1), filter);
		result.push(current);
		current = next;
	};

	if levels > 0 {
		result.push(current);
	};

	result
}


#[test]
fn test_construct_mipmap_series() {
	let image = RgbaImage::from_pixel(40, 3, image::Rgba([10, 20, 30, 255]));
	let series = construct_mipmap_series(image, 4, FilterType::Triangle);

	let dimensions = series.iter().map(RgbaImage::dimensions).collect::<Vec<_>>();
	assert_eq!(dimensions, vec![(40, 3), (20, 1), (10, 1), (5, 1)]);
	assert!(series[3].pixels().all(|p| p.0 == [10, 20, 30, 255]));
}


/// Target dimensions for importing an image of `width` x `height`.
///
/// Each dimension is floored to a multiple of `step` (at least `step`).
/// If the larger one then exceeds `max`, both are scaled by `max / larger`
/// and floored again.
///
/// # Example
/// ```
/// # use quake_wad::normalized_dimensions;
/// assert_eq!(normalized_dimensions(100, 40, 16, 512), (96, 32));
/// assert_eq!(normalized_dimensions(1000, 1000, 16, 512), (512, 512));
/// assert_eq!(normalized_dimensions(8, 8, 16, 512), (16, 16));
/// ```
pub fn normalized_dimensions(width: u32, height: u32, step: u32, max: u32) -> (u32, u32) {
	let step = step.max(1);
	let floor = |v: u32| (v / step * step).max(step);

	let (mut width, mut height) = (floor(width), floor(height));
	let larger = width.max(height);

	if larger > max {
		let scale = |v: u32| -> u32 {
			#[allow(clippy::cast_possible_truncation)]
			let scaled = (u64::from(v) * u64::from(max) / u64::from(larger)) as u32;
			scaled
		};

		width = floor(scale(width));
		height = floor(scale(height));
	};

	(width, height)
}


#[test]
fn test_normalized_dimensions() {
	assert_eq!(normalized_dimensions(64, 64, 16, 512), (64, 64));
	assert_eq!(normalized_dimensions(0, 17, 16, 512), (16, 16));
	assert_eq!(normalized_dimensions(1024, 512, 16, 512), (512, 256));
	// 2000x40 would scale to 512x10; the minimum brings the height back to 16
	assert_eq!(normalized_dimensions(2000, 40, 16, 512), (512, 16));
	assert_eq!(normalized_dimensions(700, 300, 16, 512), (512, 208));
}


/// Resize `image` to [`normalized_dimensions`], leaving it untouched when it
/// already conforms.
pub fn normalize_for_import(image: RgbaImage, step: u32, max: u32, filter: FilterType) -> RgbaImage {
	let (width, height) = image.dimensions();
	let (new_width, new_height) = normalized_dimensions(width, height, step, max);

	if (width, height) == (new_width, new_height) {
		return image;
	};

	macros::log!(debug, "Resizing {}x{} to {}x{}", width, height, new_width, new_height);

	image::imageops::resize(&image, new_width, new_height, filter)
}
