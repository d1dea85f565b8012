use std::collections::HashMap;

use image::RgbaImage;

use crate::WadResult;
use crate::Palette;
use crate::IndexedImage;
use crate::imageops::composite_over;


/// Maps true-color pixels to palette indices
///
/// Each pixel is first flattened onto the palette's transparent color by its
/// alpha, then assigned the nearest usable palette entry. Results are cached
/// per color, so a quantizer can be reused across the levels of a mipmap
/// chain.
#[derive(Debug, Clone)]
pub struct Quantizer<'a> {
	palette: &'a Palette,
	cache: HashMap<[u8; 3], u8>,
}


impl<'a> Quantizer<'a> {
	/// Construct a quantizer for `palette`.
	pub fn with_palette(palette: &'a Palette) -> Self {
		Self { palette, cache: palette.exact_lookup() }
	}


	/// Index for a single RGBA pixel.
	pub fn index_of(&mut self, pixel: [u8; 4]) -> u8 {
		let palette = self.palette;
		let rgb = composite_over(pixel, palette.transparent_color());
		*self.cache.entry(rgb).or_insert_with(|| palette.nearest(rgb))
	}


	/// Quantize a whole image.
	///
	/// # Errors
	/// - [`InvalidDimensions`][crate::WadError::InvalidDimensions]: `image` is empty.
	pub fn quantize(&mut self, image: &RgbaImage) -> WadResult<IndexedImage> {
		let indices = image.pixels().map(|p| self.index_of(p.0)).collect::<Vec<u8>>();
		IndexedImage::new(image.width(), image.height(), indices)
	}
}


/// Quantize `image` against `palette` with a fresh [`Quantizer`].
///
/// # Errors
/// See [`Quantizer::quantize`].
///
/// # Example
/// ```
/// # use quake_wad::{quantize, QUAKE_PALETTE};
/// let image = image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 255, 255, 255]));
/// let indexed = quantize(&image, &QUAKE_PALETTE).unwrap();
/// assert_eq!(indexed.indices(), &[254, 254]);
/// ```
pub fn quantize(image: &RgbaImage, palette: &Palette) -> WadResult<IndexedImage> {
	Quantizer::with_palette(palette).quantize(image)
}


#[test]
fn transparent_pixels_become_the_key_color() {
	use crate::QUAKE_PALETTE;

	let image = RgbaImage::from_raw(2, 1, vec![0, 0, 0, 0, 12, 200, 7, 0]).unwrap();
	let indexed = quantize(&image, &QUAKE_PALETTE).unwrap();
	assert_eq!(indexed.indices(), &[255, 255]);

	let reduced = QUAKE_PALETTE.without_fullbrights();
	let indexed = quantize(&image, &reduced).unwrap();
	assert_eq!(indexed.indices(), &[224, 224]);
}


#[test]
fn exact_colors_map_to_their_lowest_index() {
	use crate::QUAKE_PALETTE;

	let mut quantizer = Quantizer::with_palette(&QUAKE_PALETTE);

	for i in 0..=255u8 {
		let [r, g, b] = QUAKE_PALETTE.color(i);
		let index = quantizer.index_of([r, g, b, 255]);
		assert!(index <= i);
		assert_eq!(QUAKE_PALETTE.color(index), [r, g, b]);
	};
}


#[test]
fn quantize_empty_image() {
	use crate::QUAKE_PALETTE;
	assert!(quantize(&RgbaImage::new(0, 4), &QUAKE_PALETTE).is_err());
}


#[test]
fn reduced_palette_indices_stay_below_225() {
	use crate::QUAKE_PALETTE;

	let reduced = QUAKE_PALETTE.without_fullbrights();
	let image = RgbaImage::from_fn(64, 64, |x, y| image::Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, ((x * y) % 256) as u8]));
	let indexed = quantize(&image, &reduced).unwrap();

	assert!(indexed.indices().iter().all(|i| *i < 225));
}
