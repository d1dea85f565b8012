use std::collections::HashMap;

use image::{Rgb, Rgba};
use static_assertions::const_assert_eq;


/// Number of slots in a palette.
pub const PALETTE_LEN: usize = 256;

/// First index of the fullbright range (colors the engine draws unlit).
pub const FULLBRIGHT_START: usize = 224;


/// The standard Quake palette.
///
/// Index 255 doubles as the transparency key of `{` textures.
pub static QUAKE_PALETTE: Palette = Palette { colors: QUAKE_COLORS, usable: PALETTE_LEN };


/// An ordered table of 256 RGB colors, of which the first `usable` may be
/// chosen by the quantizer
///
/// Two palettes are provided: the full [`QUAKE_PALETTE`] and the result of
/// [`Palette::without_fullbrights`], which keeps the first 224 colors, moves
/// the transparency key to slot 224 and zero-fills the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
	colors: [[u8; 3]; PALETTE_LEN],
	usable: usize,
}


impl Palette {
	/// Build a palette where every one of the 256 slots is usable.
	pub const fn with_colors(colors: [[u8; 3]; PALETTE_LEN]) -> Self {
		Self { colors, usable: PALETTE_LEN }
	}


	/// Derive the reduced palette used for textures that must not contain
	/// fullbright pixels.
	///
	/// # Example
	/// ```
	/// # use quake_wad::QUAKE_PALETTE;
	/// let reduced = QUAKE_PALETTE.without_fullbrights();
	/// assert_eq!(reduced.usable_len(), 225);
	/// assert_eq!(reduced.color(224), QUAKE_PALETTE.color(255));
	/// assert_eq!(reduced.color(255), [0, 0, 0]);
	/// ```
	pub fn without_fullbrights(&self) -> Self {
		let mut colors = [[0u8; 3]; PALETTE_LEN];
		colors[..FULLBRIGHT_START].copy_from_slice(&self.colors[..FULLBRIGHT_START]);
		colors[FULLBRIGHT_START] = self.transparent_color();

		Self { colors, usable: FULLBRIGHT_START + 1 }
	}


	/// All 256 slots, including zero-filled ones that are never chosen.
	pub fn colors(&self) -> &[[u8; 3]; PALETTE_LEN] {
		&self.colors
	}


	/// Slots the quantizer may choose from.
	pub fn usable_colors(&self) -> &[[u8; 3]] {
		&self.colors[..self.usable]
	}


	/// Number of usable slots (256 or 225).
	pub fn usable_len(&self) -> usize {
		self.usable
	}


	/// Color at `index`.
	pub fn color(&self, index: u8) -> [u8; 3] {
		self.colors[usize::from(index)]
	}


	/// The color transparent pixels are flattened onto: the last usable slot.
	pub fn transparent_color(&self) -> [u8; 3] {
		self.colors[self.usable - 1]
	}


	/// Index of the usable color closest to `rgb` by squared Euclidean
	/// distance. Ties resolve to the lowest index.
	pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
		let distance = |c: &[u8; 3]| -> u32 {
			c.iter()
				.zip(rgb.iter())
				.map(|(a, b)| {
					let d = i32::from(*a) - i32::from(*b);
					(d * d) as u32
				})
				.sum()
		};

		let mut best = 0usize;
		let mut best_distance = u32::MAX;

		for (i, c) in self.usable_colors().iter().enumerate() {
			let d = distance(c);

			if d < best_distance {
				best = i;
				best_distance = d;

				if d == 0 {
					break;
				};
			};
		};

		best as u8
	}


	/// Opaque RGBA pixel for `index`.
	pub fn rgba(&self, index: u8) -> Rgba<u8> {
		let [r, g, b] = self.color(index);
		Rgba([r, g, b, 0xFF])
	}


	/// RGB pixel for `index`.
	pub fn rgb(&self, index: u8) -> Rgb<u8> {
		Rgb(self.color(index))
	}


	/// Reverse lookup table from exact color to its lowest index.
	pub fn exact_lookup(&self) -> HashMap<[u8; 3], u8> {
		let mut table = HashMap::with_capacity(self.usable);

		for (i, c) in self.usable_colors().iter().enumerate().rev() {
			table.insert(*c, i as u8);
		};

		table
	}
}


impl Default for Palette {
	fn default() -> Self {
		QUAKE_PALETTE.clone()
	}
}


const_assert_eq!(QUAKE_COLORS.len(), PALETTE_LEN);

#[rustfmt::skip]
const QUAKE_COLORS: [[u8; 3]; PALETTE_LEN] = [
	[  0,   0,   0], [ 15,  15,  15], [ 31,  31,  31], [ 47,  47,  47], [ 63,  63,  63], [ 75,  75,  75], [ 91,  91,  91], [107, 107, 107],
	[123, 123, 123], [139, 139, 139], [155, 155, 155], [171, 171, 171], [187, 187, 187], [203, 203, 203], [219, 219, 219], [235, 235, 235],
	[ 15,  11,   7], [ 23,  15,  11], [ 31,  23,  11], [ 39,  27,  15], [ 47,  35,  19], [ 55,  43,  23], [ 63,  47,  23], [ 75,  55,  27],
	[ 83,  59,  27], [ 91,  67,  31], [ 99,  75,  31], [107,  83,  31], [115,  87,  31], [123,  95,  35], [131, 103,  35], [143, 111,  35],
	[ 11,  11,  15], [ 19,  19,  27], [ 27,  27,  39], [ 39,  39,  51], [ 47,  47,  63], [ 55,  55,  75], [ 63,  63,  87], [ 71,  71, 103],
	[ 79,  79, 115], [ 91,  91, 127], [ 99,  99, 139], [107, 107, 151], [115, 115, 163], [123, 123, 175], [131, 131, 187], [139, 139, 203],
	[  0,   0,   0], [  7,   7,   0], [ 11,  11,   0], [ 19,  19,   0], [ 27,  27,   0], [ 35,  35,   0], [ 43,  43,   7], [ 47,  47,   7],
	[ 55,  55,   7], [ 63,  63,   7], [ 71,  71,   7], [ 75,  75,  11], [ 83,  83,  11], [ 91,  91,  11], [ 99,  99,  11], [107, 107,  15],
	[  7,   0,   0], [ 15,   0,   0], [ 23,   0,   0], [ 31,   0,   0], [ 39,   0,   0], [ 47,   0,   0], [ 55,   0,   0], [ 63,   0,   0],
	[ 71,   0,   0], [ 79,   0,   0], [ 87,   0,   0], [ 95,   0,   0], [103,   0,   0], [111,   0,   0], [119,   0,   0], [127,   0,   0],
	[ 19,  19,   0], [ 27,  27,   0], [ 35,  35,   0], [ 47,  43,   0], [ 55,  47,   0], [ 67,  55,   0], [ 75,  59,   7], [ 87,  67,   7],
	[ 95,  71,   7], [107,  75,  11], [119,  83,  15], [131,  87,  19], [139,  91,  19], [151,  95,  27], [163,  99,  31], [175, 103,  35],
	[ 35,  19,   7], [ 47,  23,  11], [ 59,  31,  15], [ 75,  35,  19], [ 87,  43,  23], [ 99,  47,  31], [115,  55,  35], [127,  59,  43],
	[143,  67,  51], [159,  79,  51], [175,  99,  47], [191, 119,  47], [207, 143,  43], [223, 171,  39], [239, 203,  31], [255, 243,  27],
	[ 11,   7,   0], [ 27,  19,   0], [ 43,  35,  15], [ 55,  43,  19], [ 71,  51,  27], [ 83,  55,  35], [ 99,  63,  43], [111,  71,  51],
	[127,  83,  63], [139,  95,  71], [155, 107,  83], [167, 123,  95], [183, 135, 107], [195, 147, 123], [211, 163, 139], [227, 179, 151],
	[171, 139, 163], [159, 127, 151], [147, 115, 135], [139, 103, 123], [127,  91, 111], [119,  83,  99], [107,  75,  87], [ 95,  63,  75],
	[ 87,  55,  67], [ 75,  47,  55], [ 67,  39,  47], [ 55,  31,  35], [ 43,  23,  27], [ 35,  19,  19], [ 23,  11,  11], [ 15,   7,   7],
	[187, 115, 159], [175, 107, 143], [163,  95, 131], [151,  87, 119], [139,  79, 107], [127,  75,  95], [115,  67,  83], [107,  59,  75],
	[ 95,  51,  63], [ 83,  43,  55], [ 71,  35,  43], [ 59,  31,  35], [ 47,  23,  27], [ 35,  19,  19], [ 23,  11,  11], [ 15,   7,   7],
	[219, 195, 187], [203, 179, 167], [191, 163, 155], [175, 151, 139], [163, 135, 123], [151, 123, 111], [135, 111,  95], [123,  99,  83],
	[107,  87,  71], [ 95,  75,  59], [ 83,  63,  51], [ 67,  51,  39], [ 55,  43,  31], [ 39,  31,  23], [ 27,  19,  15], [ 15,  11,   7],
	[111, 131, 123], [103, 123, 111], [ 95, 115, 103], [ 87, 107,  95], [ 79,  99,  87], [ 71,  91,  79], [ 63,  83,  71], [ 55,  75,  63],
	[ 47,  67,  55], [ 43,  59,  47], [ 35,  51,  39], [ 31,  43,  31], [ 23,  35,  23], [ 15,  27,  19], [ 11,  19,  11], [  7,  11,   7],
	[255, 243,  27], [239, 223,  23], [219, 203,  19], [203, 183,  15], [187, 167,  15], [171, 151,  11], [155, 131,   7], [139, 115,   7],
	[123,  99,   7], [107,  83,   0], [ 91,  71,   0], [ 75,  55,   0], [ 59,  43,   0], [ 43,  31,   0], [ 27,  15,   0], [ 11,   7,   0],
	[  0,   0, 255], [ 11,  11, 239], [ 19,  19, 223], [ 27,  27, 207], [ 35,  35, 191], [ 43,  43, 175], [ 47,  47, 159], [ 47,  47, 143],
	[ 47,  47, 127], [ 47,  47, 111], [ 47,  47,  95], [ 43,  43,  79], [ 35,  35,  63], [ 27,  27,  47], [ 19,  19,  31], [ 11,  11,  15],
	[ 43,   0,   0], [ 59,   0,   0], [ 75,   7,   0], [ 95,   7,   0], [111,  15,   0], [127,  23,   7], [147,  31,   7], [163,  39,  11],
	[183,  51,  15], [195,  75,  27], [207,  99,  43], [219, 127,  59], [227, 151,  79], [231, 171,  95], [239, 191, 119], [247, 211, 139],
	[167, 123,  59], [183, 155,  55], [199, 195,  55], [231, 227,  87], [127, 191, 255], [171, 231, 255], [215, 255, 255], [103,   0,   0],
	[139,   0,   0], [179,   0,   0], [215,   0,   0], [255,   0,   0], [255, 243, 147], [255, 247, 199], [255, 255, 255], [159,  91,  83],
];


#[test]
fn quake_palette_landmarks() {
	assert_eq!(QUAKE_PALETTE.color(0), [0, 0, 0]);
	assert_eq!(QUAKE_PALETTE.color(15), [235, 235, 235]);
	assert_eq!(QUAKE_PALETTE.color(254), [255, 255, 255]);
	assert_eq!(QUAKE_PALETTE.transparent_color(), [159, 91, 83]);
	assert_eq!(QUAKE_PALETTE.usable_len(), 256);
}


#[test]
fn nearest_prefers_lowest_index_on_ties() {
	// 0 and 48 are both black
	assert_eq!(QUAKE_PALETTE.nearest([0, 0, 0]), 0);
	// 111 and 192 are both (255, 243, 27)
	assert_eq!(QUAKE_PALETTE.color(111), QUAKE_PALETTE.color(192));
	assert_eq!(QUAKE_PALETTE.nearest([255, 243, 27]), 111);
	assert_eq!(QUAKE_PALETTE.nearest([1, 1, 2]), 0);
}


#[test]
fn nearest_is_exact_for_every_palette_color() {
	let lookup = QUAKE_PALETTE.exact_lookup();

	for c in QUAKE_PALETTE.colors() {
		let i = QUAKE_PALETTE.nearest(*c);
		assert_eq!(QUAKE_PALETTE.color(i), *c);
		assert_eq!(lookup[c], i);
	};
}


#[test]
fn reduced_palette_never_yields_fullbrights() {
	let reduced = QUAKE_PALETTE.without_fullbrights();

	assert_eq!(&reduced.colors()[..224], &QUAKE_PALETTE.colors()[..224]);
	assert_eq!(reduced.transparent_color(), [159, 91, 83]);
	assert!(reduced.colors()[225..].iter().all(|c| *c == [0, 0, 0]));

	for c in &QUAKE_PALETTE.colors()[FULLBRIGHT_START..] {
		assert!(usize::from(reduced.nearest(*c)) <= FULLBRIGHT_START);
	};

	// pure white is fullbright 254 in the full palette
	assert_eq!(QUAKE_PALETTE.nearest([255, 255, 255]), 254);
	assert!(usize::from(reduced.nearest([255, 255, 255])) < FULLBRIGHT_START);
}
