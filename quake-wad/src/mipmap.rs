#[cfg(feature = "arbitrary")] use arbitrary::{Arbitrary, Unstructured, Result as ArbitraryResult};
use bstr::{BString, ByteSlice};
use deku::prelude::*;
use image::imageops::FilterType;
use image::RgbaImage;
use static_assertions::const_assert_eq;

use crate::WadResult;
use crate::WadError::*;
use crate::{NAME_LEN, trim_name, pack_name};
use crate::Palette;
use crate::Quantizer;
use crate::imageops::construct_mipmap_series;
use crate::macros;


/// Number of mipmap levels stored in a miptexture.
pub const MIP_LEVELS: usize = 4;


/// Dimensions of mipmap `level` for a `width` x `height` texture:
/// each halving is floored, with a minimum of 1.
pub const fn mip_dimensions(width: u32, height: u32, level: usize) -> (u32, u32) {
	let w = width >> level;
	let h = height >> level;
	(if w == 0 { 1 } else { w }, if h == 0 { 1 } else { h })
}


/// A rectangular grid of palette indices in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
	width: u32,
	height: u32,
	indices: Vec<u8>,
}


impl IndexedImage {
	/// Construct an image, validating that `indices` holds exactly
	/// `width * height` entries.
	///
	/// # Errors
	/// - [`InvalidDimensions`]: Either dimension is 0, or `indices` has the wrong length.
	pub fn new(width: u32, height: u32, indices: Vec<u8>) -> WadResult<Self> {
		let expected = pixel_count(width, height)?;

		if indices.len() != expected {
			return Err(InvalidDimensions(width, height));
		};

		Ok(Self { width, height, indices })
	}


	/// Width in pixels.
	pub fn width(&self) -> u32 {
		self.width
	}


	/// Height in pixels.
	pub fn height(&self) -> u32 {
		self.height
	}


	/// `(width, height)`.
	pub fn dimensions(&self) -> (u32, u32) {
		(self.width, self.height)
	}


	/// Row-major palette indices.
	pub fn indices(&self) -> &[u8] {
		&self.indices
	}


	/// Consume self, returning the index buffer.
	pub fn into_indices(self) -> Vec<u8> {
		self.indices
	}


	/// Expand through `palette` to an opaque RGBA raster.
	///
	/// # Errors
	/// - [`InvalidDimensions`]: Should not happen for a validated image.
	pub fn to_rgba(&self, palette: &Palette) -> WadResult<RgbaImage> {
		let data = self.indices
			.iter()
			.flat_map(|i| palette.rgba(*i).0)
			.collect::<Vec<u8>>();

		RgbaImage::from_raw(self.width, self.height, data).ok_or(InvalidDimensions(self.width, self.height))
	}
}


#[cfg(feature = "arbitrary")]
impl<'a> Arbitrary<'a> for IndexedImage {
	fn arbitrary(input: &mut Unstructured<'a>) -> ArbitraryResult<Self> {
		let width: u32 = input.int_in_range(1..=128)?;
		let height: u32 = input.int_in_range(1..=128)?;
		let mut indices = vec![0u8; (width * height) as usize];
		input.fill_buffer(&mut indices)?;
		Ok(Self { width, height, indices })
	}
}


pub(crate) fn pixel_count(width: u32, height: u32) -> WadResult<usize> {
	if width == 0 || height == 0 {
		return Err(InvalidDimensions(width, height));
	};

	usize::try_from(width)?
		.checked_mul(usize::try_from(height)?)
		.ok_or(InvalidDimensions(width, height))
}


/// 40-byte miptexture header
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct MipTextureHead {
	/// NUL-padded texture name.
	pub name: [u8; NAME_LEN],
	/// Level 0 width.
	pub width: u32,
	/// Level 0 height.
	pub height: u32,
	/// Offsets of the four levels from the start of the lump.
	pub offsets: [u32; MIP_LEVELS],
}

const_assert_eq!(std::mem::size_of::<MipTextureHead>(), MipTextureHead::SIZE);


impl MipTextureHead {
	/// On-disk size in bytes.
	pub const SIZE: usize = 40;


	fn parse(raw: &[u8]) -> WadResult<Self> {
		if raw.len() < Self::SIZE {
			return Err(MalformedLump(format!("miptexture header needs {} bytes, lump has {}", Self::SIZE, raw.len())));
		};

		let (_, head) = Self::from_bytes((raw, 0))?;

		if head.width == 0 || head.height == 0 {
			return Err(MalformedLump(format!("miptexture {:?} is {}x{}", trim_name(&head.name), head.width, head.height)));
		};

		Ok(head)
	}
}


/// Offsets of the four mip levels for a `width` x `height` texture packed
/// directly after the header.
///
/// # Errors
/// - [`InvalidDimensions`], [`ArithmeticOverflow`], [`UnexpectedTryFromIntError`][crate::WadError::UnexpectedTryFromIntError]:
///   The texture does not fit a 32-bit lump.
pub fn mip_offsets(width: u32, height: u32) -> WadResult<[u32; MIP_LEVELS]> {
	let mut offsets = [0u32; MIP_LEVELS];
	let mut offset = MipTextureHead::SIZE;

	for (level, slot) in offsets.iter_mut().enumerate() {
		*slot = offset.try_into()?;
		let (w, h) = mip_dimensions(width, height, level);
		offset = offset.checked_add(pixel_count(w, h)?).ok_or(ArithmeticOverflow)?;
	};

	u32::try_from(offset)?;

	Ok(offsets)
}


#[test]
fn test_mip_offsets() {
	assert_eq!(mip_offsets(64, 64).unwrap(), [40, 40 + 4096, 40 + 4096 + 1024, 40 + 4096 + 1024 + 256]);
	assert_eq!(mip_offsets(24, 8).unwrap(), [40, 232, 280, 292]);
	assert_eq!(mip_offsets(1, 1).unwrap(), [40, 41, 42, 43]);
}


/// A world texture: name plus the full-resolution level
///
/// Only level 0 is kept; the smaller levels are regenerated on
/// [`encode`][Self::encode].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipTexture {
	/// Texture name (at most 16 bytes).
	pub name: BString,
	/// Level 0 pixels.
	pub image: IndexedImage,
}


impl MipTexture {
	/// Construct a miptexture.
	///
	/// # Errors
	/// - [`NameTooLong`]: `name` is longer than 16 bytes.
	pub fn with_name_and_image<N: Into<BString>>(name: N, image: IndexedImage) -> WadResult<Self> {
		let name = name.into();
		pack_name(&name)?;
		Ok(Self { name, image })
	}


	/// Parse a miptexture lump body, keeping only level 0.
	///
	/// Dimensions are not required to be multiples of 16.
	///
	/// # Errors
	/// - [`MalformedLump`]: The header is truncated, a dimension is zero, or
	///   level 0 lies outside the lump.
	pub fn decode(raw: &[u8]) -> WadResult<Self> {
		let head = MipTextureHead::parse(raw)?;
		let image = read_level(raw, &head, 0)?;
		Ok(Self { name: trim_name(&head.name), image })
	}


	/// Serialize to a miptexture lump body: header, level 0 as is, then three
	/// levels produced by resampling the palette-expanded image with `filter`
	/// and quantizing against `palette`.
	///
	/// # Errors
	/// - [`NameTooLong`]: [`Self::name`] is longer than 16 bytes.
	/// - [`InvalidDimensions`], [`ArithmeticOverflow`]: The texture does not fit a lump.
	pub fn encode(&self, palette: &Palette, filter: FilterType) -> WadResult<Vec<u8>> {
		let (width, height) = self.image.dimensions();
		let head = MipTextureHead {
			name: pack_name(&self.name)?,
			width,
			height,
			offsets: mip_offsets(width, height)?,
		};

		let levels = generate_mip_chain(&self.image, palette, filter)?;

		let mut buf = head.to_bytes()?;

		for level in &levels {
			buf.extend(level.indices());
		};

		macros::log!(trace, "Encoded miptexture {:?} {}x{} ({} bytes)", self.name, width, height, buf.len());

		Ok(buf)
	}


	/// Width of level 0.
	pub fn width(&self) -> u32 {
		self.image.width()
	}


	/// Height of level 0.
	pub fn height(&self) -> u32 {
		self.image.height()
	}


	/// Lossy UTF-8 rendition of [`Self::name`].
	pub fn name_lossy(&self) -> String {
		self.name.to_str_lossy().into_owned()
	}
}


fn read_level(raw: &[u8], head: &MipTextureHead, level: usize) -> WadResult<IndexedImage> {
	let (width, height) = mip_dimensions(head.width, head.height, level);
	let len = pixel_count(width, height).map_err(|e| MalformedLump(e.to_string()))?;
	let start = usize::try_from(head.offsets[level])?;

	let out_of_bounds = || MalformedLump(format!("mip level {} at {}+{} lies outside the {}-byte lump", level, start, len, raw.len()));

	if start < MipTextureHead::SIZE {
		return Err(out_of_bounds());
	};

	let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
	let pixels = raw.get(start..end).ok_or_else(out_of_bounds)?;

	IndexedImage::new(width, height, pixels.to_vec())
}


/// Read mip level `level` (0 to 3) exactly as stored in a miptexture lump body.
///
/// # Errors
/// - [`MalformedLump`]: See [`MipTexture::decode`]; also when `level` is not below [`MIP_LEVELS`].
pub fn read_stored_level(raw: &[u8], level: usize) -> WadResult<IndexedImage> {
	if level >= MIP_LEVELS {
		return Err(MalformedLump(format!("miptextures have {} levels, requested level {}", MIP_LEVELS, level)));
	};

	let head = MipTextureHead::parse(raw)?;
	read_level(raw, &head, level)
}


/// Produce the four levels of a miptexture from its level 0.
///
/// Level 0 is returned unchanged. Each further level is resampled from the
/// previous one in true color, then quantized against `palette`.
///
/// # Errors
/// - [`InvalidDimensions`]: Should not happen for a validated image.
pub fn generate_mip_chain(image: &IndexedImage, palette: &Palette, filter: FilterType) -> WadResult<Vec<IndexedImage>> {
	let rgba = image.to_rgba(palette)?;
	let series = construct_mipmap_series(rgba, MIP_LEVELS, filter);

	let mut quantizer = Quantizer::with_palette(palette);
	let mut levels = Vec::with_capacity(MIP_LEVELS);
	levels.push(image.clone());

	for level in series.iter().skip(1) {
		levels.push(quantizer.quantize(level)?);
	};

	Ok(levels)
}


/// Encode `image` as a miptexture lump body named `name` using the
/// triangle filter for mip generation.
///
/// # Errors
/// See [`MipTexture::encode`].
///
/// # Example
/// ```
/// # use quake_wad::{encode_miptexture, decode_miptexture, IndexedImage, QUAKE_PALETTE};
/// let image = IndexedImage::new(16, 16, vec![7; 256]).unwrap();
/// let body = encode_miptexture(b"floor", &image, &QUAKE_PALETTE).unwrap();
/// assert_eq!(body.len(), 40 + 256 + 64 + 16 + 4);
///
/// let texture = decode_miptexture(&body).unwrap();
/// assert_eq!(texture.name, "floor");
/// assert_eq!(texture.image, image);
/// ```
pub fn encode_miptexture(name: &[u8], image: &IndexedImage, palette: &Palette) -> WadResult<Vec<u8>> {
	let texture = MipTexture::with_name_and_image(name, image.clone())?;
	texture.encode(palette, FilterType::Triangle)
}


/// Shorthand for [`MipTexture::decode`].
///
/// # Errors
/// See [`MipTexture::decode`].
pub fn decode_miptexture(raw: &[u8]) -> WadResult<MipTexture> {
	MipTexture::decode(raw)
}


#[cfg(test)]
fn checkerboard(width: u32, height: u32) -> IndexedImage {
	let indices = (0..height)
		.flat_map(|y| (0..width).map(move |x| if (x / 4 + y / 4) % 2 == 0 { 15 } else { 0 }))
		.collect();
	IndexedImage::new(width, height, indices).unwrap()
}


#[test]
fn test_mip_dimensions() {
	assert_eq!(mip_dimensions(64, 32, 0), (64, 32));
	assert_eq!(mip_dimensions(64, 32, 3), (8, 4));
	assert_eq!(mip_dimensions(24, 8, 3), (3, 1));
	assert_eq!(mip_dimensions(1, 1, 3), (1, 1));
}


#[test]
fn encode_layout() {
	use crate::QUAKE_PALETTE;

	let image = checkerboard(32, 16);
	let body = encode_miptexture(b"check", &image, &QUAKE_PALETTE).unwrap();
	assert_eq!(body.len(), 40 + 512 + 128 + 32 + 8);

	let (_, head) = MipTextureHead::from_bytes((&body, 0)).unwrap();
	assert_eq!(trim_name(&head.name), "check");
	assert_eq!((head.width, head.height), (32, 16));
	assert_eq!(head.offsets, [40, 552, 680, 712]);
	assert_eq!(&body[40..552], image.indices());

	let level3 = read_stored_level(&body, 3).unwrap();
	assert_eq!(level3.dimensions(), (4, 2));
	let level1 = read_stored_level(&body, 1).unwrap();
	assert_eq!(level1.dimensions(), (16, 8));
	assert!(read_stored_level(&body, 4).is_err());
}


#[test]
fn solid_color_mips_keep_the_color() {
	use crate::QUAKE_PALETTE;

	let image = IndexedImage::new(16, 16, vec![100; 256]).unwrap();
	let levels = generate_mip_chain(&image, &QUAKE_PALETTE, FilterType::Triangle).unwrap();

	assert_eq!(levels.len(), 4);
	for (level, mip) in levels.iter().enumerate() {
		assert_eq!(mip.dimensions(), mip_dimensions(16, 16, level));
		assert!(mip.indices().iter().all(|i| *i == 100));
	};
}


#[test]
fn decode_tolerates_odd_dimensions() {
	use crate::QUAKE_PALETTE;

	let image = checkerboard(24, 8);
	let body = encode_miptexture(b"odd", &image, &QUAKE_PALETTE).unwrap();
	let texture = decode_miptexture(&body).unwrap();
	assert_eq!(texture.image, image);
}


#[test]
fn decode_malformed() {
	use crate::QUAKE_PALETTE;

	assert!(matches!(decode_miptexture(&[0u8; 39]), Err(MalformedLump(_))));

	let image = checkerboard(16, 16);
	let body = encode_miptexture(b"cut", &image, &QUAKE_PALETTE).unwrap();
	assert!(matches!(decode_miptexture(&body[..200]), Err(MalformedLump(_))));

	let mut zero_width = body.clone();
	zero_width[16..20].copy_from_slice(&[0, 0, 0, 0]);
	assert!(matches!(decode_miptexture(&zero_width), Err(MalformedLump(_))));

	let mut bad_offset = body;
	bad_offset[24..28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
	assert!(matches!(decode_miptexture(&bad_offset), Err(MalformedLump(_))));
}


#[test]
fn names_are_limited_to_16_bytes() {
	let image = checkerboard(16, 16);
	assert!(MipTexture::with_name_and_image("sixteen_bytes_ok", image.clone()).is_ok());
	assert!(matches!(MipTexture::with_name_and_image("seventeen_bytes__", image), Err(NameTooLong(_))));
}
