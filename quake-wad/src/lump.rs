use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::WadResult;
use crate::WadError::*;
use crate::LumpType;
use crate::{IndexedImage, MipTexture};
use crate::mipmap::pixel_count;
use crate::ExtendExt;


/// Parse a picture lump body: little-endian `u32` width and height followed
/// by `width * height` palette indices.
///
/// # Errors
/// - [`MalformedLump`]: The body is shorter than its header claims, or a dimension is zero.
pub fn decode_picture(raw: &[u8]) -> WadResult<IndexedImage> {
	let mut input = Cursor::new(raw);

	let (width, height) = match (input.read_u32::<LittleEndian>(), input.read_u32::<LittleEndian>()) {
		(Ok(w), Ok(h)) => (w, h),
		_ => return Err(MalformedLump(format!("picture header needs 8 bytes, lump has {}", raw.len()))),
	};

	let len = pixel_count(width, height).map_err(|e| MalformedLump(e.to_string()))?;
	let pixels = raw
		.get(8..)
		.and_then(|rest| rest.get(..len))
		.ok_or_else(|| MalformedLump(format!("{}x{} picture truncated to {} bytes", width, height, raw.len())))?;

	IndexedImage::new(width, height, pixels.to_vec())
}


/// Serialize `image` as a picture lump body.
pub fn encode_picture(image: &IndexedImage) -> Vec<u8> {
	let mut buf = Vec::with_capacity(8 + image.indices().len());
	buf.extend_with_uint::<LittleEndian, _, 4>(image.width());
	buf.extend_with_uint::<LittleEndian, _, 4>(image.height());
	buf.extend(image.indices());
	buf
}


/// A decoded image lump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lump {
	/// Status bar or menu picture.
	Picture(IndexedImage),
	/// World texture.
	MipTexture(MipTexture),
}


impl Lump {
	/// Decode a lump body according to its type code.
	///
	/// # Errors
	/// - [`UnsupportedLump`]: `lump_type` is neither a picture nor a miptexture.
	/// - [`MalformedLump`]: See [`decode_picture`] and [`MipTexture::decode`].
	pub fn decode(lump_type: LumpType, raw: &[u8]) -> WadResult<Self> {
		match lump_type {
			LumpType::Picture => decode_picture(raw).map(Lump::Picture),
			LumpType::MipTexture => MipTexture::decode(raw).map(Lump::MipTexture),
			other => Err(UnsupportedLump(other.into())),
		}
	}


	/// Level 0 pixels.
	pub fn image(&self) -> &IndexedImage {
		match self {
			Lump::Picture(image) => image,
			Lump::MipTexture(texture) => &texture.image,
		}
	}


	/// Type code this lump is stored under.
	pub fn lump_type(&self) -> LumpType {
		match self {
			Lump::Picture(_) => LumpType::Picture,
			Lump::MipTexture(_) => LumpType::MipTexture,
		}
	}
}


#[test]
fn picture_roundtrip() {
	let image = IndexedImage::new(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
	let body = encode_picture(&image);
	assert_eq!(body, vec![3, 0, 0, 0, 2, 0, 0, 0, 1, 2, 3, 4, 5, 6]);
	assert_eq!(decode_picture(&body).unwrap(), image);

	// trailing bytes are ignored
	let mut padded = body;
	padded.extend([0xAA, 0xBB]);
	assert_eq!(decode_picture(&padded).unwrap(), image);
}


#[test]
fn picture_malformed() {
	assert!(matches!(decode_picture(&[3, 0, 0]), Err(MalformedLump(_))));
	assert!(matches!(decode_picture(&[3, 0, 0, 0, 2, 0, 0, 0, 1, 2, 3]), Err(MalformedLump(_))));
	assert!(matches!(decode_picture(&[0, 0, 0, 0, 2, 0, 0, 0]), Err(MalformedLump(_))));
}


#[test]
fn dispatch_by_type() {
	let image = IndexedImage::new(1, 1, vec![9]).unwrap();
	let body = encode_picture(&image);

	let lump = Lump::decode(LumpType::Picture, &body).unwrap();
	assert_eq!(lump.image(), &image);
	assert_eq!(lump.lump_type(), LumpType::Picture);

	assert_eq!(Lump::decode(LumpType::Palette, &[0u8; 768]).unwrap_err(), UnsupportedLump(0x40));
	assert_eq!(Lump::decode(LumpType::Other(0x43), &body).unwrap_err(), UnsupportedLump(0x43));
}
