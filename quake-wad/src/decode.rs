use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tap::prelude::*;

use crate::{WadArchive, WadLump, LumpType, WadResult};
use crate::WadError::*;
use crate::{Lump, Palette, QUAKE_PALETTE};
use crate::{unique_stem, file_stem_for_lump};
use crate::macros;


/// Decodes the lumps of a [`WadArchive`] into images
#[derive(Debug, Clone)]
pub struct WadDecoder {
	wad: WadArchive,
	palette: Palette,
}


/// A lump written out by [`WadDecoder::extract_to`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLump {
	/// Name shown to the user: the lump name, with a ` (n)` suffix if the
	/// destination already held that name.
	pub display_name: String,
	/// Written file: `<display_name>.png` for images, `<display_name>` for raw lumps.
	pub path: PathBuf,
	/// Type code of the source lump.
	pub lump_type: LumpType,
}


impl ExtractedLump {
	/// `true` when the lump was written as an image.
	pub fn is_image(&self) -> bool {
		self.lump_type.is_image()
	}
}


impl WadDecoder {
	/// Create an instance of `Self` from a [`WadArchive`], expanding images
	/// through the Quake palette.
	pub fn with_wad(wad: WadArchive) -> Self {
		Self::with_wad_and_palette(wad, QUAKE_PALETTE.clone())
	}


	/// Create an instance of `Self` with a custom palette.
	pub fn with_wad_and_palette(wad: WadArchive, palette: Palette) -> Self {
		Self { wad, palette }
	}


	/// The archive being decoded.
	pub fn wad(&self) -> &WadArchive {
		&self.wad
	}


	/// Lump at `index`, or the error recorded while reading it.
	///
	/// # Errors
	/// - [`LumpIndexOutOfRange`]: `index` is outside of bounds of [`WadArchive::lumps`].
	/// - other: [`WadResult<WadLump>`] at given index contains an error.
	pub fn lump_nth(&self, index: usize) -> WadResult<&WadLump> {
		self.wad.lumps
			.get(index)
			.ok_or(LumpIndexOutOfRange)?
			.as_ref()
			.map_err(Clone::clone)
	}


	/// Decode lump at [`WadArchive::lumps`]`[index]`.
	///
	/// # Errors
	/// - [`LumpIndexOutOfRange`], other: See [`Self::lump_nth`].
	/// - [`UnsupportedCompression`]: The lump is compressed.
	/// - [`UnsupportedLump`], [`MalformedLump`]: See [`Lump::decode`].
	pub fn decode_nth(&self, index: usize) -> WadResult<Lump> {
		let lump = self.lump_nth(index)?;

		if lump.compression != 0 {
			return Err(UnsupportedCompression(lump.compression));
		};

		Lump::decode(lump.lump_type, &lump.data)
	}


	/// Decode lump at `index` and expand it to an opaque RGBA raster.
	///
	/// # Errors
	/// See [`Self::decode_nth`].
	pub fn decode_nth_rgba(&self, index: usize) -> WadResult<RgbaImage> {
		self.decode_nth(index)?.image().to_rgba(&self.palette)
	}


	/// Write every lump into `dest_dir`.
	///
	/// Image lumps become `<name>.png`; lumps of other types are copied raw to
	/// an extension-less `<name>`. Names already present in `dest_dir` get a
	/// ` (n)` suffix. A lump that fails to decode or write is logged and
	/// skipped. Results are in directory order.
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: `dest_dir` could not be created.
	pub fn extract_to(&self, dest_dir: &Path) -> WadResult<Vec<ExtractedLump>> {
		std::fs::create_dir_all(dest_dir)?;

		let mut extracted = Vec::with_capacity(self.wad.lumps.len());

		for index in 0..self.wad.lumps.len() {
			match self.extract_nth(index, dest_dir) {
				Ok(lump) => {
					macros::log!(debug, "Extracted {} ({})", lump.display_name, lump.lump_type);
					extracted.push(lump);
				},
				Err(e) => {
					let name = self.lump_nth(index).map(WadLump::name_lossy).unwrap_or_default();
					macros::log!(error, "Skipping lump #{} {:?}: {}", index, name, e);
				},
			};
		};

		macros::log!(info, "Extracted {} of {} lumps", extracted.len(), self.wad.lumps.len());

		Ok(extracted)
	}


	fn extract_nth(&self, index: usize, dest_dir: &Path) -> WadResult<ExtractedLump> {
		let lump = self.lump_nth(index)?;
		let name = file_stem_for_lump(&lump.name);

		match self.decode_nth_rgba(index) {
			Ok(image) => {
				let display_name = unique_stem(dest_dir, &name, Some("png"));
				let path = dest_dir.join(format!("{}.png", display_name));
				image.save(&path)?;
				Ok(ExtractedLump { display_name, path, lump_type: lump.lump_type })
			},
			Err(UnsupportedLump(_)) => {
				macros::log!(warn, "Lump {:?} has type {}, copying raw data", name, lump.lump_type);
				let display_name = unique_stem(dest_dir, &name, None);
				let path = dest_dir.join(&display_name);
				std::fs::write(&path, &lump.data)?;
				Ok(ExtractedLump { display_name, path, lump_type: lump.lump_type })
			},
			Err(e) => Err(e),
		}
	}
}


/// Read the archive at `wad_path` and extract every lump into `dest_dir`,
/// see [`WadDecoder::extract_to`].
///
/// # Errors
/// - [`NotAWadFile`], [`DirectoryOutOfBounds`]: See [`WadArchive::read_from`].
/// - [`UnexpectedIoError`]: `wad_path` could not be opened or `dest_dir` could not be created.
pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(wad_path: P, dest_dir: Q) -> WadResult<Vec<ExtractedLump>> {
	let mut input = File::open(wad_path.as_ref())?.pipe(BufReader::new);

	WadArchive::read_from(&mut input)?
		.pipe(WadDecoder::with_wad)
		.extract_to(dest_dir.as_ref())
}


#[cfg(test)]
fn sample_archive() -> WadArchive {
	use crate::{IndexedImage, encode_miptexture, encode_picture};

	let texture = IndexedImage::new(16, 16, (0..=255).collect()).unwrap();
	let picture = IndexedImage::new(2, 1, vec![254, 0]).unwrap();

	WadArchive::with_lumps(vec![
		WadLump::new("ramp", LumpType::MipTexture, encode_miptexture(b"ramp", &texture, &QUAKE_PALETTE).unwrap()),
		WadLump::new("CONCHARS", LumpType::Flat, vec![1, 2, 3]),
		WadLump::new("ramp", LumpType::Picture, encode_picture(&picture)),
		WadLump::new("broken", LumpType::MipTexture, vec![0; 12]),
	])
}


#[test]
fn decode_nth_errors() {
	let decoder = WadDecoder::with_wad(sample_archive());

	assert!(matches!(decoder.decode_nth(0), Ok(Lump::MipTexture(_))));
	assert_eq!(decoder.decode_nth(1).unwrap_err(), UnsupportedLump(0x45));
	assert!(matches!(decoder.decode_nth(3), Err(MalformedLump(_))));
	assert_eq!(decoder.decode_nth(4).unwrap_err(), LumpIndexOutOfRange);

	let mut compressed = sample_archive();
	if let Ok(lump) = &mut compressed.lumps[0] {
		lump.compression = 1;
	};
	assert_eq!(WadDecoder::with_wad(compressed).decode_nth(0).unwrap_err(), UnsupportedCompression(1));
}


#[test]
fn extract_to_directory() {
	let dir = tempfile::tempdir().unwrap();
	let wad_path = dir.path().join("sample.wad");
	let out = dir.path().join("out");

	std::fs::write(&wad_path, sample_archive().to_bytes().unwrap()).unwrap();

	let extracted = open(&wad_path, &out).unwrap();
	let names = extracted.iter().map(|e| e.display_name.as_str()).collect::<Vec<_>>();
	assert_eq!(names, vec!["ramp", "CONCHARS", "ramp (1)"]);

	assert!(extracted[0].is_image());
	assert_eq!(extracted[0].path, out.join("ramp.png"));
	assert!(!extracted[1].is_image());
	assert_eq!(std::fs::read(out.join("CONCHARS")).unwrap(), vec![1, 2, 3]);

	let ramp = image::open(out.join("ramp.png")).unwrap().into_rgba8();
	assert_eq!(ramp.dimensions(), (16, 16));
	assert_eq!(ramp.get_pixel(15, 15).0, [159, 91, 83, 255]);
	assert_eq!(ramp.get_pixel(1, 0).0, [15, 15, 15, 255]);

	let picture = image::open(out.join("ramp (1).png")).unwrap().into_rgba8();
	assert_eq!(picture.dimensions(), (2, 1));
	assert_eq!(picture.get_pixel(0, 0).0, [255, 255, 255, 255]);

	// extracting again does not clobber the first run
	let again = open(&wad_path, &out).unwrap();
	assert_eq!(again[0].display_name, "ramp (2)");
}


#[test]
fn open_rejects_non_wad() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("not.wad");
	std::fs::write(&path, b"PACK\0\0\0\0").unwrap();

	assert_eq!(open(&path, dir.path().join("out")).unwrap_err(), NotAWadFile);
	assert!(!dir.path().join("out").exists());
}
