#![warn(missing_docs, unreachable_pub, clippy::all)]
#![allow(deprecated)]
#![allow(clippy::wildcard_imports, clippy::enum_glob_use)]
#![warn(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]


#![doc = include_str!("../../README.md")]


mod macros;
mod palette;
mod quantize;
mod imageops;
mod mipmap;
mod lump;
mod naming;
mod decode;
mod encode;
mod import;
mod transform;

pub use palette::*;
pub use quantize::*;
pub use mipmap::*;
pub use lump::*;
pub use naming::*;
pub use decode::*;
pub use encode::*;
pub use import::*;
pub use transform::*;
pub use imageops::{normalized_dimensions, normalize_for_import};


use std::io::{Read, Write, Seek, SeekFrom, Cursor};
use std::iter::Extend;

use bstr::{BString, ByteSlice};
use byteorder::ByteOrder;
#[cfg(test)] use byteorder::LittleEndian;
use deku::prelude::*;
use derive_more::{Display, Error};
use static_assertions::const_assert_eq;
#[cfg(test)] use static_assertions::assert_impl_all;

use WadError::*;

/// [`std::result::Result`] parameterized with [`WadError`]
pub type WadResult<T> = Result<T, WadError>;


/// `quake_wad`'s [`std::error::Error`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WadError {
	/// The input does not start with the `WAD2` signature.
	#[display(fmt = "Not a WAD2 file (missing \"WAD2\" signature)")]
	NotAWadFile,

	/// A function that reads from [`std::io::Read`] encountered early EOF.
	#[display(fmt = "Unexpected end of input file")]
	UnexpectedEof,

	/// Unexpected I/O error that is not UnexpectedEof.
	#[display(fmt = "Unexpected I/O error: {}", _0)]
	UnexpectedIoError(#[error(ignore)] std::io::ErrorKind),

	/// Unexpected integer conversion error.
	#[display(fmt = "Unexpected integer conversion error: {}", _0)]
	UnexpectedTryFromIntError(std::num::TryFromIntError),

	/// The lump directory (as indicated by the header) lies outside the archive.
	#[display(fmt = "Lump directory lies outside the archive")]
	DirectoryOutOfBounds,

	/// Lump data is truncated or its header is inconsistent with its length.
	#[display(fmt = "Malformed lump: {}", _0)]
	MalformedLump(#[error(ignore)] String),

	/// Lump type code is neither a picture nor a miptexture.
	#[display(fmt = "Unsupported lump type: 0x{:02X}", _0)]
	UnsupportedLump(#[error(ignore)] u8),

	/// Lump is stored with a compression scheme other than "none".
	#[display(fmt = "Unsupported lump compression: {}", _0)]
	UnsupportedCompression(#[error(ignore)] u8),

	/// Lump name does not fit the 16-byte name field.
	#[display(fmt = "Lump name is longer than 16 bytes: {:?}", _0)]
	NameTooLong(#[error(ignore)] String),

	/// Image width or height is zero, or width * height overflows.
	#[display(fmt = "Invalid image dimensions: {}x{}", _0, _1)]
	InvalidDimensions(u32, u32),

	/// A checked arithmetic operation triggered an unexpected under/overflow.
	#[display(fmt = "A checked arithmetic operation triggered an unexpected under/overflow")]
	ArithmeticOverflow,

	/// The `image` crate failed to load or save a raster.
	#[display(fmt = "Image error: {}", _0)]
	ImageError(#[error(ignore)] String),

	/// A rename target already exists.
	#[display(fmt = "Path already exists: {}", _0)]
	PathExists(#[error(ignore)] String),

	/// [`WadDecoder::decode_nth`] received a lump index out of range.
	#[display(fmt = "Lump index out of range")]
	LumpIndexOutOfRange,

	/// The [`WadArchive`] passed to [`WadArchive::to_bytes`] contained lump errors.
	#[display(fmt = "The WadArchive passed to WadArchive::to_bytes contained lump errors")]
	InputLumpErrorWhileEncoding(usize, Box<WadError>),

	/// Serializing a fixed-layout structure failed.
	#[display(fmt = "Serialization failed: {}", _0)]
	SerializationError(#[error(ignore)] String),
}


impl From<std::io::Error> for WadError {
	fn from(error: std::io::Error) -> Self {
		match error.kind() {
			std::io::ErrorKind::UnexpectedEof => UnexpectedEof,
			kind => UnexpectedIoError(kind),
		}
	}
}


impl From<std::num::TryFromIntError> for WadError {
	fn from(error: std::num::TryFromIntError) -> Self {
		UnexpectedTryFromIntError(error)
	}
}


impl From<image::ImageError> for WadError {
	fn from(error: image::ImageError) -> Self {
		match error {
			image::ImageError::IoError(e) => e.into(),
			e => ImageError(e.to_string()),
		}
	}
}


impl From<DekuError> for WadError {
	fn from(error: DekuError) -> Self {
		SerializationError(error.to_string())
	}
}


/// Length of the lump name field in directory entries and miptexture headers.
pub const NAME_LEN: usize = 16;


/// Type code of a lump, as stored in its directory entry
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LumpType {
	/// 256 RGB triplets.
	#[display(fmt = "palette")]
	Palette,

	/// Flat picture with a width/height header (status bar and menu graphics).
	#[display(fmt = "picture")]
	Picture,

	/// World texture with a name header and four mipmap levels.
	#[display(fmt = "miptex")]
	MipTexture,

	/// Headerless picture (console background, `CONCHARS`).
	#[display(fmt = "flat")]
	Flat,

	/// Any other type code.
	#[display(fmt = "0x{:02X}", _0)]
	Other(u8),
}


impl LumpType {
	/// Returns `true` for the lump types that decode to an image.
	pub const fn is_image(&self) -> bool {
		matches!(self, LumpType::Picture | LumpType::MipTexture)
	}
}


impl From<u8> for LumpType {
	fn from(code: u8) -> Self {
		match code {
			0x40 => LumpType::Palette,
			0x42 => LumpType::Picture,
			0x44 => LumpType::MipTexture,
			0x45 => LumpType::Flat,
			other => LumpType::Other(other),
		}
	}
}


impl From<LumpType> for u8 {
	fn from(lump_type: LumpType) -> Self {
		match lump_type {
			LumpType::Palette => 0x40,
			LumpType::Picture => 0x42,
			LumpType::MipTexture => 0x44,
			LumpType::Flat => 0x45,
			LumpType::Other(code) => code,
		}
	}
}


/// WAD2 file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct WadHeader {
	/// Always `WAD2`.
	pub magic: [u8; 4],
	/// Number of directory entries.
	pub entry_count: u32,
	/// Offset of the directory from the start of the archive.
	pub directory_offset: u32,
}

const_assert_eq!(std::mem::size_of::<WadHeader>(), 12);


impl WadHeader {
	/// Archive signature.
	pub const MAGIC: [u8; 4] = *b"WAD2";
	/// On-disk size in bytes.
	pub const SIZE: usize = 12;


	/// Construct a header with the `WAD2` signature.
	pub const fn new(entry_count: u32, directory_offset: u32) -> Self {
		Self { magic: Self::MAGIC, entry_count, directory_offset }
	}
}


/// WAD2 directory entry: location, size, type and name of one lump
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct WadEntry {
	/// Offset of the lump data from the start of the archive.
	pub offset: u32,
	/// Size of the lump as stored.
	pub disk_size: u32,
	/// Size of the lump after decompression.
	pub size: u32,
	/// Raw lump type code, see [`LumpType`].
	pub lump_type: u8,
	/// 0 for uncompressed lumps; no other value is supported.
	pub compression: u8,
	/// NUL-padded lump name.
	#[deku(pad_bytes_before = "2")]
	pub name: [u8; NAME_LEN],
}


impl WadEntry {
	/// On-disk size in bytes (including two padding bytes).
	pub const SIZE: usize = 32;


	/// Lump name up to the first NUL byte.
	pub fn name(&self) -> BString {
		trim_name(&self.name)
	}


	/// `offset + disk_size`, or `None` on overflow.
	pub fn end(&self) -> Option<u64> {
		u64::from(self.offset).checked_add(self.disk_size.into())
	}
}


/// One named lump held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadLump {
	/// Lump name (at most 16 bytes, without NUL padding).
	pub name: BString,
	/// Lump type code.
	pub lump_type: LumpType,
	/// Compression code from the directory entry.
	pub compression: u8,
	/// Lump body as stored.
	pub data: Vec<u8>,
}


impl WadLump {
	/// Construct an uncompressed lump.
	pub fn new<N: Into<BString>>(name: N, lump_type: LumpType, data: Vec<u8>) -> Self {
		Self { name: name.into(), lump_type, compression: 0, data }
	}


	/// Lossy UTF-8 rendition of [`Self::name`].
	pub fn name_lossy(&self) -> String {
		self.name.to_str_lossy().into_owned()
	}
}


/// A WAD2 archive: its lumps in directory order
///
/// Lumps that could not be read are kept as `Err` elements in place, so one
/// damaged entry does not hide the rest of the archive.
#[derive(Default, Debug, Clone)]
pub struct WadArchive {
	/// Lumps in on-disk directory order.
	pub lumps: Vec<WadResult<WadLump>>,
}


impl WadArchive {
	/// Construct an archive from successfully built lumps.
	pub fn with_lumps(lumps: Vec<WadLump>) -> Self {
		Self { lumps: lumps.into_iter().map(Ok).collect() }
	}


	/// Read a [`WadArchive`][Self] from a [`std::io::Read`].
	///
	/// The signature is checked before anything else is parsed.
	///
	/// # Errors
	/// - [`NotAWadFile`]: The input does not start with `WAD2`.
	/// - [`UnexpectedEof`]: The header or directory is truncated.
	/// - [`UnexpectedIoError`]: Unexpected read or seek error.
	/// - [`DirectoryOutOfBounds`]: The directory does not fit in the input.
	pub fn read_from<R: Read + Seek>(input: &mut R) -> WadResult<Self> {
		let start = input.stream_position()?;

		let mut head_data = [0u8; WadHeader::SIZE];

		match input.read_exact(&mut head_data[..4]) {
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(NotAWadFile),
			r => r?,
		};

		if head_data[..4] != WadHeader::MAGIC {
			return Err(NotAWadFile);
		};

		input.read_exact(&mut head_data[4..])?;
		let (_, header) = WadHeader::from_bytes((&head_data, 0))?;

		let end = input.seek(SeekFrom::End(0))?;
		let archive_len = end.checked_sub(start).ok_or(ArithmeticOverflow)?;

		let directory_len = u64::from(header.entry_count)
			.checked_mul(WadEntry::SIZE as u64)
			.ok_or(ArithmeticOverflow)?;
		let directory_end = u64::from(header.directory_offset)
			.checked_add(directory_len)
			.ok_or(ArithmeticOverflow)?;

		if directory_end > archive_len {
			return Err(DirectoryOutOfBounds);
		};

		macros::log!(debug, "WAD2 header: {} entries, directory at 0x{:X}", header.entry_count, header.directory_offset);

		input.seek(SeekFrom::Start(start + u64::from(header.directory_offset)))?;
		let directory_data = input.read_exact_buffered(directory_len.try_into()?)?;

		let entries = directory_data
			.chunks_exact(WadEntry::SIZE)
			.map(|chunk| WadEntry::from_bytes((chunk, 0)).map(|(_, e)| e))
			.collect::<Result<Vec<WadEntry>, DekuError>>()?;

		let lumps = entries
			.iter()
			.map(|entry| read_lump(input, start, archive_len, entry))
			.collect::<Vec<WadResult<WadLump>>>();

		Ok(Self { lumps })
	}


	/// Wrap `input` with a [`Cursor`][std::io::Cursor] and
	/// [`read_from`][`Self::read_from`] from it.
	///
	/// # Errors
	/// See [`Self::read_from`].
	///
	/// # Example
	/// ```
	/// # use quake_wad::{WadArchive, WadError};
	/// assert_eq!(WadArchive::from_bytes(b"PACK").unwrap_err(), WadError::NotAWadFile);
	/// let empty = WadArchive::default().to_bytes().unwrap();
	/// assert!(WadArchive::from_bytes(&empty).unwrap().lumps.is_empty());
	/// ```
	pub fn from_bytes(input: &[u8]) -> WadResult<Self> {
		let mut cursor = Cursor::new(input);
		Self::read_from(&mut cursor)
	}


	/// Convert self to WAD2 data as `Vec<u8>`.
	///
	/// Ignores stored offsets: lump bodies are packed sequentially after the
	/// header and the directory is written last.
	///
	/// # Errors
	/// - [`InputLumpErrorWhileEncoding`]: One of [`WadArchive::lumps`] contained an error.
	/// - [`NameTooLong`]: A lump name does not fit 16 bytes.
	/// - [`ArithmeticOverflow`], [`UnexpectedTryFromIntError`]: The archive
	///   would exceed 4 GiB.
	pub fn to_bytes(&self) -> WadResult<Vec<u8>> {
		let lumps = self.lumps
			.iter()
			.enumerate()
			.map(|(i, l)| l.as_ref().map_err(|e| InputLumpErrorWhileEncoding(i, Box::new(e.clone()))))
			.collect::<WadResult<Vec<&WadLump>>>()?;

		let body_len: usize = lumps.iter().map(|l| l.data.len()).sum();
		let mut buf: Vec<u8> = Vec::with_capacity(WadHeader::SIZE + body_len + lumps.len() * WadEntry::SIZE);
		buf.extend([0u8; WadHeader::SIZE]);

		let mut entries: Vec<WadEntry> = Vec::with_capacity(lumps.len());

		for lump in lumps {
			let offset: u32 = buf.len().try_into()?;
			let size: u32 = lump.data.len().try_into()?;
			let name = pack_name(&lump.name)?;

			entries.push(WadEntry {
				offset,
				disk_size: size,
				size,
				lump_type: lump.lump_type.into(),
				compression: lump.compression,
				name,
			});

			buf.extend(&lump.data);
		};

		let directory_offset: u32 = buf.len().try_into()?;

		for entry in &entries {
			buf.extend(entry.to_bytes()?);
		};

		u32::try_from(buf.len())?;

		let header = WadHeader::new(entries.len().try_into()?, directory_offset);
		buf[..WadHeader::SIZE].copy_from_slice(&header.to_bytes()?);

		Ok(buf)
	}


	/// Serialize self with [`Self::to_bytes`] and write it to `output`.
	///
	/// # Errors
	/// See [`Self::to_bytes`]; also [`UnexpectedIoError`] on write failure.
	pub fn write_to<W: Write>(&self, output: &mut W) -> WadResult<()> {
		let data = self.to_bytes()?;
		output.write_all(&data)?;
		Ok(())
	}
}


fn read_lump<R: Read + Seek>(input: &mut R, start: u64, archive_len: u64, entry: &WadEntry) -> WadResult<WadLump> {
	let name = entry.name();

	let in_bounds = entry.end().map_or(false, |end| end <= archive_len);

	if !in_bounds {
		return Err(MalformedLump(format!("{}: data at 0x{:X}+{} lies outside the archive", name, entry.offset, entry.disk_size)));
	};

	input.seek(SeekFrom::Start(start + u64::from(entry.offset)))?;
	let data = input.read_exact_buffered(entry.disk_size.try_into()?)?;

	macros::log!(trace, "Read lump {:?} ({} bytes, type {})", name, data.len(), LumpType::from(entry.lump_type));

	Ok(WadLump { name, lump_type: entry.lump_type.into(), compression: entry.compression, data })
}


/// Strip NUL padding from a fixed-width name field.
pub(crate) fn trim_name(field: &[u8]) -> BString {
	let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
	BString::from(&field[..len])
}


/// NUL-pad `name` into a fixed-width name field.
pub(crate) fn pack_name(name: &[u8]) -> WadResult<[u8; NAME_LEN]> {
	if name.len() > NAME_LEN {
		return Err(NameTooLong(name.to_str_lossy().into_owned()));
	};

	let mut field = [0u8; NAME_LEN];
	field[..name.len()].copy_from_slice(name);
	Ok(field)
}


trait ExtendExt: Extend<u8> {
	/// Convenience function which extends an [`std::iter::Extend<u8>`] with a
	/// [`byteorder::ByteOrder`]-encoded integer.
	fn extend_with_uint<B: ByteOrder, T: Into<u64>, const N: usize>(&mut self, v: T) {
		let mut buf = vec![0u8; N];
		B::write_uint(&mut buf[..], v.into(), N);
		self.extend(buf.into_iter());
	}
}


impl<T> ExtendExt for T where T: Extend<u8> {}


#[test]
fn test_extend_with_uint() {
	let mut dest: Vec<u8> = vec![];

	dest.extend_with_uint::<LittleEndian, _, 4>(0x44u32);
	assert_eq!(dest, vec![0x44, 0x00, 0x00, 0x00]);

	dest.extend_with_uint::<LittleEndian, _, 4>(1234u32);
	assert_eq!(dest, vec![0x44, 0x00, 0x00, 0x00, 0xD2, 0x04, 0x00, 0x00]);
}


trait ReadExt: Read {
	const SINGLE_READ_SIZE: usize = 4096;

	fn read_exact_buffered(&mut self, len: usize) -> WadResult<Vec<u8>> {
		let mut data: Vec<u8> = Vec::with_capacity(std::cmp::min(len, Self::SINGLE_READ_SIZE));
		let mut total = 0usize;

		loop {
			if total == len {
				break;
			};

			let bufsize = std::cmp::min(Self::SINGLE_READ_SIZE, len-total);
			let mut buf = vec![0u8; bufsize];
			self.read_exact(&mut buf)?;
			data.extend(&buf[..]);
			total += bufsize;
		};

		Ok(data)
	}
}


impl<T> ReadExt for T where T: Read { }


#[test]
fn test_read_exact_buffered() {
	let mut input = Cursor::new(vec![0x41u8, 0x42, 0x43, 0x44, 0x45, 0x46]);
	assert_eq!(input.read_exact_buffered(1).unwrap(), vec![0x41u8]);
	assert_eq!(input.read_exact_buffered(2).unwrap(), vec![0x42u8, 0x43]);
	assert_eq!(input.read_exact_buffered(4).unwrap_err(), UnexpectedEof);
}


#[cfg(test)]
fn entry_bytes(offset: u32, length: u32, lump_type: u8, name: &[u8]) -> Vec<u8> {
	let mut entry = Vec::new();
	entry.extend_with_uint::<LittleEndian, _, 4>(offset);
	entry.extend_with_uint::<LittleEndian, _, 4>(length);
	entry.extend_with_uint::<LittleEndian, _, 4>(length);
	entry.push(lump_type);
	entry.push(0u8);
	entry.extend([0u8; 2]);
	entry.extend(pack_name(name).unwrap());
	entry
}


#[test]
fn lump_type_codes() {
	for code in 0u8..=255 {
		assert_eq!(u8::from(LumpType::from(code)), code);
	};

	assert_eq!(LumpType::from(0x44), LumpType::MipTexture);
	assert_eq!(LumpType::from(0x42), LumpType::Picture);
	assert!(!LumpType::from(0x40).is_image());
}


#[test]
fn entry_layout() {
	let bytes = entry_bytes(0x1234, 99, 0x44, b"brick1_4");
	assert_eq!(bytes.len(), WadEntry::SIZE);

	let (_, entry) = WadEntry::from_bytes((&bytes, 0)).unwrap();
	assert_eq!(entry.offset, 0x1234);
	assert_eq!(entry.disk_size, 99);
	assert_eq!(entry.size, 99);
	assert_eq!(LumpType::from(entry.lump_type), LumpType::MipTexture);
	assert_eq!(entry.name(), "brick1_4");
	assert_eq!(entry.to_bytes().unwrap(), bytes);
}


#[test]
fn read_bad_magic() {
	assert_eq!(WadArchive::from_bytes(b"WAD3\0\0\0\0\x0C\0\0\0").unwrap_err(), NotAWadFile);
	assert_eq!(WadArchive::from_bytes(b"WA").unwrap_err(), NotAWadFile);
	assert_eq!(WadArchive::from_bytes(b"").unwrap_err(), NotAWadFile);
}


#[test]
fn read_directory_out_of_bounds() {
	let mut wad = Vec::new();
	wad.extend(WadHeader::MAGIC);
	wad.extend_with_uint::<LittleEndian, _, 4>(3u32);
	wad.extend_with_uint::<LittleEndian, _, 4>(12u32);
	wad.extend(entry_bytes(12, 0, 0x44, b"only_one"));
	assert_eq!(WadArchive::from_bytes(&wad).unwrap_err(), DirectoryOutOfBounds);
}


#[test]
fn read_keeps_directory_order_and_isolates_bad_lumps() {
	let mut wad = Vec::new();
	wad.extend(WadHeader::MAGIC);
	wad.extend_with_uint::<LittleEndian, _, 4>(3u32);
	wad.extend_with_uint::<LittleEndian, _, 4>(12u32 + 7);
	wad.extend(b"abcdefg");
	wad.extend(entry_bytes(12, 4, 0x44, b"zeta"));
	wad.extend(entry_bytes(10_000, 4, 0x44, b"broken"));
	wad.extend(entry_bytes(16, 3, 0x45, b"alpha"));

	let archive = WadArchive::from_bytes(&wad).unwrap();
	assert_eq!(archive.lumps.len(), 3);

	let first = archive.lumps[0].as_ref().unwrap();
	assert_eq!(first.name, "zeta");
	assert_eq!(first.data, b"abcd");

	assert!(matches!(archive.lumps[1], Err(MalformedLump(_))));

	let third = archive.lumps[2].as_ref().unwrap();
	assert_eq!(third.name, "alpha");
	assert_eq!(third.lump_type, LumpType::Flat);
	assert_eq!(third.data, b"efg");
}


#[test]
fn write_then_read() {
	let archive = WadArchive::with_lumps(vec![
		WadLump::new("first", LumpType::MipTexture, vec![1, 2, 3]),
		WadLump::new("exactly_16_bytes", LumpType::Picture, vec![4, 5]),
	]);

	let bytes = archive.to_bytes().unwrap();
	assert_eq!(&bytes[..4], b"WAD2");
	assert_eq!(bytes.len(), WadHeader::SIZE + 5 + 2 * WadEntry::SIZE);
	assert_eq!(LittleEndian::read_u32(&bytes[4..8]), 2);
	assert_eq!(LittleEndian::read_u32(&bytes[8..12]), 17);

	let back = WadArchive::from_bytes(&bytes).unwrap();
	let lumps = back.lumps.into_iter().collect::<WadResult<Vec<WadLump>>>().unwrap();
	assert_eq!(lumps, archive.lumps.into_iter().collect::<WadResult<Vec<WadLump>>>().unwrap());
}


#[test]
fn write_empty_archive() {
	let bytes = WadArchive::default().to_bytes().unwrap();
	assert_eq!(bytes, b"WAD2\0\0\0\0\x0C\0\0\0");
}


#[test]
fn write_rejects_long_names_and_failed_lumps() {
	let long = WadArchive::with_lumps(vec![WadLump::new("seventeen_bytes__", LumpType::MipTexture, vec![])]);
	assert!(matches!(long.to_bytes(), Err(NameTooLong(_))));

	let failed = WadArchive { lumps: vec![Err(UnexpectedEof)] };
	assert!(matches!(failed.to_bytes(), Err(InputLumpErrorWhileEncoding(0, _))));
}


#[test]
fn assert_traits() {
	use std::fmt::{Debug, Display};
	use std::error::Error;
	use std::panic::{UnwindSafe, RefUnwindSafe};

	assert_impl_all!(WadError: Debug, Display, Error, Send, Sync, UnwindSafe, RefUnwindSafe);
}
