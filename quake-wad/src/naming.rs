use std::collections::HashSet;
use std::path::{Path, PathBuf};

use derive_more::Display;

use crate::NAME_LEN;


/// First free file stem in `dir` for `stem`: `stem` itself, else
/// `stem (1)`, `stem (2)` and so on, checking `stem.extension` (or the bare
/// stem when `extension` is `None`).
pub fn unique_stem(dir: &Path, stem: &str, extension: Option<&str>) -> String {
	let taken = |candidate: &str| {
		let file_name = match extension {
			Some(ext) => format!("{}.{}", candidate, ext),
			None => candidate.to_owned(),
		};
		dir.join(file_name).exists()
	};

	let mut candidate = stem.to_owned();
	let mut counter = 1u32;

	while taken(&candidate) {
		candidate = format!("{} ({})", stem, counter);
		counter += 1;
	};

	candidate
}


/// Like [`unique_stem`], returning the full path.
pub fn unique_path(dir: &Path, stem: &str, extension: Option<&str>) -> PathBuf {
	let stem = unique_stem(dir, stem, extension);

	match extension {
		Some(ext) => dir.join(format!("{}.{}", stem, ext)),
		None => dir.join(stem),
	}
}


/// Lump name for an image file: its file stem (the name without the last
/// extension) with `%XX` escapes turned back into raw bytes.
///
/// This reverses [`file_stem_for_lump`], so every lump extracted by
/// [`open`][crate::open] packs back under its original name.
///
/// # Example
/// ```
/// # use quake_wad::lump_name_from_path;
/// # use std::path::Path;
/// assert_eq!(lump_name_from_path(Path::new("tex/+0slime.png")).as_deref(), Some(&b"+0slime"[..]));
/// assert_eq!(lump_name_from_path(Path::new("wall.v2.png")).as_deref(), Some(&b"wall.v2"[..]));
/// assert_eq!(lump_name_from_path(Path::new("caf%E9.png")).as_deref(), Some(&b"caf\xE9"[..]));
/// ```
pub fn lump_name_from_path(path: &Path) -> Option<Vec<u8>> {
	let stem = path.file_stem()?.to_string_lossy();
	let stem = stem.as_bytes();
	let mut name = Vec::with_capacity(stem.len());
	let mut i = 0;

	while i < stem.len() {
		let escaped = stem.get(i + 1..i + 3)
			.filter(|hex| stem[i] == b'%' && hex.iter().all(u8::is_ascii_hexdigit))
			.and_then(|hex| std::str::from_utf8(hex).ok())
			.and_then(|hex| u8::from_str_radix(hex, 16).ok());

		match escaped {
			Some(byte) => { name.push(byte); i += 3; },
			None => { name.push(stem[i]); i += 1; },
		};
	};

	if name.is_empty() {
		None
	} else {
		Some(name)
	}
}


/// File stem for a lump name.
///
/// Printable ASCII is kept as is. Other bytes, path separators and `%` are
/// written as `%XX`, as are the dots of a name made only of dots. An empty
/// name becomes `unnamed`.
pub fn file_stem_for_lump(name: &[u8]) -> String {
	if name.is_empty() {
		return "unnamed".to_owned();
	};

	let all_dots = name.iter().all(|&b| b == b'.');

	name.iter().fold(String::with_capacity(name.len()), |mut stem, &byte| {
		let plain = (0x20..0x7F).contains(&byte)
			&& !matches!(byte, b'/' | b'\\' | b'%')
			&& !(all_dots && byte == b'.');

		if plain {
			stem.push(char::from(byte));
		} else {
			stem.push_str(&format!("%{:02X}", byte));
		};

		stem
	})
}


#[test]
fn test_file_stem_for_lump() {
	assert_eq!(file_stem_for_lump(b"*lava1"), "*lava1");
	assert_eq!(file_stem_for_lump(b"../evil"), "..%2Fevil");
	assert_eq!(file_stem_for_lump(b".."), "%2E%2E");
	assert_eq!(file_stem_for_lump(b"caf\xE9 50%"), "caf%E9 50%25");
	assert_eq!(file_stem_for_lump(b""), "unnamed");
}


#[test]
fn test_lump_name_from_path() {
	for name in [&b"wall.v2"[..], b"caf\xE9", b"50%", b"a/b\\c", b"..", b"{grate"] {
		let path = Path::new("textures").join(format!("{}.png", file_stem_for_lump(name)));
		assert_eq!(lump_name_from_path(&path).as_deref(), Some(name));
	};

	assert_eq!(lump_name_from_path(Path::new("100%zz.png")).as_deref(), Some(&b"100%zz"[..]));
	assert_eq!(lump_name_from_path(Path::new("%+1.png")).as_deref(), Some(&b"%+1"[..]));
	assert_eq!(lump_name_from_path(Path::new("")), None);
}


/// Make `name` distinct from every name in `taken` by appending ` (n)`,
/// shortening the base so the result still fits in a lump name, then record
/// the result in `taken`.
pub fn disambiguate_lump_name(name: &[u8], taken: &mut HashSet<Vec<u8>>) -> Vec<u8> {
	let mut candidate = name.to_vec();
	let mut counter = 1u32;

	while taken.contains(&candidate) {
		let suffix = format!(" ({})", counter);
		let keep = name.len().min(NAME_LEN.saturating_sub(suffix.len()));
		candidate = name[..keep].to_vec();
		candidate.extend(suffix.as_bytes());
		counter += 1;
	};

	taken.insert(candidate.clone());
	candidate
}


/// How the engine treats a texture, by the first character of its name
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
	/// `+`: animated or toggled frame sequence.
	#[display(fmt = "animated")]
	Animated,
	/// `*`: warped liquid surface.
	#[display(fmt = "liquid")]
	Liquid,
	/// `{`: palette index 255 is see-through.
	#[display(fmt = "transparent")]
	Transparent,
	/// `sky` prefix: scrolling two-layer sky.
	#[display(fmt = "sky")]
	Sky,
	/// Anything else.
	#[display(fmt = "normal")]
	Normal,
}


impl TextureKind {
	/// Classify a texture name.
	pub fn from_name(name: &[u8]) -> Self {
		match name.first() {
			Some(b'+') => TextureKind::Animated,
			Some(b'*') => TextureKind::Liquid,
			Some(b'{') => TextureKind::Transparent,
			_ if name.len() >= 3 && name[..3].eq_ignore_ascii_case(b"sky") => TextureKind::Sky,
			_ => TextureKind::Normal,
		}
	}
}


#[test]
fn test_texture_kind() {
	assert_eq!(TextureKind::from_name(b"+0button"), TextureKind::Animated);
	assert_eq!(TextureKind::from_name(b"*water0"), TextureKind::Liquid);
	assert_eq!(TextureKind::from_name(b"{grate"), TextureKind::Transparent);
	assert_eq!(TextureKind::from_name(b"SKY4"), TextureKind::Sky);
	assert_eq!(TextureKind::from_name(b"brick"), TextureKind::Normal);
	assert_eq!(TextureKind::from_name(b""), TextureKind::Normal);
}


#[test]
fn test_disambiguate_lump_name() {
	let mut taken = HashSet::new();
	assert_eq!(disambiguate_lump_name(b"wall", &mut taken), b"wall");
	assert_eq!(disambiguate_lump_name(b"wall", &mut taken), b"wall (1)");
	assert_eq!(disambiguate_lump_name(b"wall", &mut taken), b"wall (2)");

	assert_eq!(disambiguate_lump_name(b"sixteen_bytes_ok", &mut taken), b"sixteen_bytes_ok");
	assert_eq!(disambiguate_lump_name(b"sixteen_bytes_ok", &mut taken), b"sixteen_byte (1)");
}


#[test]
fn test_unique_path() {
	let dir = tempfile::tempdir().unwrap();

	assert_eq!(unique_path(dir.path(), "wall", Some("png")), dir.path().join("wall.png"));
	std::fs::write(dir.path().join("wall.png"), b"").unwrap();
	assert_eq!(unique_path(dir.path(), "wall", Some("png")), dir.path().join("wall (1).png"));
	std::fs::write(dir.path().join("wall (1).png"), b"").unwrap();
	assert_eq!(unique_stem(dir.path(), "wall", Some("png")), "wall (2)");

	// extension-less names are tracked separately
	assert_eq!(unique_path(dir.path(), "wall", None), dir.path().join("wall"));
}
