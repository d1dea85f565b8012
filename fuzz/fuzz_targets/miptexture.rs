#![no_main]
use libfuzzer_sys::fuzz_target;
use arbitrary::{
	Arbitrary,
	Unstructured,
	Result as ArbitraryResult,
};
use bstr::BString;
use quake_wad::{IndexedImage, MipTexture, QUAKE_PALETTE};


#[derive(Debug)]
struct MipTextureFuzzer {
	name: BString,
	image: IndexedImage,
}

impl<'a> Arbitrary<'a> for MipTextureFuzzer {
	fn arbitrary(input: &mut Unstructured<'a>) -> ArbitraryResult<Self> {
		let name_len: usize = input.int_in_range(1..=16)?;
		let mut name = vec![0u8; name_len];
		input.fill_buffer(&mut name)?;
		// NUL terminates names on disk
		name.iter_mut().filter(|b| **b == 0).for_each(|b| *b = b'_');

		let image = <IndexedImage as Arbitrary>::arbitrary(input)?;

		Ok(Self { name: name.into(), image })
	}
}


fuzz_target!(|tex: MipTextureFuzzer| {
	let texture = MipTexture::with_name_and_image(tex.name.clone(), tex.image.clone()).unwrap();
	let bytes = texture.encode(&QUAKE_PALETTE, image::imageops::FilterType::Triangle).unwrap();
	let back = MipTexture::decode(&bytes).unwrap();
	assert_eq!(back.name, tex.name);
	assert_eq!(back.image, tex.image);
});
