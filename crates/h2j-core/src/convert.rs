//! HEIC → JPEG conversion.
//!
//! Decoding sits behind [`SourceDecoder`] so the JPEG side and the dispatch
//! pipeline can be exercised without the native HEIF library. The libheif
//! decoder is only compiled with the `heif` feature.

use image::{codecs::jpeg::JpegEncoder, DynamicImage, RgbImage};

use crate::{errors::Error, ports::Converter, Result};

pub const SOURCE_MIME: &str = "image/heic";

/// Decodes source-format bytes into pixels held fully in memory.
pub trait SourceDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage>;
}

/// Decode with `D`, then encode JPEG at a fixed quality.
pub struct JpegConverter<D> {
    decoder: D,
    quality: u8,
}

impl<D: SourceDecoder> JpegConverter<D> {
    pub fn new(decoder: D, quality: u8) -> Self {
        Self {
            decoder,
            quality: quality.clamp(1, 100),
        }
    }
}

impl<D: SourceDecoder> Converter for JpegConverter<D> {
    fn convert(&self, source: &[u8]) -> Result<Vec<u8>> {
        let img = self.decoder.decode(source)?;
        encode_jpeg(&img, self.quality)
    }
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out)
}

/// Copy `height` rows of `width` RGB pixels out of a plane whose rows are
/// `stride` bytes apart. Padding past each row is dropped.
pub(crate) fn pack_rgb_rows(data: &[u8], stride: usize, width: u32, height: u32) -> Result<RgbImage> {
    let row_len = width as usize * 3;
    if stride < row_len {
        return Err(Error::Decode(format!(
            "plane stride {stride} is shorter than a {width}px row"
        )));
    }

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for y in 0..height as usize {
        let row = data
            .get(y * stride..)
            .and_then(|rest| rest.get(..row_len))
            .ok_or_else(|| Error::Decode(format!("plane truncated at row {y}")))?;
        pixels.extend_from_slice(row);
    }

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::Decode("plane size mismatch".to_string()))
}

/// The decoder this build ships with.
pub fn default_decoder() -> Box<dyn SourceDecoder> {
    #[cfg(feature = "heif")]
    {
        Box::new(heif::LibHeifDecoder)
    }
    #[cfg(not(feature = "heif"))]
    {
        Box::new(UnavailableDecoder)
    }
}

pub fn heif_supported() -> bool {
    cfg!(feature = "heif")
}

impl SourceDecoder for Box<dyn SourceDecoder> {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        (**self).decode(bytes)
    }
}

/// Stand-in for builds without libheif: every input is rejected.
pub struct UnavailableDecoder;

impl SourceDecoder for UnavailableDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<DynamicImage> {
        Err(Error::Decode("built without HEIF support".to_string()))
    }
}

#[cfg(feature = "heif")]
pub mod heif {
    use image::DynamicImage;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    use super::{pack_rgb_rows, SourceDecoder};
    use crate::{errors::Error, Result};

    /// Decodes the primary image of a HEIF container to 8-bit RGB.
    pub struct LibHeifDecoder;

    fn decode_err(e: impl std::fmt::Display) -> Error {
        Error::Decode(e.to_string())
    }

    impl SourceDecoder for LibHeifDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
            let lib = LibHeif::new();
            let ctx = HeifContext::read_from_bytes(bytes).map_err(decode_err)?;
            let handle = ctx.primary_image_handle().map_err(decode_err)?;
            let decoded = lib
                .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
                .map_err(decode_err)?;

            let planes = decoded.planes();
            let plane = planes
                .interleaved
                .ok_or_else(|| Error::Decode("no interleaved RGB plane".to_string()))?;

            let rgb = pack_rgb_rows(plane.data, plane.stride, plane.width, plane.height)?;
            Ok(DynamicImage::ImageRgb8(rgb))
        }
    }

}
