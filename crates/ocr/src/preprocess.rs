use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Gain applied around [`CONTRAST_MIDPOINT`] after grayscale conversion.
pub const CONTRAST_GAIN: f32 = 1.35;
pub const CONTRAST_MIDPOINT: f32 = 128.0;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Normalized RGBA pixels ready for recognition. Lives for a single
/// recognition call and is dropped when that call returns.
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw pixel buffer, 4 bytes per pixel, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// PNG encoding, for engines that only accept encoded images.
    pub fn to_png(&self) -> Result<Vec<u8>, PreprocessError> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Load an image file and normalize it for recognition.
pub fn preprocess_file(path: &Path) -> Result<Bitmap, PreprocessError> {
    let img = image::open(path)?;
    Ok(normalize(img))
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …) and normalize them.
pub fn preprocess(data: &[u8]) -> Result<Bitmap, PreprocessError> {
    let img = image::load_from_memory(data)?;
    Ok(normalize(img))
}

/// ITU-R BT.601 luma.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Linear stretch around the midpoint, clamped to the 8-bit range.
pub fn contrast_stretch(luma: f32) -> u8 {
    ((luma - CONTRAST_MIDPOINT) * CONTRAST_GAIN + CONTRAST_MIDPOINT)
        .clamp(0.0, 255.0)
        .round() as u8
}

/// Grayscale + contrast stretch. Alpha is left untouched; no resizing.
fn normalize(img: DynamicImage) -> Bitmap {
    let mut rgba = img.to_rgba8();
    for px in rgba.pixels_mut() {
        let [r, g, b, _] = px.0;
        let y = contrast_stretch(luminance(r, g, b));
        px.0[0] = y;
        px.0[1] = y;
        px.0[2] = y;
    }
    Bitmap { image: rgba }
}
