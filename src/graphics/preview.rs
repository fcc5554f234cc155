//! PNG preview rendering for decoded EGA images.

use std::io;
use std::path::Path;

use image::{ImageError, Rgba, RgbaImage};

#[derive(Debug)]
pub enum PreviewError {
    Io(io::Error),
    Image(ImageError),
    /// Raster length does not match the declared geometry
    InvalidRaster(String),
    /// PNG post-processing failed
    Optimise(String),
}

impl From<io::Error> for PreviewError {
    fn from(err: io::Error) -> Self {
        PreviewError::Io(err)
    }
}
impl From<ImageError> for PreviewError {
    fn from(err: ImageError) -> Self {
        PreviewError::Image(err)
    }
}

impl std::fmt::Display for PreviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewError::Io(err) => write!(f, "I/O error: {}", err),
            PreviewError::Image(err) => write!(f, "Image error: {}", err),
            PreviewError::InvalidRaster(msg) => write!(f, "Invalid raster: {}", msg),
            PreviewError::Optimise(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PreviewError {}

/// Render a one-byte-per-pixel raster to an RGBA image through a 16-colour
/// palette. Pixel values are masked to 4 bits before lookup.
pub fn render_rgba(
    pixels: &[u8],
    width: u16,
    height: u16,
    palette: &[[u8; 3]; 16],
) -> Result<RgbaImage, PreviewError> {
    let w = width as usize;
    if pixels.len() != w * height as usize {
        return Err(PreviewError::InvalidRaster(format!(
            "expected {} pixels for {} x {}, got {}",
            w * height as usize,
            width,
            height,
            pixels.len()
        )));
    }

    let mut image = RgbaImage::new(width as u32, height as u32);
    for (i, &px) in pixels.iter().enumerate() {
        let [r, g, b] = palette[(px & 0x0F) as usize];
        let x = (i % w) as u32;
        let y = (i / w) as u32;
        image.put_pixel(x, y, Rgba([r, g, b, 255]));
    }

    Ok(image)
}

/// Render and save a PNG preview, then shrink it with oxipng.
pub fn save_preview(
    pixels: &[u8],
    width: u16,
    height: u16,
    palette: &[[u8; 3]; 16],
    path: &Path,
) -> Result<(), PreviewError> {
    let image = render_rgba(pixels, width, height, palette)?;

    // Save at full quality first, then let oxipng reduce the bit depth
    let temp_path = path.with_extension("temp.png");
    image.save(&temp_path).map_err(PreviewError::Image)?;

    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;

    oxipng::optimize(
        &oxipng::InFile::Path(temp_path.clone()),
        &oxipng::OutFile::Path(Some(path.to_path_buf())),
        &options,
    )
    .map_err(|e| PreviewError::Optimise(format!("PNG optimisation failed: {}", e)))?;

    if let Err(e) = std::fs::remove_file(&temp_path) {
        println!("  Warning: Failed to remove temporary file: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::palette::EGA_PALETTE;

    #[test]
    fn renders_palette_colours() {
        let image = render_rgba(&[0, 1, 15, 6], 2, 2, &EGA_PALETTE).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0x00, 0x00, 0x00, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [0x00, 0x00, 0xAA, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [0xFF, 0xFF, 0xFF, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [0xAA, 0x55, 0x00, 255]);
    }

    #[test]
    fn rejects_mismatched_raster() {
        assert!(matches!(
            render_rgba(&[0, 1, 2], 2, 2, &EGA_PALETTE).unwrap_err(),
            PreviewError::InvalidRaster(_)
        ));
    }
}
