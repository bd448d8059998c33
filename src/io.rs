use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageError, RgbaImage};

// ============================================================================
// ERRORS
// ============================================================================

/// Failures at the edges of the core: files, decoders, fonts, bad input.
/// Everything inside the editing model is total and never produces one.
#[derive(Debug)]
pub enum CoreError {
    Io(std::io::Error),
    Image(String),
    InvalidInput(String),
    Font(String),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Io(e) => write!(f, "I/O error: {}", e),
            CoreError::Image(e) => write!(f, "Image error: {}", e),
            CoreError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            CoreError::Font(e) => write!(f, "Font error: {}", e),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Io(e)
    }
}

impl From<ImageError> for CoreError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => CoreError::Io(io),
            other => CoreError::Image(other.to_string()),
        }
    }
}

// ============================================================================
// FLAT RASTER LOAD / SAVE
// ============================================================================

/// Decode any supported raster file to straight-alpha RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, CoreError> {
    let img = image::open(path)?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(CoreError::InvalidInput(format!(
            "{} has zero-sized dimensions",
            path.display()
        )));
    }
    Ok(img)
}

/// Write a flat RGBA image as PNG (lossless).
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), CoreError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_save_then_load() {
        let dir = std::env::temp_dir().join(format!("mintpaint_io_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("flat.png");

        let mut img = RgbaImage::new(4, 3);
        img.put_pixel(1, 2, Rgba([10, 20, 30, 40]));
        save_png(&img, &path).unwrap();

        let back = load_image(&path).unwrap();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(*back.get_pixel(1, 2), Rgba([10, 20, 30, 40]));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, CoreError::Io(_) | CoreError::Image(_)));
    }
}
