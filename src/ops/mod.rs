pub mod effects;
pub mod shapes;
pub mod text;
pub mod transform;

use image::RgbaImage;

/// A rendered patch positioned in canvas space: `pixels` sits at (`x`, `y`).
#[derive(Clone, Debug)]
pub struct PlacedRaster {
    pub pixels: RgbaImage,
    pub x: i64,
    pub y: i64,
}
