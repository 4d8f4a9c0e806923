//! Image loading for texture data

use std::path::Path;
use std::sync::Arc;

use crate::assets::AssetError;

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// Raw RGBA pixel data, row major
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl TextureData {
    /// Create a solid color texture
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// RGBA value at `(x, y)`, if inside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.data
            .get(offset..offset + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Loads image files into shared textures
pub struct ImageLoader;

impl ImageLoader {
    /// Decode an image file to RGBA8
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<TextureData>, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading image from {}", path.display());

        let image = image::open(path).map_err(|e| AssetError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let texture = Self::from_image(image);

        log::info!("Loaded image {}x{} from {}", texture.width, texture.height, path.display());
        Ok(Arc::new(texture))
    }

    /// Decode an in-memory encoded image
    pub fn load_from_memory(bytes: &[u8]) -> Result<Arc<TextureData>, AssetError> {
        let image = image::load_from_memory(bytes).map_err(|e| AssetError::LoadFailed {
            path: "<memory>".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Arc::new(Self::from_image(image)))
    }

    fn from_image(image: image::DynamicImage) -> TextureData {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        TextureData {
            data: rgba.into_raw(),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_pixels() {
        let texture = TextureData::solid_color(2, 3, [10, 20, 30, 255]);
        assert_eq!(texture.data.len(), 2 * 3 * 4);
        assert_eq!(texture.pixel(1, 2), Some([10, 20, 30, 255]));
        assert_eq!(texture.pixel(2, 0), None);
    }

    #[test]
    fn test_png_round_trip_through_memory() {
        let mut encoded = Vec::new();
        let source = image::RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 4]));
        image::DynamicImage::ImageRgba8(source)
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .expect("encode png");

        let texture = ImageLoader::load_from_memory(&encoded).expect("decode png");
        assert_eq!((texture.width, texture.height), (4, 2));
        assert_eq!(texture.pixel(3, 1), Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(ImageLoader::load_from_memory(b"not an image").is_err());
    }
}
