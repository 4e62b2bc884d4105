//! Image decoding for texture data
//!
//! Decodes PNG and JPEG files with the `image` crate, keeping the file's own
//! channel count so the texture layer can pick (or reject) a pixel format.

use std::path::Path;

use crate::assets::AssetError;

/// Decoded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Tightly packed 8-bit pixel rows
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels per pixel
    pub channels: u8,
}

impl ImageData {
    /// Decode an image file, first row at the top
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        log::debug!("Loading image from: {:?}", path_ref);

        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {e}", path_ref.display())))?;
        let data = Self::from_dynamic(img);

        log::info!(
            "Loaded image {}x{} ({} channels) from {:?}",
            data.width,
            data.height,
            data.channels,
            path_ref
        );
        Ok(data)
    }

    /// Decode an image held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("image from bytes: {e}")))?;
        Ok(Self::from_dynamic(img))
    }

    fn from_dynamic(img: image::DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let channels = img.color().channel_count();
        let data = match channels {
            1 => img.into_luma8().into_raw(),
            2 => img.into_luma_alpha8().into_raw(),
            3 => img.into_rgb8().into_raw(),
            _ => img.into_rgba8().into_raw(),
        };
        Self {
            data,
            width,
            height,
            channels: channels.min(4),
        }
    }

    /// Create a solid color image; the channel count is `color.len()`
    pub fn solid_color(width: u32, height: u32, color: &[u8]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
            channels: color.len() as u8,
        }
    }

    /// Copy with the row order reversed (top-left origin to bottom-left)
    pub fn flipped_vertically(&self) -> Self {
        let row = self.width as usize * usize::from(self.channels);
        let data = if row == 0 {
            Vec::new()
        } else {
            self.data.chunks_exact(row).rev().flatten().copied().collect()
        };
        Self {
            data,
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("render_engine_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, &[255, 0, 0, 255]);
        assert_eq!((img.width, img.height, img.channels), (4, 4, 4));
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_flip_reverses_rows() {
        let img = ImageData {
            data: vec![1, 2, 3, 4, 5, 6],
            width: 2,
            height: 3,
            channels: 1,
        };
        assert_eq!(img.flipped_vertically().data, vec![5, 6, 3, 4, 1, 2]);
    }

    #[test]
    fn test_decode_keeps_channel_count() {
        let gray_path = temp_path("gray.png");
        image::GrayImage::from_pixel(3, 2, image::Luma([7])).save(&gray_path).expect("write png");
        let gray = ImageData::from_file(&gray_path).expect("decode gray");
        assert_eq!((gray.width, gray.height, gray.channels), (3, 2, 1));
        assert_eq!(gray.data, vec![7; 6]);

        let rgb_path = temp_path("rgb.png");
        image::RgbImage::from_pixel(1, 1, image::Rgb([1, 2, 3])).save(&rgb_path).expect("write png");
        let rgb = ImageData::from_file(&rgb_path).expect("decode rgb");
        assert_eq!(rgb.channels, 3);
        assert_eq!(rgb.data, vec![1, 2, 3]);

        let _ = std::fs::remove_file(gray_path);
        let _ = std::fs::remove_file(rgb_path);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ImageData::from_file(temp_path("does_not_exist.png"));
        assert!(matches!(result, Err(AssetError::LoadFailed(_))));
    }
}
