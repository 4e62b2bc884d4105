//! 2D textures decoded from image files
//!
//! Loading never aborts. When an image cannot be decoded, or has a channel
//! count with no pixel format, the texture keeps its device handle but holds
//! no content and reports itself as [`TextureState::Broken`].

use std::cell::Cell;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::assets::ImageData;
use crate::render::device::{Device, PixelFormat, SamplerState, TextureHandle, TextureImage};

/// Why a texture has no content
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// The image file could not be read or decoded
    #[error("failed to decode texture image: {0}")]
    Decode(String),

    /// The decoded image has a channel count with no matching pixel format
    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannelCount(u8),
}

/// Content state of a texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureState {
    /// Pixels uploaded and mipmaps generated
    Ready,
    /// Handle allocated but no pixels uploaded
    Broken(TextureError),
}

/// Device-resident 2D texture
pub struct Texture {
    device: Device,
    handle: TextureHandle,
    path: PathBuf,
    width: u32,
    height: u32,
    channels: u8,
    state: TextureState,
    // Unit that was active before the last `bind`, reselected by `unbind`.
    restore_unit: Cell<Option<u32>>,
}

impl Texture {
    /// Decode the image at `path` and upload it
    ///
    /// The image is flipped vertically so texture coordinate (0, 0) is the
    /// bottom-left corner. Failures are logged and leave a broken texture.
    pub fn from_file(device: &Device, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut texture = Self::allocate(device, path);
        match ImageData::from_file(path) {
            Ok(image) => texture.upload(&image.flipped_vertically()),
            Err(e) => texture.mark_broken(TextureError::Decode(e.to_string())),
        }
        texture
    }

    /// Upload already decoded pixels (rows are taken as given, bottom row first)
    pub fn from_image(device: &Device, image: &ImageData, label: impl Into<PathBuf>) -> Self {
        let label = label.into();
        let mut texture = Self::allocate(device, &label);
        texture.upload(image);
        texture
    }

    fn allocate(device: &Device, path: &Path) -> Self {
        let handle = device.with(|d| {
            let handle = d.create_texture();
            d.bind_texture(Some(handle));
            d.set_sampler_state(&SamplerState::default());
            d.bind_texture(None);
            handle
        });
        log::debug!("Created texture {:?} for {:?}", handle, path);
        Self {
            device: device.clone(),
            handle,
            path: path.to_path_buf(),
            width: 0,
            height: 0,
            channels: 0,
            state: TextureState::Broken(TextureError::Decode("no image uploaded".to_string())),
            restore_unit: Cell::new(None),
        }
    }

    fn upload(&mut self, image: &ImageData) {
        let Some(format) = PixelFormat::from_channel_count(image.channels) else {
            self.mark_broken(TextureError::UnsupportedChannelCount(image.channels));
            return;
        };
        let handle = self.handle;
        self.device.with(|d| {
            d.bind_texture(Some(handle));
            d.upload_texture_image(&TextureImage {
                width: image.width,
                height: image.height,
                format,
                pixels: &image.data,
            });
            d.generate_mipmaps();
            d.bind_texture(None);
        });
        self.width = image.width;
        self.height = image.height;
        self.channels = image.channels;
        self.state = TextureState::Ready;
        log::info!(
            "Uploaded texture {:?} ({}x{}, {:?})",
            self.path,
            self.width,
            self.height,
            format
        );
    }

    fn mark_broken(&mut self, error: TextureError) {
        log::error!("Failed to load texture {:?}: {}", self.path, error);
        self.state = TextureState::Broken(error);
    }

    /// Activate `unit` and attach this texture to it
    pub fn bind(&self, unit: u32) {
        let handle = self.handle;
        let previous = self.device.with(|d| {
            let previous = d.active_texture_unit();
            d.set_active_texture_unit(unit);
            d.bind_texture(Some(handle));
            previous
        });
        self.restore_unit.set(Some(previous));
    }

    /// Detach whatever is bound on the active unit
    ///
    /// After a [`Texture::bind`], the unit that was active before it is
    /// selected again.
    pub fn unbind(&self) {
        let restore = self.restore_unit.take();
        self.device.with(|d| {
            d.bind_texture(None);
            if let Some(unit) = restore {
                d.set_active_texture_unit(unit);
            }
        });
    }

    /// True when pixels were uploaded
    pub fn is_valid(&self) -> bool {
        self.state == TextureState::Ready
    }

    /// Content state
    pub fn state(&self) -> &TextureState {
        &self.state
    }

    /// Get texture handle
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Source path (or label for in-memory images)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width in pixels, 0 when broken
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, 0 when broken
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count, 0 when broken
    pub fn channels(&self) -> u8 {
        self.channels
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        log::trace!("Releasing texture {:?}", self.handle);
        let handle = self.handle;
        self.device.release("texture", |d| d.delete_texture(handle));
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("handle", &self.handle)
            .field("path", &self.path)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::headless::HeadlessDevice;
    use crate::render::device::{FilterMode, WrapMode};

    fn stored(device: &Device, texture: &Texture) -> Option<(Option<(u32, u32, PixelFormat)>, bool, Vec<u8>)> {
        device
            .inspect(|h: &HeadlessDevice| {
                h.texture(texture.handle())
                    .map(|r| (r.image, r.mipmapped, r.pixels.clone()))
            })
            .flatten()
    }

    #[test]
    fn test_supported_channel_counts_select_format() {
        let device = Device::headless();
        let cases = [
            (1u8, PixelFormat::R8),
            (3, PixelFormat::Rgb8),
            (4, PixelFormat::Rgba8),
        ];
        for (channels, format) in cases {
            let color = vec![9u8; channels as usize];
            let texture = Texture::from_image(&device, &ImageData::solid_color(2, 2, &color), "solid");
            assert!(texture.is_valid());
            let (image, mipmapped, _) = stored(&device, &texture).expect("live texture");
            assert_eq!(image, Some((2, 2, format)));
            assert!(mipmapped);
        }
    }

    #[test]
    fn test_two_channels_are_rejected() {
        let device = Device::headless();
        let texture = Texture::from_image(&device, &ImageData::solid_color(1, 1, &[1, 2]), "luma_alpha");
        assert!(!texture.is_valid());
        assert_eq!(
            texture.state(),
            &TextureState::Broken(TextureError::UnsupportedChannelCount(2))
        );
        let (image, _, _) = stored(&device, &texture).expect("handle stays allocated");
        assert_eq!(image, None);
    }

    #[test]
    fn test_decode_failure_leaves_broken_but_allocated_texture() {
        let device = Device::headless();
        let texture = Texture::from_file(&device, "missing/container2.png");
        assert!(!texture.is_valid());
        assert!(matches!(texture.state(), TextureState::Broken(TextureError::Decode(_))));
        assert!(stored(&device, &texture).is_some());

        let sampler = device
            .inspect(|h: &HeadlessDevice| h.texture(texture.handle()).and_then(|r| r.sampler))
            .flatten()
            .expect("sampler set before decoding");
        assert_eq!(sampler.wrap, WrapMode::Repeat);
        assert_eq!((sampler.min_filter, sampler.mag_filter), (FilterMode::Linear, FilterMode::Linear));

        drop(texture);
        assert_eq!(device.inspect(|h: &HeadlessDevice| h.live_textures()), Some(0));
        assert_eq!(device.poll_error(), None);
    }

    #[test]
    fn test_file_is_flipped_on_upload() {
        let path = std::env::temp_dir().join(format!("render_engine_{}_flip.png", std::process::id()));
        let mut img = image::GrayImage::new(1, 2);
        img.put_pixel(0, 0, image::Luma([10]));
        img.put_pixel(0, 1, image::Luma([20]));
        img.save(&path).expect("write png");

        let device = Device::headless();
        let texture = Texture::from_file(&device, &path);
        assert!(texture.is_valid());
        assert_eq!((texture.width(), texture.height(), texture.channels()), (1, 2, 1));
        let (_, _, pixels) = stored(&device, &texture).expect("live texture");
        assert_eq!(pixels, vec![20, 10]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_bind_unbind_restores_state() {
        let device = Device::headless();
        let texture = Texture::from_image(&device, &ImageData::solid_color(1, 1, &[0, 0, 0]), "black");
        let before = device.binding_state();
        texture.bind(3);
        let during = device.binding_state();
        assert_eq!(during.active_unit, 3);
        assert_eq!(during.textures.get(&3), Some(&texture.handle()));
        texture.unbind();
        assert_eq!(device.binding_state(), before);
    }

    #[test]
    fn test_unbind_reselects_previously_active_unit() {
        let device = Device::headless();
        let texture = Texture::from_image(&device, &ImageData::solid_color(1, 1, &[0, 0, 0]), "black");
        device.with(|d| d.set_active_texture_unit(2));
        let before = device.binding_state();
        assert_eq!(before.active_unit, 2);

        texture.bind(2);
        texture.unbind();
        assert_eq!(device.binding_state(), before);

        texture.bind(5);
        texture.unbind();
        assert_eq!(device.binding_state(), before);
        assert_eq!(device.poll_error(), None);
    }
}
