//! Asset decoding
//!
//! External file formats are decoded here into plain data; GPU upload
//! happens in the render layer.

pub mod image_loader;
pub mod obj_loader;

pub use image_loader::ImageData;
pub use obj_loader::{MeshData, ModelData, ObjLoader, TextureRef};

use thiserror::Error;

/// Asset decoding errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),
}
