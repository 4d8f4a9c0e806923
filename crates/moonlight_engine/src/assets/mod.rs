//! Asset loading
//!
//! Loaders return `Arc` handles so many game objects can share one decoded
//! mesh or texture.

pub mod image_loader;
pub mod obj_loader;

pub use image_loader::{ImageLoader, TextureData};
pub use obj_loader::ObjLoader;

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read or decoded
    #[error("Failed to load {path}: {reason}")]
    LoadFailed {
        /// Source path
        path: String,
        /// Decoder message
        reason: String,
    },

    /// Decoded data is unusable
    #[error("Invalid asset data: {0}")]
    InvalidData(String),
}
