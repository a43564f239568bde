//! Error type for the drawing context and renderer backends.

use crate::renderer::TextureId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The texture handle does not name a live texture.
    UnknownTexture(TextureId),
    /// The requested texture does not fit the backend's limits.
    TextureSize { width: u32, height: u32, max: u32 },
    /// The pixel buffer does not match the region being uploaded.
    ImageData { expected: usize, got: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownTexture(id) => write!(f, "unknown texture {id:?}"),
            Error::TextureSize { width, height, max } => {
                write!(f, "texture {width}x{height} exceeds backend limit {max}")
            }
            Error::ImageData { expected, got } => {
                write!(f, "image data is {got} bytes, region needs {expected}")
            }
        }
    }
}

impl std::error::Error for Error {}
