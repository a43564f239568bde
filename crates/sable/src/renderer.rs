//! Backend abstraction: texture management and frame submission.
//!
//! The drawing context records geometry and calls on the CPU; a [`Renderer`]
//! consumes one [`Frame`](crate::batch::Frame) per flush and owns all GPU
//! resources. Backends differ in how they replay calls, not in what they
//! receive.

use crate::batch::Frame;
use crate::error::Error;
use bitflags::bitflags;

/// Opaque handle to a backend texture slot.
///
/// Handles are never zero and slot indices are recycled after deletion, so a
/// stale handle may alias a newer texture. Callers are expected to stop using
/// handles they deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

impl TextureId {
    /// Backend slot index for this handle.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Id for a backend slot index. Backends mint ids with this so slot 0
    /// maps to id 1, keeping 0 free as a niche.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }
}

/// Pixel layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Four bytes per pixel, RGBA order.
    Rgba,
    /// One byte per pixel, sampled into the alpha channel.
    Alpha,
}

impl TextureKind {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureKind::Rgba => 4,
            TextureKind::Alpha => 1,
        }
    }
}

bitflags! {
    /// Creation-time texture options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ImageFlags: u32 {
        /// Request mipmapped sampling; backends without a blit path treat
        /// this as a filtering hint.
        const GENERATE_MIPMAPS = 1 << 0;
        /// Repeat instead of clamp in x.
        const REPEAT_X = 1 << 1;
        /// Repeat instead of clamp in y.
        const REPEAT_Y = 1 << 2;
        /// Texture data is stored bottom-up.
        const FLIP_Y = 1 << 3;
        /// Texture data already has premultiplied alpha.
        const PREMULTIPLIED = 1 << 4;
        /// Sample with nearest filtering.
        const NEAREST = 1 << 5;
    }
}

/// Metadata the frontend needs about a live texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureInfo {
    pub kind: TextureKind,
    pub flags: ImageFlags,
    pub width: u32,
    pub height: u32,
}

/// What a backend can do, queried once at context creation.
///
/// The tessellator changes shape based on these: without `edge_antialias` no
/// fringe ribbons are emitted, and without `stencil_strokes` stroke calls
/// reserve a single uniform slot instead of two.
#[derive(Debug, Clone, Copy)]
pub struct RendererFeatures {
    /// Geometry is expanded with a one-pixel coverage fringe.
    pub edge_antialias: bool,
    /// Strokes draw through a stencil pre-pass so overlapping segments do
    /// not double-blend.
    pub stencil_strokes: bool,
}

pub trait Renderer {
    fn features(&self) -> RendererFeatures;

    /// Allocates a texture, optionally uploading initial pixels.
    ///
    /// `data`, when present, holds `width * height` pixels in the layout
    /// given by `kind`.
    fn create_texture(
        &mut self,
        kind: TextureKind,
        width: u32,
        height: u32,
        flags: ImageFlags,
        data: Option<&[u8]>,
    ) -> Result<TextureId, Error>;

    /// Uploads a horizontal band of full-width rows `y .. y + height`.
    fn update_texture(
        &mut self,
        id: TextureId,
        y: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), Error>;

    /// Releases a texture slot. The backend may defer the actual free until
    /// in-flight frames no longer reference it.
    fn delete_texture(&mut self, id: TextureId) -> Result<(), Error>;

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo>;

    /// Consumes one recorded frame: uploads vertices and uniforms, then
    /// replays the call list in order.
    fn flush(&mut self, frame: Frame<'_>);
}
