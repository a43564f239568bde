//! The vertex format shared by every draw call.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use static_assertions::const_assert_eq;

/// A single tessellated vertex: position plus antialiasing texcoord.
///
/// `uv.x` carries the across-edge coverage ramp: full at 0.5, faded out at
/// 0 and 1. `uv.y` fades stroke caps along their length. Image draws reuse
/// the slot as a plain texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: Vec2,
    pub uv: Vec2,
}

const_assert_eq!(std::mem::size_of::<Vertex>(), 16);

impl Vertex {
    pub const fn new(pos: Vec2, u: f32, v: f32) -> Self {
        Self {
            pos,
            uv: Vec2::new(u, v),
        }
    }
}
