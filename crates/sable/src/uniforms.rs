//! Per-call fragment uniform block.
//!
//! One [`FragUniforms`] instance is appended to the frame for every draw
//! phase that needs distinct shading state. The layout is `repr(C)` and
//! padding-free so the whole array can be uploaded to the GPU in a single
//! copy; backends either index it from a storage buffer or bind slices of it
//! at a fixed stride.

use crate::math;
use crate::paint::Paint;
use crate::renderer::{ImageFlags, TextureInfo, TextureKind};
use crate::state::Scissor;
use glam::{Affine2, Mat4, Vec2, Vec4};

/// Shading mode selector, mirrored by the fragment shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ShaderType {
    /// Gradient fill evaluated from the paint transform.
    FillGradient = 0,
    /// Textured fill sampled through the paint transform.
    FillImage = 1,
    /// Constant output, used by stencil-only passes.
    Simple = 2,
    /// Direct textured triangles.
    Image = 3,
}

/// GPU-facing uniform block for one draw phase.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FragUniforms {
    pub scissor_mat: Mat4,
    pub paint_mat: Mat4,
    pub inner_color: Vec4,
    pub outer_color: Vec4,
    pub scissor_ext: Vec2,
    pub scissor_scale: Vec2,
    pub extent: Vec2,
    pub radius: f32,
    pub feather: f32,
    pub stroke_mult: f32,
    pub stroke_thr: f32,
    pub tex_type: i32,
    pub shader_type: i32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<FragUniforms>(), 208);

/// Embeds a 2D affine transform into a `Mat4` so shaders can apply it with a
/// plain matrix multiply of `vec4(pos, 1.0, 1.0)`.
fn xform_to_mat4(t: &Affine2) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(t.matrix2.x_axis.x, t.matrix2.x_axis.y, 0.0, 0.0),
        Vec4::new(t.matrix2.y_axis.x, t.matrix2.y_axis.y, 0.0, 0.0),
        Vec4::new(t.translation.x, t.translation.y, 1.0, 0.0),
        Vec4::ZERO,
    )
}

impl FragUniforms {
    /// Stencil-pass block: no shading, no scissor, no stroke threshold.
    pub(crate) fn simple() -> Self {
        Self {
            stroke_thr: -1.0,
            shader_type: ShaderType::Simple as i32,
            ..bytemuck::Zeroable::zeroed()
        }
    }

    /// Packs a paint plus scissor into the uniform layout.
    ///
    /// `width` is the geometric stroke width for coverage correction, `fringe`
    /// the antialiasing band, `stroke_thr` the coverage cutoff for stencilled
    /// strokes (negative disables it). `texture` carries the resolved info for
    /// `paint.image`; a paint whose image cannot be resolved degrades to a
    /// gradient of its inner color.
    pub(crate) fn convert_paint(
        paint: &Paint,
        scissor: &Scissor,
        width: f32,
        fringe: f32,
        stroke_thr: f32,
        texture: Option<&TextureInfo>,
    ) -> Self {
        let mut frag = Self {
            inner_color: Vec4::from(paint.inner_color.premultiplied()),
            outer_color: Vec4::from(paint.outer_color.premultiplied()),
            ..bytemuck::Zeroable::zeroed()
        };

        if scissor.is_enabled() {
            let inv = math::inverse_or_identity(&scissor.xform);
            frag.scissor_mat = xform_to_mat4(&inv);
            frag.scissor_ext = scissor.extent;
            frag.scissor_scale = Vec2::new(
                Vec2::new(scissor.xform.matrix2.x_axis.x, scissor.xform.matrix2.y_axis.x).length()
                    / fringe,
                Vec2::new(scissor.xform.matrix2.x_axis.y, scissor.xform.matrix2.y_axis.y).length()
                    / fringe,
            );
        } else {
            frag.scissor_mat = Mat4::ZERO;
            frag.scissor_ext = Vec2::ONE;
            frag.scissor_scale = Vec2::ONE;
        }

        frag.extent = paint.extent;
        frag.stroke_mult = (width * 0.5 + fringe * 0.5) / fringe;
        frag.stroke_thr = stroke_thr;

        let invxform;
        if let Some(tex) = texture {
            if tex.flags.contains(ImageFlags::FLIP_Y) {
                let flipped = paint.xform
                    * Affine2::from_translation(Vec2::new(0.0, frag.extent.y * 0.5))
                    * Affine2::from_scale(Vec2::new(1.0, -1.0))
                    * Affine2::from_translation(Vec2::new(0.0, -frag.extent.y * 0.5));
                invxform = math::inverse_or_identity(&flipped);
            } else {
                invxform = math::inverse_or_identity(&paint.xform);
            }
            frag.shader_type = ShaderType::FillImage as i32;
            frag.tex_type = match tex.kind {
                TextureKind::Rgba if tex.flags.contains(ImageFlags::PREMULTIPLIED) => 0,
                TextureKind::Rgba => 1,
                TextureKind::Alpha => 2,
            };
        } else {
            frag.shader_type = ShaderType::FillGradient as i32;
            frag.radius = paint.radius;
            frag.feather = paint.feather;
            invxform = math::inverse_or_identity(&paint.xform);
        }
        frag.paint_mat = xform_to_mat4(&invxform);

        frag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_simple_block() {
        let frag = FragUniforms::simple();
        assert_eq!(frag.shader_type, ShaderType::Simple as i32);
        assert_eq!(frag.stroke_thr, -1.0);
        assert_eq!(frag.inner_color, Vec4::ZERO);
    }

    #[test]
    fn test_disabled_scissor_passes_everything() {
        let paint = Paint::color(Color::rgbf(1.0, 0.0, 0.0));
        let frag =
            FragUniforms::convert_paint(&paint, &Scissor::DISABLED, 1.0, 1.0, -1.0, None);
        assert_eq!(frag.scissor_mat, Mat4::ZERO);
        assert_eq!(frag.scissor_ext, Vec2::ONE);
        assert_eq!(frag.scissor_scale, Vec2::ONE);
        assert_eq!(frag.shader_type, ShaderType::FillGradient as i32);
    }

    #[test]
    fn test_colors_are_premultiplied() {
        let paint = Paint::color(Color::rgbaf(1.0, 0.5, 0.0, 0.5));
        let frag =
            FragUniforms::convert_paint(&paint, &Scissor::DISABLED, 1.0, 1.0, -1.0, None);
        assert_eq!(frag.inner_color, Vec4::new(0.5, 0.25, 0.0, 0.5));
    }

    #[test]
    fn test_scissor_scale_tracks_fringe() {
        let mut scissor = Scissor::DISABLED;
        scissor.xform = Affine2::from_translation(Vec2::new(50.0, 50.0));
        scissor.extent = Vec2::new(20.0, 10.0);
        let paint = Paint::color(Color::WHITE);
        let frag = FragUniforms::convert_paint(&paint, &scissor, 1.0, 2.0, -1.0, None);
        assert_eq!(frag.scissor_ext, Vec2::new(20.0, 10.0));
        // Identity rotation: scale is 1 / fringe per axis.
        assert_eq!(frag.scissor_scale, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_image_paint_selects_texture_shading() {
        let paint = Paint::image_pattern(
            Vec2::ZERO,
            Vec2::new(64.0, 64.0),
            0.0,
            crate::renderer::TextureId::from_index(0),
            1.0,
        );
        let info = TextureInfo {
            kind: TextureKind::Rgba,
            width: 64,
            height: 64,
            flags: ImageFlags::empty(),
        };
        let frag =
            FragUniforms::convert_paint(&paint, &Scissor::DISABLED, 1.0, 1.0, -1.0, Some(&info));
        assert_eq!(frag.shader_type, ShaderType::FillImage as i32);
        assert_eq!(frag.tex_type, 1);

        let premult = TextureInfo {
            flags: ImageFlags::PREMULTIPLIED,
            ..info
        };
        let frag = FragUniforms::convert_paint(
            &paint,
            &Scissor::DISABLED,
            1.0,
            1.0,
            -1.0,
            Some(&premult),
        );
        assert_eq!(frag.tex_type, 0);
    }

    #[test]
    fn test_stroke_mult() {
        let paint = Paint::color(Color::WHITE);
        let frag =
            FragUniforms::convert_paint(&paint, &Scissor::DISABLED, 3.0, 1.0, -1.0, None);
        assert_eq!(frag.stroke_mult, 2.0);
    }
}
