//! Paint sources: solid colors, gradients and image patterns.
//!
//! A gradient is not a pixel ramp but a transform plus extent/radius/feather
//! that the fragment shader feeds into a rounded-rect distance field. The
//! constructors here only set up that parametrization.

use crate::color::Color;
use crate::renderer::TextureId;
use glam::{Affine2, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Local-to-paint-space transform. Multiplied by the current state
    /// transform when the paint is assigned.
    pub xform: Affine2,
    pub extent: Vec2,
    pub radius: f32,
    pub feather: f32,
    pub inner_color: Color,
    pub outer_color: Color,
    pub image: Option<TextureId>,
}

impl Paint {
    /// Uniform solid color.
    pub fn color(color: Color) -> Self {
        Self {
            xform: Affine2::IDENTITY,
            extent: Vec2::ZERO,
            radius: 0.0,
            feather: 1.0,
            inner_color: color,
            outer_color: color,
            image: None,
        }
    }

    /// Linear gradient from `start` to `end`.
    pub fn linear_gradient(start: Vec2, end: Vec2, inner: Color, outer: Color) -> Self {
        // The shader has no dedicated linear mode; a box gradient stretched
        // far past the viewport degenerates into one.
        const LARGE: f32 = 1e5;

        let mut d = end - start;
        let len = d.length();
        if len > 0.0001 {
            d /= len;
        } else {
            d = Vec2::new(0.0, 1.0);
        }

        Self {
            xform: Affine2::from_cols(Vec2::new(d.y, -d.x), d, start - d * LARGE),
            extent: Vec2::new(LARGE, LARGE + len * 0.5),
            radius: 0.0,
            feather: len.max(1.0),
            inner_color: inner,
            outer_color: outer,
            image: None,
        }
    }

    /// Box gradient: a feathered rounded rectangle, useful for drop shadows.
    pub fn box_gradient(
        pos: Vec2,
        size: Vec2,
        radius: f32,
        feather: f32,
        inner: Color,
        outer: Color,
    ) -> Self {
        Self {
            xform: Affine2::from_translation(pos + size * 0.5),
            extent: size * 0.5,
            radius,
            feather: feather.max(1.0),
            inner_color: inner,
            outer_color: outer,
            image: None,
        }
    }

    /// Radial gradient between an inner and an outer radius.
    pub fn radial_gradient(
        center: Vec2,
        in_radius: f32,
        out_radius: f32,
        inner: Color,
        outer: Color,
    ) -> Self {
        let r = (in_radius + out_radius) * 0.5;
        Self {
            xform: Affine2::from_translation(center),
            extent: Vec2::splat(r),
            radius: r,
            feather: (out_radius - in_radius).max(1.0),
            inner_color: inner,
            outer_color: outer,
            image: None,
        }
    }

    /// Repeating or clamped image fill. `origin` and `size` place one tile of
    /// the image, `angle` rotates around its top-left corner.
    pub fn image_pattern(
        origin: Vec2,
        size: Vec2,
        angle: f32,
        image: TextureId,
        alpha: f32,
    ) -> Self {
        let mut xform = Affine2::from_angle(angle);
        xform.translation = origin;
        Self {
            xform,
            extent: size,
            radius: 0.0,
            feather: 0.0,
            inner_color: Color::rgbaf(1.0, 1.0, 1.0, alpha),
            outer_color: Color::rgbaf(1.0, 1.0, 1.0, alpha),
            image: Some(image),
        }
    }

    /// Folds a state transform into the paint.
    pub(crate) fn apply_transform(&mut self, t: &Affine2) {
        self.xform = *t * self.xform;
    }
}

impl From<Color> for Paint {
    fn from(c: Color) -> Self {
        Paint::color(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_gradient_axis() {
        let p = Paint::linear_gradient(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Color::WHITE,
            Color::BLACK,
        );
        // Gradient direction becomes the second basis column.
        assert_eq!(p.xform.matrix2.y_axis, Vec2::new(0.0, 1.0));
        assert_eq!(p.xform.matrix2.x_axis, Vec2::new(1.0, 0.0));
        assert_eq!(p.xform.translation, Vec2::new(0.0, -1e5));
        assert_eq!(p.feather, 10.0);
        assert_eq!(p.extent, Vec2::new(1e5, 1e5 + 5.0));
    }

    #[test]
    fn test_linear_gradient_degenerate() {
        let p = Paint::linear_gradient(Vec2::ZERO, Vec2::ZERO, Color::WHITE, Color::BLACK);
        // Zero-length gradients fall back to a vertical axis with unit feather.
        assert_eq!(p.xform.matrix2.y_axis, Vec2::new(0.0, 1.0));
        assert_eq!(p.feather, 1.0);
    }

    #[test]
    fn test_radial_gradient() {
        let p = Paint::radial_gradient(Vec2::new(5.0, 5.0), 2.0, 6.0, Color::WHITE, Color::BLACK);
        assert_eq!(p.radius, 4.0);
        assert_eq!(p.extent, Vec2::splat(4.0));
        assert_eq!(p.feather, 4.0);
        assert_eq!(p.xform.translation, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_box_gradient_centering() {
        let p = Paint::box_gradient(
            Vec2::new(10.0, 20.0),
            Vec2::new(100.0, 50.0),
            4.0,
            0.0,
            Color::WHITE,
            Color::BLACK,
        );
        assert_eq!(p.xform.translation, Vec2::new(60.0, 45.0));
        assert_eq!(p.extent, Vec2::new(50.0, 25.0));
        // Feather is clamped away from zero to avoid division in the shader.
        assert_eq!(p.feather, 1.0);
    }

    #[test]
    fn test_image_pattern() {
        let p = Paint::image_pattern(
            Vec2::new(3.0, 4.0),
            Vec2::new(64.0, 32.0),
            0.0,
            TextureId(7),
            0.5,
        );
        assert_eq!(p.image, Some(TextureId(7)));
        assert_eq!(p.extent, Vec2::new(64.0, 32.0));
        assert_eq!(p.inner_color.a, 0.5);
        assert_eq!(p.xform.translation, Vec2::new(3.0, 4.0));
    }
}
