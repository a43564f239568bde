//! RGBA color type used by paints and gradients.
//!
//! Channels are unpremultiplied floats in `[0, 1]`. Premultiplication happens
//! once, when a paint is converted to fragment uniforms.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgbaf(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::rgbaf(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgbaf(1.0, 1.0, 1.0, 1.0);

    /// Color from float channels, no clamping.
    pub const fn rgbaf(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgbf(r: f32, g: f32, b: f32) -> Self {
        Self::rgbaf(r, g, b, 1.0)
    }

    /// Color from 8-bit channels.
    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba8(r, g, b, 255)
    }

    /// Color from hue, saturation and lightness, each in `[0, 1]`.
    ///
    /// Hue wraps around, saturation and lightness are clamped.
    pub fn hsla(h: f32, s: f32, l: f32, a: f32) -> Self {
        let mut h = h % 1.0;
        if h < 0.0 {
            h += 1.0;
        }
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let m1 = 2.0 * l - m2;
        Self {
            r: hue(h + 1.0 / 3.0, m1, m2).clamp(0.0, 1.0),
            g: hue(h, m1, m2).clamp(0.0, 1.0),
            b: hue(h - 1.0 / 3.0, m1, m2).clamp(0.0, 1.0),
            a,
        }
    }

    pub fn hsl(h: f32, s: f32, l: f32) -> Self {
        Self::hsla(h, s, l, 1.0)
    }

    /// This color with its alpha replaced.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation between two colors, `u` clamped to `[0, 1]`.
    pub fn lerp(self, other: Self, u: f32) -> Self {
        let u = u.clamp(0.0, 1.0);
        let om = 1.0 - u;
        Self {
            r: self.r * om + other.r * u,
            g: self.g * om + other.g * u,
            b: self.b * om + other.b * u,
            a: self.a * om + other.a * u,
        }
    }

    /// Alpha-premultiplied copy, as expected by the blend equations.
    pub fn premultiplied(self) -> Self {
        Self {
            r: self.r * self.a,
            g: self.g * self.a,
            b: self.b * self.a,
            a: self.a,
        }
    }
}

impl From<Color> for Vec4 {
    fn from(c: Color) -> Self {
        Vec4::new(c.r, c.g, c.b, c.a)
    }
}

fn hue(mut h: f32, m1: f32, m2: f32) -> f32 {
    if h < 0.0 {
        h += 1.0;
    }
    if h > 1.0 {
        h -= 1.0;
    }
    if h < 1.0 / 6.0 {
        m1 + (m2 - m1) * h * 6.0
    } else if h < 3.0 / 6.0 {
        m2
    } else if h < 4.0 / 6.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
    } else {
        m1
    }
}
