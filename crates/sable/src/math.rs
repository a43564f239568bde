//! Scalar and vector helpers shared by the tessellation pipeline.

use glam::{Affine2, Vec2};

/// Handle length relative to radius when approximating a 90 degree arc
/// with a cubic bezier.
pub const KAPPA90: f32 = 0.552_284_8;

/// Tessellation tolerances derived from the device pixel ratio.
///
/// All quality knobs scale with the ratio so that geometry flattened for a
/// hidpi target uses proportionally more segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Maximum curve flattening error, in pixels.
    pub tess: f32,
    /// Distance under which two points are merged.
    pub dist: f32,
    /// Width of the antialiasing fringe, one device pixel.
    pub fringe: f32,
    /// The ratio the tolerances were derived from.
    pub device_ratio: f32,
}

impl Tolerances {
    pub fn from_ratio(ratio: f32) -> Self {
        Self {
            tess: 0.25 / ratio,
            dist: 0.01 / ratio,
            fringe: 1.0 / ratio,
            device_ratio: ratio,
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::from_ratio(1.0)
    }
}

/// Axis-aligned rectangle accumulated over flattened points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// An empty bounds that any added point will replace.
    pub const NONE: Self = Self {
        min: Vec2::new(1e6, 1e6),
        max: Vec2::new(-1e6, -1e6),
    };

    pub fn add_point(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::NONE
    }
}

/// Whether two points coincide within `tol`.
pub fn pt_equals(a: Vec2, b: Vec2, tol: f32) -> bool {
    let d = b - a;
    d.x * d.x + d.y * d.y < tol * tol
}

/// Twice the signed area of the triangle `(a, b, c)`.
pub fn triarea2(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let ab = b - a;
    let ac = c - a;
    ac.x * ab.y - ab.x * ac.y
}

/// Cross product of two direction vectors.
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    b.x * a.y - a.x * b.y
}

/// Normalizes `v`, returning the unit vector and the original length.
///
/// Vectors shorter than 1e-6 are returned unchanged so that degenerate
/// segments never produce NaNs downstream.
pub fn normalize(v: Vec2) -> (Vec2, f32) {
    let d = (v.x * v.x + v.y * v.y).sqrt();
    if d > 1e-6 {
        let id = 1.0 / d;
        (v * id, d)
    } else {
        (v, d)
    }
}

/// Squared distance from `p` to the segment `q`-`r`.
pub fn dist_pt_seg(p: Vec2, q: Vec2, r: Vec2) -> f32 {
    let pq = r - q;
    let d = pq.x * pq.x + pq.y * pq.y;
    let mut t = pq.x * (p.x - q.x) + pq.y * (p.y - q.y);
    if d > 0.0 {
        t /= d;
    }
    t = t.clamp(0.0, 1.0);
    let dx = q.x + t * pq.x - p.x;
    let dy = q.y + t * pq.y - p.y;
    dx * dx + dy * dy
}

/// Number of segments needed for an arc of the given radius to stay within
/// `tol` of the true circle. Never less than 2.
pub fn curve_divs(r: f32, arc: f32, tol: f32) -> u32 {
    let da = (r / (r + tol)).acos() * 2.0;
    ((arc / da).ceil() as u32).max(2)
}

/// Average of the x and y scale factors encoded in a transform.
pub fn average_scale(t: &Affine2) -> f32 {
    let sx = Vec2::new(t.matrix2.x_axis.x, t.matrix2.y_axis.x).length();
    let sy = Vec2::new(t.matrix2.x_axis.y, t.matrix2.y_axis.y).length();
    (sx + sy) * 0.5
}

/// Inverse of `t`, or identity when the matrix is not invertible.
pub fn inverse_or_identity(t: &Affine2) -> Affine2 {
    let det = t.matrix2.determinant();
    if det > -1e-6 && det < 1e-6 {
        return Affine2::IDENTITY;
    }
    t.inverse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_divs_small_radius() {
        // A unit-radius half circle at default quality needs few segments.
        assert_eq!(curve_divs(1.0, std::f32::consts::PI, 0.25), 3);
    }

    #[test]
    fn test_curve_divs_large_radius() {
        assert_eq!(curve_divs(10.0, std::f32::consts::PI, 0.25), 8);
    }

    #[test]
    fn test_curve_divs_minimum() {
        // Tiny arcs still get at least two segments.
        assert_eq!(curve_divs(100.0, 0.001, 0.25), 2);
    }

    #[test]
    fn test_triarea2_sign() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(0.0, 1.0);
        let c = Vec2::new(1.0, 1.0);
        // Screen-space counter-clockwise triangles have positive area.
        assert_eq!(triarea2(a, b, c), 1.0);
        assert_eq!(triarea2(a, c, b), -1.0);
    }

    #[test]
    fn test_normalize_zero_length() {
        let (v, len) = normalize(Vec2::ZERO);
        assert_eq!(len, 0.0);
        assert!(v.x == 0.0 && v.y == 0.0);
    }

    #[test]
    fn test_normalize_unit_result() {
        let (v, len) = normalize(Vec2::new(3.0, 4.0));
        assert!((len - 5.0).abs() < 1e-6);
        assert!((v.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dist_pt_seg() {
        let q = Vec2::new(0.0, 0.0);
        let r = Vec2::new(10.0, 0.0);
        assert_eq!(dist_pt_seg(Vec2::new(5.0, 0.0), q, r), 0.0);
        assert_eq!(dist_pt_seg(Vec2::new(5.0, 2.0), q, r), 4.0);
        // Beyond the end, distance is to the endpoint.
        assert_eq!(dist_pt_seg(Vec2::new(13.0, 4.0), q, r), 25.0);
    }

    #[test]
    fn test_bounds_accumulate() {
        let mut b = Bounds::NONE;
        b.add_point(Vec2::new(2.0, -1.0));
        b.add_point(Vec2::new(-3.0, 5.0));
        assert_eq!(b.min, Vec2::new(-3.0, -1.0));
        assert_eq!(b.max, Vec2::new(2.0, 5.0));
        assert_eq!(b.width(), 5.0);
        assert_eq!(b.height(), 6.0);
    }

    #[test]
    fn test_inverse_or_identity_singular() {
        let t = Affine2::from_scale(Vec2::new(0.0, 1.0));
        assert_eq!(inverse_or_identity(&t), Affine2::IDENTITY);
    }

    #[test]
    fn test_inverse_or_identity_roundtrip() {
        let t = Affine2::from_scale_angle_translation(Vec2::new(2.0, 3.0), 0.4, Vec2::new(7.0, -2.0));
        let inv = inverse_or_identity(&t);
        let p = Vec2::new(1.5, -4.0);
        let back = inv.transform_point2(t.transform_point2(p));
        assert!((back - p).length() < 1e-4);
    }

    #[test]
    fn test_average_scale() {
        let t = Affine2::from_scale(Vec2::new(2.0, 4.0));
        assert!((average_scale(&t) - 3.0).abs() < 1e-6);
    }
}
