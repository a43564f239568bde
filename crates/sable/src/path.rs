//! Flattened sub-path storage: points, direction data and join analysis.

use crate::math::{self, Bounds};
use crate::style::{LineJoin, Winding};
use crate::vertex::Vertex;
use bitflags::bitflags;
use glam::Vec2;

const INIT_POINTS: usize = 128;
const INIT_VERTS: usize = 256;

bitflags! {
    /// Per-point classification computed during flattening and join analysis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PointFlags: u8 {
        /// An actual path corner, as opposed to a curve subdivision point.
        const CORNER = 0x01;
        /// The path turns left at this point.
        const LEFT = 0x02;
        /// The outside of the corner is beveled.
        const BEVEL = 0x04;
        /// The inside of the corner must be beveled to stay inside the shape.
        const INNER_BEVEL = 0x08;
    }
}

/// A flattened point with its outgoing edge and miter data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Point {
    pub pos: Vec2,
    /// Unit direction towards the next point.
    pub dir: Vec2,
    /// Distance to the next point.
    pub len: f32,
    /// Miter direction, scaled so `pos + dm * w` is the miter tip for a
    /// half-width `w`.
    pub dm: Vec2,
    pub flags: PointFlags,
}

/// One flattened sub-path plus its expanded vertex ribbons.
///
/// Instances are pooled by the path cache; `recycle` trims excess capacity
/// so a single huge path does not pin its memory forever.
#[derive(Debug, Default)]
pub struct Path {
    pub(crate) points: Vec<Point>,
    pub(crate) closed: bool,
    pub(crate) winding: Winding,
    pub(crate) nbevel: usize,
    pub(crate) convex: bool,
    pub(crate) fill: Vec<Vertex>,
    pub(crate) stroke: Vec<Vertex>,
}

impl Path {
    pub(crate) fn new() -> Self {
        Self {
            points: Vec::with_capacity(INIT_POINTS),
            ..Self::default()
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_convex(&self) -> bool {
        self.convex
    }

    /// Triangle-fan vertices covering the interior, empty until a fill
    /// expansion ran.
    pub fn fill_vertices(&self) -> &[Vertex] {
        &self.fill
    }

    /// Triangle-strip vertices for the stroke or fringe ring.
    pub fn stroke_vertices(&self) -> &[Vertex] {
        &self.stroke
    }

    /// Resets for reuse and gives back memory beyond the pool baseline.
    pub(crate) fn recycle(&mut self) {
        self.points.clear();
        self.points.shrink_to(INIT_POINTS);
        self.fill.clear();
        self.fill.shrink_to(INIT_VERTS);
        self.stroke.clear();
        self.stroke.shrink_to(INIT_VERTS);
        self.closed = false;
        self.winding = Winding::Ccw;
        self.nbevel = 0;
        self.convex = false;
    }

    /// Appends a point, merging with the previous one when closer than
    /// `dist_tol`. Merged points keep the union of both flag sets.
    pub(crate) fn add_point(&mut self, pos: Vec2, flags: PointFlags, dist_tol: f32) {
        if let Some(last) = self.points.last_mut() {
            if math::pt_equals(last.pos, pos, dist_tol) {
                last.flags |= flags;
                return;
            }
        }
        self.points.push(Point {
            pos,
            flags,
            ..Point::default()
        });
    }

    /// Post-flattening fixup: dedupe the closing point, enforce the recorded
    /// winding and compute per-edge directions.
    pub(crate) fn finish(&mut self, dist_tol: f32, bounds: &mut Bounds) {
        if self.points.len() >= 2 {
            let first = self.points[0].pos;
            let last = self.points[self.points.len() - 1].pos;
            if math::pt_equals(last, first, dist_tol) {
                self.points.pop();
                self.closed = true;
            }
        }

        if self.points.len() > 2 {
            let area = poly_area(&self.points);
            let reverse = match self.winding {
                Winding::Ccw => area < 0.0,
                Winding::Cw => area > 0.0,
            };
            if reverse {
                self.points.reverse();
            }
        }

        let n = self.points.len();
        for i in 0..n {
            let next = self.points[(i + 1) % n].pos;
            let p = &mut self.points[i];
            let (dir, len) = math::normalize(next - p.pos);
            p.dir = dir;
            p.len = len;
            bounds.add_point(p.pos);
        }
    }

    /// Classifies every corner for the expanders: miter vectors, left turns,
    /// bevel flags and the convexity of the whole sub-path.
    pub(crate) fn calculate_joins(&mut self, w: f32, line_join: LineJoin, miter_limit: f32) {
        let iw = if w > 0.0 { 1.0 / w } else { 0.0 };
        let n = self.points.len();
        if n == 0 {
            return;
        }

        let mut nleft = 0;
        self.nbevel = 0;

        let mut p0_idx = n - 1;
        for i in 0..n {
            let p0 = self.points[p0_idx];
            let p1 = &mut self.points[i];

            let dl0 = Vec2::new(p0.dir.y, -p0.dir.x);
            let dl1 = Vec2::new(p1.dir.y, -p1.dir.x);

            // Extrusion direction is the average of the two edge normals,
            // lengthened to reach the miter tip. The 600 cap keeps nearly
            // opposite edges from exploding.
            let mut dm = (dl0 + dl1) * 0.5;
            let dmr2 = dm.x * dm.x + dm.y * dm.y;
            if dmr2 > 1e-6 {
                let scale = (1.0 / dmr2).min(600.0);
                dm *= scale;
            }
            p1.dm = dm;

            // Keep the corner bit, drop stale join data.
            p1.flags &= PointFlags::CORNER;

            let cross = p1.dir.x * p0.dir.y - p0.dir.x * p1.dir.y;
            if cross > 0.0 {
                nleft += 1;
                p1.flags |= PointFlags::LEFT;
            }

            // Bevel the inside when the miter tip would cross the short edge.
            let limit = (p0.len.min(p1.len) * iw).max(1.01);
            if dmr2 * limit * limit < 1.0 {
                p1.flags |= PointFlags::INNER_BEVEL;
            }

            if p1.flags.contains(PointFlags::CORNER)
                && (dmr2 * miter_limit * miter_limit < 1.0 || line_join != LineJoin::Miter)
            {
                p1.flags |= PointFlags::BEVEL;
            }

            if p1.flags.intersects(PointFlags::BEVEL | PointFlags::INNER_BEVEL) {
                self.nbevel += 1;
            }

            p0_idx = i;
        }

        self.convex = nleft == n;
    }
}

fn poly_area(points: &[Point]) -> f32 {
    let mut area = 0.0;
    for i in 2..points.len() {
        area += math::triarea2(points[0].pos, points[i - 1].pos, points[i].pos);
    }
    area * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(w: Winding) -> Path {
        let mut p = Path::new();
        p.winding = w;
        for xy in [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)] {
            p.add_point(Vec2::new(xy.0, xy.1), PointFlags::CORNER, 0.01);
        }
        p.closed = true;
        p
    }

    #[test]
    fn test_add_point_merges_and_unions_flags() {
        let mut p = Path::new();
        p.add_point(Vec2::ZERO, PointFlags::empty(), 0.01);
        p.add_point(Vec2::new(0.001, 0.0), PointFlags::CORNER, 0.01);
        assert_eq!(p.points.len(), 1);
        assert!(p.points[0].flags.contains(PointFlags::CORNER));
    }

    #[test]
    fn test_finish_dedupes_closing_point() {
        let mut p = Path::new();
        for xy in [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (0.0, 0.0)] {
            // Larger spacing than dist_tol so only the wraparound merges.
            p.points.push(Point {
                pos: Vec2::new(xy.0, xy.1),
                ..Point::default()
            });
        }
        let mut bounds = Bounds::NONE;
        p.finish(0.01, &mut bounds);
        assert_eq!(p.points.len(), 3);
        assert!(p.closed);
        assert_eq!(bounds.min, Vec2::ZERO);
        assert_eq!(bounds.max, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_finish_enforces_winding() {
        // Recorded clockwise (negative area) but tagged solid, so finish
        // must reverse the point order.
        let mut p = Path::new();
        for xy in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
            p.add_point(Vec2::new(xy.0, xy.1), PointFlags::CORNER, 0.01);
        }
        assert!(poly_area(&p.points) < 0.0);
        let mut bounds = Bounds::NONE;
        p.finish(0.01, &mut bounds);
        assert!(poly_area(&p.points) > 0.0);
    }

    #[test]
    fn test_finish_keeps_hole_winding() {
        let mut p = square(Winding::Cw);
        assert!(poly_area(&p.points) > 0.0);
        let mut bounds = Bounds::NONE;
        p.finish(0.01, &mut bounds);
        assert!(poly_area(&p.points) < 0.0);
    }

    #[test]
    fn test_square_is_convex_all_left() {
        let mut p = square(Winding::Ccw);
        let mut bounds = Bounds::NONE;
        p.finish(0.01, &mut bounds);
        p.calculate_joins(1.0, LineJoin::Miter, 10.0);
        assert!(p.convex);
        for pt in p.points() {
            assert!(pt.flags.contains(PointFlags::LEFT));
        }
        // Right angles fit under the default miter limit.
        assert_eq!(p.nbevel, 0);
    }

    #[test]
    fn test_bevel_join_flags_every_corner() {
        let mut p = square(Winding::Ccw);
        let mut bounds = Bounds::NONE;
        p.finish(0.01, &mut bounds);
        p.calculate_joins(1.0, LineJoin::Bevel, 10.0);
        assert_eq!(p.nbevel, 4);
        for pt in p.points() {
            assert!(pt.flags.contains(PointFlags::BEVEL));
        }
    }

    #[test]
    fn test_star_is_concave() {
        let mut p = Path::new();
        p.winding = Winding::Ccw;
        let n = 5;
        for i in 0..(n * 2) {
            let r = if i % 2 == 0 { 10.0 } else { 4.0 };
            let a = i as f32 / (n * 2) as f32 * std::f32::consts::TAU;
            p.add_point(
                Vec2::new(a.cos() * r, a.sin() * r),
                PointFlags::CORNER,
                0.01,
            );
        }
        p.closed = true;
        let mut bounds = Bounds::NONE;
        p.finish(0.01, &mut bounds);
        p.calculate_joins(1.0, LineJoin::Miter, 10.0);
        assert!(!p.convex);
    }

    #[test]
    fn test_sharp_corner_gets_miter_bevel() {
        // A near-degenerate spike exceeds any reasonable miter limit.
        let mut p = Path::new();
        p.add_point(Vec2::new(0.0, 0.0), PointFlags::CORNER, 0.01);
        p.add_point(Vec2::new(100.0, 0.0), PointFlags::CORNER, 0.01);
        p.add_point(Vec2::new(0.0, 1.0), PointFlags::CORNER, 0.01);
        p.closed = true;
        let mut bounds = Bounds::NONE;
        p.finish(0.01, &mut bounds);
        p.calculate_joins(1.0, LineJoin::Miter, 4.0);
        assert!(p.points[1].flags.contains(PointFlags::BEVEL));
    }

    #[test]
    fn test_recycle_resets() {
        let mut p = square(Winding::Cw);
        p.fill.push(Vertex::new(Vec2::ZERO, 0.5, 1.0));
        p.recycle();
        assert!(p.points.is_empty());
        assert!(p.fill.is_empty());
        assert_eq!(p.winding, Winding::Ccw);
        assert!(!p.closed);
    }
}
