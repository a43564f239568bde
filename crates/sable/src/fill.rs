//! Fill expansion: interior fans plus the antialiasing fringe ring.
//!
//! Each sub-path turns into a triangle fan covering its interior and, when a
//! fringe width is given, a thin triangle strip around the perimeter whose
//! `u` texcoord ramps coverage from opaque to transparent. The interior fan
//! is shrunk by half the fringe so fan and ring overlap seamlessly.

use crate::cache::PathCache;
use crate::path::{Path, Point, PointFlags};
use crate::stroke::bevel_join;
use crate::style::LineJoin;
use crate::vertex::Vertex;
use glam::Vec2;

/// Expands every cached path into fill geometry.
///
/// `w` is the fringe half-width; zero skips the fringe ring entirely and
/// emits the raw polygon. `fringe_width` feeds the interior inset even when
/// `w` differs from it.
pub(crate) fn expand_fill(
    cache: &mut PathCache,
    w: f32,
    line_join: LineJoin,
    miter_limit: f32,
    fringe_width: f32,
) {
    let aa = fringe_width;
    let fringe = w > 0.0;

    for path in &mut cache.paths {
        path.calculate_joins(w, line_join, miter_limit);
    }

    // The convex fast path only applies to a lone convex sub-path; holes
    // force the stencil cover.
    let convex = cache.paths.len() == 1 && cache.paths[0].convex;

    for path in &mut cache.paths {
        expand_path_fill(path, w, aa, fringe, convex);
    }
}

fn expand_path_fill(path: &mut Path, w: f32, aa: f32, fringe: bool, convex: bool) {
    let woff = 0.5 * aa;
    let n = path.points.len();
    let nbevel = path.nbevel;

    path.fill.clear();
    path.stroke.clear();

    {
        let points: &[Point] = &path.points;
        let dst = &mut path.fill;
        dst.reserve(n + nbevel + 1);

        if fringe {
            // Inset the fan by half the fringe so the coverage ramp peaks on
            // the true outline.
            let mut p0 = points[n - 1];
            for i in 0..n {
                let p1 = points[i];
                if p1.flags.contains(PointFlags::BEVEL) {
                    let dl0 = Vec2::new(p0.dir.y, -p0.dir.x);
                    let dl1 = Vec2::new(p1.dir.y, -p1.dir.x);
                    if p1.flags.contains(PointFlags::LEFT) {
                        dst.push(Vertex::new(p1.pos + p1.dm * woff, 0.5, 1.0));
                    } else {
                        dst.push(Vertex::new(p1.pos + dl0 * woff, 0.5, 1.0));
                        dst.push(Vertex::new(p1.pos + dl1 * woff, 0.5, 1.0));
                    }
                } else {
                    dst.push(Vertex::new(p1.pos + p1.dm * woff, 0.5, 1.0));
                }
                p0 = p1;
            }
        } else {
            for p in points {
                dst.push(Vertex::new(p.pos, 0.5, 1.0));
            }
        }
    }

    if fringe {
        let mut lw = w + woff;
        let rw = w - woff;
        let mut lu = 0.0;
        let ru = 1.0;
        if convex {
            // The fan already reaches the outline; the ring only has to fade
            // outwards.
            lw = woff;
            lu = 0.5;
        }

        let points: &[Point] = &path.points;
        let dst = &mut path.stroke;
        dst.reserve((n + nbevel * 5 + 1) * 2);

        let mut p0 = points[n - 1];
        for i in 0..n {
            let p1 = points[i];
            if p1.flags.intersects(PointFlags::BEVEL | PointFlags::INNER_BEVEL) {
                bevel_join(dst, p0, p1, lw, rw, lu, ru);
            } else {
                dst.push(Vertex::new(p1.pos + p1.dm * lw, lu, 1.0));
                dst.push(Vertex::new(p1.pos - p1.dm * rw, ru, 1.0));
            }
            p0 = p1;
        }

        // Close the strip by repeating the first pair.
        let v0 = dst[0];
        let v1 = dst[1];
        dst.push(Vertex::new(v0.pos, lu, 1.0));
        dst.push(Vertex::new(v1.pos, ru, 1.0));
    }
}
