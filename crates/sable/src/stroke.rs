//! Stroke expansion: ribbons, caps and joins.
//!
//! A stroke becomes one triangle strip per sub-path. Interior points emit a
//! left/right vertex pair extruded along the miter direction; corners that
//! were flagged by join analysis emit bevel or round-join geometry instead.
//! The `u` texcoord carries the coverage ramp the fragment shader turns into
//! edge antialiasing.

use crate::cache::PathCache;
use crate::math::{self, Tolerances};
use crate::path::{Path, Point, PointFlags};
use crate::style::{LineCap, LineJoin};
use crate::vertex::Vertex;
use glam::Vec2;

/// Expands every cached path into a stroke ribbon of half-width `w`.
///
/// `fringe` is the antialiasing band width. Zero disables the coverage ramp
/// by pinning `u` to 0.5 across the strip.
pub(crate) fn expand_stroke(
    cache: &mut PathCache,
    mut w: f32,
    fringe: f32,
    line_cap: LineCap,
    line_join: LineJoin,
    miter_limit: f32,
    tol: &Tolerances,
) {
    let aa = fringe;
    let (u0, u1) = if aa == 0.0 { (0.5, 0.5) } else { (0.0, 1.0) };
    let ncap = math::curve_divs(w, std::f32::consts::PI, tol.tess);

    w += aa * 0.5;

    for path in &mut cache.paths {
        path.calculate_joins(w, line_join, miter_limit);
        path.fill.clear();
        expand_path_stroke(path, w, aa, u0, u1, line_cap, line_join, ncap);
    }
}

#[allow(clippy::too_many_arguments)]
fn expand_path_stroke(
    path: &mut Path,
    w: f32,
    aa: f32,
    u0: f32,
    u1: f32,
    cap: LineCap,
    join: LineJoin,
    ncap: u32,
) {
    let n = path.points.len();
    let nbevel = path.nbevel;
    let looped = path.closed;

    let mut cverts = if join == LineJoin::Round {
        (n + nbevel * (ncap as usize + 2) + 1) * 2
    } else {
        (n + nbevel * 5 + 1) * 2
    };
    if !looped {
        cverts += if cap == LineCap::Round {
            (ncap as usize * 2 + 2) * 2
        } else {
            12
        };
    }

    path.stroke.clear();

    let points: &[Point] = &path.points;
    let dst = &mut path.stroke;
    dst.reserve(cverts);

    let (s, e) = if looped { (0, n) } else { (1, n - 1) };
    let mut p0 = if looped { points[n - 1] } else { points[0] };
    let mut p1_idx = if looped { 0 } else { 1 };

    if !looped {
        let (d, _) = math::normalize(points[1].pos - points[0].pos);
        match cap {
            LineCap::Butt => butt_cap_start(dst, points[0], d, w, -aa * 0.5, aa, u0, u1),
            LineCap::Square => butt_cap_start(dst, points[0], d, w, w - aa, aa, u0, u1),
            LineCap::Round => round_cap_start(dst, points[0], d, w, ncap, u0, u1),
        }
    }

    for _ in s..e {
        let p1 = points[p1_idx];
        if p1.flags.intersects(PointFlags::BEVEL | PointFlags::INNER_BEVEL) {
            if join == LineJoin::Round {
                round_join(dst, p0, p1, w, w, u0, u1, ncap);
            } else {
                bevel_join(dst, p0, p1, w, w, u0, u1);
            }
        } else {
            dst.push(Vertex::new(p1.pos + p1.dm * w, u0, 1.0));
            dst.push(Vertex::new(p1.pos - p1.dm * w, u1, 1.0));
        }
        p0 = p1;
        p1_idx += 1;
    }

    if looped {
        // Close the strip by repeating the first pair.
        let v0 = dst[0];
        let v1 = dst[1];
        dst.push(Vertex::new(v0.pos, u0, 1.0));
        dst.push(Vertex::new(v1.pos, u1, 1.0));
    } else {
        let p1 = points[p1_idx];
        let (d, _) = math::normalize(p1.pos - p0.pos);
        match cap {
            LineCap::Butt => butt_cap_end(dst, p1, d, w, -aa * 0.5, aa, u0, u1),
            LineCap::Square => butt_cap_end(dst, p1, d, w, w - aa, aa, u0, u1),
            LineCap::Round => round_cap_end(dst, p1, d, w, ncap, u0, u1),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn butt_cap_start(
    dst: &mut Vec<Vertex>,
    p: Point,
    d: Vec2,
    w: f32,
    dist: f32,
    aa: f32,
    u0: f32,
    u1: f32,
) {
    let pos = p.pos - d * dist;
    let dl = Vec2::new(d.y, -d.x);
    dst.push(Vertex::new(pos + dl * w - d * aa, u0, 0.0));
    dst.push(Vertex::new(pos - dl * w - d * aa, u1, 0.0));
    dst.push(Vertex::new(pos + dl * w, u0, 1.0));
    dst.push(Vertex::new(pos - dl * w, u1, 1.0));
}

#[allow(clippy::too_many_arguments)]
fn butt_cap_end(
    dst: &mut Vec<Vertex>,
    p: Point,
    d: Vec2,
    w: f32,
    dist: f32,
    aa: f32,
    u0: f32,
    u1: f32,
) {
    let pos = p.pos + d * dist;
    let dl = Vec2::new(d.y, -d.x);
    dst.push(Vertex::new(pos + dl * w, u0, 1.0));
    dst.push(Vertex::new(pos - dl * w, u1, 1.0));
    dst.push(Vertex::new(pos + dl * w + d * aa, u0, 0.0));
    dst.push(Vertex::new(pos - dl * w + d * aa, u1, 0.0));
}

fn round_cap_start(dst: &mut Vec<Vertex>, p: Point, d: Vec2, w: f32, ncap: u32, u0: f32, u1: f32) {
    let pos = p.pos;
    let dl = Vec2::new(d.y, -d.x);
    for i in 0..ncap {
        let a = i as f32 / (ncap - 1) as f32 * std::f32::consts::PI;
        let (ax, ay) = (a.cos() * w, a.sin() * w);
        dst.push(Vertex::new(pos - dl * ax - d * ay, u0, 1.0));
        dst.push(Vertex::new(pos, 0.5, 1.0));
    }
    dst.push(Vertex::new(pos + dl * w, u0, 1.0));
    dst.push(Vertex::new(pos - dl * w, u1, 1.0));
}

fn round_cap_end(dst: &mut Vec<Vertex>, p: Point, d: Vec2, w: f32, ncap: u32, u0: f32, u1: f32) {
    let pos = p.pos;
    let dl = Vec2::new(d.y, -d.x);
    dst.push(Vertex::new(pos + dl * w, u0, 1.0));
    dst.push(Vertex::new(pos - dl * w, u1, 1.0));
    for i in 0..ncap {
        let a = i as f32 / (ncap - 1) as f32 * std::f32::consts::PI;
        let (ax, ay) = (a.cos() * w, a.sin() * w);
        dst.push(Vertex::new(pos, 0.5, 1.0));
        dst.push(Vertex::new(pos - dl * ax + d * ay, u0, 1.0));
    }
}

/// Picks the two inner-edge anchor points for a join. When the inner side
/// needs a bevel the edge endpoints are extruded along each segment's own
/// normal; otherwise both collapse onto the miter tip.
fn choose_bevel(inner_bevel: bool, p0: Point, p1: Point, w: f32) -> (Vec2, Vec2) {
    if inner_bevel {
        (
            Vec2::new(p1.pos.x + p0.dir.y * w, p1.pos.y - p0.dir.x * w),
            Vec2::new(p1.pos.x + p1.dir.y * w, p1.pos.y - p1.dir.x * w),
        )
    } else {
        let m = p1.pos + p1.dm * w;
        (m, m)
    }
}

pub(crate) fn bevel_join(
    dst: &mut Vec<Vertex>,
    p0: Point,
    p1: Point,
    lw: f32,
    rw: f32,
    lu: f32,
    ru: f32,
) {
    let dl0 = Vec2::new(p0.dir.y, -p0.dir.x);
    let dl1 = Vec2::new(p1.dir.y, -p1.dir.x);

    if p1.flags.contains(PointFlags::LEFT) {
        let (l0, l1) = choose_bevel(p1.flags.contains(PointFlags::INNER_BEVEL), p0, p1, lw);

        dst.push(Vertex::new(l0, lu, 1.0));
        dst.push(Vertex::new(p1.pos - dl0 * rw, ru, 1.0));

        if p1.flags.contains(PointFlags::BEVEL) {
            dst.push(Vertex::new(l0, lu, 1.0));
            dst.push(Vertex::new(p1.pos - dl0 * rw, ru, 1.0));
            dst.push(Vertex::new(l1, lu, 1.0));
            dst.push(Vertex::new(p1.pos - dl1 * rw, ru, 1.0));
        } else {
            // Miter overflowed only on the inside; patch the outer edge with
            // degenerate triangles through the corner point.
            let r0 = p1.pos - p1.dm * rw;
            dst.push(Vertex::new(p1.pos, 0.5, 1.0));
            dst.push(Vertex::new(p1.pos - dl0 * rw, ru, 1.0));
            dst.push(Vertex::new(r0, ru, 1.0));
            dst.push(Vertex::new(r0, ru, 1.0));
            dst.push(Vertex::new(p1.pos, 0.5, 1.0));
            dst.push(Vertex::new(p1.pos - dl1 * rw, ru, 1.0));
        }

        dst.push(Vertex::new(l1, lu, 1.0));
        dst.push(Vertex::new(p1.pos - dl1 * rw, ru, 1.0));
    } else {
        let (r0, r1) = choose_bevel(p1.flags.contains(PointFlags::INNER_BEVEL), p0, p1, -rw);

        dst.push(Vertex::new(p1.pos + dl0 * lw, lu, 1.0));
        dst.push(Vertex::new(r0, ru, 1.0));

        if p1.flags.contains(PointFlags::BEVEL) {
            dst.push(Vertex::new(p1.pos + dl0 * lw, lu, 1.0));
            dst.push(Vertex::new(r0, ru, 1.0));
            dst.push(Vertex::new(p1.pos + dl1 * lw, lu, 1.0));
            dst.push(Vertex::new(r1, ru, 1.0));
        } else {
            let l0 = p1.pos + p1.dm * lw;
            dst.push(Vertex::new(p1.pos + dl0 * lw, lu, 1.0));
            dst.push(Vertex::new(p1.pos, 0.5, 1.0));
            dst.push(Vertex::new(l0, lu, 1.0));
            dst.push(Vertex::new(l0, lu, 1.0));
            dst.push(Vertex::new(p1.pos + dl1 * lw, lu, 1.0));
            dst.push(Vertex::new(p1.pos, 0.5, 1.0));
        }

        dst.push(Vertex::new(p1.pos + dl1 * lw, lu, 1.0));
        dst.push(Vertex::new(r1, ru, 1.0));
    }
}

#[allow(clippy::too_many_arguments)]
fn round_join(
    dst: &mut Vec<Vertex>,
    p0: Point,
    p1: Point,
    lw: f32,
    rw: f32,
    lu: f32,
    ru: f32,
    ncap: u32,
) {
    let dl0 = Vec2::new(p0.dir.y, -p0.dir.x);
    let dl1 = Vec2::new(p1.dir.y, -p1.dir.x);

    if p1.flags.contains(PointFlags::LEFT) {
        let (l0, l1) = choose_bevel(p1.flags.contains(PointFlags::INNER_BEVEL), p0, p1, lw);
        let a0 = (-dl0.y).atan2(-dl0.x);
        let mut a1 = (-dl1.y).atan2(-dl1.x);
        if a1 > a0 {
            a1 -= std::f32::consts::TAU;
        }

        dst.push(Vertex::new(l0, lu, 1.0));
        dst.push(Vertex::new(p1.pos - dl0 * rw, ru, 1.0));

        let n = (((a0 - a1) / std::f32::consts::PI * ncap as f32).ceil() as u32).clamp(2, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let a = a0 + u * (a1 - a0);
            let r = p1.pos + Vec2::new(a.cos(), a.sin()) * rw;
            dst.push(Vertex::new(p1.pos, 0.5, 1.0));
            dst.push(Vertex::new(r, ru, 1.0));
        }

        dst.push(Vertex::new(l1, lu, 1.0));
        dst.push(Vertex::new(p1.pos - dl1 * rw, ru, 1.0));
    } else {
        let (r0, r1) = choose_bevel(p1.flags.contains(PointFlags::INNER_BEVEL), p0, p1, -rw);
        let a0 = dl0.y.atan2(dl0.x);
        let mut a1 = dl1.y.atan2(dl1.x);
        if a1 < a0 {
            a1 += std::f32::consts::TAU;
        }

        dst.push(Vertex::new(p1.pos + dl0 * lw, lu, 1.0));
        dst.push(Vertex::new(r0, ru, 1.0));

        let n = (((a1 - a0) / std::f32::consts::PI * ncap as f32).ceil() as u32).clamp(2, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let a = a0 + u * (a1 - a0);
            let l = p1.pos + Vec2::new(a.cos(), a.sin()) * lw;
            dst.push(Vertex::new(l, lu, 1.0));
            dst.push(Vertex::new(p1.pos, 0.5, 1.0));
        }

        dst.push(Vertex::new(p1.pos + dl1 * lw, lu, 1.0));
        dst.push(Vertex::new(r1, ru, 1.0));
    }
}
