//! Deferred path recording and curve flattening.
//!
//! Draw APIs append [`Instruction`]s with positions already mapped through
//! the state transform. Nothing is tessellated until a fill or stroke needs
//! the geometry, so transform churn between `move_to` calls costs only the
//! per-point multiply.

use crate::cache::PathCache;
use crate::math::Tolerances;
use crate::path::PointFlags;
use crate::style::Winding;
use glam::Vec2;

/// One recorded path instruction, in device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    MoveTo(Vec2),
    LineTo(Vec2),
    BezierTo { c1: Vec2, c2: Vec2, end: Vec2 },
    Close,
    Winding(Winding),
}

/// Append-only instruction queue, flattened on demand.
#[derive(Debug, Default)]
pub struct InstructionQueue {
    instructions: Vec<Instruction>,
}

impl InstructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Flattens the recorded instructions into `cache`.
    ///
    /// No-op while the cache still holds paths: a fill followed by a stroke
    /// of the same recording reuses the flattened points.
    pub(crate) fn flatten_into(&self, cache: &mut PathCache, tol: &Tolerances) {
        if !cache.is_empty() {
            return;
        }

        for instr in &self.instructions {
            match *instr {
                Instruction::MoveTo(p) => {
                    cache.add_path();
                    cache.add_point(p, PointFlags::CORNER, tol.dist);
                }
                Instruction::LineTo(p) => {
                    cache.add_point(p, PointFlags::CORNER, tol.dist);
                }
                Instruction::BezierTo { c1, c2, end } => {
                    if let Some(last) = cache.last_point() {
                        tessellate_bezier(cache, last, c1, c2, end, 0, PointFlags::CORNER, tol);
                    }
                }
                Instruction::Close => cache.close_last(),
                Instruction::Winding(w) => cache.set_winding(w),
            }
        }

        cache.finish(tol.dist);
    }
}

/// Adaptive De Casteljau subdivision.
///
/// Splits at the midpoint until the control points sit within `tol.tess` of
/// the chord, then emits the segment endpoint. Only the final endpoint
/// carries the caller's flags; interior subdivision points are smooth by
/// construction. Recursion is capped at depth 10, beyond which the segment
/// endpoint is simply dropped.
fn tessellate_bezier(
    cache: &mut PathCache,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    p4: Vec2,
    level: u32,
    flags: PointFlags,
    tol: &Tolerances,
) {
    if level > 10 {
        return;
    }

    let d = p4 - p1;
    let d2 = ((p2.x - p4.x) * d.y - (p2.y - p4.y) * d.x).abs();
    let d3 = ((p3.x - p4.x) * d.y - (p3.y - p4.y) * d.x).abs();

    if (d2 + d3) * (d2 + d3) < tol.tess * (d.x * d.x + d.y * d.y) {
        cache.add_point(p4, flags, tol.dist);
        return;
    }

    let p12 = (p1 + p2) * 0.5;
    let p23 = (p2 + p3) * 0.5;
    let p34 = (p3 + p4) * 0.5;
    let p123 = (p12 + p23) * 0.5;
    let p234 = (p23 + p34) * 0.5;
    let p1234 = (p123 + p234) * 0.5;

    tessellate_bezier(cache, p1, p12, p123, p1234, level + 1, PointFlags::empty(), tol);
    tessellate_bezier(cache, p1234, p234, p34, p4, level + 1, flags, tol);
}
