//! Saved drawing state: styles, transform and scissor.

use crate::color::Color;
use crate::composite::CompositeOperationState;
use crate::math;
use crate::paint::Paint;
use crate::style::{LineCap, LineJoin};
use glam::{Affine2, Vec2};

/// Maximum depth of the save/restore stack.
pub(crate) const MAX_STATES: usize = 32;

/// Transform-aligned scissor rectangle.
///
/// `extent` is the half-size in the scissor's own space; a negative extent
/// disables scissoring entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scissor {
    pub xform: Affine2,
    pub extent: Vec2,
}

impl Scissor {
    pub const DISABLED: Self = Self {
        xform: Affine2::ZERO,
        extent: Vec2::new(-1.0, -1.0),
    };

    pub fn is_enabled(&self) -> bool {
        self.extent.x >= 0.0
    }
}

/// One snapshot of every property affected by save/restore.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub composite: CompositeOperationState,
    pub shape_antialias: bool,
    pub fill: Paint,
    pub stroke: Paint,
    pub stroke_width: f32,
    pub miter_limit: f32,
    pub line_join: LineJoin,
    pub line_cap: LineCap,
    pub alpha: f32,
    pub xform: Affine2,
    pub scissor: Scissor,
}

impl Default for State {
    fn default() -> Self {
        Self {
            composite: CompositeOperationState::default(),
            shape_antialias: true,
            fill: Paint::color(Color::WHITE),
            stroke: Paint::color(Color::BLACK),
            stroke_width: 1.0,
            miter_limit: 10.0,
            line_join: LineJoin::Miter,
            line_cap: LineCap::Butt,
            alpha: 1.0,
            xform: Affine2::IDENTITY,
            scissor: Scissor::DISABLED,
        }
    }
}

impl State {
    /// Replaces the scissor with an axis-aligned rect in local coordinates.
    pub fn set_scissor(&mut self, pos: Vec2, size: Vec2) {
        let size = size.max(Vec2::ZERO);
        self.scissor.xform = self.xform * Affine2::from_translation(pos + size * 0.5);
        self.scissor.extent = size * 0.5;
    }

    /// Intersects the current scissor with a local-space rect.
    ///
    /// The existing scissor is projected into local space as an axis-aligned
    /// bound first, so under rotation the result is an approximation.
    pub fn intersect_scissor(&mut self, pos: Vec2, size: Vec2) {
        if !self.scissor.is_enabled() {
            self.set_scissor(pos, size);
            return;
        }

        let ex = self.scissor.extent.x;
        let ey = self.scissor.extent.y;
        let p = math::inverse_or_identity(&self.xform) * self.scissor.xform;
        let m = p.matrix2;
        let tex = ex * m.x_axis.x.abs() + ey * m.y_axis.x.abs();
        let tey = ex * m.x_axis.y.abs() + ey * m.y_axis.y.abs();

        let (ipos, isize) = isect_rects(
            p.translation - Vec2::new(tex, tey),
            Vec2::new(tex, tey) * 2.0,
            pos,
            size,
        );
        self.set_scissor(ipos, isize);
    }

    pub fn reset_scissor(&mut self) {
        self.scissor = Scissor::DISABLED;
    }
}

fn isect_rects(a_pos: Vec2, a_size: Vec2, b_pos: Vec2, b_size: Vec2) -> (Vec2, Vec2) {
    let min = a_pos.max(b_pos);
    let max = (a_pos + a_size).min(b_pos + b_size);
    (min, (max - min).max(Vec2::ZERO))
}

/// Fixed-depth stack of saved states.
///
/// Saving past the cap and restoring the last remaining state are both
/// silently ignored, matching how unbalanced save/restore pairs are treated
/// in canvas-style APIs.
#[derive(Debug)]
pub struct StateStack {
    current: State,
    saved: Vec<State>,
}

impl StateStack {
    pub fn new() -> Self {
        Self {
            current: State::default(),
            saved: Vec::with_capacity(MAX_STATES - 1),
        }
    }

    pub fn current(&self) -> &State {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut State {
        &mut self.current
    }

    pub fn save(&mut self) {
        // Total depth counts the live state plus the saved ones.
        if self.saved.len() + 1 >= MAX_STATES {
            return;
        }
        self.saved.push(self.current);
    }

    pub fn restore(&mut self) {
        if let Some(prev) = self.saved.pop() {
            self.current = prev;
        }
    }

    /// Resets the current state to defaults without touching saved ones.
    pub fn reset_current(&mut self) {
        self.current = State::default();
    }

    /// Drops every saved state, leaving a single default one.
    pub fn clear(&mut self) {
        self.saved.clear();
        self.current = State::default();
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.saved.len() + 1
    }
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new()
    }
}
