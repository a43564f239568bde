//! The drawing context: public entry point of the crate.
//!
//! A [`Context`] owns a renderer plus the full CPU side of the pipeline:
//! state stack, instruction queue, flattened path cache and call batcher.
//! Shapes are recorded in local coordinates, mapped through the current
//! transform at record time, tessellated lazily when a fill or stroke needs
//! geometry, and batched into one frame the renderer consumes at
//! [`end_frame`](Context::end_frame).

use crate::batch::{BatchLimits, CallBatcher};
use crate::cache::PathCache;
use crate::color::Color;
use crate::composite::{BlendFactor, CompositeOperation, CompositeOperationState};
use crate::error::Error;
use crate::fill::expand_fill;
use crate::instructions::{Instruction, InstructionQueue};
use crate::math::{self, Tolerances, KAPPA90};
use crate::paint::Paint;
use crate::renderer::{ImageFlags, Renderer, TextureId, TextureKind};
use crate::state::StateStack;
use crate::stroke::expand_stroke;
use crate::style::{LineCap, LineJoin, Winding};
use crate::vertex::Vertex;
use glam::{Affine2, Vec2};

pub struct Context<R: Renderer> {
    renderer: R,
    states: StateStack,
    queue: InstructionQueue,
    cache: PathCache,
    batcher: CallBatcher,
    tol: Tolerances,
    /// Last recorded path position in local coordinates, the anchor for
    /// `quad_to` and `arc_to`.
    last_point: Vec2,
}

impl<R: Renderer> Context<R> {
    pub fn new(renderer: R) -> Self {
        Self::with_limits(renderer, BatchLimits::default())
    }

    pub fn with_limits(renderer: R, limits: BatchLimits) -> Self {
        let stencil_strokes = renderer.features().stencil_strokes;
        Self {
            renderer,
            states: StateStack::new(),
            queue: InstructionQueue::new(),
            cache: PathCache::new(),
            batcher: CallBatcher::new(stencil_strokes, limits),
            tol: Tolerances::default(),
            last_point: Vec2::ZERO,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // Frame lifecycle

    /// Starts a frame: resets the state stack and adapts tessellation
    /// tolerances to the device pixel ratio.
    pub fn begin_frame(&mut self, view_size: Vec2, device_ratio: f32) {
        tracing::trace!(?view_size, device_ratio, "begin frame");
        self.states.clear();
        self.tol = Tolerances::from_ratio(device_ratio);
        self.batcher.begin_frame(view_size, device_ratio);
    }

    /// Submits everything recorded this frame to the renderer.
    pub fn end_frame(&mut self) {
        self.renderer.flush(self.batcher.frame());
        self.batcher.clear();
    }

    /// Drops everything recorded this frame without rendering.
    pub fn cancel_frame(&mut self) {
        self.batcher.clear();
    }

    // State stack

    pub fn save(&mut self) {
        self.states.save();
    }

    pub fn restore(&mut self) {
        self.states.restore();
    }

    /// Resets the current state to defaults without touching the stack.
    pub fn reset(&mut self) {
        self.states.reset_current();
    }

    pub fn set_shape_antialias(&mut self, enabled: bool) {
        self.states.current_mut().shape_antialias = enabled;
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.states.current_mut().stroke_width = width;
    }

    pub fn set_miter_limit(&mut self, limit: f32) {
        self.states.current_mut().miter_limit = limit;
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.states.current_mut().line_cap = cap;
    }

    pub fn set_line_join(&mut self, join: LineJoin) {
        self.states.current_mut().line_join = join;
    }

    /// Alpha applied on top of every paint, including nested frames of
    /// save/restore.
    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.states.current_mut().alpha = alpha;
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.states.current_mut().fill = Paint::color(color);
    }

    /// Sets the fill paint, folding in the current transform so the paint
    /// stays anchored to the shapes recorded under it.
    pub fn set_fill_paint(&mut self, paint: Paint) {
        let state = self.states.current_mut();
        state.fill = paint;
        let xform = state.xform;
        state.fill.apply_transform(&xform);
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.states.current_mut().stroke = Paint::color(color);
    }

    pub fn set_stroke_paint(&mut self, paint: Paint) {
        let state = self.states.current_mut();
        state.stroke = paint;
        let xform = state.xform;
        state.stroke.apply_transform(&xform);
    }

    pub fn set_composite_operation(&mut self, op: CompositeOperation) {
        self.states.current_mut().composite = op.into();
    }

    pub fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.states.current_mut().composite = CompositeOperationState::with_func(src, dst);
    }

    pub fn set_blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.states.current_mut().composite =
            CompositeOperationState::separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
    }

    // Transforms

    /// Appends `t` to the current transform; recorded shapes see the
    /// composition.
    pub fn transform(&mut self, t: Affine2) {
        let state = self.states.current_mut();
        state.xform *= t;
    }

    pub fn reset_transform(&mut self) {
        self.states.current_mut().xform = Affine2::IDENTITY;
    }

    pub fn current_transform(&self) -> Affine2 {
        self.states.current().xform
    }

    pub fn translate(&mut self, v: Vec2) {
        self.transform(Affine2::from_translation(v));
    }

    pub fn rotate(&mut self, angle: f32) {
        self.transform(Affine2::from_angle(angle));
    }

    pub fn scale(&mut self, v: Vec2) {
        self.transform(Affine2::from_scale(v));
    }

    pub fn skew_x(&mut self, angle: f32) {
        self.transform(Affine2::from_cols(
            Vec2::new(1.0, 0.0),
            Vec2::new(angle.tan(), 1.0),
            Vec2::ZERO,
        ));
    }

    pub fn skew_y(&mut self, angle: f32) {
        self.transform(Affine2::from_cols(
            Vec2::new(1.0, angle.tan()),
            Vec2::new(0.0, 1.0),
            Vec2::ZERO,
        ));
    }

    // Scissoring

    /// Replaces the scissor with an axis-aligned rect under the current
    /// transform.
    pub fn scissor(&mut self, pos: Vec2, size: Vec2) {
        self.states.current_mut().set_scissor(pos, size);
    }

    /// Intersects the current scissor with a rect. The intersection is
    /// computed in the previous scissor's space, so rotated scissors produce
    /// a conservative axis-aligned result.
    pub fn intersect_scissor(&mut self, pos: Vec2, size: Vec2) {
        self.states.current_mut().intersect_scissor(pos, size);
    }

    pub fn reset_scissor(&mut self) {
        self.states.current_mut().reset_scissor();
    }

    // Images

    pub fn create_image(
        &mut self,
        kind: TextureKind,
        width: u32,
        height: u32,
        flags: ImageFlags,
        data: Option<&[u8]>,
    ) -> Result<TextureId, Error> {
        self.renderer.create_texture(kind, width, height, flags, data)
    }

    /// Replaces the full contents of an image.
    pub fn update_image(&mut self, id: TextureId, data: &[u8]) -> Result<(), Error> {
        let info = self
            .renderer
            .texture_info(id)
            .ok_or(Error::UnknownTexture(id))?;
        self.renderer.update_texture(id, 0, info.height, data)
    }

    pub fn delete_image(&mut self, id: TextureId) -> Result<(), Error> {
        self.renderer.delete_texture(id)
    }

    pub fn image_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.renderer.texture_info(id).map(|i| (i.width, i.height))
    }

    // Path recording

    /// Clears the recorded path and its flattened cache.
    pub fn begin_path(&mut self) {
        self.queue.clear();
        self.cache.clear();
    }

    pub fn move_to(&mut self, p: Vec2) {
        let xform = self.states.current().xform;
        self.queue.push(Instruction::MoveTo(xform.transform_point2(p)));
        self.last_point = p;
    }

    pub fn line_to(&mut self, p: Vec2) {
        let xform = self.states.current().xform;
        self.queue.push(Instruction::LineTo(xform.transform_point2(p)));
        self.last_point = p;
    }

    pub fn bezier_to(&mut self, c1: Vec2, c2: Vec2, end: Vec2) {
        let xform = self.states.current().xform;
        self.queue.push(Instruction::BezierTo {
            c1: xform.transform_point2(c1),
            c2: xform.transform_point2(c2),
            end: xform.transform_point2(end),
        });
        self.last_point = end;
    }

    /// Quadratic curve, recorded as the equivalent cubic.
    pub fn quad_to(&mut self, c: Vec2, end: Vec2) {
        let p0 = self.last_point;
        self.bezier_to(
            p0 + 2.0 / 3.0 * (c - p0),
            end + 2.0 / 3.0 * (c - end),
            end,
        );
    }

    /// Circular arc from the current point towards `p1`, turning onto the
    /// segment `p1 -> p2`, with the given radius.
    pub fn arc_to(&mut self, p1: Vec2, p2: Vec2, radius: f32) {
        if self.queue.is_empty() {
            return;
        }
        let p0 = self.last_point;

        // Degenerate into a line when the corner is too tight to matter.
        if math::pt_equals(p0, p1, self.tol.dist)
            || math::pt_equals(p1, p2, self.tol.dist)
            || math::dist_pt_seg(p1, p0, p2) < self.tol.dist * self.tol.dist
            || radius < self.tol.dist
        {
            self.line_to(p1);
            return;
        }

        let (d0, _) = math::normalize(p0 - p1);
        let (d1, _) = math::normalize(p2 - p1);
        let a = d0.dot(d1).acos();
        let d = radius / (a * 0.5).tan();

        if d > 10000.0 {
            self.line_to(p1);
            return;
        }

        let (center, a0, a1, dir) = if math::cross(d0, d1) > 0.0 {
            (
                Vec2::new(p1.x + d0.x * d + d0.y * radius, p1.y + d0.y * d - d0.x * radius),
                d0.x.atan2(-d0.y),
                (-d1.x).atan2(d1.y),
                Winding::Cw,
            )
        } else {
            (
                Vec2::new(p1.x + d0.x * d - d0.y * radius, p1.y + d0.y * d + d0.x * radius),
                (-d0.x).atan2(d0.y),
                d1.x.atan2(-d1.y),
                Winding::Ccw,
            )
        };
        self.arc(center, radius, a0, a1, dir);
    }

    pub fn close_path(&mut self) {
        self.queue.push(Instruction::Close);
    }

    /// Sets the winding of the current sub-path; [`Winding::Cw`] marks a
    /// hole.
    pub fn path_winding(&mut self, winding: Winding) {
        self.queue.push(Instruction::Winding(winding));
    }

    // Shapes

    pub fn rect(&mut self, pos: Vec2, size: Vec2) {
        self.move_to(pos);
        self.line_to(Vec2::new(pos.x, pos.y + size.y));
        self.line_to(pos + size);
        self.line_to(Vec2::new(pos.x + size.x, pos.y));
        self.close_path();
    }

    pub fn rounded_rect(&mut self, pos: Vec2, size: Vec2, radius: f32) {
        self.rounded_rect_varying(pos, size, radius, radius, radius, radius);
    }

    /// Rounded rect with one radius per corner. Radii are clamped to half
    /// the rect size; negative sizes flip the corners with them.
    pub fn rounded_rect_varying(
        &mut self,
        pos: Vec2,
        size: Vec2,
        top_left: f32,
        top_right: f32,
        bottom_right: f32,
        bottom_left: f32,
    ) {
        if top_left < 0.1 && top_right < 0.1 && bottom_right < 0.1 && bottom_left < 0.1 {
            self.rect(pos, size);
            return;
        }

        let half = size.abs() * 0.5;
        let sign = Vec2::new(size.x.signum(), size.y.signum());
        let bl = Vec2::new(bottom_left.min(half.x), bottom_left.min(half.y)) * sign;
        let br = Vec2::new(bottom_right.min(half.x), bottom_right.min(half.y)) * sign;
        let tr = Vec2::new(top_right.min(half.x), top_right.min(half.y)) * sign;
        let tl = Vec2::new(top_left.min(half.x), top_left.min(half.y)) * sign;
        let (x, y) = (pos.x, pos.y);
        let (w, h) = (size.x, size.y);
        let k = 1.0 - KAPPA90;

        self.move_to(Vec2::new(x, y + tl.y));
        self.line_to(Vec2::new(x, y + h - bl.y));
        self.bezier_to(
            Vec2::new(x, y + h - bl.y * k),
            Vec2::new(x + bl.x * k, y + h),
            Vec2::new(x + bl.x, y + h),
        );
        self.line_to(Vec2::new(x + w - br.x, y + h));
        self.bezier_to(
            Vec2::new(x + w - br.x * k, y + h),
            Vec2::new(x + w, y + h - br.y * k),
            Vec2::new(x + w, y + h - br.y),
        );
        self.line_to(Vec2::new(x + w, y + tr.y));
        self.bezier_to(
            Vec2::new(x + w, y + tr.y * k),
            Vec2::new(x + w - tr.x * k, y),
            Vec2::new(x + w - tr.x, y),
        );
        self.line_to(Vec2::new(x + tl.x, y));
        self.bezier_to(
            Vec2::new(x + tl.x * k, y),
            Vec2::new(x, y + tl.y * k),
            Vec2::new(x, y + tl.y),
        );
        self.close_path();
    }

    pub fn ellipse(&mut self, center: Vec2, radii: Vec2) {
        let (c, r) = (center, radii);
        self.move_to(Vec2::new(c.x - r.x, c.y));
        self.bezier_to(
            Vec2::new(c.x - r.x, c.y + r.y * KAPPA90),
            Vec2::new(c.x - r.x * KAPPA90, c.y + r.y),
            Vec2::new(c.x, c.y + r.y),
        );
        self.bezier_to(
            Vec2::new(c.x + r.x * KAPPA90, c.y + r.y),
            Vec2::new(c.x + r.x, c.y + r.y * KAPPA90),
            Vec2::new(c.x + r.x, c.y),
        );
        self.bezier_to(
            Vec2::new(c.x + r.x, c.y - r.y * KAPPA90),
            Vec2::new(c.x + r.x * KAPPA90, c.y - r.y),
            Vec2::new(c.x, c.y - r.y),
        );
        self.bezier_to(
            Vec2::new(c.x - r.x * KAPPA90, c.y - r.y),
            Vec2::new(c.x - r.x, c.y - r.y * KAPPA90),
            Vec2::new(c.x - r.x, c.y),
        );
        self.close_path();
    }

    pub fn circle(&mut self, center: Vec2, radius: f32) {
        self.ellipse(center, Vec2::splat(radius));
    }

    /// Arc around `center`, from angle `a0` to `a1` in radians, swept in the
    /// direction given by `dir`. Continues the current sub-path with a line
    /// when one exists.
    pub fn arc(&mut self, center: Vec2, radius: f32, a0: f32, a1: f32, dir: Winding) {
        use std::f32::consts::{PI, TAU};

        let continues = !self.queue.is_empty();
        let mut da = a1 - a0;
        if dir == Winding::Cw {
            if da.abs() >= TAU {
                da = TAU;
            } else {
                while da < 0.0 {
                    da += TAU;
                }
            }
        } else if da.abs() >= TAU {
            da = -TAU;
        } else {
            while da > 0.0 {
                da -= TAU;
            }
        }

        let ndivs = ((da.abs() / (PI * 0.5) + 0.5) as i32).clamp(1, 5);
        let hda = (da / ndivs as f32) / 2.0;
        let mut kappa = (4.0 / 3.0 * (1.0 - hda.cos()) / hda.sin()).abs();
        if dir == Winding::Ccw {
            kappa = -kappa;
        }

        let mut prev = Vec2::ZERO;
        let mut prev_tan = Vec2::ZERO;
        for i in 0..=ndivs {
            let a = a0 + da * (i as f32 / ndivs as f32);
            let dirv = Vec2::new(a.cos(), a.sin());
            let p = center + dirv * radius;
            let tan = Vec2::new(-dirv.y, dirv.x) * radius * kappa;

            if i == 0 {
                if continues {
                    self.line_to(p);
                } else {
                    self.move_to(p);
                }
            } else {
                self.bezier_to(prev + prev_tan, p - tan, p);
            }
            prev = p;
            prev_tan = tan;
        }
    }

    // Rendering

    /// Fills the recorded path with the current fill paint.
    pub fn fill(&mut self) {
        let state = *self.states.current();
        let mut paint = state.fill;
        paint.inner_color.a *= state.alpha;
        paint.outer_color.a *= state.alpha;

        self.queue.flatten_into(&mut self.cache, &self.tol);
        let fringe = if self.renderer.features().edge_antialias && state.shape_antialias {
            self.tol.fringe
        } else {
            0.0
        };
        expand_fill(&mut self.cache, fringe, LineJoin::Miter, 2.4, self.tol.fringe);

        let texture = paint.image.and_then(|id| self.renderer.texture_info(id));
        self.batcher.fill(
            &paint,
            state.composite,
            &state.scissor,
            self.tol.fringe,
            self.cache.bounds(),
            self.cache.paths(),
            texture.as_ref(),
        );
    }

    /// Strokes the recorded path with the current stroke paint.
    pub fn stroke(&mut self) {
        let state = *self.states.current();
        let scale = math::average_scale(&state.xform);
        let mut width = (state.stroke_width * scale).clamp(0.0, 200.0);
        let mut paint = state.stroke;

        if width < self.tol.fringe {
            // Too thin to resolve: render at fringe width and push the lost
            // coverage into alpha.
            let coverage = (width / self.tol.fringe).clamp(0.0, 1.0);
            paint.inner_color.a *= coverage * coverage;
            paint.outer_color.a *= coverage * coverage;
            width = self.tol.fringe;
        }
        paint.inner_color.a *= state.alpha;
        paint.outer_color.a *= state.alpha;

        self.queue.flatten_into(&mut self.cache, &self.tol);
        let fringe = if self.renderer.features().edge_antialias && state.shape_antialias {
            self.tol.fringe
        } else {
            0.0
        };
        expand_stroke(
            &mut self.cache,
            width * 0.5,
            fringe,
            state.line_cap,
            state.line_join,
            state.miter_limit,
            &self.tol,
        );

        let texture = paint.image.and_then(|id| self.renderer.texture_info(id));
        self.batcher.stroke(
            &paint,
            state.composite,
            &state.scissor,
            self.tol.fringe,
            width,
            self.cache.paths(),
            texture.as_ref(),
        );
    }

    /// Draws a pre-built triangle list with the given paint, bypassing path
    /// expansion. Text renderers feed glyph quads through here.
    pub fn triangles(&mut self, paint: &Paint, vertices: &[Vertex]) {
        let state = *self.states.current();
        let mut paint = *paint;
        paint.inner_color.a *= state.alpha;
        paint.outer_color.a *= state.alpha;

        let texture = paint.image.and_then(|id| self.renderer.texture_info(id));
        self.batcher.triangles(
            &paint,
            state.composite,
            &state.scissor,
            self.tol.fringe,
            vertices,
            texture.as_ref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::CallKind;
    use crate::headless::HeadlessRenderer;

    fn ctx() -> Context<HeadlessRenderer> {
        let mut ctx = Context::new(HeadlessRenderer::new());
        ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        ctx
    }

    #[test]
    fn test_shapes_record_in_device_space() {
        let mut ctx = ctx();
        ctx.translate(Vec2::new(100.0, 0.0));
        ctx.begin_path();
        ctx.move_to(Vec2::new(10.0, 10.0));
        ctx.line_to(Vec2::new(20.0, 10.0));
        let instrs = ctx.queue.instructions();
        assert_eq!(instrs[0], Instruction::MoveTo(Vec2::new(110.0, 10.0)));
        assert_eq!(instrs[1], Instruction::LineTo(Vec2::new(120.0, 10.0)));
    }

    #[test]
    fn test_transform_order_is_local_first() {
        let mut ctx = ctx();
        ctx.translate(Vec2::new(100.0, 0.0));
        ctx.scale(Vec2::splat(2.0));
        // Scale applies to the point, translate to the result.
        ctx.begin_path();
        ctx.move_to(Vec2::new(5.0, 5.0));
        assert_eq!(
            ctx.queue.instructions()[0],
            Instruction::MoveTo(Vec2::new(110.0, 10.0))
        );
    }

    #[test]
    fn test_save_restore_isolates_state() {
        let mut ctx = ctx();
        ctx.set_stroke_width(4.0);
        ctx.save();
        ctx.set_stroke_width(9.0);
        ctx.translate(Vec2::new(50.0, 0.0));
        ctx.restore();
        assert_eq!(ctx.states.current().stroke_width, 4.0);
        assert_eq!(ctx.current_transform(), Affine2::IDENTITY);
    }

    #[test]
    fn test_quad_to_lifts_to_cubic() {
        let mut ctx = ctx();
        ctx.begin_path();
        ctx.move_to(Vec2::new(0.0, 0.0));
        ctx.quad_to(Vec2::new(30.0, 0.0), Vec2::new(30.0, 30.0));
        let Instruction::BezierTo { c1, c2, end } = ctx.queue.instructions()[1] else {
            panic!("expected a cubic");
        };
        assert_eq!(c1, Vec2::new(20.0, 0.0));
        assert_eq!(c2, Vec2::new(30.0, 10.0));
        assert_eq!(end, Vec2::new(30.0, 30.0));
    }

    #[test]
    fn test_arc_to_degenerates_to_line() {
        let mut ctx = ctx();
        ctx.begin_path();
        ctx.move_to(Vec2::ZERO);
        // Collinear corner point.
        ctx.arc_to(Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0), 5.0);
        assert_eq!(
            ctx.queue.instructions()[1],
            Instruction::LineTo(Vec2::new(10.0, 0.0))
        );
    }

    #[test]
    fn test_fill_then_stroke_flattens_once() {
        let mut ctx = ctx();
        ctx.begin_path();
        ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(40.0, 20.0));
        ctx.fill();
        let points_after_fill = ctx.cache.paths()[0].points().len();
        ctx.stroke();
        // The cache was reused, not re-flattened.
        assert_eq!(ctx.cache.paths()[0].points().len(), points_after_fill);
        let frame = ctx.batcher.frame();
        assert_eq!(frame.calls.len(), 2);
        assert_eq!(frame.calls[0].kind, CallKind::ConvexFill);
        assert_eq!(frame.calls[1].kind, CallKind::StencilStroke);
    }

    #[test]
    fn test_thin_stroke_compensates_with_alpha() {
        let mut ctx = ctx();
        ctx.set_stroke_width(0.5);
        ctx.set_stroke_color(Color::rgbaf(1.0, 1.0, 1.0, 1.0));
        ctx.begin_path();
        ctx.move_to(Vec2::ZERO);
        ctx.line_to(Vec2::new(100.0, 0.0));
        ctx.stroke();
        let frame = ctx.batcher.frame();
        // Width clamps up to the fringe; alpha drops to coverage squared.
        let inner = frame.uniforms[0].inner_color;
        assert!((inner.w - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_global_alpha_multiplies_paint() {
        let mut ctx = ctx();
        ctx.set_global_alpha(0.5);
        ctx.set_fill_color(Color::rgbaf(1.0, 0.0, 0.0, 0.8));
        ctx.begin_path();
        ctx.rect(Vec2::ZERO, Vec2::new(10.0, 10.0));
        ctx.fill();
        let frame = ctx.batcher.frame();
        let inner = frame.uniforms[0].inner_color;
        // Premultiplied by the effective alpha 0.4.
        assert!((inner.w - 0.4).abs() < 1e-5);
        assert!((inner.x - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_antialias_off_skips_fringe() {
        let mut ctx = ctx();
        ctx.set_shape_antialias(false);
        ctx.begin_path();
        ctx.rect(Vec2::new(10.0, 10.0), Vec2::new(40.0, 20.0));
        ctx.fill();
        assert!(ctx.cache.paths()[0].stroke_vertices().is_empty());
    }

    #[test]
    fn test_end_frame_flushes_and_clears() {
        let mut ctx = ctx();
        ctx.begin_path();
        ctx.circle(Vec2::new(100.0, 100.0), 30.0);
        ctx.fill();
        ctx.end_frame();
        assert_eq!(ctx.renderer().frames_flushed(), 1);
        assert!(ctx.renderer().events().len() > 0);
        assert!(ctx.batcher.is_empty());
    }

    #[test]
    fn test_cancel_frame_discards() {
        let mut ctx = ctx();
        ctx.begin_path();
        ctx.rect(Vec2::ZERO, Vec2::new(10.0, 10.0));
        ctx.fill();
        ctx.cancel_frame();
        ctx.end_frame();
        assert_eq!(ctx.renderer().frames_flushed(), 1);
        assert!(ctx.renderer().events().is_empty());
    }

    #[test]
    fn test_hole_winding() {
        let mut ctx = ctx();
        ctx.begin_path();
        ctx.rect(Vec2::ZERO, Vec2::new(100.0, 100.0));
        ctx.circle(Vec2::new(50.0, 50.0), 20.0);
        ctx.path_winding(Winding::Cw);
        ctx.fill();
        let frame = ctx.batcher.frame();
        // Two sub-paths cannot take the convex route.
        assert_eq!(frame.calls[0].kind, CallKind::Fill);
        assert_eq!(frame.calls[0].path_count, 2);
    }

    #[test]
    fn test_arc_spans_quarters() {
        let mut ctx = ctx();
        ctx.begin_path();
        ctx.arc(
            Vec2::new(50.0, 50.0),
            20.0,
            0.0,
            std::f32::consts::PI,
            Winding::Cw,
        );
        // Half circle: move plus two quarter beziers.
        let instrs = ctx.queue.instructions();
        assert_eq!(instrs.len(), 3);
        assert!(matches!(instrs[0], Instruction::MoveTo(_)));
        assert!(matches!(instrs[1], Instruction::BezierTo { .. }));
        let Instruction::BezierTo { end, .. } = instrs[2] else {
            panic!("expected a cubic");
        };
        assert!((end - Vec2::new(30.0, 50.0)).length() < 1e-3);
    }

    #[test]
    fn test_image_lifecycle() {
        let mut ctx = ctx();
        let img = ctx
            .create_image(TextureKind::Rgba, 4, 4, ImageFlags::empty(), None)
            .unwrap();
        assert_eq!(ctx.image_size(img), Some((4, 4)));
        ctx.update_image(img, &[128; 64]).unwrap();
        ctx.delete_image(img).unwrap();
        assert_eq!(ctx.image_size(img), None);
    }

    #[test]
    fn test_triangles_batch_directly() {
        let mut ctx = ctx();
        ctx.set_global_alpha(0.5);
        let img = ctx
            .create_image(TextureKind::Alpha, 16, 16, ImageFlags::empty(), None)
            .unwrap();
        let paint = Paint::image_pattern(Vec2::ZERO, Vec2::new(16.0, 16.0), 0.0, img, 1.0);
        let verts = [
            Vertex::new(Vec2::new(0.0, 0.0), 0.0, 0.0),
            Vertex::new(Vec2::new(10.0, 0.0), 1.0, 0.0),
            Vertex::new(Vec2::new(0.0, 10.0), 0.0, 1.0),
        ];
        ctx.triangles(&paint, &verts);
        let frame = ctx.batcher.frame();
        assert_eq!(frame.calls[0].kind, CallKind::Triangles);
        assert_eq!(frame.calls[0].triangle_count, 3);
        assert_eq!(frame.vertices.len(), 3);
        // Global alpha lands on the batched paint.
        assert!((frame.uniforms[0].inner_color.w - 0.5).abs() < 1e-5);
    }
}
