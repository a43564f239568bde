//! Render-call batching.
//!
//! Fills, strokes and raw triangle runs are appended as [`Call`]s into four
//! flat arrays: vertices, per-sub-path draw ranges, calls and fragment
//! uniform blocks. A backend uploads the arrays once per frame and replays
//! the call list in order, so draw order equals call order and no state
//! leaks between calls.
//!
//! Interior fans arrive as triangle fans but are stored as triangle lists,
//! which keeps the vertex stream renderable on APIs without fan primitives.

use crate::composite::CompositeOperationState;
use crate::math::Bounds;
use crate::paint::Paint;
use crate::path::Path;
use crate::renderer::{TextureId, TextureInfo};
use crate::state::Scissor;
use crate::uniforms::{FragUniforms, ShaderType};
use crate::vertex::Vertex;
use glam::Vec2;

/// A contiguous run in the frame vertex array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexRange {
    pub offset: u32,
    pub count: u32,
}

impl VertexRange {
    pub fn is_empty(self) -> bool {
        self.count == 0
    }

    /// `offset..offset + count` as a draw range.
    pub fn range(self) -> std::ops::Range<u32> {
        self.offset..self.offset + self.count
    }
}

/// Draw ranges for one expanded sub-path.
///
/// `fill` holds a triangle list covering the interior, `stroke` a triangle
/// strip for the stroke ribbon or fill fringe. Either may be empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpuPath {
    pub fill: VertexRange,
    pub stroke: VertexRange,
}

/// How a call's geometry is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Stencil the winding, draw the fringe, cover with a bounds quad.
    Fill,
    /// Single convex sub-path, drawn directly without stencil.
    ConvexFill,
    /// Stroke strips drawn directly.
    Stroke,
    /// Stroke strips drawn through a stencil pre-pass so overlapping
    /// segments blend once.
    StencilStroke,
    /// Raw textured triangles.
    Triangles,
}

/// One replayable draw call.
#[derive(Debug, Clone, Copy)]
pub struct Call {
    pub kind: CallKind,
    pub image: Option<TextureId>,
    /// Range in [`Frame::paths`] for fill and stroke kinds.
    pub path_offset: u32,
    pub path_count: u32,
    /// Vertex range for the cover quad or triangle run.
    pub triangle_offset: u32,
    pub triangle_count: u32,
    /// First slot in [`Frame::uniforms`]; some kinds use two consecutive
    /// slots.
    pub uniform_offset: u32,
    pub blend: CompositeOperationState,
}

/// Soft caps on per-frame batch growth.
///
/// A call that would push any array past its cap is dropped with a warning
/// instead of growing without bound; rendering continues with what fits.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub max_vertices: usize,
    pub max_paths: usize,
    pub max_calls: usize,
    pub max_uniforms: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_vertices: 4 * 1024 * 1024,
            max_paths: 65536,
            max_calls: 65536,
            max_uniforms: 65536,
        }
    }
}

/// One frame of batched geometry, borrowed from the batcher at flush time.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub vertices: &'a [Vertex],
    pub paths: &'a [GpuPath],
    pub calls: &'a [Call],
    pub uniforms: &'a [FragUniforms],
    /// Viewport size in logical units; backends divide by it to reach clip
    /// space.
    pub view_size: Vec2,
    pub device_ratio: f32,
}

/// Accumulates draw calls between `begin_frame` and flush.
#[derive(Debug)]
pub struct CallBatcher {
    vertices: Vec<Vertex>,
    paths: Vec<GpuPath>,
    calls: Vec<Call>,
    uniforms: Vec<FragUniforms>,
    view_size: Vec2,
    device_ratio: f32,
    stencil_strokes: bool,
    limits: BatchLimits,
}

impl CallBatcher {
    pub fn new(stencil_strokes: bool, limits: BatchLimits) -> Self {
        Self {
            vertices: Vec::new(),
            paths: Vec::new(),
            calls: Vec::new(),
            uniforms: Vec::new(),
            view_size: Vec2::ZERO,
            device_ratio: 1.0,
            stencil_strokes,
            limits,
        }
    }

    pub fn begin_frame(&mut self, view_size: Vec2, device_ratio: f32) {
        self.view_size = view_size;
        self.device_ratio = device_ratio;
    }

    /// Discards everything recorded since the last clear.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.paths.clear();
        self.calls.clear();
        self.uniforms.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            vertices: &self.vertices,
            paths: &self.paths,
            calls: &self.calls,
            uniforms: &self.uniforms,
            view_size: self.view_size,
            device_ratio: self.device_ratio,
        }
    }

    /// True when the arrays have room for the worst case of one more call.
    fn fits(&self, verts: usize, paths: usize, uniforms: usize) -> bool {
        if self.vertices.len() + verts > self.limits.max_vertices
            || self.paths.len() + paths > self.limits.max_paths
            || self.uniforms.len() + uniforms > self.limits.max_uniforms
            || self.calls.len() + 1 > self.limits.max_calls
        {
            tracing::warn!(
                verts,
                paths,
                uniforms,
                "batch limits exceeded, dropping call"
            );
            return false;
        }
        true
    }

    /// Records a fill over the expanded `paths`.
    ///
    /// A single convex sub-path takes the direct route; everything else is
    /// stencilled and covered with a quad over `bounds`.
    #[allow(clippy::too_many_arguments)]
    pub fn fill(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        bounds: Bounds,
        paths: &[Path],
        texture: Option<&TextureInfo>,
    ) {
        if paths.is_empty() {
            return;
        }

        let kind = if paths.len() == 1 && paths[0].is_convex() {
            CallKind::ConvexFill
        } else {
            CallKind::Fill
        };
        let nuniforms = if kind == CallKind::Fill { 2 } else { 1 };

        let mut nverts: usize = paths
            .iter()
            .map(|p| fan_list_len(p.fill_vertices().len()) + p.stroke_vertices().len())
            .sum();
        if kind == CallKind::Fill {
            nverts += 4;
        }
        if !self.fits(nverts, paths.len(), nuniforms) {
            return;
        }

        let path_offset = self.paths.len() as u32;
        for src in paths {
            let mut gp = GpuPath::default();

            let fan = src.fill_vertices();
            if fan.len() >= 3 {
                let offset = self.vertices.len() as u32;
                for j in 0..fan.len() - 2 {
                    self.vertices.push(fan[0]);
                    self.vertices.push(fan[j + 1]);
                    self.vertices.push(fan[j + 2]);
                }
                gp.fill = VertexRange {
                    offset,
                    count: self.vertices.len() as u32 - offset,
                };
            }

            let stroke = src.stroke_vertices();
            if !stroke.is_empty() {
                gp.stroke = VertexRange {
                    offset: self.vertices.len() as u32,
                    count: stroke.len() as u32,
                };
                self.vertices.extend_from_slice(stroke);
            }

            self.paths.push(gp);
        }

        let uniform_offset = self.uniforms.len() as u32;
        let mut triangle_offset = 0;
        let mut triangle_count = 0;
        if kind == CallKind::Fill {
            // Bounds quad for the cover pass.
            triangle_offset = self.vertices.len() as u32;
            triangle_count = 4;
            self.vertices.push(Vertex::new(bounds.max, 0.5, 1.0));
            self.vertices
                .push(Vertex::new(Vec2::new(bounds.max.x, bounds.min.y), 0.5, 1.0));
            self.vertices
                .push(Vertex::new(Vec2::new(bounds.min.x, bounds.max.y), 0.5, 1.0));
            self.vertices.push(Vertex::new(bounds.min, 0.5, 1.0));

            self.uniforms.push(FragUniforms::simple());
            self.uniforms.push(FragUniforms::convert_paint(
                paint, scissor, fringe, fringe, -1.0, texture,
            ));
        } else {
            self.uniforms.push(FragUniforms::convert_paint(
                paint, scissor, fringe, fringe, -1.0, texture,
            ));
        }

        self.calls.push(Call {
            kind,
            image: paint.image,
            path_offset,
            path_count: paths.len() as u32,
            triangle_offset,
            triangle_count,
            uniform_offset,
            blend: composite,
        });
    }

    /// Records a stroke over the expanded `paths`.
    #[allow(clippy::too_many_arguments)]
    pub fn stroke(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: &[Path],
        texture: Option<&TextureInfo>,
    ) {
        if paths.is_empty() {
            return;
        }

        let kind = if self.stencil_strokes {
            CallKind::StencilStroke
        } else {
            CallKind::Stroke
        };
        let nuniforms = if self.stencil_strokes { 2 } else { 1 };

        let nverts: usize = paths.iter().map(|p| p.stroke_vertices().len()).sum();
        if !self.fits(nverts, paths.len(), nuniforms) {
            return;
        }

        let path_offset = self.paths.len() as u32;
        for src in paths {
            let mut gp = GpuPath::default();
            let stroke = src.stroke_vertices();
            if !stroke.is_empty() {
                gp.stroke = VertexRange {
                    offset: self.vertices.len() as u32,
                    count: stroke.len() as u32,
                };
                self.vertices.extend_from_slice(stroke);
            }
            self.paths.push(gp);
        }

        let uniform_offset = self.uniforms.len() as u32;
        self.uniforms.push(FragUniforms::convert_paint(
            paint,
            scissor,
            stroke_width,
            fringe,
            -1.0,
            texture,
        ));
        if self.stencil_strokes {
            // Second block for the stencil draw pass: cut off fragments the
            // antialiased pass will redraw.
            self.uniforms.push(FragUniforms::convert_paint(
                paint,
                scissor,
                stroke_width,
                fringe,
                1.0 - 0.5 / 255.0,
                texture,
            ));
        }

        self.calls.push(Call {
            kind,
            image: paint.image,
            path_offset,
            path_count: paths.len() as u32,
            triangle_offset: 0,
            triangle_count: 0,
            uniform_offset,
            blend: composite,
        });
    }

    /// Records a pre-built triangle run, the path text rendering takes.
    #[allow(clippy::too_many_arguments)]
    pub fn triangles(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        vertices: &[Vertex],
        texture: Option<&TextureInfo>,
    ) {
        if vertices.is_empty() {
            return;
        }
        if !self.fits(vertices.len(), 0, 1) {
            return;
        }

        let triangle_offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);

        let uniform_offset = self.uniforms.len() as u32;
        let mut frag = FragUniforms::convert_paint(paint, scissor, 1.0, fringe, -1.0, texture);
        frag.shader_type = ShaderType::Image as i32;
        self.uniforms.push(frag);

        self.calls.push(Call {
            kind: CallKind::Triangles,
            image: paint.image,
            path_offset: 0,
            path_count: 0,
            triangle_offset,
            triangle_count: vertices.len() as u32,
            uniform_offset,
            blend: composite,
        });
    }
}

/// Triangle-list length of a fan with `n` rim vertices.
fn fan_list_len(n: usize) -> usize {
    if n >= 3 { (n - 2) * 3 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::composite::CompositeOperation;
    use crate::instructions::{Instruction, InstructionQueue};
    use crate::math::Tolerances;
    use crate::style::LineJoin;
    use crate::{cache::PathCache, fill::expand_fill};

    fn expanded_rect() -> PathCache {
        let tol = Tolerances::default();
        let mut queue = InstructionQueue::new();
        queue.push(Instruction::MoveTo(Vec2::new(10.0, 10.0)));
        queue.push(Instruction::LineTo(Vec2::new(10.0, 30.0)));
        queue.push(Instruction::LineTo(Vec2::new(50.0, 30.0)));
        queue.push(Instruction::LineTo(Vec2::new(50.0, 10.0)));
        queue.push(Instruction::Close);
        let mut cache = PathCache::new();
        queue.flatten_into(&mut cache, &tol);
        expand_fill(&mut cache, 1.0, LineJoin::Miter, 2.4, 1.0);
        cache
    }

    fn white() -> Paint {
        Paint::color(Color::WHITE)
    }

    fn over() -> CompositeOperationState {
        CompositeOperation::SourceOver.into()
    }

    #[test]
    fn test_convex_fill_call_shape() {
        let cache = expanded_rect();
        let mut batcher = CallBatcher::new(true, BatchLimits::default());
        batcher.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        batcher.fill(
            &white(),
            over(),
            &Scissor::DISABLED,
            1.0,
            cache.bounds(),
            cache.paths(),
            None,
        );

        let frame = batcher.frame();
        assert_eq!(frame.calls.len(), 1);
        let call = frame.calls[0];
        assert_eq!(call.kind, CallKind::ConvexFill);
        assert_eq!(call.path_count, 1);
        assert_eq!(call.triangle_count, 0);
        assert_eq!(frame.uniforms.len(), 1);

        // Four rim vertices fan into two triangles.
        let gp = frame.paths[call.path_offset as usize];
        assert_eq!(gp.fill.count, 6);
        assert_eq!(gp.stroke.count, 10);
        assert_eq!(frame.vertices.len(), 16);
    }

    #[test]
    fn test_fill_call_gets_quad_and_two_uniforms() {
        // Two sub-paths force the stencil route.
        let tol = Tolerances::default();
        let mut queue = InstructionQueue::new();
        for base in [10.0f32, 100.0] {
            queue.push(Instruction::MoveTo(Vec2::new(base, 10.0)));
            queue.push(Instruction::LineTo(Vec2::new(base, 30.0)));
            queue.push(Instruction::LineTo(Vec2::new(base + 40.0, 30.0)));
            queue.push(Instruction::LineTo(Vec2::new(base + 40.0, 10.0)));
            queue.push(Instruction::Close);
        }
        let mut cache = PathCache::new();
        queue.flatten_into(&mut cache, &tol);
        expand_fill(&mut cache, 1.0, LineJoin::Miter, 2.4, 1.0);

        let mut batcher = CallBatcher::new(true, BatchLimits::default());
        batcher.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        batcher.fill(
            &white(),
            over(),
            &Scissor::DISABLED,
            1.0,
            cache.bounds(),
            cache.paths(),
            None,
        );

        let frame = batcher.frame();
        let call = frame.calls[0];
        assert_eq!(call.kind, CallKind::Fill);
        assert_eq!(call.path_count, 2);
        assert_eq!(call.triangle_count, 4);
        assert_eq!(frame.uniforms.len(), 2);
        assert_eq!(
            frame.uniforms[call.uniform_offset as usize].shader_type,
            ShaderType::Simple as i32
        );

        // Cover quad spans the flattened bounds.
        let quad = &frame.vertices[call.triangle_offset as usize..][..4];
        assert_eq!(quad[0].pos, Vec2::new(140.0, 30.0));
        assert_eq!(quad[3].pos, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_stroke_uniform_slots_follow_stencil_mode() {
        let cache = expanded_rect();
        for (stencil, slots) in [(true, 2), (false, 1)] {
            let mut batcher = CallBatcher::new(stencil, BatchLimits::default());
            batcher.begin_frame(Vec2::new(800.0, 600.0), 1.0);
            batcher.stroke(
                &white(),
                over(),
                &Scissor::DISABLED,
                1.0,
                2.0,
                cache.paths(),
                None,
            );
            let frame = batcher.frame();
            assert_eq!(frame.uniforms.len(), slots);
            let expected = if stencil {
                CallKind::StencilStroke
            } else {
                CallKind::Stroke
            };
            assert_eq!(frame.calls[0].kind, expected);
            // Stroke calls copy ribbons only.
            assert_eq!(frame.paths[0].fill.count, 0);
        }
    }

    #[test]
    fn test_limits_drop_whole_call() {
        let cache = expanded_rect();
        let limits = BatchLimits {
            max_vertices: 8,
            ..BatchLimits::default()
        };
        let mut batcher = CallBatcher::new(true, limits);
        batcher.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        batcher.fill(
            &white(),
            over(),
            &Scissor::DISABLED,
            1.0,
            cache.bounds(),
            cache.paths(),
            None,
        );
        // Nothing was partially written.
        assert!(batcher.is_empty());
        let frame = batcher.frame();
        assert!(frame.vertices.is_empty());
        assert!(frame.paths.is_empty());
        assert!(frame.uniforms.is_empty());
    }

    #[test]
    fn test_triangles_call() {
        let verts = [
            Vertex::new(Vec2::ZERO, 0.0, 0.0),
            Vertex::new(Vec2::new(10.0, 0.0), 1.0, 0.0),
            Vertex::new(Vec2::new(0.0, 10.0), 0.0, 1.0),
        ];
        let mut batcher = CallBatcher::new(true, BatchLimits::default());
        batcher.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        batcher.triangles(&white(), over(), &Scissor::DISABLED, 1.0, &verts, None);

        let frame = batcher.frame();
        let call = frame.calls[0];
        assert_eq!(call.kind, CallKind::Triangles);
        assert_eq!(call.triangle_count, 3);
        assert_eq!(
            frame.uniforms[0].shader_type,
            ShaderType::Image as i32
        );
    }

    #[test]
    fn test_clear_resets_everything() {
        let cache = expanded_rect();
        let mut batcher = CallBatcher::new(true, BatchLimits::default());
        batcher.begin_frame(Vec2::new(800.0, 600.0), 1.0);
        batcher.fill(
            &white(),
            over(),
            &Scissor::DISABLED,
            1.0,
            cache.bounds(),
            cache.paths(),
            None,
        );
        assert!(!batcher.is_empty());
        batcher.clear();
        assert!(batcher.is_empty());
        assert!(batcher.frame().vertices.is_empty());
    }
}
