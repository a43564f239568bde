//! CPU-only renderer that records what it would draw.
//!
//! Replays frames through the same pipeline-key sequence a GPU backend uses,
//! but resolves every key to a counter handle and logs one [`DrawEvent`] per
//! draw. Tests assert on the event stream, on pipeline cache growth, and on
//! the retained copy of the last flushed frame; texture contents live in
//! plain byte vectors so uploads can be inspected.

use crate::batch::{Call, CallKind, Frame, GpuPath};
use crate::error::Error;
use crate::pipeline::{DynCaps, PipelineCache, PipelineKey, Topology};
use crate::renderer::{
    ImageFlags, Renderer, RendererFeatures, TextureId, TextureInfo, TextureKind,
};
use crate::uniforms::FragUniforms;
use crate::vertex::Vertex;
use glam::Vec2;

/// One replayed draw, in submission order.
#[derive(Debug, Clone, Copy)]
pub struct DrawEvent {
    /// Handle of the pipeline the draw was bound to. Handles count up from
    /// one in creation order.
    pub pipeline: u32,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub uniform_offset: u32,
    pub image: Option<TextureId>,
    pub color_write: bool,
}

/// Owned copy of a flushed frame, for inspecting the geometry the events
/// index into.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub vertices: Vec<Vertex>,
    pub paths: Vec<GpuPath>,
    pub calls: Vec<Call>,
    pub uniforms: Vec<FragUniforms>,
    pub view_size: Vec2,
    pub device_ratio: f32,
}

#[derive(Debug)]
struct HeadlessTexture {
    info: TextureInfo,
    data: Vec<u8>,
}

/// Backend stand-in for tests and benchmarks.
#[derive(Debug)]
pub struct HeadlessRenderer {
    features: RendererFeatures,
    pipelines: PipelineCache<u32>,
    next_pipeline: u32,
    textures: Vec<Option<HeadlessTexture>>,
    events: Vec<DrawEvent>,
    last_frame: Option<FrameSnapshot>,
    frames: usize,
    max_texture_size: u32,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::with_features(
            RendererFeatures {
                edge_antialias: true,
                stencil_strokes: true,
            },
            DynCaps::empty(),
        )
    }

    /// A renderer with explicit feature and dynamic-state settings, for
    /// exercising the degraded replay paths.
    pub fn with_features(features: RendererFeatures, caps: DynCaps) -> Self {
        Self {
            features,
            pipelines: PipelineCache::new(caps),
            next_pipeline: 0,
            textures: Vec::new(),
            events: Vec::new(),
            last_frame: None,
            frames: 0,
            max_texture_size: 8192,
        }
    }

    /// Draws recorded since the last [`clear_events`](Self::clear_events).
    pub fn events(&self) -> &[DrawEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn frames_flushed(&self) -> usize {
        self.frames
    }

    /// The most recently flushed frame's buffers and call list.
    pub fn last_frame(&self) -> Option<&FrameSnapshot> {
        self.last_frame.as_ref()
    }

    /// Distinct pipelines built so far.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Raw pixel bytes of a live texture.
    pub fn texture_data(&self, id: TextureId) -> Option<&[u8]> {
        self.textures
            .get(id.index())?
            .as_ref()
            .map(|t| t.data.as_slice())
    }

    fn draw(
        &mut self,
        key: &PipelineKey,
        offset: u32,
        count: u32,
        uniform_offset: u32,
        image: Option<TextureId>,
    ) {
        if count == 0 {
            return;
        }
        let next = &mut self.next_pipeline;
        let pipeline = *self.pipelines.get_or_create(key, |_| {
            *next += 1;
            *next
        });
        self.events.push(DrawEvent {
            pipeline,
            vertex_offset: offset,
            vertex_count: count,
            uniform_offset,
            image,
            color_write: key.color_write,
        });
    }

    fn replay_fill(&mut self, frame: &Frame<'_>, call: &Call) {
        let paths = &frame.paths[call.path_offset as usize..][..call.path_count as usize];

        let stencil = PipelineKey::fill_stencil(call.blend);
        for p in paths {
            self.draw(
                &stencil,
                p.fill.offset,
                p.fill.count,
                call.uniform_offset,
                call.image,
            );
        }

        if self.features.edge_antialias {
            let fringe = PipelineKey::fill_fringe(call.blend);
            for p in paths {
                self.draw(
                    &fringe,
                    p.stroke.offset,
                    p.stroke.count,
                    call.uniform_offset + 1,
                    call.image,
                );
            }
        }

        let cover = PipelineKey::fill_cover(call.blend);
        self.draw(
            &cover,
            call.triangle_offset,
            call.triangle_count,
            call.uniform_offset + 1,
            call.image,
        );
    }

    fn replay_convex_fill(&mut self, frame: &Frame<'_>, call: &Call) {
        let paths = &frame.paths[call.path_offset as usize..][..call.path_count as usize];

        let fill = PipelineKey::plain(call.blend, Topology::TriangleList);
        for p in paths {
            self.draw(
                &fill,
                p.fill.offset,
                p.fill.count,
                call.uniform_offset,
                call.image,
            );
        }

        if self.features.edge_antialias {
            let fringe = PipelineKey::plain(call.blend, Topology::TriangleStrip);
            for p in paths {
                self.draw(
                    &fringe,
                    p.stroke.offset,
                    p.stroke.count,
                    call.uniform_offset,
                    call.image,
                );
            }
        }
    }

    fn replay_stencil_stroke(&mut self, frame: &Frame<'_>, call: &Call) {
        let paths = &frame.paths[call.path_offset as usize..][..call.path_count as usize];

        let base = PipelineKey::stroke_stencil_fill(call.blend);
        for p in paths {
            self.draw(
                &base,
                p.stroke.offset,
                p.stroke.count,
                call.uniform_offset + 1,
                call.image,
            );
        }

        let aa = PipelineKey::stroke_draw_aa(call.blend);
        for p in paths {
            self.draw(
                &aa,
                p.stroke.offset,
                p.stroke.count,
                call.uniform_offset,
                call.image,
            );
        }

        let clear = PipelineKey::stroke_clear(call.blend);
        for p in paths {
            self.draw(
                &clear,
                p.stroke.offset,
                p.stroke.count,
                call.uniform_offset,
                call.image,
            );
        }
    }

    fn replay_stroke(&mut self, frame: &Frame<'_>, call: &Call) {
        let paths = &frame.paths[call.path_offset as usize..][..call.path_count as usize];
        let key = PipelineKey::plain(call.blend, Topology::TriangleStrip);
        for p in paths {
            self.draw(
                &key,
                p.stroke.offset,
                p.stroke.count,
                call.uniform_offset,
                call.image,
            );
        }
    }

    fn replay_triangles(&mut self, call: &Call) {
        let key = PipelineKey::plain(call.blend, Topology::TriangleList);
        self.draw(
            &key,
            call.triangle_offset,
            call.triangle_count,
            call.uniform_offset,
            call.image,
        );
    }
}

impl Renderer for HeadlessRenderer {
    fn features(&self) -> RendererFeatures {
        self.features
    }

    fn create_texture(
        &mut self,
        kind: TextureKind,
        width: u32,
        height: u32,
        flags: ImageFlags,
        data: Option<&[u8]>,
    ) -> Result<TextureId, Error> {
        if width > self.max_texture_size || height > self.max_texture_size {
            return Err(Error::TextureSize {
                width,
                height,
                max: self.max_texture_size,
            });
        }
        let expected = (width * height * kind.bytes_per_pixel()) as usize;
        let bytes = match data {
            Some(d) if d.len() != expected => {
                return Err(Error::ImageData {
                    expected,
                    got: d.len(),
                });
            }
            Some(d) => d.to_vec(),
            None => vec![0; expected],
        };

        let texture = HeadlessTexture {
            info: TextureInfo {
                kind,
                flags,
                width,
                height,
            },
            data: bytes,
        };
        let slot = self.textures.iter().position(Option::is_none);
        let index = match slot {
            Some(i) => {
                self.textures[i] = Some(texture);
                i
            }
            None => {
                self.textures.push(Some(texture));
                self.textures.len() - 1
            }
        };
        Ok(TextureId::from_index(index))
    }

    fn update_texture(
        &mut self,
        id: TextureId,
        y: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), Error> {
        let tex = self
            .textures
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownTexture(id))?;
        if y + height > tex.info.height {
            return Err(Error::TextureSize {
                width: tex.info.width,
                height: y + height,
                max: tex.info.height,
            });
        }
        let stride = (tex.info.width * tex.info.kind.bytes_per_pixel()) as usize;
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(Error::ImageData {
                expected,
                got: data.len(),
            });
        }
        let start = stride * y as usize;
        tex.data[start..start + expected].copy_from_slice(data);
        Ok(())
    }

    fn delete_texture(&mut self, id: TextureId) -> Result<(), Error> {
        let slot = self
            .textures
            .get_mut(id.index())
            .ok_or(Error::UnknownTexture(id))?;
        if slot.is_none() {
            return Err(Error::UnknownTexture(id));
        }
        *slot = None;
        Ok(())
    }

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.textures
            .get(id.index())?
            .as_ref()
            .map(|t| t.info)
    }

    fn flush(&mut self, frame: Frame<'_>) {
        self.frames += 1;
        self.last_frame = Some(FrameSnapshot {
            vertices: frame.vertices.to_vec(),
            paths: frame.paths.to_vec(),
            calls: frame.calls.to_vec(),
            uniforms: frame.uniforms.to_vec(),
            view_size: frame.view_size,
            device_ratio: frame.device_ratio,
        });
        tracing::trace!(
            calls = frame.calls.len(),
            vertices = frame.vertices.len(),
            "headless flush"
        );
        for call in frame.calls {
            match call.kind {
                CallKind::Fill => self.replay_fill(&frame, call),
                CallKind::ConvexFill => self.replay_convex_fill(&frame, call),
                CallKind::StencilStroke => self.replay_stencil_stroke(&frame, call),
                CallKind::Stroke => self.replay_stroke(&frame, call),
                CallKind::Triangles => self.replay_triangles(call),
            }
        }
    }
}
