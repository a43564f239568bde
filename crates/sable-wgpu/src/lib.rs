//! wgpu backend for the sable vector-graphics core.
//!
//! [`WgpuRenderer`] consumes the frames a [`sable::Context`] records and
//! replays them into one render pass per flush. All pipeline state is baked
//! into cached pipeline objects, vertex and uniform data live in per-slot
//! buffers cycled across frames in flight, and per-draw uniform selection
//! goes through push constants where the device offers them, falling back
//! to a dynamic-offset uniform buffer everywhere else.
//!
//! The embedder owns the surface and the color attachment. Point the
//! renderer at the frame's target before ending the context frame:
//!
//! ```no_run
//! use sable::{Color, Context, Vec2};
//! use sable_wgpu::{WgpuRenderer, WgpuRendererDescriptor};
//!
//! # fn demo(device: &sable_wgpu::wgpu::Device, queue: &sable_wgpu::wgpu::Queue,
//! #         view: sable_wgpu::wgpu::TextureView) {
//! let renderer = WgpuRenderer::new(
//!     device,
//!     queue,
//!     sable_wgpu::wgpu::TextureFormat::Bgra8Unorm,
//!     WgpuRendererDescriptor::default(),
//! );
//! let mut ctx = Context::new(renderer);
//!
//! ctx.renderer_mut().set_render_target(view, 800, 600);
//! ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
//! ctx.begin_path();
//! ctx.circle(Vec2::new(400.0, 300.0), 120.0);
//! ctx.set_fill_color(Color::rgbf(0.9, 0.3, 0.35));
//! ctx.fill();
//! ctx.end_frame();
//! # }
//! ```

pub use sable;
pub use wgpu;

mod buffers;
mod pipeline;
mod texture;

use ahash::HashMap;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use sable::batch::{Call, CallKind, Frame};
use sable::pipeline::{DynCaps, PipelineCache, PipelineKey, Topology};
use sable::renderer::{
    ImageFlags, Renderer, RendererFeatures, TextureId, TextureInfo, TextureKind,
};
use sable::uniforms::FragUniforms;
use sable::Error;

use crate::buffers::GrowBuffer;
use crate::pipeline::PipelineFactory;
use crate::texture::{GpuTexture, RetireRing, TextureStore};

/// Size of the per-draw push constant block.
const PUSH_SIZE: u32 = 16;
/// Size of one fragment uniform block.
const UNIFORM_SIZE: u64 = std::mem::size_of::<FragUniforms>() as u64;

const INITIAL_VERTEX_BYTES: u64 = 64 * 1024;
const INITIAL_UNIFORM_BYTES: u64 = 16 * 1024;

/// Creation options for [`WgpuRenderer`].
#[derive(Debug, Clone)]
pub struct WgpuRendererDescriptor {
    /// Number of frame slots cycled between flushes. Each slot owns its own
    /// vertex and uniform buffers so a frame still in flight is never
    /// overwritten.
    pub frames_in_flight: usize,
    /// Expand geometry with a coverage fringe for antialiased edges.
    pub edge_antialias: bool,
    /// Draw strokes through a stencil pre-pass so overlapping segments of
    /// a translucent stroke blend once.
    pub stencil_strokes: bool,
    /// Force the uniform transport. `None` picks push constants when the
    /// device supports them; `Some(true)` is still clamped to what the
    /// device offers.
    pub use_push_constants: Option<bool>,
}

impl Default for WgpuRendererDescriptor {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            edge_antialias: true,
            stencil_strokes: true,
            use_push_constants: None,
        }
    }
}

/// How per-draw fragment uniforms reach the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UniformMode {
    /// Uniform blocks live in a storage array; a push constant selects the
    /// block and carries the view size.
    Push,
    /// One uniform block per draw, selected with a dynamic bind-group
    /// offset. `stride` is the block size rounded up to the device's
    /// offset alignment.
    DynamicOffset { stride: u32 },
}

/// Per-draw push constant block, mirrored by the shader header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct PushData {
    view_size: [f32; 2],
    uniform_offset: u32,
    _pad: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<PushData>(), PUSH_SIZE as usize);

fn push_constants_viable(features: wgpu::Features, limits: &wgpu::Limits) -> bool {
    features.contains(wgpu::Features::PUSH_CONSTANTS)
        && limits.max_push_constant_size >= PUSH_SIZE
}

fn uniform_stride(alignment: u32) -> u32 {
    (std::mem::size_of::<FragUniforms>() as u32).next_multiple_of(alignment)
}

fn shader_source(use_push: bool) -> String {
    let header = if use_push {
        include_str!("../shaders/header_push.wgsl")
    } else {
        include_str!("../shaders/header_ubo.wgsl")
    };
    format!("{header}\n{}", include_str!("../shaders/fill_body.wgsl"))
}

/// Copies each uniform block into a buffer image with `stride` bytes per
/// block, zero-padded, for the dynamic-offset transport.
fn stride_uniforms(uniforms: &[FragUniforms], stride: u32) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; uniforms.len() * stride];
    for (block, chunk) in uniforms.iter().zip(bytes.chunks_exact_mut(stride)) {
        chunk[..UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(block));
    }
    bytes
}

/// Vertex and uniform buffers for one frame in flight.
struct FrameSlot {
    vertices: GrowBuffer,
    uniforms: GrowBuffer,
}

struct StencilBuffer {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct FrameTarget {
    color: wgpu::TextureView,
    stencil: wgpu::TextureView,
}

/// GPU backend that replays recorded frames through wgpu.
pub struct WgpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    features: RendererFeatures,
    mode: UniformMode,
    factory: PipelineFactory,
    pipelines: PipelineCache<wgpu::RenderPipeline>,
    uniform_layout: wgpu::BindGroupLayout,
    image_layout: wgpu::BindGroupLayout,
    textures: TextureStore,
    /// Deleted textures, freed once their frame slot cycles around.
    retired: RetireRing<GpuTexture>,
    slots: Vec<FrameSlot>,
    slot: usize,
    target: Option<FrameTarget>,
    stencil: Option<StencilBuffer>,
    /// Written and bound in dynamic-offset mode; push constants carry the
    /// view size otherwise.
    view_buffer: wgpu::Buffer,
    /// Bound at group 1 for draws without an image so the layout is always
    /// satisfied.
    dummy_bind_group: wgpu::BindGroup,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        descriptor: WgpuRendererDescriptor,
    ) -> Self {
        let limits = device.limits();
        let push_viable = push_constants_viable(device.features(), &limits);
        let use_push = descriptor.use_push_constants.unwrap_or(push_viable) && push_viable;
        let mode = if use_push {
            UniformMode::Push
        } else {
            UniformMode::DynamicOffset {
                stride: uniform_stride(limits.min_uniform_buffer_offset_alignment),
            }
        };
        tracing::debug!(?mode, "uniform transport selected");

        let uniform_layout = match mode {
            UniformMode::Push => device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("sable uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                    },
                    count: None,
                }],
            }),
            UniformMode::DynamicOffset { .. } => {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("sable uniform layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: true,
                                min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(8),
                            },
                            count: None,
                        },
                    ],
                })
            }
        };

        let image_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sable image layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let push_range = [wgpu::PushConstantRange {
            stages: wgpu::ShaderStages::VERTEX_FRAGMENT,
            range: 0..PUSH_SIZE,
        }];
        let push_constant_ranges: &[wgpu::PushConstantRange] =
            if use_push { &push_range } else { &[] };
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sable pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &image_layout],
            push_constant_ranges,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sable fill shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source(use_push).into()),
        });

        let uniform_usage = match mode {
            UniformMode::Push => wgpu::BufferUsages::STORAGE,
            UniformMode::DynamicOffset { .. } => wgpu::BufferUsages::UNIFORM,
        };
        let frames_in_flight = descriptor.frames_in_flight.max(1);
        let slots = (0..frames_in_flight)
            .map(|_| FrameSlot {
                vertices: GrowBuffer::new(
                    device,
                    "sable vertices",
                    INITIAL_VERTEX_BYTES,
                    wgpu::BufferUsages::VERTEX,
                ),
                uniforms: GrowBuffer::new(
                    device,
                    "sable frag uniforms",
                    INITIAL_UNIFORM_BYTES,
                    uniform_usage,
                ),
            })
            .collect();

        let view_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sable view uniforms"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let dummy_bind_group = create_dummy_bind_group(device, queue, &image_layout);

        Self {
            device: device.clone(),
            queue: queue.clone(),
            features: RendererFeatures {
                edge_antialias: descriptor.edge_antialias,
                stencil_strokes: descriptor.stencil_strokes,
            },
            mode,
            factory: PipelineFactory {
                device: device.clone(),
                layout,
                shader,
                color_format,
            },
            pipelines: PipelineCache::new(DynCaps::empty()),
            uniform_layout,
            image_layout,
            textures: TextureStore::new(limits.max_texture_dimension_2d),
            retired: RetireRing::new(frames_in_flight),
            slots,
            slot: 0,
            target: None,
            stencil: None,
            view_buffer,
            dummy_bind_group,
        }
    }

    /// Whether per-draw uniforms go through push constants on this device.
    pub fn uses_push_constants(&self) -> bool {
        matches!(self.mode, UniformMode::Push)
    }

    /// Number of distinct pipelines built so far.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Points the next flush at `view`. `width` and `height` are the view's
    /// size in physical pixels; the renderer-owned stencil attachment is
    /// recreated to match when they change. The color attachment is loaded,
    /// not cleared, so the embedder controls the background.
    pub fn set_render_target(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        let stencil = self.ensure_stencil(width, height);
        self.target = Some(FrameTarget {
            color: view,
            stencil,
        });
    }

    fn ensure_stencil(&mut self, width: u32, height: u32) -> wgpu::TextureView {
        if let Some(stencil) = &self.stencil {
            if stencil.width == width && stencil.height == height {
                return stencil.view.clone();
            }
        }
        tracing::debug!(width, height, "recreating stencil attachment");
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sable stencil"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Stencil8,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.stencil = Some(StencilBuffer {
            view: view.clone(),
            width,
            height,
        });
        view
    }

    fn build_uniform_bind_group(&self, slot: &FrameSlot) -> wgpu::BindGroup {
        match self.mode {
            UniformMode::Push => self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sable uniform binding"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: slot.uniforms.buffer().as_entire_binding(),
                }],
            }),
            UniformMode::DynamicOffset { .. } => {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("sable uniform binding"),
                    layout: &self.uniform_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer: slot.uniforms.buffer(),
                                offset: 0,
                                size: wgpu::BufferSize::new(UNIFORM_SIZE),
                            }),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: self.view_buffer.as_entire_binding(),
                        },
                    ],
                })
            }
        }
    }

    fn build_image_bind_groups(&self) -> HashMap<TextureId, wgpu::BindGroup> {
        self.textures
            .iter_live()
            .map(|(id, texture)| {
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("sable image binding"),
                    layout: &self.image_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&texture.sampler),
                        },
                    ],
                });
                (id, bind_group)
            })
            .collect()
    }
}

fn create_dummy_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sable dummy image"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255, 255, 255, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("sable dummy sampler"),
        ..Default::default()
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("sable dummy image binding"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}

/// A render pass mid-replay, tracking the last bound pipeline and image so
/// consecutive draws sharing state skip the rebind.
struct ReplayPass<'a> {
    pass: wgpu::RenderPass<'static>,
    pipelines: &'a mut PipelineCache<wgpu::RenderPipeline>,
    factory: &'a PipelineFactory,
    mode: UniformMode,
    edge_antialias: bool,
    view_size: Vec2,
    uniform_bind_group: &'a wgpu::BindGroup,
    image_bind_groups: &'a HashMap<TextureId, wgpu::BindGroup>,
    dummy_bind_group: &'a wgpu::BindGroup,
    last_key: Option<PipelineKey>,
    last_image: Option<Option<TextureId>>,
}

impl ReplayPass<'_> {
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

        if self.last_key != Some(*key) {
            let factory = self.factory;
            let pipeline = self.pipelines.get_or_create(key, |k| factory.build(k));
            self.pass.set_pipeline(pipeline);
            self.last_key = Some(*key);
        }

        match self.mode {
            UniformMode::Push => {
                let push = PushData {
                    view_size: [self.view_size.x, self.view_size.y],
                    uniform_offset,
                    _pad: 0,
                };
                self.pass.set_push_constants(
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    0,
                    bytemuck::bytes_of(&push),
                );
            }
            UniformMode::DynamicOffset { stride } => {
                self.pass
                    .set_bind_group(0, self.uniform_bind_group, &[uniform_offset * stride]);
            }
        }

        if self.last_image != Some(image) {
            let bind_group = image
                .and_then(|id| self.image_bind_groups.get(&id))
                .unwrap_or(self.dummy_bind_group);
            self.pass.set_bind_group(1, bind_group, &[]);
            self.last_image = Some(image);
        }

        self.pass.draw(offset..offset + count, 0..1);
    }

    fn fill(&mut self, frame: &Frame<'_>, call: &Call) {
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

        if self.edge_antialias {
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

    fn convex_fill(&mut self, frame: &Frame<'_>, call: &Call) {
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

        if self.edge_antialias {
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

    fn stencil_stroke(&mut self, frame: &Frame<'_>, call: &Call) {
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

    fn stroke(&mut self, frame: &Frame<'_>, call: &Call) {
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

    fn triangles(&mut self, call: &Call) {
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

impl Renderer for WgpuRenderer {
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
        self.textures
            .create(&self.device, &self.queue, kind, width, height, flags, data)
    }

    fn update_texture(
        &mut self,
        id: TextureId,
        y: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), Error> {
        self.textures.update(&self.queue, id, y, height, data)
    }

    fn delete_texture(&mut self, id: TextureId) -> Result<(), Error> {
        match self.textures.take(id) {
            Some(texture) => {
                // Parked until its frame slot cycles around, at which point
                // the submission that may reference it has been scheduled.
                self.retired.park(texture);
                Ok(())
            }
            None => Err(Error::UnknownTexture(id)),
        }
    }

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.textures.info(id)
    }

    fn flush(&mut self, frame: Frame<'_>) {
        let Some(target) = self.target.take() else {
            tracing::warn!("flush without a render target, dropping frame");
            return;
        };

        self.retired.cycle();

        let slot_index = self.slot;
        {
            let slot = &mut self.slots[slot_index];
            slot.vertices.upload(
                &self.device,
                &self.queue,
                bytemuck::cast_slice(frame.vertices),
            );
            match self.mode {
                UniformMode::Push => {
                    slot.uniforms.upload(
                        &self.device,
                        &self.queue,
                        bytemuck::cast_slice(frame.uniforms),
                    );
                }
                UniformMode::DynamicOffset { stride } => {
                    let bytes = stride_uniforms(frame.uniforms, stride);
                    slot.uniforms.upload(&self.device, &self.queue, &bytes);
                    self.queue.write_buffer(
                        &self.view_buffer,
                        0,
                        bytemuck::cast_slice(&[frame.view_size.x, frame.view_size.y]),
                    );
                }
            }
        }
        let slot = &self.slots[slot_index];

        let uniform_bind_group = self.build_uniform_bind_group(slot);
        let image_bind_groups = self.build_image_bind_groups();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sable frame"),
            });
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("sable pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target.color,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &target.stencil,
                        depth_ops: None,
                        stencil_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(0),
                            store: wgpu::StoreOp::Discard,
                        }),
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            pass.set_vertex_buffer(0, slot.vertices.buffer().slice(..));
            pass.set_stencil_reference(0);
            if self.mode == UniformMode::Push {
                pass.set_bind_group(0, &uniform_bind_group, &[]);
            }

            let mut replay = ReplayPass {
                pass,
                pipelines: &mut self.pipelines,
                factory: &self.factory,
                mode: self.mode,
                edge_antialias: self.features.edge_antialias,
                view_size: frame.view_size,
                uniform_bind_group: &uniform_bind_group,
                image_bind_groups: &image_bind_groups,
                dummy_bind_group: &self.dummy_bind_group,
                last_key: None,
                last_image: None,
            };
            for call in frame.calls {
                match call.kind {
                    CallKind::Fill => replay.fill(&frame, call),
                    CallKind::ConvexFill => replay.convex_fill(&frame, call),
                    CallKind::Stroke => replay.stroke(&frame, call),
                    CallKind::StencilStroke => replay.stencil_stroke(&frame, call),
                    CallKind::Triangles => replay.triangles(call),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.slot = (self.slot + 1) % self.slots.len();
        tracing::trace!(
            calls = frame.calls.len(),
            vertices = frame.vertices.len(),
            "frame submitted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(radius: f32) -> FragUniforms {
        FragUniforms {
            radius,
            ..bytemuck::Zeroable::zeroed()
        }
    }

    #[test]
    fn test_stride_uniforms_pads_between_blocks() {
        let blocks = [block(1.0), block(2.0)];
        let bytes = stride_uniforms(&blocks, 256);
        assert_eq!(bytes.len(), 512);
        assert_eq!(&bytes[..208], bytemuck::bytes_of(&blocks[0]));
        assert_eq!(&bytes[256..464], bytemuck::bytes_of(&blocks[1]));
        assert!(bytes[208..256].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_stride_uniforms_tight_when_aligned() {
        let blocks = [block(3.0)];
        let bytes = stride_uniforms(&blocks, 208);
        assert_eq!(bytes.len(), 208);
        assert_eq!(&bytes[..], bytemuck::bytes_of(&blocks[0]));
    }

    #[test]
    fn test_uniform_stride_respects_alignment() {
        assert_eq!(uniform_stride(256), 256);
        assert_eq!(uniform_stride(64), 256);
        assert_eq!(uniform_stride(32), 224);
        assert_eq!(uniform_stride(16), 208);
    }

    #[test]
    fn test_push_data_matches_shader_block() {
        let push = PushData {
            view_size: [800.0, 600.0],
            uniform_offset: 7,
            _pad: 0,
        };
        let bytes = bytemuck::bytes_of(&push);
        assert_eq!(bytes.len(), PUSH_SIZE as usize);
        assert_eq!(bytes[8..12], 7u32.to_ne_bytes());
    }

    #[test]
    fn test_push_constants_need_feature_and_size() {
        let mut limits = wgpu::Limits::default();
        assert!(!push_constants_viable(wgpu::Features::empty(), &limits));
        // The default limit of zero rules it out even with the feature.
        assert!(!push_constants_viable(
            wgpu::Features::PUSH_CONSTANTS,
            &limits
        ));
        limits.max_push_constant_size = 128;
        assert!(push_constants_viable(
            wgpu::Features::PUSH_CONSTANTS,
            &limits
        ));
    }

    #[test]
    fn test_shader_sources_define_both_transports() {
        let push = shader_source(true);
        assert!(push.contains("var<push_constant>"));
        assert!(push.contains("fn load_uniforms"));
        assert!(push.contains("fn fs_main"));

        let ubo = shader_source(false);
        assert!(!ubo.contains("var<push_constant>"));
        assert!(ubo.contains("var<uniform> frag_uniforms"));
        assert!(ubo.contains("fn vs_main"));
    }

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = WgpuRendererDescriptor::default();
        assert_eq!(descriptor.frames_in_flight, 2);
        assert!(descriptor.edge_antialias);
        assert!(descriptor.stencil_strokes);
        assert_eq!(descriptor.use_push_constants, None);
    }
}
