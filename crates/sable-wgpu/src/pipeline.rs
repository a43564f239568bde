//! Concrete pipeline construction from core pipeline keys.
//!
//! The core describes each draw phase as a [`PipelineKey`]; this module
//! translates one into a `wgpu::RenderPipeline`. wgpu bakes topology,
//! blend, stencil and the color mask into the pipeline object, so every
//! distinct key becomes its own pipeline and the backend reports no
//! dynamic capabilities.

use sable::composite::{BlendFactor, CompositeOperationState};
use sable::pipeline::{
    CullMode, PipelineKey, StencilConfig, StencilFunc, StencilOp, StencilSide, Topology,
};
use sable::Vertex;

/// Vertex buffer layout shared by every pipeline: position and texture
/// coordinate, both `vec2<f32>`.
pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    use wgpu::*;
    VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &[
            // position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
            // texcoord
            VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: VertexFormat::Float32x2,
            },
        ],
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::SrcAlphaSaturate => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

fn blend_state(blend: CompositeOperationState) -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: blend_factor(blend.src_rgb),
            dst_factor: blend_factor(blend.dst_rgb),
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: blend_factor(blend.src_alpha),
            dst_factor: blend_factor(blend.dst_alpha),
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn stencil_op(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
        StencilOp::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
        StencilOp::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOp::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

fn stencil_compare(func: StencilFunc) -> wgpu::CompareFunction {
    match func {
        StencilFunc::Always => wgpu::CompareFunction::Always,
        StencilFunc::Equal => wgpu::CompareFunction::Equal,
        StencilFunc::NotEqual => wgpu::CompareFunction::NotEqual,
    }
}

fn stencil_face(side: StencilSide) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare: stencil_compare(side.compare),
        fail_op: stencil_op(side.fail),
        depth_fail_op: stencil_op(side.depth_fail),
        pass_op: stencil_op(side.pass),
    }
}

fn stencil_state(config: Option<StencilConfig>) -> wgpu::StencilState {
    match config {
        Some(cfg) => wgpu::StencilState {
            front: stencil_face(cfg.front),
            back: stencil_face(cfg.back),
            read_mask: 0xff,
            write_mask: 0xff,
        },
        None => wgpu::StencilState {
            front: wgpu::StencilFaceState::IGNORE,
            back: wgpu::StencilFaceState::IGNORE,
            read_mask: 0,
            write_mask: 0,
        },
    }
}

/// Builds render pipelines for the keys the replay asks for. Held by the
/// renderer and handed to the pipeline cache as the miss constructor.
pub(crate) struct PipelineFactory {
    pub device: wgpu::Device,
    pub layout: wgpu::PipelineLayout,
    pub shader: wgpu::ShaderModule,
    pub color_format: wgpu::TextureFormat,
}

impl PipelineFactory {
    pub fn build(&self, key: &PipelineKey) -> wgpu::RenderPipeline {
        let topology = match key.topology {
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        };
        let cull_mode = match key.cull_mode() {
            CullMode::None => None,
            CullMode::Back => Some(wgpu::Face::Back),
        };
        let write_mask = if key.color_write {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        };

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("sable pipeline"),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[vertex_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: Some(blend_state(key.blend)),
                        write_mask,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Stencil8,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    stencil: stencil_state(key.stencil_state()),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
    }
}
