//! Sable - antialiased 2D vector graphics on the GPU
//!
//! This crate is the renderer-independent core: it records paths, flattens
//! curves, expands fills and strokes into antialiased triangle geometry and
//! batches everything into per-frame draw calls. A backend implements the
//! [`Renderer`] trait to consume those calls; `sable-wgpu` ships the wgpu
//! one, and [`HeadlessRenderer`] replays frames without a GPU for tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use sable::{Color, Context, HeadlessRenderer, Vec2};
//!
//! let mut ctx = Context::new(HeadlessRenderer::new());
//! ctx.begin_frame(Vec2::new(800.0, 600.0), 1.0);
//!
//! ctx.begin_path();
//! ctx.rounded_rect(Vec2::new(20.0, 20.0), Vec2::new(200.0, 120.0), 8.0);
//! ctx.set_fill_color(Color::rgbaf(0.2, 0.5, 0.9, 1.0));
//! ctx.fill();
//!
//! ctx.begin_path();
//! ctx.circle(Vec2::new(400.0, 300.0), 60.0);
//! ctx.set_stroke_color(Color::WHITE);
//! ctx.set_stroke_width(3.0);
//! ctx.stroke();
//!
//! ctx.end_frame();
//! ```

pub mod batch;
pub mod cache;
pub mod color;
pub mod composite;
pub mod context;
pub mod error;
pub mod headless;
pub mod instructions;
pub mod logging;
pub mod math;
pub mod paint;
pub mod path;
pub mod pipeline;
pub mod renderer;
pub mod state;
pub mod style;
pub mod uniforms;
pub mod vertex;

mod fill;
mod stroke;

// Re-export main types
pub use batch::{BatchLimits, Call, CallBatcher, CallKind, Frame, GpuPath, VertexRange};
pub use color::Color;
pub use composite::{BlendFactor, CompositeOperation, CompositeOperationState};
pub use context::Context;
pub use error::Error;
pub use headless::HeadlessRenderer;
pub use paint::Paint;
pub use pipeline::{DynCaps, PipelineCache, PipelineKey, StrokeStencil, Topology};
pub use renderer::{
    ImageFlags, Renderer, RendererFeatures, TextureId, TextureInfo, TextureKind,
};
pub use state::Scissor;
pub use style::{LineCap, LineJoin, Solidity, Winding};
pub use uniforms::{FragUniforms, ShaderType};
pub use vertex::Vertex;

// Re-export common types from dependencies
pub use glam::{Affine2, Vec2};
