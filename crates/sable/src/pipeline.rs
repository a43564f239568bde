//! Pipeline state description and caching.
//!
//! Every draw phase is described by a [`PipelineKey`]: topology, stencil
//! role, blend state and color-write mask. Backends build one concrete
//! pipeline object per distinct key and reuse it across frames through
//! [`PipelineCache`]. On APIs where parts of that state can be set
//! dynamically at bind time, [`DynCaps`] collapses the corresponding key
//! groups so one pipeline serves many keys.

use crate::composite::CompositeOperationState;
use ahash::HashMap;
use bitflags::bitflags;

/// Primitive topology of a draw phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Which phase of a stencilled stroke this pipeline serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrokeStencil {
    /// Not a stencilled stroke phase.
    #[default]
    Inactive,
    /// Base pass: draw where the stencil is clear, marking covered pixels so
    /// overlapping segments blend once.
    Fill,
    /// Antialiasing pass over still-clear pixels.
    DrawAa,
    /// Stencil reset pass, no color output.
    Clear,
}

/// Stencil compare function. The reference value is always zero and both
/// masks are `0xff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilFunc {
    Always,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

/// Per-face stencil behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilSide {
    pub compare: StencilFunc,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl StencilSide {
    const fn uniform(compare: StencilFunc, op: StencilOp) -> Self {
        Self {
            compare,
            fail: op,
            depth_fail: op,
            pass: op,
        }
    }

    const fn keep_until(compare: StencilFunc, pass: StencilOp) -> Self {
        Self {
            compare,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass,
        }
    }
}

/// Two-sided stencil state for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilConfig {
    pub front: StencilSide,
    pub back: StencilSide,
}

impl StencilConfig {
    const fn symmetric(side: StencilSide) -> Self {
        Self {
            front: side,
            back: side,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

bitflags! {
    /// Pipeline state a backend can change at bind time without switching
    /// pipeline objects.
    ///
    /// Each bit collapses one group of key fields during cache lookup, so
    /// keys differing only inside that group share a pipeline. The grouping
    /// mirrors how the fields travel together: topology, the stencil tables
    /// and the antialiasing flag that selects between them switch per phase,
    /// blend switches per call, and the color mask flips for stencil-only
    /// phases.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DynCaps: u32 {
        const TOPOLOGY_STENCIL = 1 << 0;
        const BLEND = 1 << 1;
        const COLOR_WRITE = 1 << 2;
    }
}

/// Complete render state for one draw phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub topology: Topology,
    pub stencil_fill: bool,
    pub stencil_test: bool,
    pub edge_aa: bool,
    pub stroke_stencil: StrokeStencil,
    /// Whether color output is enabled. Stencil-only phases derive this as
    /// false; it stays a stored field so backends without a dynamic
    /// color-write mask still get distinct pipelines.
    pub color_write: bool,
    pub blend: CompositeOperationState,
}

impl PipelineKey {
    fn base(blend: CompositeOperationState) -> Self {
        Self {
            topology: Topology::TriangleList,
            stencil_fill: false,
            stencil_test: false,
            edge_aa: false,
            stroke_stencil: StrokeStencil::Inactive,
            color_write: true,
            blend,
        }
    }

    /// Winding accumulation pass of a non-convex fill.
    pub fn fill_stencil(blend: CompositeOperationState) -> Self {
        Self {
            stencil_fill: true,
            color_write: false,
            ..Self::base(blend)
        }
    }

    /// Fringe pass of a non-convex fill.
    pub fn fill_fringe(blend: CompositeOperationState) -> Self {
        Self {
            topology: Topology::TriangleStrip,
            stencil_test: true,
            edge_aa: true,
            ..Self::base(blend)
        }
    }

    /// Cover-quad pass of a non-convex fill; also clears the stencil.
    pub fn fill_cover(blend: CompositeOperationState) -> Self {
        Self {
            topology: Topology::TriangleStrip,
            stencil_test: true,
            ..Self::base(blend)
        }
    }

    /// Direct draw with no stencil interaction.
    pub fn plain(blend: CompositeOperationState, topology: Topology) -> Self {
        Self {
            topology,
            ..Self::base(blend)
        }
    }

    /// Base pass of a stencilled stroke.
    pub fn stroke_stencil_fill(blend: CompositeOperationState) -> Self {
        Self {
            topology: Topology::TriangleStrip,
            stroke_stencil: StrokeStencil::Fill,
            ..Self::base(blend)
        }
    }

    /// Antialiasing pass of a stencilled stroke.
    pub fn stroke_draw_aa(blend: CompositeOperationState) -> Self {
        Self {
            topology: Topology::TriangleStrip,
            stroke_stencil: StrokeStencil::DrawAa,
            ..Self::base(blend)
        }
    }

    /// Stencil reset pass of a stencilled stroke.
    pub fn stroke_clear(blend: CompositeOperationState) -> Self {
        Self {
            topology: Topology::TriangleStrip,
            stroke_stencil: StrokeStencil::Clear,
            color_write: false,
            ..Self::base(blend)
        }
    }

    /// The winding pass must see both faces; everything else culls.
    pub fn cull_mode(&self) -> CullMode {
        if self.stencil_fill {
            CullMode::None
        } else {
            CullMode::Back
        }
    }

    /// Stencil state this key requires, `None` when the stencil test is off.
    pub fn stencil_state(&self) -> Option<StencilConfig> {
        match self.stroke_stencil {
            StrokeStencil::Fill => {
                return Some(StencilConfig::symmetric(StencilSide::keep_until(
                    StencilFunc::Equal,
                    StencilOp::IncrementClamp,
                )));
            }
            StrokeStencil::DrawAa => {
                return Some(StencilConfig::symmetric(StencilSide::keep_until(
                    StencilFunc::Equal,
                    StencilOp::Keep,
                )));
            }
            StrokeStencil::Clear => {
                return Some(StencilConfig::symmetric(StencilSide::uniform(
                    StencilFunc::Always,
                    StencilOp::Zero,
                )));
            }
            StrokeStencil::Inactive => {}
        }

        if self.stencil_fill {
            // Front faces increment, back faces decrement: the classic
            // non-zero winding accumulation.
            Some(StencilConfig {
                front: StencilSide::keep_until(StencilFunc::Always, StencilOp::IncrementWrap),
                back: StencilSide::keep_until(StencilFunc::Always, StencilOp::DecrementWrap),
            })
        } else if self.stencil_test {
            Some(if self.edge_aa {
                StencilConfig::symmetric(StencilSide::keep_until(
                    StencilFunc::Equal,
                    StencilOp::Keep,
                ))
            } else {
                StencilConfig::symmetric(StencilSide::uniform(
                    StencilFunc::NotEqual,
                    StencilOp::Zero,
                ))
            })
        } else {
            None
        }
    }

    /// Canonical key under the given dynamic capabilities: every group a
    /// backend sets at bind time is reset to its default, so keys that only
    /// differ there map to the same pipeline.
    pub fn normalized(&self, caps: DynCaps) -> Self {
        let mut key = *self;
        if caps.contains(DynCaps::TOPOLOGY_STENCIL) {
            key.topology = Topology::TriangleList;
            key.stencil_fill = false;
            key.stencil_test = false;
            key.edge_aa = false;
            key.stroke_stencil = StrokeStencil::Inactive;
        }
        if caps.contains(DynCaps::BLEND) {
            key.blend = CompositeOperationState::default();
        }
        if caps.contains(DynCaps::COLOR_WRITE) {
            key.color_write = true;
        }
        key
    }
}

/// Pipeline objects keyed by normalized state.
#[derive(Debug)]
pub struct PipelineCache<P> {
    pipelines: HashMap<PipelineKey, P>,
    caps: DynCaps,
}

impl<P> PipelineCache<P> {
    pub fn new(caps: DynCaps) -> Self {
        Self {
            pipelines: HashMap::default(),
            caps,
        }
    }

    pub fn caps(&self) -> DynCaps {
        self.caps
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn clear(&mut self) {
        self.pipelines.clear();
    }

    /// Looks up the pipeline for `key`, building it on first use.
    ///
    /// `create` receives the full key; the cache entry is stored under the
    /// normalized one.
    pub fn get_or_create(
        &mut self,
        key: &PipelineKey,
        create: impl FnOnce(&PipelineKey) -> P,
    ) -> &P {
        let normalized = key.normalized(self.caps);
        self.pipelines
            .entry(normalized)
            .or_insert_with(|| create(key))
    }
}
