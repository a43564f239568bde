//! Porter-Duff composite operations and their blend factor expansions.

/// A single blend factor, mirroring the GPU blend factor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

/// Named composite operations, resolved to blend factors at draw time.
///
/// Colors are alpha-premultiplied by the time they reach the blender, which
/// is why `SourceOver` is `(One, OneMinusSrcAlpha)` rather than the
/// straight-alpha pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeOperation {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    Atop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
}

/// Fully resolved blend factors for one draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeOperationState {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl CompositeOperationState {
    /// Same factor pair for the color and alpha channels.
    pub fn with_func(src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            src_rgb: src,
            dst_rgb: dst,
            src_alpha: src,
            dst_alpha: dst,
        }
    }

    pub fn separate(
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Self {
        Self {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        }
    }
}

impl From<CompositeOperation> for CompositeOperationState {
    fn from(op: CompositeOperation) -> Self {
        use BlendFactor::*;
        let (src, dst) = match op {
            CompositeOperation::SourceOver => (One, OneMinusSrcAlpha),
            CompositeOperation::SourceIn => (DstAlpha, Zero),
            CompositeOperation::SourceOut => (OneMinusDstAlpha, Zero),
            CompositeOperation::Atop => (DstAlpha, OneMinusSrcAlpha),
            CompositeOperation::DestinationOver => (OneMinusDstAlpha, One),
            CompositeOperation::DestinationIn => (Zero, SrcAlpha),
            CompositeOperation::DestinationOut => (Zero, OneMinusSrcAlpha),
            CompositeOperation::DestinationAtop => (OneMinusDstAlpha, SrcAlpha),
            CompositeOperation::Lighter => (One, One),
            CompositeOperation::Copy => (One, Zero),
            CompositeOperation::Xor => (OneMinusDstAlpha, OneMinusSrcAlpha),
        };
        Self::with_func(src, dst)
    }
}

impl Default for CompositeOperationState {
    fn default() -> Self {
        CompositeOperation::SourceOver.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_over_premultiplied() {
        let s = CompositeOperationState::from(CompositeOperation::SourceOver);
        assert_eq!(s.src_rgb, BlendFactor::One);
        assert_eq!(s.dst_rgb, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(s.src_alpha, s.src_rgb);
        assert_eq!(s.dst_alpha, s.dst_rgb);
    }

    #[test]
    fn test_preset_table() {
        use BlendFactor::*;
        let cases = [
            (CompositeOperation::Lighter, One, One),
            (CompositeOperation::Copy, One, Zero),
            (CompositeOperation::Xor, OneMinusDstAlpha, OneMinusSrcAlpha),
            (CompositeOperation::DestinationIn, Zero, SrcAlpha),
        ];
        for (op, src, dst) in cases {
            let s = CompositeOperationState::from(op);
            assert_eq!(s.src_rgb, src, "{op:?}");
            assert_eq!(s.dst_rgb, dst, "{op:?}");
        }
    }

    #[test]
    fn test_separate_channels() {
        let s = CompositeOperationState::separate(
            BlendFactor::One,
            BlendFactor::Zero,
            BlendFactor::SrcAlpha,
            BlendFactor::DstAlpha,
        );
        assert_ne!(s.src_rgb, s.src_alpha);
    }
}
