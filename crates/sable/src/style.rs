//! Stroke and fill styling enums.

/// End cap shape for open stroked paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Shape drawn where two stroke segments meet at a corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Direction a closed sub-path runs in.
///
/// Screen space is y-down, so counter-clockwise corresponds to positive
/// signed area. Fills treat counter-clockwise sub-paths as solid and
/// clockwise ones as holes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Winding {
    #[default]
    Ccw,
    Cw,
}

/// Intent-level alias for [`Winding`] when punching holes into fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solidity {
    Solid,
    Hole,
}

impl From<Solidity> for Winding {
    fn from(s: Solidity) -> Self {
        match s {
            Solidity::Solid => Winding::Ccw,
            Solidity::Hole => Winding::Cw,
        }
    }
}
