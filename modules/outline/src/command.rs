use crate::FixedPoint;

/// One outline instruction of a glyph contour, in 26.6 fixed-point coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutlineCommand {
    MoveTo(FixedPoint),
    LineTo(FixedPoint),
    QuadTo {
        control: FixedPoint,
        to: FixedPoint,
    },
    /// Cubic segment. Never tessellated: rejected with [`crate::TessellationError::UnsupportedCubicSegment`].
    CubeTo {
        control1: FixedPoint,
        control2: FixedPoint,
        to: FixedPoint,
    },
}
impl OutlineCommand {
    /// The on-curve point this command ends at.
    pub const fn end_point(&self) -> FixedPoint {
        match *self {
            Self::MoveTo(p) | Self::LineTo(p) => p,
            Self::QuadTo { to, .. } | Self::CubeTo { to, .. } => to,
        }
    }

    pub const fn is_move(&self) -> bool {
        matches!(self, Self::MoveTo(_))
    }
}
impl std::fmt::Display for OutlineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn p(f: &mut std::fmt::Formatter<'_>, pt: &FixedPoint) -> std::fmt::Result {
            write!(f, "({}, {})", pt.x.to_f32(), pt.y.to_f32())
        }

        match self {
            Self::MoveTo(to) => {
                f.write_str("MoveTo ")?;
                p(f, to)
            }
            Self::LineTo(to) => {
                f.write_str("LineTo ")?;
                p(f, to)
            }
            Self::QuadTo { control, to } => {
                f.write_str("QuadTo ")?;
                p(f, control)?;
                f.write_str(" ")?;
                p(f, to)
            }
            Self::CubeTo {
                control1,
                control2,
                to,
            } => {
                f.write_str("CubeTo ")?;
                p(f, control1)?;
                f.write_str(" ")?;
                p(f, control2)?;
                f.write_str(" ")?;
                p(f, to)
            }
        }
    }
}
