//! Bary tag cycling

/// Per-vertex interpolation key consumed by the curve membership test.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct BaryTag(pub [f32; 3]);
impl BaryTag {
    /// Neutral tag: always evaluates as "inside the curve".
    pub const ZERO: Self = Self([0.0, 0.0, 0.0]);
    pub const FIRST: Self = Self([1.0, 0.0, 0.0]);
    pub const SECOND: Self = Self([0.0, 1.0, 0.0]);
    pub const THIRD: Self = Self([0.0, 0.0, 1.0]);
}

/// Three-state rotation assigning bary tags to consecutive coarse vertices of a contour.
///
/// `Start -> Positive -> Negative -> Positive -> ...`; reset to `Start` at every contour start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BaryCycle {
    #[default]
    Start,
    Positive,
    Negative,
}
impl BaryCycle {
    /// Tag handed out in this state.
    pub const fn tag(self) -> BaryTag {
        match self {
            Self::Start => BaryTag::SECOND,
            Self::Positive => BaryTag::FIRST,
            Self::Negative => BaryTag::THIRD,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Start | Self::Negative => Self::Positive,
            Self::Positive => Self::Negative,
        }
    }

    /// `(tag for the current vertex, state for the following one)`
    pub const fn advance(self) -> (BaryTag, Self) {
        (self.tag(), self.next())
    }

    pub const fn reset() -> Self {
        Self::Start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tag_after_reset_is_second_axis() {
        let (tag, _) = BaryCycle::reset().advance();
        assert_eq!(tag, BaryTag::SECOND);
    }

    #[test]
    fn cycle_alternates_after_start() {
        let mut state = BaryCycle::reset();
        let mut tags = Vec::new();
        for _ in 0..6 {
            let (t, n) = state.advance();
            tags.push(t);
            state = n;
        }

        assert_eq!(
            tags,
            [
                BaryTag::SECOND,
                BaryTag::FIRST,
                BaryTag::THIRD,
                BaryTag::FIRST,
                BaryTag::THIRD,
                BaryTag::FIRST
            ]
        );
    }

    #[test]
    fn start_is_never_revisited_without_reset() {
        let mut state = BaryCycle::Start;
        for _ in 0..10 {
            state = state.next();
            assert_ne!(state, BaryCycle::Start);
        }
    }
}
