//! 26.6 Fixed-point scalar

/// Signed fixed-point scalar with 6 fractional bits, as emitted by TrueType outline scalers.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed26_6(pub i32);
impl Fixed26_6 {
    pub const FRACTION_BITS: u32 = 6;
    const FRACTION_MASK: i32 = (1 << Self::FRACTION_BITS) - 1;
    /// Denominator applied to the fractional bits when converting to render space.
    pub const FRACTION_DENOMINATOR: f32 = 127.0;

    pub const ZERO: Self = Self(0);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn from_int(v: i32) -> Self {
        Self(v << Self::FRACTION_BITS)
    }

    /// Quantizes a real value (round to nearest 1/64).
    pub fn from_f32(v: f32) -> Self {
        Self((v * (1 << Self::FRACTION_BITS) as f32).round() as i32)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    /// Floor of the value (arithmetic shift).
    pub const fn integer_part(self) -> i32 {
        self.0 >> Self::FRACTION_BITS
    }

    /// Raw fractional bits, always in `0..64`.
    pub const fn fraction_bits(self) -> i32 {
        self.0 & Self::FRACTION_MASK
    }

    /// Converts into render space: `integer_part + fraction_bits / 127`.
    ///
    /// This is not an exact `/64` conversion. Every coordinate of a glyph goes through the same mapping so
    /// the shape stays consistent with its own bounding box.
    pub fn to_f32(self) -> f32 {
        self.integer_part() as f32 + self.fraction_bits() as f32 / Self::FRACTION_DENOMINATOR
    }
}
impl From<Fixed26_6> for f32 {
    fn from(v: Fixed26_6) -> f32 {
        v.to_f32()
    }
}

/// A point in 26.6 fixed-point coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FixedPoint {
    pub x: Fixed26_6,
    pub y: Fixed26_6,
}
impl FixedPoint {
    pub const fn new(x: Fixed26_6, y: Fixed26_6) -> Self {
        Self { x, y }
    }

    pub const fn from_int(x: i32, y: i32) -> Self {
        Self::new(Fixed26_6::from_int(x), Fixed26_6::from_int(y))
    }

    pub fn to_f32(self) -> [f32; 2] {
        [self.x.to_f32(), self.y.to_f32()]
    }
}

/// Axis-aligned rectangle in 26.6 fixed-point coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FixedRect {
    pub min: FixedPoint,
    pub max: FixedPoint,
}
impl FixedRect {
    pub const fn new(min: FixedPoint, max: FixedPoint) -> Self {
        Self { min, max }
    }

    /// Degenerate rect at `p`; grow it with [`FixedRect::include`].
    pub const fn at(p: FixedPoint) -> Self {
        Self { min: p, max: p }
    }

    pub fn include(&mut self, p: FixedPoint) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// `(min_x, min_y, max_x, max_y)` in render space.
    pub fn to_f32(&self) -> (f32, f32, f32, f32) {
        (
            self.min.x.to_f32(),
            self.min.y.to_f32(),
            self.max.x.to_f32(),
            self.max.y.to_f32(),
        )
    }
}
