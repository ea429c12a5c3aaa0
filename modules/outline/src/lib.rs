//! Glyph outline to Stencil-then-Cover geometry
//!
//! Converts an outline (MoveTo/LineTo/QuadTo sequence in 26.6 fixed point) into two geometry streams:
//! a coarse triangle-fan polygon per contour and a list of curvature-correction triangles, plus the
//! bounding quad used by the cover pass.

mod fixed;
pub use self::fixed::*;
mod command;
pub use self::command::*;
mod bary;
pub use self::bary::*;
mod tessellator;
pub use self::tessellator::*;
mod layout;
pub use self::layout::*;
pub mod raster;

/// Vertex layout shared by both geometry streams.
///
/// Matches the vertex input of the rendering pipelines: `position` at offset 0 (R32G32_SFLOAT),
/// `bary` at offset 8 (R32G32B32_SFLOAT), 20 bytes stride.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 2],
    pub bary: [f32; 3],
}
impl Vertex {
    pub const fn new(position: [f32; 2], bary: BaryTag) -> Self {
        Self {
            position,
            bary: bary.0,
        }
    }

    pub const POSITION_OFFSET: u32 = 0;
    pub const BARY_OFFSET: u32 = 8;
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as _;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout() {
        assert_eq!(Vertex::STRIDE, 20);
        assert_eq!(std::mem::align_of::<Vertex>(), 4);

        let v = Vertex::new([1.0, 2.0], BaryTag::SECOND);
        let base = &v as *const Vertex as usize;
        assert_eq!(&v.position as *const _ as usize - base, Vertex::POSITION_OFFSET as usize);
        assert_eq!(&v.bary as *const _ as usize - base, Vertex::BARY_OFFSET as usize);
    }
}
