//! Packed buffer layout and capacity check

use log::debug;

use crate::{GlyphGeometry, Vertex};

/// A contiguous slice of the packed index buffer plus the vertex offset it is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DrawRange {
    pub first_index: u32,
    pub index_count: u32,
    pub vertex_offset: i32,
}
impl DrawRange {
    pub const fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    pub const fn index_range(&self) -> std::ops::Range<usize> {
        self.first_index as usize..(self.first_index + self.index_count) as usize
    }
}

/// Named sub-ranges of the packed buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedLayout {
    /// Vertex index where the correction stream begins.
    pub quad_vert_start: u32,
    /// Element index where the correction indices begin.
    pub quad_index_start: u32,
    /// Coarse fans (restart enabled).
    pub contour_triangles: DrawRange,
    /// Curvature correction triangle list, bounds quad excluded.
    pub correction_triangles: DrawRange,
    /// Trailing 4-index fan covering the glyph bounds.
    pub bounds_quad: DrawRange,
}

/// Fixed byte capacity of each device buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryCapacity {
    pub vertex_bytes: u64,
    pub index_bytes: u64,
}
impl GeometryCapacity {
    pub const DEFAULT_BYTES: u64 = 4096;

    pub const fn uniform(bytes: u64) -> Self {
        Self {
            vertex_bytes: bytes,
            index_bytes: bytes,
        }
    }
}
impl Default for GeometryCapacity {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_BYTES)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Vertex,
    Index,
}
impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Index => "index",
        })
    }
}

/// Packed geometry does not fit in the configured buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityError {
    pub stream: StreamKind,
    pub required_bytes: u64,
    pub capacity_bytes: u64,
}
impl std::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buffer capacity exceeded: {} bytes required, {} bytes available",
            self.stream, self.required_bytes, self.capacity_bytes
        )
    }
}
impl std::error::Error for CapacityError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutError {
    Capacity(CapacityError),
    /// The correction stream is too short to end with the bounds quad.
    MissingBoundsQuad { correction_indices: usize },
}
impl From<CapacityError> for LayoutError {
    fn from(value: CapacityError) -> Self {
        Self::Capacity(value)
    }
}
impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capacity(e) => std::fmt::Display::fmt(e, f),
            Self::MissingBoundsQuad { correction_indices } => write!(
                f,
                "correction stream has {correction_indices} indices, no trailing {}-vertex bounds quad",
                GlyphGeometry::BOUNDS_QUAD_VERTICES
            ),
        }
    }
}
impl std::error::Error for LayoutError {}

/// Concatenated streams ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub layout: PackedLayout,
}
impl PackedGeometry {
    pub fn vertex_bytes(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<Vertex>()) as _
    }

    pub fn index_bytes(&self) -> u64 {
        (self.indices.len() * std::mem::size_of::<u16>()) as _
    }

    /// Fails when either stream is larger than the buffer it would be copied into.
    pub fn fits_within(&self, capacity: &GeometryCapacity) -> Result<(), CapacityError> {
        check(StreamKind::Vertex, self.vertex_bytes(), capacity.vertex_bytes)?;
        check(StreamKind::Index, self.index_bytes(), capacity.index_bytes)
    }
}

fn check(stream: StreamKind, required_bytes: u64, capacity_bytes: u64) -> Result<(), CapacityError> {
    if required_bytes > capacity_bytes {
        return Err(CapacityError {
            stream,
            required_bytes,
            capacity_bytes,
        });
    }

    Ok(())
}

/// Concatenates `[coarse][correction]` for both vertices and indices and names the draw ranges.
///
/// Fails before copying anything when either stream exceeds its capacity, or when the correction
/// stream does not end with the bounds quad.
pub fn pack(geometry: &GlyphGeometry, capacity: &GeometryCapacity) -> Result<PackedGeometry, LayoutError> {
    let vertex_count = geometry.coarse.vertex_count() + geometry.correction.vertex_count();
    let index_count = geometry.coarse.index_count() + geometry.correction.index_count();
    check(
        StreamKind::Vertex,
        (vertex_count * std::mem::size_of::<Vertex>()) as _,
        capacity.vertex_bytes,
    )?;
    check(
        StreamKind::Index,
        (index_count * std::mem::size_of::<u16>()) as _,
        capacity.index_bytes,
    )?;

    let correction_indices = geometry.correction.index_count();
    let correction_triangle_indices = correction_indices
        .checked_sub(GlyphGeometry::BOUNDS_QUAD_VERTICES)
        .filter(|_| geometry.correction.vertex_count() >= GlyphGeometry::BOUNDS_QUAD_VERTICES)
        .ok_or(LayoutError::MissingBoundsQuad { correction_indices })?;

    let quad_vert_start = geometry.coarse.vertex_count() as u32;
    let quad_index_start = geometry.coarse.index_count() as u32;
    let bounds_first = quad_index_start + correction_triangle_indices as u32;
    let layout = PackedLayout {
        quad_vert_start,
        quad_index_start,
        contour_triangles: DrawRange {
            first_index: 0,
            index_count: quad_index_start,
            vertex_offset: 0,
        },
        correction_triangles: DrawRange {
            first_index: quad_index_start,
            index_count: correction_triangle_indices as _,
            vertex_offset: quad_vert_start as _,
        },
        bounds_quad: DrawRange {
            first_index: bounds_first,
            index_count: GlyphGeometry::BOUNDS_QUAD_VERTICES as _,
            vertex_offset: quad_vert_start as _,
        },
    };

    let mut vertices = Vec::with_capacity(vertex_count);
    vertices.extend_from_slice(&geometry.coarse.vertices);
    vertices.extend_from_slice(&geometry.correction.vertices);
    let mut indices = Vec::with_capacity(index_count);
    indices.extend_from_slice(&geometry.coarse.indices);
    indices.extend_from_slice(&geometry.correction.indices);

    debug!(
        "packed geometry: {} vertices ({} bytes), {} indices ({} bytes), layout {layout:?}",
        vertices.len(),
        vertex_count * std::mem::size_of::<Vertex>(),
        indices.len(),
        index_count * std::mem::size_of::<u16>()
    );

    Ok(PackedGeometry {
        vertices,
        indices,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tessellator::tests::{bounds_of, pt, rect_commands};
    use crate::{tessellate, FixedRect, GeometryStream, OutlineCommand};

    #[test]
    fn straight_outline_correction_draw_is_empty() {
        let cmds = rect_commands(0, 0, 8, 8);
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");
        let p = pack(&g, &GeometryCapacity::default()).expect("pack failed");

        assert_eq!(p.layout.quad_vert_start, 5);
        assert_eq!(p.layout.quad_index_start, 5);
        assert_eq!(
            p.layout.contour_triangles,
            DrawRange {
                first_index: 0,
                index_count: 5,
                vertex_offset: 0
            }
        );
        assert!(p.layout.correction_triangles.is_empty());
        assert_eq!(
            p.layout.bounds_quad,
            DrawRange {
                first_index: 5,
                index_count: 4,
                vertex_offset: 5
            }
        );
    }

    #[test]
    fn ranges_address_the_right_vertices() {
        let mut cmds = rect_commands(0, 0, 20, 20);
        cmds.push(OutlineCommand::MoveTo(pt(2, 2)));
        cmds.push(OutlineCommand::QuadTo {
            control: pt(5, 0),
            to: pt(8, 2),
        });
        cmds.push(OutlineCommand::LineTo(pt(8, 8)));
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");
        let p = pack(&g, &GeometryCapacity::default()).expect("pack failed");

        assert_eq!(p.layout.correction_triangles.index_count, 3);
        assert_eq!(p.layout.correction_triangles.first_index, p.layout.quad_index_start);
        assert_eq!(p.indices.len() as u32, p.layout.bounds_quad.first_index + 4);

        let r = p.layout.correction_triangles;
        let control = p.vertices[(p.indices[r.first_index as usize + 1] as i32 + r.vertex_offset) as usize];
        assert_eq!(control.position, [5.0, 0.0]);

        let q = p.layout.bounds_quad;
        let first_corner = p.vertices[(p.indices[q.first_index as usize] as i32 + q.vertex_offset) as usize];
        assert_eq!(first_corner.position, [0.0, 0.0]);
    }

    #[test]
    fn vertex_overflow_fails_fast() {
        let cmds = rect_commands(0, 0, 8, 8);
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");
        // 5 coarse + 4 bounds vertices = 180 bytes
        let cap = GeometryCapacity {
            vertex_bytes: 179,
            index_bytes: 4096,
        };

        assert_eq!(
            pack(&g, &cap),
            Err(LayoutError::Capacity(CapacityError {
                stream: StreamKind::Vertex,
                required_bytes: 180,
                capacity_bytes: 179
            }))
        );
        assert!(pack(&g, &GeometryCapacity::uniform(180)).is_ok());
    }

    #[test]
    fn index_overflow_fails_fast() {
        let cmds = rect_commands(0, 0, 8, 8);
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");
        let cap = GeometryCapacity {
            vertex_bytes: 4096,
            index_bytes: 16,
        };

        let Err(LayoutError::Capacity(e)) = pack(&g, &cap) else {
            panic!("index stream must not fit");
        };
        assert_eq!(e.stream, StreamKind::Index);
        assert_eq!(e.required_bytes, 18);
    }

    #[test]
    fn default_capacity_rejects_large_glyphs() {
        let mut cmds = vec![OutlineCommand::MoveTo(pt(0, 0))];
        for n in 0..250 {
            cmds.push(OutlineCommand::LineTo(pt(n, n % 7)));
        }
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        assert!(matches!(
            pack(&g, &GeometryCapacity::default()),
            Err(LayoutError::Capacity(CapacityError {
                stream: StreamKind::Vertex,
                ..
            }))
        ));
    }

    #[test]
    fn geometry_without_bounds_quad_is_rejected() {
        let g = GlyphGeometry {
            coarse: GeometryStream::new(),
            correction: GeometryStream::new(),
            curve_count: 0,
            bounds: FixedRect::default(),
        };

        assert_eq!(
            pack(&g, &GeometryCapacity::default()),
            Err(LayoutError::MissingBoundsQuad {
                correction_indices: 0
            })
        );
    }

    #[test]
    fn truncated_correction_stream_is_rejected() {
        let cmds = rect_commands(0, 0, 8, 8);
        let mut g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");
        g.correction.indices.truncate(3);

        assert_eq!(
            pack(&g, &GeometryCapacity::default()),
            Err(LayoutError::MissingBoundsQuad {
                correction_indices: 3
            })
        );
    }

    #[test]
    fn packed_geometry_checked_against_smaller_buffers() {
        let cmds = rect_commands(0, 0, 8, 8);
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");
        let p = pack(&g, &GeometryCapacity::uniform(8192)).expect("pack failed");

        assert_eq!(p.fits_within(&GeometryCapacity::default()), Ok(()));
        assert_eq!(
            p.fits_within(&GeometryCapacity {
                vertex_bytes: 4096,
                index_bytes: 16
            }),
            Err(CapacityError {
                stream: StreamKind::Index,
                required_bytes: 18,
                capacity_bytes: 16
            })
        );
        assert!(matches!(
            p.fits_within(&GeometryCapacity::uniform(100)),
            Err(CapacityError {
                stream: StreamKind::Vertex,
                required_bytes: 180,
                ..
            })
        ));
    }
}
