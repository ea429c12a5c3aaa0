//! Outline Tessellator

use log::{debug, trace};

use crate::{BaryCycle, BaryTag, FixedPoint, FixedRect, OutlineCommand, Vertex};

/// Index value terminating one triangle fan and starting the next within a single draw.
pub const PRIMITIVE_RESTART_INDEX: u16 = 0xffff;
/// Vertices a stream can address without colliding with [`PRIMITIVE_RESTART_INDEX`].
pub const MAX_STREAM_VERTICES: usize = PRIMITIVE_RESTART_INDEX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TessellationError {
    /// Cubic segments are not supported.
    UnsupportedCubicSegment { command_index: usize },
    /// `LineTo`/`QuadTo` appeared before any `MoveTo`.
    ContourNotStarted { command_index: usize },
    /// A stream grew past the addressable 16-bit index range.
    VertexIndexOverflow { vertices: usize },
}
impl std::fmt::Display for TessellationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedCubicSegment { command_index } => write!(
                f,
                "cubic outline segment at command #{command_index} is not supported"
            ),
            Self::ContourNotStarted { command_index } => write!(
                f,
                "outline command #{command_index} draws before any MoveTo"
            ),
            Self::VertexIndexOverflow { vertices } => write!(
                f,
                "geometry stream needs {vertices} vertices, more than a 16-bit index can address"
            ),
        }
    }
}
impl std::error::Error for TessellationError {}

/// Ordered vertex list + index list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryStream {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}
impl GeometryStream {
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Appends a vertex and its sequential index.
    fn push_indexed(&mut self, v: Vertex) -> Result<u16, TessellationError> {
        if self.vertices.len() >= MAX_STREAM_VERTICES {
            return Err(TessellationError::VertexIndexOverflow {
                vertices: self.vertices.len() + 1,
            });
        }

        let index = self.vertices.len() as u16;
        self.vertices.push(v);
        self.indices.push(index);
        Ok(index)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Tessellation result for one glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphGeometry {
    /// Triangle-fan-per-contour polygon approximation, contours separated by [`PRIMITIVE_RESTART_INDEX`].
    pub coarse: GeometryStream,
    /// One triangle per quadratic segment, followed by the 4-vertex bounds quad.
    pub correction: GeometryStream,
    /// Number of quadratic segments (= correction triangles).
    pub curve_count: usize,
    pub bounds: FixedRect,
}
impl GlyphGeometry {
    pub const BOUNDS_QUAD_VERTICES: usize = 4;

    /// Indices of the correction triangles, excluding the trailing bounds quad.
    pub fn correction_triangle_index_count(&self) -> usize {
        self.curve_count * 3
    }

    /// The 4 trailing vertices of the correction stream, if it is long enough to hold them.
    pub fn bounds_quad(&self) -> Option<&[Vertex]> {
        let first = self
            .correction
            .vertices
            .len()
            .checked_sub(Self::BOUNDS_QUAD_VERTICES)?;

        Some(&self.correction.vertices[first..])
    }
}

/// Incremental outline walker.
#[derive(Debug, Default)]
pub struct Tessellator {
    coarse: GeometryStream,
    correction: GeometryStream,
    cycle: BaryCycle,
    contour_started: bool,
    curve_count: usize,
    processed: usize,
}
impl Tessellator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_coarse_vertex(&mut self, p: FixedPoint) -> Result<(), TessellationError> {
        let (tag, next) = self.cycle.advance();
        self.cycle = next;
        self.coarse.push_indexed(Vertex::new(p.to_f32(), tag))?;

        Ok(())
    }

    fn start_contour(&mut self, p: FixedPoint) -> Result<(), TessellationError> {
        // the leading contour needs no separator
        if !self.coarse.indices.is_empty() {
            self.coarse.indices.push(PRIMITIVE_RESTART_INDEX);
        }
        self.cycle = BaryCycle::reset();
        self.contour_started = true;

        self.push_coarse_vertex(p)
    }

    fn push_curve(&mut self, control: FixedPoint, to: FixedPoint) -> Result<(), TessellationError> {
        self.push_coarse_vertex(to)?;

        let n = self.coarse.vertices.len();
        let (v0, v1) = (self.coarse.vertices[n - 2], self.coarse.vertices[n - 1]);
        self.correction
            .push_indexed(Vertex::new(v0.position, BaryTag::FIRST))?;
        self.correction
            .push_indexed(Vertex::new(control.to_f32(), BaryTag::SECOND))?;
        self.correction
            .push_indexed(Vertex::new(v1.position, BaryTag::THIRD))?;
        self.curve_count += 1;

        Ok(())
    }

    /// Feeds the next outline command.
    pub fn push(&mut self, command: &OutlineCommand) -> Result<(), TessellationError> {
        let command_index = self.processed;
        self.processed += 1;
        trace!("segment #{command_index}: {command}");

        match *command {
            OutlineCommand::MoveTo(p) => self.start_contour(p),
            OutlineCommand::LineTo(_) | OutlineCommand::QuadTo { .. } if !self.contour_started => {
                Err(TessellationError::ContourNotStarted { command_index })
            }
            OutlineCommand::LineTo(p) => self.push_coarse_vertex(p),
            OutlineCommand::QuadTo { control, to } => self.push_curve(control, to),
            OutlineCommand::CubeTo { .. } => {
                Err(TessellationError::UnsupportedCubicSegment { command_index })
            }
        }
    }

    /// Appends the bounds quad and returns both streams.
    pub fn finish(mut self, bounds: &FixedRect) -> Result<GlyphGeometry, TessellationError> {
        let (min_x, min_y, max_x, max_y) = bounds.to_f32();
        for p in [
            [min_x, min_y],
            [min_x, max_y],
            [max_x, max_y],
            [max_x, min_y],
        ] {
            self.correction.push_indexed(Vertex::new(p, BaryTag::ZERO))?;
        }

        debug!(
            "tessellated {} commands: coarse {} verts/{} indices, correction {} curves ({} verts/{} indices incl. bounds quad)",
            self.processed,
            self.coarse.vertex_count(),
            self.coarse.index_count(),
            self.curve_count,
            self.correction.vertex_count(),
            self.correction.index_count()
        );

        Ok(GlyphGeometry {
            coarse: self.coarse,
            correction: self.correction,
            curve_count: self.curve_count,
            bounds: *bounds,
        })
    }
}

/// Tessellates a whole outline.
pub fn tessellate<'c>(
    commands: impl IntoIterator<Item = &'c OutlineCommand>,
    bounds: &FixedRect,
) -> Result<GlyphGeometry, TessellationError> {
    let mut t = Tessellator::new();
    for c in commands {
        t.push(c)?;
    }

    t.finish(bounds)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn pt(x: i32, y: i32) -> FixedPoint {
        FixedPoint::from_int(x, y)
    }

    pub(crate) fn rect_commands(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<OutlineCommand> {
        vec![
            OutlineCommand::MoveTo(pt(x0, y0)),
            OutlineCommand::LineTo(pt(x1, y0)),
            OutlineCommand::LineTo(pt(x1, y1)),
            OutlineCommand::LineTo(pt(x0, y1)),
            OutlineCommand::LineTo(pt(x0, y0)),
        ]
    }

    pub(crate) fn bounds_of(commands: &[OutlineCommand]) -> FixedRect {
        let mut r = FixedRect::at(commands[0].end_point());
        for c in commands {
            match *c {
                OutlineCommand::QuadTo { control, to } => {
                    r.include(control);
                    r.include(to);
                }
                ref c => r.include(c.end_point()),
            }
        }
        r
    }

    #[test]
    fn straight_outline_has_only_bounds_quad() {
        let cmds = rect_commands(2, 2, 10, 8);
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        assert_eq!(g.curve_count, 0);
        assert_eq!(g.correction.vertex_count(), 4);
        assert_eq!(g.correction.indices, [0, 1, 2, 3]);
        assert_eq!(g.correction_triangle_index_count(), 0);
        assert_eq!(g.coarse.vertex_count(), 5);
        assert_eq!(g.coarse.indices, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn quadratic_segments_produce_three_plus_four() {
        let cmds = vec![
            OutlineCommand::MoveTo(pt(0, 0)),
            OutlineCommand::QuadTo {
                control: pt(5, -4),
                to: pt(10, 0),
            },
            OutlineCommand::LineTo(pt(10, 10)),
            OutlineCommand::QuadTo {
                control: pt(5, 14),
                to: pt(0, 10),
            },
            OutlineCommand::QuadTo {
                control: pt(-4, 5),
                to: pt(0, 0),
            },
        ];
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        assert_eq!(g.curve_count, 3);
        assert_eq!(g.correction.vertex_count(), 3 * 3 + 4);
        assert_eq!(g.correction.index_count(), 3 * 3 + 4);
        assert_eq!(g.correction_triangle_index_count(), 9);
        assert_eq!(&g.correction.indices[9..], &[9, 10, 11, 12]);
    }

    #[test]
    fn correction_triangle_spans_chord_and_control() {
        let cmds = vec![
            OutlineCommand::MoveTo(pt(0, 0)),
            OutlineCommand::QuadTo {
                control: pt(5, -4),
                to: pt(10, 0),
            },
        ];
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        let tri = &g.correction.vertices[..3];
        assert_eq!(tri[0], Vertex::new([0.0, 0.0], BaryTag::FIRST));
        assert_eq!(tri[1], Vertex::new([5.0, -4.0], BaryTag::SECOND));
        assert_eq!(tri[2], Vertex::new([10.0, 0.0], BaryTag::THIRD));
        // coarse stream keeps the chord end point, not the control point
        assert_eq!(g.coarse.vertices[1].position, [10.0, 0.0]);
    }

    #[test]
    fn bounds_quad_corner_order_and_zero_tag() {
        let cmds = rect_commands(1, 3, 7, 9);
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        let q = g.bounds_quad().expect("tessellator always appends the bounds quad");
        let positions: Vec<_> = q.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            [[1.0, 3.0], [1.0, 9.0], [7.0, 9.0], [7.0, 3.0]]
        );
        assert!(q.iter().all(|v| v.bary == BaryTag::ZERO.0));
    }

    #[test]
    fn short_correction_stream_has_no_bounds_quad() {
        let g = GlyphGeometry {
            coarse: GeometryStream::new(),
            correction: GeometryStream {
                vertices: vec![Vertex::default(); 3],
                indices: vec![0, 1, 2],
            },
            curve_count: 1,
            bounds: FixedRect::default(),
        };

        assert_eq!(g.bounds_quad(), None);
    }

    #[test]
    fn restart_separates_contours_only() {
        let mut cmds = rect_commands(0, 0, 10, 10);
        cmds.extend(rect_commands(3, 3, 6, 6));
        cmds.extend(rect_commands(20, 0, 30, 10));
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        let restarts = g
            .coarse
            .indices
            .iter()
            .filter(|&&i| i == PRIMITIVE_RESTART_INDEX)
            .count();
        assert_eq!(restarts, 2);
        assert_ne!(g.coarse.indices[0], PRIMITIVE_RESTART_INDEX);
        assert!(!g
            .coarse
            .indices
            .windows(2)
            .any(|w| w[0] == PRIMITIVE_RESTART_INDEX && w[1] == PRIMITIVE_RESTART_INDEX));
        assert_eq!(g.coarse.indices[5], PRIMITIVE_RESTART_INDEX);
        assert_eq!(g.coarse.indices[6], 5);
    }

    #[test]
    fn consecutive_moves_never_emit_adjacent_sentinels() {
        let cmds = vec![
            OutlineCommand::MoveTo(pt(0, 0)),
            OutlineCommand::MoveTo(pt(1, 1)),
            OutlineCommand::MoveTo(pt(2, 2)),
            OutlineCommand::LineTo(pt(3, 2)),
        ];
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        assert_eq!(
            g.coarse.indices,
            [0, PRIMITIVE_RESTART_INDEX, 1, PRIMITIVE_RESTART_INDEX, 2, 3]
        );
    }

    #[test]
    fn bary_cycle_restarts_per_contour() {
        let mut cmds = rect_commands(0, 0, 10, 10);
        cmds.extend(rect_commands(3, 3, 6, 6));
        let g = tessellate(&cmds, &bounds_of(&cmds)).expect("tessellation failed");

        let tags: Vec<_> = g.coarse.vertices.iter().map(|v| BaryTag(v.bary)).collect();
        let contour = [
            BaryTag::SECOND,
            BaryTag::FIRST,
            BaryTag::THIRD,
            BaryTag::FIRST,
            BaryTag::THIRD,
        ];
        assert_eq!(&tags[..5], &contour);
        assert_eq!(&tags[5..], &contour);
    }

    #[test]
    fn cubic_is_rejected() {
        let cmds = vec![
            OutlineCommand::MoveTo(pt(0, 0)),
            OutlineCommand::LineTo(pt(4, 0)),
            OutlineCommand::CubeTo {
                control1: pt(5, 1),
                control2: pt(6, 2),
                to: pt(7, 3),
            },
        ];

        assert_eq!(
            tessellate(&cmds, &bounds_of(&cmds)),
            Err(TessellationError::UnsupportedCubicSegment { command_index: 2 })
        );
    }

    #[test]
    fn drawing_before_move_is_rejected() {
        let cmds = vec![OutlineCommand::LineTo(pt(1, 1))];

        assert_eq!(
            tessellate(&cmds, &FixedRect::default()),
            Err(TessellationError::ContourNotStarted { command_index: 0 })
        );
    }

    #[test]
    fn index_overflow_is_reported() {
        let mut t = Tessellator::new();
        t.push(&OutlineCommand::MoveTo(pt(0, 0)))
            .expect("move failed");
        for n in 1..MAX_STREAM_VERTICES {
            t.push(&OutlineCommand::LineTo(pt(n as i32 % 100, 0)))
                .expect("line failed");
        }

        assert_eq!(
            t.push(&OutlineCommand::LineTo(pt(1, 1))),
            Err(TessellationError::VertexIndexOverflow {
                vertices: MAX_STREAM_VERTICES + 1
            })
        );
    }
}
