//! Software Stencil-then-Cover rasterizer
//!
//! CPU reference for the GPU protocol: accumulates the same wrapping 8-bit winding counts from the packed
//! geometry, then resolves coverage through the bounds quad. Used by tests and by the ASCII preview.

use crate::{DrawRange, PackedGeometry, Vertex, PRIMITIVE_RESTART_INDEX};

/// Curve membership test on an interpolated bary tag; the zero tag always passes.
pub fn inside_curve(tag: [f32; 3]) -> bool {
    let u = 0.5 * tag[1] + tag[2];
    let v = tag[2];

    u * u <= v
}

#[derive(Clone, Copy)]
struct Edge {
    a: [f32; 2],
    b: [f32; 2],
}
impl Edge {
    fn eval(&self, p: [f32; 2]) -> f32 {
        (self.b[0] - self.a[0]) * (p[1] - self.a[1]) - (self.b[1] - self.a[1]) * (p[0] - self.a[0])
    }

    /// Pixels exactly on a top or left edge belong to the triangle.
    fn owns_boundary(&self) -> bool {
        let (dx, dy) = (self.b[0] - self.a[0], self.b[1] - self.a[1]);

        (dy == 0.0 && dx > 0.0) || dy < 0.0
    }

    fn covers(&self, w: f32) -> bool {
        w > 0.0 || (w == 0.0 && self.owns_boundary())
    }
}

/// Per-pixel wrapping 8-bit winding counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StencilGrid {
    width: u32,
    height: u32,
    values: Vec<u8>,
}
impl StencilGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0; (width * height) as usize],
        }
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.values[(x + y * self.width) as usize]
    }

    pub fn clear(&mut self) {
        self.values.fill(0);
    }

    /// Walks every pixel center covered by the triangle, handing the interpolated tag and the facing
    /// (`true` when the shoelace area is positive in y-down space).
    fn rasterize_triangle(&self, tri: [Vertex; 3], mut sink: impl FnMut(u32, u32, [f32; 3], bool)) {
        let [p0, p1, p2] = [tri[0].position, tri[1].position, tri[2].position];
        let area = Edge { a: p0, b: p1 }.eval(p2);
        if area == 0.0 {
            return;
        }
        let front = area > 0.0;
        // normalize to positive orientation so the interior is where every edge function is positive
        let ordered = if front { tri } else { [tri[0], tri[2], tri[1]] };
        let area = area.abs();
        let [a, b, c] = [ordered[0].position, ordered[1].position, ordered[2].position];
        let edges = [Edge { a: b, b: c }, Edge { a: c, b: a }, Edge { a, b }];

        let min_x = a[0].min(b[0]).min(c[0]).floor().max(0.0) as u32;
        let min_y = a[1].min(b[1]).min(c[1]).floor().max(0.0) as u32;
        let max_x = (a[0].max(b[0]).max(c[0]).ceil().max(0.0) as u32).min(self.width);
        let max_y = (a[1].max(b[1]).max(c[1]).ceil().max(0.0) as u32).min(self.height);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = [x as f32 + 0.5, y as f32 + 0.5];
                let w = edges.map(|e| e.eval(p));
                if !edges.iter().zip(w).all(|(e, w)| e.covers(w)) {
                    continue;
                }

                let l = w.map(|w| w / area);
                let mut tag = [0.0f32; 3];
                for (v, l) in ordered.iter().zip(l) {
                    for (t, b) in tag.iter_mut().zip(v.bary) {
                        *t += l * b;
                    }
                }
                sink(x, y, tag, front);
            }
        }
    }

    fn winding_step(&mut self, x: u32, y: u32, front: bool) {
        let v = &mut self.values[(x + y * self.width) as usize];
        *v = if front {
            v.wrapping_add(1)
        } else {
            v.wrapping_sub(1)
        };
    }

    fn vertex(geometry: &PackedGeometry, range: &DrawRange, index: u16) -> Vertex {
        geometry.vertices[(index as i32 + range.vertex_offset) as usize]
    }

    /// Coarse fans (one per contour, split at restart markers).
    pub fn accumulate_contours(&mut self, geometry: &PackedGeometry) {
        let range = geometry.layout.contour_triangles;
        let indices = &geometry.indices[range.index_range()];

        for fan in indices.split(|&i| i == PRIMITIVE_RESTART_INDEX) {
            let Some((&first, rest)) = fan.split_first() else {
                continue;
            };
            let origin = Self::vertex(geometry, &range, first);
            for pair in rest.windows(2) {
                let tri = [
                    origin,
                    Self::vertex(geometry, &range, pair[0]),
                    Self::vertex(geometry, &range, pair[1]),
                ];
                let mut hits = Vec::new();
                self.rasterize_triangle(tri, |x, y, _, front| hits.push((x, y, front)));
                for (x, y, front) in hits {
                    self.winding_step(x, y, front);
                }
            }
        }
    }

    /// Correction triangle list, discarding pixels that fail the curve test.
    pub fn accumulate_corrections(&mut self, geometry: &PackedGeometry) {
        let range = geometry.layout.correction_triangles;
        let indices = &geometry.indices[range.index_range()];

        for tri in indices.chunks_exact(3) {
            let tri = [
                Self::vertex(geometry, &range, tri[0]),
                Self::vertex(geometry, &range, tri[1]),
                Self::vertex(geometry, &range, tri[2]),
            ];
            let mut hits = Vec::new();
            self.rasterize_triangle(tri, |x, y, tag, front| {
                if inside_curve(tag) {
                    hits.push((x, y, front));
                }
            });
            for (x, y, front) in hits {
                self.winding_step(x, y, front);
            }
        }
    }

    /// Stage 0: clears and accumulates both streams.
    pub fn accumulate(&mut self, geometry: &PackedGeometry) {
        self.clear();
        self.accumulate_contours(geometry);
        self.accumulate_corrections(geometry);
    }

    /// Stage 1: pixels of the bounds quad whose winding count is not zero.
    pub fn cover(&self, geometry: &PackedGeometry) -> CoverageMask {
        let range = geometry.layout.bounds_quad;
        let q: Vec<_> = geometry.indices[range.index_range()]
            .iter()
            .map(|&i| Self::vertex(geometry, &range, i))
            .collect();
        let mut mask = CoverageMask {
            width: self.width,
            height: self.height,
            bits: vec![false; self.values.len()],
        };

        if q.len() == 4 {
            for tri in [[q[0], q[1], q[2]], [q[0], q[2], q[3]]] {
                self.rasterize_triangle(tri, |x, y, _, _| {
                    let i = (x + y * self.width) as usize;
                    mask.bits[i] = self.values[i] != 0;
                });
            }
        }

        mask
    }
}

/// Resolved coverage of one glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}
impl CoverageMask {
    pub fn covered(&self, x: u32, y: u32) -> bool {
        self.bits[(x + y * self.width) as usize]
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// One text line per pixel row: `#` covered, `.` background.
    pub fn render_ascii(&self) -> String {
        let mut s = String::with_capacity(((self.width + 1) * self.height) as usize);
        for row in self.bits.chunks(self.width as usize) {
            s.extend(row.iter().map(|&b| if b { '#' } else { '.' }));
            s.push('\n');
        }

        s
    }
}

/// Runs both stages on a fresh grid.
pub fn rasterize(geometry: &PackedGeometry, width: u32, height: u32) -> (StencilGrid, CoverageMask) {
    let mut grid = StencilGrid::new(width, height);
    grid.accumulate(geometry);
    let mask = grid.cover(geometry);

    (grid, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tessellator::tests::{bounds_of, pt, rect_commands};
    use crate::{pack, tessellate, BaryTag, GeometryCapacity, OutlineCommand};

    fn packed(cmds: &[OutlineCommand]) -> PackedGeometry {
        let g = tessellate(cmds, &bounds_of(cmds)).expect("tessellation failed");
        pack(&g, &GeometryCapacity::uniform(1 << 16)).expect("pack failed")
    }

    #[test]
    fn curve_test_classification() {
        assert!(inside_curve(BaryTag::ZERO.0));
        assert!(inside_curve(BaryTag::FIRST.0));
        assert!(inside_curve(BaryTag::THIRD.0));
        assert!(!inside_curve(BaryTag::SECOND.0));
        // chord midpoint lies inside, control side does not
        assert!(inside_curve([0.5, 0.0, 0.5]));
        assert!(!inside_curve([0.0, 0.9, 0.1]));
    }

    #[test]
    fn clockwise_rectangle_winds_to_one() {
        // clockwise on screen (y down)
        let p = packed(&rect_commands(2, 2, 10, 8));
        let (grid, mask) = rasterize(&p, 12, 12);

        for y in 0..12 {
            for x in 0..12 {
                let inside = (2..10).contains(&x) && (2..8).contains(&y);
                assert_eq!(grid.value(x, y), inside as u8, "stencil at ({x}, {y})");
                assert_eq!(mask.covered(x, y), inside, "coverage at ({x}, {y})");
            }
        }
        assert_eq!(mask.count(), 8 * 6);
    }

    #[test]
    fn reversed_winding_wraps_but_stays_covered() {
        let cmds = vec![
            OutlineCommand::MoveTo(pt(2, 2)),
            OutlineCommand::LineTo(pt(2, 8)),
            OutlineCommand::LineTo(pt(10, 8)),
            OutlineCommand::LineTo(pt(10, 2)),
            OutlineCommand::LineTo(pt(2, 2)),
        ];
        let p = packed(&cmds);
        let (grid, mask) = rasterize(&p, 12, 12);
        let (_, cw_mask) = rasterize(&packed(&rect_commands(2, 2, 10, 8)), 12, 12);

        assert_eq!(grid.value(5, 5), 255);
        assert_eq!(grid.value(0, 0), 0);
        assert_eq!(mask, cw_mask);
    }

    #[test]
    fn hole_cancels_winding() {
        let mut cmds = rect_commands(0, 0, 12, 12);
        // counter-clockwise inner contour
        cmds.extend([
            OutlineCommand::MoveTo(pt(4, 4)),
            OutlineCommand::LineTo(pt(4, 8)),
            OutlineCommand::LineTo(pt(8, 8)),
            OutlineCommand::LineTo(pt(8, 4)),
            OutlineCommand::LineTo(pt(4, 4)),
        ]);
        let (grid, mask) = rasterize(&packed(&cmds), 12, 12);

        assert_eq!(grid.value(1, 1), 1);
        assert_eq!(grid.value(5, 5), 0);
        assert!(!mask.covered(6, 6));
        assert!(mask.covered(10, 10));
        assert_eq!(mask.count(), 144 - 16);
    }

    #[test]
    fn degenerate_quad_adds_nothing_over_chord() {
        let chord = vec![
            OutlineCommand::MoveTo(pt(2, 2)),
            OutlineCommand::LineTo(pt(12, 2)),
            OutlineCommand::LineTo(pt(12, 10)),
            OutlineCommand::LineTo(pt(2, 10)),
            OutlineCommand::LineTo(pt(2, 2)),
        ];
        let mut curved = chord.clone();
        // control point on the chord midpoint
        curved[1] = OutlineCommand::QuadTo {
            control: pt(7, 2),
            to: pt(12, 2),
        };

        let (chord_grid, _) = rasterize(&packed(&chord), 16, 16);
        let (curved_grid, _) = rasterize(&packed(&curved), 16, 16);
        assert_eq!(chord_grid, curved_grid);
    }

    #[test]
    fn outward_bulge_adds_pixels() {
        let chord = rect_commands(2, 8, 18, 16);
        let mut curved = chord.clone();
        // top edge bulges upwards, away from the interior
        curved[1] = OutlineCommand::QuadTo {
            control: pt(10, 0),
            to: pt(18, 8),
        };

        let (_, chord_mask) = rasterize(&packed(&chord), 20, 20);
        let (_, curved_mask) = rasterize(&packed(&curved), 20, 20);
        assert!(curved_mask.count() > chord_mask.count());
        assert!(curved_mask.covered(10, 6));
        assert!(!chord_mask.covered(10, 6));
        // beyond the apex of the curve (y = 4)
        assert!(!curved_mask.covered(10, 2));
    }

    #[test]
    fn inward_bulge_removes_pixels() {
        let chord = rect_commands(2, 2, 18, 16);
        let mut curved = chord.clone();
        // top edge sags into the interior, apex at y = 6
        curved[1] = OutlineCommand::QuadTo {
            control: pt(10, 10),
            to: pt(18, 2),
        };

        let (chord_grid, chord_mask) = rasterize(&packed(&chord), 20, 20);
        let (curved_grid, curved_mask) = rasterize(&packed(&curved), 20, 20);
        assert!(curved_mask.count() < chord_mask.count());
        assert!(chord_mask.covered(10, 4));
        assert!(!curved_mask.covered(10, 4));
        assert_eq!(curved_grid.value(10, 4), 0);
        // below the apex both fills agree
        assert!(curved_mask.covered(10, 8));
        assert_eq!(curved_grid.value(10, 8), chord_grid.value(10, 8));
    }

    #[test]
    fn overlapping_contours_stay_covered() {
        let mut cmds = rect_commands(2, 2, 10, 10);
        cmds.extend(rect_commands(6, 6, 14, 14));
        let (grid, mask) = rasterize(&packed(&cmds), 16, 16);

        assert_eq!(grid.value(3, 3), 1);
        assert_eq!(grid.value(7, 7), 2);
        assert_eq!(grid.value(12, 12), 1);
        assert!(mask.covered(7, 7));
        assert_eq!(mask.count(), 64 + 64 - 16);
    }

    #[test]
    fn self_intersecting_lobes_wind_oppositely() {
        // bow tie crossing at (6, 6)
        let cmds = vec![
            OutlineCommand::MoveTo(pt(2, 2)),
            OutlineCommand::LineTo(pt(10, 10)),
            OutlineCommand::LineTo(pt(10, 2)),
            OutlineCommand::LineTo(pt(2, 10)),
            OutlineCommand::LineTo(pt(2, 2)),
        ];
        let (grid, mask) = rasterize(&packed(&cmds), 12, 12);

        let (left, right) = (grid.value(3, 6), grid.value(8, 6));
        assert_ne!(left, 0);
        assert_ne!(right, 0);
        assert_eq!(left.wrapping_add(right), 0);
        assert!(mask.covered(3, 6));
        assert!(mask.covered(8, 6));
        // between the lobes both fan triangles overlap and cancel
        assert_eq!(grid.value(5, 3), 0);
        assert!(!mask.covered(5, 3));
    }

    #[test]
    fn collinear_control_inside_outer_contour_keeps_coverage() {
        let outer = rect_commands(0, 0, 20, 20);
        let mut straight = outer.clone();
        straight.extend(rect_commands(5, 5, 15, 15));
        let mut curved = straight.clone();
        // off-center control point on the inner top edge
        curved[6] = OutlineCommand::QuadTo {
            control: pt(7, 5),
            to: pt(15, 5),
        };

        let (straight_grid, straight_mask) = rasterize(&packed(&straight), 20, 20);
        let (curved_grid, curved_mask) = rasterize(&packed(&curved), 20, 20);
        assert_eq!(curved_grid.value(10, 10), 2);
        assert_eq!(curved_grid.value(2, 2), 1);
        assert_eq!(curved_grid, straight_grid);
        assert_eq!(curved_mask, straight_mask);
        assert_eq!(curved_mask.count(), 400);
    }

    #[test]
    fn ascii_rendering_rows() {
        let (_, mask) = rasterize(&packed(&rect_commands(1, 1, 3, 2)), 4, 3);
        assert_eq!(mask.render_ascii(), "....\n.##.\n....\n");
    }
}
