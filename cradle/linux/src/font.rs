//! Font file → outline commands

use log::{info, trace};
use peridot_glyph_outline::{Fixed26_6, FixedPoint, FixedRect, OutlineCommand};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum FontError {
    Io(PathBuf, std::io::Error),
    Parse(ttf_parser::FaceParsingError),
    MissingGlyph(char),
    EmptyOutline(char),
}
impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(p, e) => write!(f, "failed to read font {}: {e}", p.display()),
            Self::Parse(e) => write!(f, "failed to parse font: {e}"),
            Self::MissingGlyph(c) => write!(f, "the font has no glyph for {c:?}"),
            Self::EmptyOutline(c) => write!(f, "the glyph for {c:?} has no outline"),
        }
    }
}
impl std::error::Error for FontError {}

/// Maps font units into the y-down render space of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineTransform {
    pub scale: f32,
    pub origin: (f32, f32),
}
impl OutlineTransform {
    /// Baseline origin at (1/10 of width, 4/5 of height).
    pub fn for_target(ppem: f32, units_per_em: u16, width: u32, height: u32) -> Self {
        Self {
            scale: ppem / units_per_em as f32,
            origin: (width as f32 / 10.0, height as f32 * 4.0 / 5.0),
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> FixedPoint {
        FixedPoint::new(
            Fixed26_6::from_f32(self.origin.0 + x * self.scale),
            Fixed26_6::from_f32(self.origin.1 - y * self.scale),
        )
    }
}

/// Outline commands of one glyph and the bounding box of every point they mention.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphOutline {
    pub commands: Vec<OutlineCommand>,
    pub bounds: FixedRect,
}

pub struct OutlineCollector {
    transform: OutlineTransform,
    commands: Vec<OutlineCommand>,
    bounds: Option<FixedRect>,
}
impl OutlineCollector {
    pub fn new(transform: OutlineTransform) -> Self {
        Self {
            transform,
            commands: Vec::new(),
            bounds: None,
        }
    }

    fn point(&mut self, x: f32, y: f32) -> FixedPoint {
        let p = self.transform.apply(x, y);
        match self.bounds {
            Some(ref mut b) => b.include(p),
            None => self.bounds = Some(FixedRect::at(p)),
        }

        p
    }

    fn push(&mut self, c: OutlineCommand) {
        trace!("outline: {c}");
        self.commands.push(c);
    }

    /// None when nothing was emitted.
    pub fn finish(self) -> Option<GlyphOutline> {
        let bounds = self.bounds?;

        Some(GlyphOutline {
            commands: self.commands,
            bounds,
        })
    }
}
impl ttf_parser::OutlineBuilder for OutlineCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        self.push(OutlineCommand::MoveTo(p));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        self.push(OutlineCommand::LineTo(p));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let control = self.point(x1, y1);
        let to = self.point(x, y);
        self.push(OutlineCommand::QuadTo { control, to });
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let control1 = self.point(x1, y1);
        let control2 = self.point(x2, y2);
        let to = self.point(x, y);
        self.push(OutlineCommand::CubeTo {
            control1,
            control2,
            to,
        });
    }

    // fans close every contour on their own
    fn close(&mut self) {}
}

pub fn load_glyph_outline(
    path: &Path,
    ch: char,
    ppem: f32,
    target: (u32, u32),
) -> Result<GlyphOutline, FontError> {
    let data = std::fs::read(path).map_err(|e| FontError::Io(path.to_owned(), e))?;
    let face = ttf_parser::Face::parse(&data, 0).map_err(FontError::Parse)?;
    let gid = face.glyph_index(ch).ok_or(FontError::MissingGlyph(ch))?;

    let mut collector = OutlineCollector::new(OutlineTransform::for_target(
        ppem,
        face.units_per_em(),
        target.0,
        target.1,
    ));
    face.outline_glyph(gid, &mut collector)
        .ok_or(FontError::EmptyOutline(ch))?;
    let outline = collector.finish().ok_or(FontError::EmptyOutline(ch))?;

    let (x0, y0, x1, y1) = outline.bounds.to_f32();
    info!("glyph {ch:?}: bounds ({x0}, {y0})-({x1}, {y1})");
    info!("glyph {ch:?}: {} outline commands", outline.commands.len());

    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttf_parser::OutlineBuilder;

    fn collector() -> OutlineCollector {
        OutlineCollector::new(OutlineTransform::for_target(100.0, 1000, 800, 600))
    }

    #[test]
    fn transform_flips_y_and_offsets_origin() {
        let t = OutlineTransform::for_target(640.0, 2048, 800, 800);
        assert_eq!(t.origin, (80.0, 640.0));
        assert_eq!(t.scale, 0.3125);

        let p = t.apply(0.0, 0.0);
        assert_eq!(p, FixedPoint::from_int(80, 640));
        let p = t.apply(64.0, 64.0);
        assert_eq!(p, FixedPoint::from_int(100, 620));
    }

    #[test]
    fn quantizes_to_sixty_fourths() {
        let t = OutlineTransform {
            scale: 1.0,
            origin: (0.0, 0.0),
        };
        assert_eq!(t.apply(0.5, 0.0).x, Fixed26_6(32));
        assert_eq!(t.apply(1.0 / 128.0 + 0.0001, 0.0).x, Fixed26_6(1));
    }

    #[test]
    fn collects_commands_in_order() {
        let mut c = collector();
        c.move_to(0.0, 0.0);
        c.line_to(100.0, 0.0);
        c.quad_to(150.0, 50.0, 100.0, 100.0);
        c.close();
        let o = c.finish().expect("outline emitted");

        assert_eq!(o.commands.len(), 3);
        assert!(o.commands[0].is_move());
        assert_eq!(o.commands[1], OutlineCommand::LineTo(FixedPoint::from_int(90, 480)));
        assert_eq!(
            o.commands[2],
            OutlineCommand::QuadTo {
                control: FixedPoint::from_int(95, 475),
                to: FixedPoint::from_int(90, 470),
            }
        );
    }

    #[test]
    fn bounds_include_control_points() {
        let mut c = collector();
        c.move_to(0.0, 0.0);
        c.quad_to(150.0, 50.0, 100.0, 100.0);
        let o = c.finish().expect("outline emitted");

        assert_eq!(o.bounds.min, FixedPoint::from_int(80, 470));
        assert_eq!(o.bounds.max, FixedPoint::from_int(95, 480));
    }

    #[test]
    fn cubic_segments_are_kept_for_rejection() {
        let mut c = collector();
        c.move_to(0.0, 0.0);
        c.curve_to(10.0, 0.0, 20.0, 10.0, 20.0, 20.0);
        let o = c.finish().expect("outline emitted");

        assert!(matches!(o.commands[1], OutlineCommand::CubeTo { .. }));
    }

    #[test]
    fn nothing_emitted() {
        assert!(collector().finish().is_none());
    }
}
