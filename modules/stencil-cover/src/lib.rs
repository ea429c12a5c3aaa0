//! Stencil-then-Cover glyph rendering
//!
//! Subpass 0 accumulates a wrapping winding count into an 8-bit stencil attachment from the coarse
//! contour fans and the curvature-correction triangles. Subpass 1 paints the bounds quad wherever the
//! count is non-zero.

pub mod command;
mod blending;
pub use self::blending::*;
mod stencil;
pub use self::stencil::*;
mod shader;
pub use self::shader::*;
mod buffers;
pub use self::buffers::*;
mod renderer;
pub use self::renderer::*;
