//! Single glyph viewer: one font glyph rendered with Stencil-then-Cover into an X11 window

use bedrock as br;
use log::*;
use std::path::PathBuf;
use structopt::StructOpt;

use peridot_glyph::{
    event_queue, Engine, FrameOutcome, GraphicsInitializationError, KeyRepeatState, WindowEvent,
};
use peridot_glyph_outline::{pack, raster, tessellate, GeometryCapacity, LayoutError, TessellationError};
use peridot_glyph_stencil_cover::{
    GeometryBuffers, GlyphShaders, RenderTargetConfig, RendererError, ShaderLoadError,
    StencilCoverRenderer, UploadError,
};

mod font;
mod presenter;
mod x11;

/// X11 keycode of Escape on evdev keymaps
const ESCAPE_KEYCODE: u32 = 9;
/// Edge length of the `--ascii-preview` grid, in cells
const PREVIEW_SIZE: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba([f32; 4]);
impl std::str::FromStr for Rgba {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut c = [0.0; 4];
        let mut parts = s.split(',');
        for (n, v) in c.iter_mut().enumerate() {
            let p = parts
                .next()
                .ok_or_else(|| format!("expected 4 components, got {n}"))?;
            *v = p
                .trim()
                .parse()
                .map_err(|e| format!("invalid component {p:?}: {e}"))?;
        }
        if parts.next().is_some() {
            return Err(String::from("expected 4 components, got more"));
        }

        Ok(Self(c))
    }
}

fn first_char(s: &str) -> Result<char, String> {
    s.chars()
        .next()
        .ok_or_else(|| String::from("empty character argument"))
}

/// Renders one glyph of a font with the Stencil-then-Cover technique
#[derive(StructOpt, Debug)]
#[structopt(name = "glyph-viewer")]
pub struct Args {
    /// Font file (TrueType/OpenType)
    #[structopt(long, env = "GLYPH_VIEWER_FONT", parse(from_os_str))]
    font: PathBuf,
    /// Character to render (only the first one is used)
    #[structopt(long = "char", default_value = "R", parse(try_from_str = first_char))]
    character: char,
    /// Pixels per em
    #[structopt(long, default_value = "640")]
    ppem: f32,
    #[structopt(long, default_value = "800")]
    width: u16,
    #[structopt(long, default_value = "800")]
    height: u16,
    /// Byte capacity of each geometry buffer
    #[structopt(long, default_value = "4096")]
    buffer_capacity: u64,
    /// Directory holding the compiled SPIR-V modules
    #[structopt(long, parse(from_os_str))]
    shader_dir: Option<PathBuf>,
    /// Fill color as r,g,b,a
    #[structopt(long, default_value = "1,1,1,1")]
    fill_color: Rgba,
    /// Print a coverage preview of the glyph and exit without opening a window
    #[structopt(long)]
    ascii_preview: bool,
}
impl Args {
    fn shader_dir(&self) -> PathBuf {
        self.shader_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(env!("GLYPH_VIEWER_SHADER_DIR")))
    }

    fn render_target(&self) -> RenderTargetConfig {
        RenderTargetConfig {
            extent: br::vk::VkExtent2D {
                width: self.width as _,
                height: self.height as _,
            },
            fill_color: self.fill_color.0,
            capacity: GeometryCapacity::uniform(self.buffer_capacity),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Font(font::FontError),
    Tessellation(TessellationError),
    Layout(LayoutError),
    Window(x11::X11Error),
    GraphicsInit(GraphicsInitializationError),
    Upload(UploadError),
    Shader(ShaderLoadError),
    Renderer(RendererError),
    Vulkan(br::VkResultBox),
    Io(std::io::Error),
}
macro_rules! app_error_from {
    ($($v: ident($t: ty)),*) => {
        $(impl From<$t> for AppError {
            fn from(value: $t) -> Self {
                Self::$v(value)
            }
        })*
    };
}
app_error_from!(
    Font(font::FontError),
    Tessellation(TessellationError),
    Layout(LayoutError),
    Window(x11::X11Error),
    GraphicsInit(GraphicsInitializationError),
    Upload(UploadError),
    Shader(ShaderLoadError),
    Renderer(RendererError),
    Vulkan(br::VkResultBox),
    Io(std::io::Error)
);
impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Font(e) => write!(f, "font: {e}"),
            Self::Tessellation(e) => write!(f, "tessellation: {e}"),
            Self::Layout(e) => write!(f, "geometry packing: {e}"),
            Self::Window(e) => write!(f, "window: {e}"),
            Self::GraphicsInit(e) => write!(f, "graphics initialization: {e}"),
            Self::Upload(e) => write!(f, "geometry upload: {e}"),
            Self::Shader(e) => write!(f, "shader loading: {e}"),
            Self::Renderer(e) => write!(f, "renderer setup: {e}"),
            Self::Vulkan(e) => write!(f, "frame: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}
impl std::error::Error for AppError {}

fn main() {
    env_logger::init();
    let args = Args::from_args();

    let r = if args.ascii_preview {
        print_ascii_preview(&args)
    } else {
        run(&args)
    };
    if let Err(e) = r {
        error!("{e}");
        std::process::exit(1);
    }
}

fn print_ascii_preview(args: &Args) -> Result<(), AppError> {
    let ppem = args.ppem * PREVIEW_SIZE as f32 / args.width.max(1) as f32;
    let outline =
        font::load_glyph_outline(&args.font, args.character, ppem, (PREVIEW_SIZE, PREVIEW_SIZE))?;
    let geometry = tessellate(&outline.commands, &outline.bounds)?;
    let packed = pack(&geometry, &GeometryCapacity::uniform(args.buffer_capacity))?;

    let (_, coverage) = raster::rasterize(&packed, PREVIEW_SIZE, PREVIEW_SIZE);
    print!("{}", coverage.render_ascii());

    Ok(())
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = args.render_target();

    let outline = font::load_glyph_outline(
        &args.font,
        args.character,
        args.ppem,
        (config.extent.width, config.extent.height),
    )?;
    let geometry = tessellate(&outline.commands, &outline.bounds)?;
    let packed = pack(&geometry, &config.capacity)?;

    let window = x11::X11::init("Glyph Viewer", args.width, args.height)?;
    let (event_sender, events) = event_queue();

    let mut engine = Engine::new(
        "glyph-viewer",
        (0, 1, 0),
        presenter::NativeLink {
            window: &window,
            default_extent: config.extent,
        },
    )?;
    let buffers = GeometryBuffers::upload(engine.graphics_mut(), &packed, &config.capacity)?;
    let shaders = GlyphShaders::load(engine.graphics_device(), &args.shader_dir())?;
    let renderer = StencilCoverRenderer::new(&engine, &shaders, buffers, &config)?;
    // modules are baked into the pipelines
    drop(shaders);

    window.show()?;
    window.spawn_event_thread(event_sender)?;
    info!("Ready (Esc or closing the window quits)");

    let mut keys = KeyRepeatState::new();
    'frames: loop {
        for e in events.drain() {
            match e {
                WindowEvent::CloseRequested => break 'frames,
                WindowEvent::Resized { width, height } => {
                    info!("window resized to {width}x{height}; render target kept as is");
                }
                _ => {
                    let Some(press) = keys.apply(&e) else {
                        continue;
                    };
                    trace!("key {} (repeat={})", press.code, press.repeat);
                    if press.code == ESCAPE_KEYCODE && !press.repeat {
                        break 'frames;
                    }
                }
            }
        }

        if let FrameOutcome::Skipped(r) = engine.draw_next_frame(&renderer)? {
            trace!("no frame this tick: {r}");
        }
    }

    engine.wait_device_idle()?;
    drop(renderer);

    Ok(())
}
