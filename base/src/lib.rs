use log::*;

use bedrock as br;
use br::{CommandBuffer, Device, SubmissionBatch};

mod graphics;
pub use self::graphics::{
    CommandBundle, DeviceObject, Graphics, GraphicsInitializationError, InstanceObject,
    MemoryTypeCatalog,
};
mod state_track;
use self::state_track::StateFence;
mod window;
pub use self::window::{select_present_mode, SurfaceInfo};
mod resource;
pub use self::resource::*;
mod input;
pub use self::input::*;
mod presenter;
pub use self::presenter::*;

pub mod mthelper;
use mthelper::SharedRef;

pub trait NativeLinker: Sized {
    type Presenter: PlatformPresenter;

    fn instance_extensions(&self) -> Vec<&str>;
    fn device_extensions(&self) -> Vec<&str>;

    fn new_presenter(&self, g: &Graphics) -> Result<Self::Presenter, GraphicsInitializationError>;
}

/// Records the commands producing one frame into the command buffer of a back buffer.
pub trait FrameRenderer {
    fn record_frame(
        &self,
        back_buffer_index: usize,
        rec: &mut br::CmdRecord<dyn br::VkHandleMut<Handle = br::vk::VkCommandBuffer>>,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// the swapchain no longer matches the surface at acquisition
    AcquireOutOfDate,
    /// the swapchain went stale between submission and presentation
    PresentOutOfDate,
}
impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcquireOutOfDate => f.write_str("render target out of date at acquisition"),
            Self::PresentOutOfDate => f.write_str("render target out of date at presentation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    Skipped(SkipReason),
}

/// Result codes meaning "the surface changed under us": recoverable by trying again next tick.
pub fn is_stale_surface(r: &br::VkResultBox) -> bool {
    r.0 == br::vk::VK_ERROR_OUT_OF_DATE_KHR || r.0 == br::vk::VK_SUBOPTIMAL_KHR
}

pub struct Engine<NL: NativeLinker> {
    presenter: NL::Presenter,
    frame_commands: CommandBundle<DeviceObject>,
    last_rendering_completion: StateFence<br::FenceObject<DeviceObject>>,
    pub(self) g: Graphics,
    _native_link: NL,
}
impl<NL: NativeLinker> Engine<NL> {
    pub fn new(
        name: &str,
        version: (u32, u32, u32),
        native_link: NL,
    ) -> Result<Self, GraphicsInitializationError> {
        let mut g = Graphics::new(
            name,
            version,
            native_link.instance_extensions(),
            native_link.device_extensions(),
        )?;
        let presenter = native_link.new_presenter(&g)?;
        g.submit_commands(|mut r| {
            presenter.emit_initialize_back_buffer_commands(&mut r);
            r
        })?;

        Ok(Self {
            frame_commands: CommandBundle::new(&g, presenter.back_buffer_count())?,
            last_rendering_completion: StateFence::new(g.device.clone())?,
            _native_link: native_link,
            g,
            presenter,
        })
    }
}
impl<NL: NativeLinker> Engine<NL> {
    pub const fn graphics(&self) -> &Graphics {
        &self.g
    }
    pub fn graphics_mut(&mut self) -> &mut Graphics {
        &mut self.g
    }

    pub const fn graphics_device(&self) -> &DeviceObject {
        &self.g.device
    }

    pub fn back_buffer_format(&self) -> br::vk::VkFormat {
        self.presenter.format()
    }
    pub fn back_buffer_extent(&self) -> br::vk::VkExtent2D {
        self.presenter.extent()
    }
    pub fn back_buffer_count(&self) -> usize {
        self.presenter.back_buffer_count()
    }
    pub fn back_buffer(
        &self,
        index: usize,
    ) -> Option<SharedRef<<NL::Presenter as PlatformPresenter>::BackBuffer>> {
        self.presenter.back_buffer(index)
    }
    pub fn iter_back_buffers<'s>(
        &'s self,
    ) -> impl Iterator<Item = SharedRef<<NL::Presenter as PlatformPresenter>::BackBuffer>> + 's
    {
        (0..self.back_buffer_count()).filter_map(move |x| self.back_buffer(x))
    }
    /// Blocks until every submitted frame has retired.
    pub fn wait_device_idle(&self) -> br::Result<()> {
        unsafe { self.g.device.wait() }
    }

    pub fn requesting_back_buffer_layout(&self) -> (br::ImageLayout, br::PipelineStageFlags) {
        self.presenter.requesting_back_buffer_layout()
    }
}
impl<NL: NativeLinker> Engine<NL> {
    /// Acquires a back buffer, re-records the frame and presents it.
    ///
    /// A stale render target skips the frame without submitting anything; every other error is
    /// returned to the caller.
    pub fn draw_next_frame(&mut self, renderer: &impl FrameRenderer) -> br::Result<FrameOutcome> {
        let bb_index = match self.presenter.next_back_buffer_index() {
            Err(e) if is_stale_surface(&e) => {
                debug!("frame skipped: {}", SkipReason::AcquireOutOfDate);
                return Ok(FrameOutcome::Skipped(SkipReason::AcquireOutOfDate));
            }
            r => r?,
        };
        StateFence::wait(&mut self.last_rendering_completion)?;
        trace!("frame on back buffer #{bb_index}");

        // only one frame is in flight after the wait, so every buffer in the pool is idle
        self.frame_commands.reset()?;
        {
            let mut rec = unsafe { self.frame_commands[bb_index as usize].begin()? };
            renderer.record_frame(bb_index as _, &mut rec.as_dyn_ref());
            rec.end()?;
        }

        let i = bb_index as usize;
        self.presenter.submit(
            &mut self.g,
            self.last_rendering_completion.inner_mut(),
            bb_index,
            br::EmptySubmissionBatch.with_command_buffers(&self.frame_commands[i..=i]),
        )?;
        unsafe {
            self.last_rendering_completion.signal();
        }

        match self.presenter.present(&mut self.g, bb_index) {
            Err(e) if is_stale_surface(&e) => {
                debug!("frame skipped: {}", SkipReason::PresentOutOfDate);
                Ok(FrameOutcome::Skipped(SkipReason::PresentOutOfDate))
            }
            r => r.map(|_| FrameOutcome::Presented),
        }
    }
}
impl<NL: NativeLinker> Drop for Engine<NL> {
    fn drop(&mut self) {
        info!("Shutting down: waiting for device idle");
        if let Err(e) = unsafe { self.g.device.wait() } {
            error!("device wait failed on shutdown: {e}");
        }
    }
}

pub struct LayoutedPipeline<Pipeline: br::Pipeline, Layout: br::PipelineLayout>(Pipeline, Layout);
impl<Pipeline: br::Pipeline, Layout: br::PipelineLayout> LayoutedPipeline<Pipeline, Layout> {
    pub const fn combine(p: Pipeline, layout: Layout) -> Self {
        Self(p, layout)
    }

    pub const fn layout(&self) -> &Layout {
        &self.1
    }

    pub fn bind(&self, rec: &mut br::CmdRecord<impl br::CommandBuffer + br::VkHandleMut + ?Sized>) {
        let _ = rec.bind_graphics_pipeline_pair(&self.0, &self.1);
    }
}
