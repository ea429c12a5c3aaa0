use bedrock as br;
use br::{Device, Image, PhysicalDevice, SubmissionBatch, Swapchain};
use log::info;

use crate::mthelper::SharedRef;
use crate::{DeviceObject, Graphics, GraphicsInitializationError, SurfaceInfo};

pub trait PlatformPresenter {
    type BackBuffer: br::ImageView<ConcreteDevice = DeviceObject> + 'static;

    fn format(&self) -> br::vk::VkFormat;
    fn extent(&self) -> br::vk::VkExtent2D;
    fn back_buffer_count(&self) -> usize;
    fn back_buffer(&self, index: usize) -> Option<SharedRef<Self::BackBuffer>>;

    fn emit_initialize_back_buffer_commands(
        &self,
        recorder: &mut br::CmdRecord<impl br::CommandBuffer + br::VkHandleMut + ?Sized>,
    );
    fn next_back_buffer_index(&mut self) -> br::Result<u32>;
    fn requesting_back_buffer_layout(&self) -> (br::ImageLayout, br::PipelineStageFlags);
    /// Submits rendering for `back_buffer_index`, ordered after the image acquisition.
    fn submit(
        &mut self,
        g: &mut Graphics,
        last_render_fence: &mut (impl br::Fence + br::VkHandleMut),
        back_buffer_index: u32,
        render_submission: impl br::SubmissionBatch,
    ) -> br::Result<()>;
    fn present(&mut self, g: &mut Graphics, back_buffer_index: u32) -> br::Result<()>;
}

pub type SwapchainBackBuffer<Surface> = br::ImageViewObject<
    br::SwapchainImage<SharedRef<br::SwapchainObject<DeviceObject, Surface>>>,
>;

/// Swapchain with its back buffer views and the semaphores ordering acquire, render and present.
pub struct IntegratedSwapchain<Surface: br::Surface> {
    surface_info: SurfaceInfo,
    extent: br::vk::VkExtent2D,
    swapchain: SharedRef<br::SwapchainObject<DeviceObject, Surface>>,
    back_buffers: Vec<SharedRef<SwapchainBackBuffer<Surface>>>,
    rendering_order: br::SemaphoreObject<DeviceObject>,
    present_order: br::SemaphoreObject<DeviceObject>,
}
impl<Surface: br::Surface + 'static> IntegratedSwapchain<Surface> {
    pub fn new(
        g: &Graphics,
        surface: Surface,
        default_extent: br::vk::VkExtent2D,
    ) -> Result<Self, GraphicsInitializationError> {
        if !g
            .adapter()
            .surface_support(g.graphics_queue_family_index(), &surface)?
        {
            return Err(GraphicsInitializationError::PresentationUnsupported);
        }
        let surface_info = SurfaceInfo::gather_info(g.adapter(), &surface)?;

        let si = g.adapter().surface_capabilities(&surface)?;
        let extent = swapchain_extent(
            si.currentExtent,
            si.minImageExtent,
            si.maxImageExtent,
            default_extent,
        );
        let buffer_count = swapchain_image_count(si.minImageCount, si.maxImageCount);
        let pre_transform = if br::SurfaceTransform::Identity.contains(si.supportedTransforms) {
            br::SurfaceTransform::Identity
        } else {
            br::SurfaceTransform::Inherit
        };
        let mut cb = br::SwapchainBuilder::new(
            surface,
            buffer_count,
            &surface_info.fmt,
            &extent,
            br::ImageUsage::COLOR_ATTACHMENT,
        );
        cb.present_mode(surface_info.pres_mode)
            .composite_alpha(surface_info.available_composite_alpha)
            .pre_transform(pre_transform);
        let swapchain = SharedRef::new(g.device().clone().new_swapchain(cb)?);
        info!(
            "Swapchain: {}x{} with {buffer_count} images",
            extent.width, extent.height
        );

        let isr_c0 = br::ImageSubresourceRange::color(0, 0);
        let back_buffers = swapchain
            .get_images()?
            .into_iter()
            .map(|bb| {
                bb.clone_parent()
                    .create_view(None, None, &Default::default(), &isr_c0)
                    .map(SharedRef::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rendering_order: g.device().clone().new_semaphore()?,
            present_order: g.device().clone().new_semaphore()?,
            surface_info,
            extent,
            swapchain,
            back_buffers,
        })
    }
}
impl<Surface: br::Surface + 'static> PlatformPresenter for IntegratedSwapchain<Surface> {
    type BackBuffer = SwapchainBackBuffer<Surface>;

    fn format(&self) -> br::vk::VkFormat {
        self.surface_info.format()
    }

    fn extent(&self) -> br::vk::VkExtent2D {
        self.extent
    }

    fn back_buffer_count(&self) -> usize {
        self.back_buffers.len()
    }

    fn back_buffer(&self, index: usize) -> Option<SharedRef<Self::BackBuffer>> {
        self.back_buffers.get(index).cloned()
    }

    fn emit_initialize_back_buffer_commands(
        &self,
        recorder: &mut br::CmdRecord<impl br::CommandBuffer + br::VkHandleMut + ?Sized>,
    ) {
        let image_barriers = self
            .back_buffers
            .iter()
            .map(|v| {
                br::ImageMemoryBarrier::new(
                    &***v,
                    br::ImageSubresourceRange::color(0, 0),
                    br::ImageLayout::Undefined,
                    br::ImageLayout::PresentSrc,
                )
            })
            .collect::<Vec<_>>();

        recorder.pipeline_barrier(
            br::PipelineStageFlags::BOTTOM_OF_PIPE,
            br::PipelineStageFlags::BOTTOM_OF_PIPE,
            false,
            &[],
            &[],
            &image_barriers,
        );
    }

    fn next_back_buffer_index(&mut self) -> br::Result<u32> {
        self.swapchain.acquire_next(
            None,
            br::CompletionHandler::<br::FenceObject<DeviceObject>, _>::Queue(&self.rendering_order),
        )
    }

    fn requesting_back_buffer_layout(&self) -> (br::ImageLayout, br::PipelineStageFlags) {
        (
            br::ImageLayout::PresentSrc,
            br::PipelineStageFlags::TOP_OF_PIPE,
        )
    }

    fn submit(
        &mut self,
        g: &mut Graphics,
        last_render_fence: &mut (impl br::Fence + br::VkHandleMut),
        _back_buffer_index: u32,
        render_submission: impl br::SubmissionBatch,
    ) -> br::Result<()> {
        let render_waits = &[(
            &self.rendering_order,
            br::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        )];
        let render_signal = &[&self.present_order];
        let render_submission = render_submission
            .with_wait_semaphores(render_waits)
            .with_signal_semaphores(render_signal);

        g.submit_buffered_commands(&[render_submission], last_render_fence)
    }

    fn present(&mut self, g: &mut Graphics, back_buffer_index: u32) -> br::Result<()> {
        self.swapchain.queue_present(
            g.graphics_queue_mut(),
            back_buffer_index,
            &[&self.present_order],
        )
    }
}

/// Resolves the swapchain extent: the surface dictates it unless it reports the "any size" sentinel.
pub fn swapchain_extent(
    current: br::vk::VkExtent2D,
    min: br::vk::VkExtent2D,
    max: br::vk::VkExtent2D,
    default_extent: br::vk::VkExtent2D,
) -> br::vk::VkExtent2D {
    let width = if current.width == 0xffff_ffff {
        default_extent.width
    } else {
        current.width
    };
    let height = if current.height == 0xffff_ffff {
        default_extent.height
    } else {
        current.height
    };

    br::vk::VkExtent2D {
        width: width.max(min.width).min(max.width),
        height: height.max(min.height).min(max.height),
    }
}

/// Double buffering within the surface limits. A `max_count` of 0 means no upper limit.
pub fn swapchain_image_count(min_count: u32, max_count: u32) -> u32 {
    let count = 2.max(min_count);
    if max_count == 0 {
        count
    } else {
        count.min(max_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(width: u32, height: u32) -> br::vk::VkExtent2D {
        br::vk::VkExtent2D { width, height }
    }

    #[test]
    fn extent_follows_surface_when_defined() {
        let e = swapchain_extent(ext(640, 480), ext(1, 1), ext(4096, 4096), ext(800, 800));
        assert_eq!((e.width, e.height), (640, 480));
    }

    #[test]
    fn extent_uses_default_for_sentinel() {
        let e = swapchain_extent(
            ext(0xffff_ffff, 0xffff_ffff),
            ext(1, 1),
            ext(4096, 4096),
            ext(800, 600),
        );
        assert_eq!((e.width, e.height), (800, 600));
    }

    #[test]
    fn extent_is_clamped() {
        let e = swapchain_extent(
            ext(0xffff_ffff, 0xffff_ffff),
            ext(100, 100),
            ext(512, 512),
            ext(800, 50),
        );
        assert_eq!((e.width, e.height), (512, 100));
    }

    #[test]
    fn image_count() {
        assert_eq!(swapchain_image_count(1, 8), 2);
        assert_eq!(swapchain_image_count(3, 8), 3);
        assert_eq!(swapchain_image_count(1, 1), 1);
        assert_eq!(swapchain_image_count(2, 0), 2);
    }
}
