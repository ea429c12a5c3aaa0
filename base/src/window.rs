use bedrock as br;

use crate::GraphicsInitializationError;

pub struct SurfaceInfo {
    pub(crate) fmt: br::vk::VkSurfaceFormatKHR,
    pub(crate) pres_mode: br::PresentMode,
    pub(crate) available_composite_alpha: br::CompositeAlpha,
}
impl SurfaceInfo {
    pub fn gather_info(
        pd: &impl br::PhysicalDevice,
        obj: &impl br::Surface,
    ) -> Result<Self, GraphicsInitializationError> {
        let mut fmq = br::FormatQueryPred::default();
        fmq.bit(32)
            .components(br::FormatComponents::RGBA)
            .elements(br::ElementType::UNORM);
        let fmt = pd
            .surface_formats(&obj)?
            .into_iter()
            .find(|sf| fmq.satisfy(sf.format))
            .ok_or(GraphicsInitializationError::NoSuitableSurfaceFormat)?;
        let pres_mode = select_present_mode(&pd.surface_present_modes(&obj)?);

        let caps = pd.surface_capabilities(&obj)?;
        let available_composite_alpha =
            if (caps.supportedCompositeAlpha & (br::CompositeAlpha::Inherit as u32)) != 0 {
                br::CompositeAlpha::Inherit
            } else {
                br::CompositeAlpha::Opaque
            };

        Ok(Self {
            fmt,
            pres_mode,
            available_composite_alpha,
        })
    }

    pub const fn format(&self) -> br::vk::VkFormat {
        self.fmt.format
    }
}

/// Picks a vsync'd present mode. FIFO is guaranteed by every implementation, so it is the fallback.
pub fn select_present_mode(available: &[br::PresentMode]) -> br::PresentMode {
    available
        .iter()
        .copied()
        .find(|&m| m == br::PresentMode::FIFO || m == br::PresentMode::Mailbox)
        .unwrap_or(br::PresentMode::FIFO)
}
