use bedrock as br;
use br::PhysicalDevice;
use peridot_glyph::{
    Graphics, GraphicsInitializationError, InstanceObject, IntegratedSwapchain, NativeLinker,
};

use crate::x11::X11;

pub type Presenter = IntegratedSwapchain<br::SurfaceObject<InstanceObject>>;

/// Binds the engine to the X11 window via `VK_KHR_xcb_surface`.
pub struct NativeLink<'w> {
    pub window: &'w X11,
    pub default_extent: br::vk::VkExtent2D,
}
impl NativeLinker for NativeLink<'_> {
    type Presenter = Presenter;

    fn instance_extensions(&self) -> Vec<&str> {
        vec!["VK_KHR_surface", "VK_KHR_xcb_surface"]
    }

    fn device_extensions(&self) -> Vec<&str> {
        vec!["VK_KHR_swapchain"]
    }

    fn new_presenter(&self, g: &Graphics) -> Result<Presenter, GraphicsInitializationError> {
        let con = self.window.connection();
        if !g.adapter().xcb_presentation_support(
            g.graphics_queue_family_index(),
            con.get_raw_conn(),
            self.window.visual(),
        ) {
            return Err(GraphicsInitializationError::PresentationUnsupported);
        }
        let so = g
            .adapter()
            .new_surface_xcb(con.get_raw_conn(), self.window.window())?;

        IntegratedSwapchain::new(g, so, self.default_extent)
    }
}
