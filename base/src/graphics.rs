use crate::mthelper::SharedRef;
use bedrock as br;
use br::{CommandBuffer, Device, Instance, PhysicalDevice, Queue, SubmissionBatch};
use log::{info, warn};

pub type InstanceObject = SharedRef<br::InstanceObject>;
pub type DeviceObject = SharedRef<br::DeviceObject<InstanceObject>>;

mod command_bundle;
pub use self::command_bundle::*;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

#[derive(Debug)]
pub enum GraphicsInitializationError {
    LayerEnumerationFailed(br::VkResultBox),
    ExtensionEnumerationFailed(br::VkResultBox),
    VulkanError(br::VkResultBox),
    NoPhysicalDevices,
    NoSuitableGraphicsQueue,
    PresentationUnsupported,
    NoSuitableSurfaceFormat,
    StencilFormatUnsupported(br::vk::VkFormat),
}
impl From<br::VkResultBox> for GraphicsInitializationError {
    fn from(value: br::VkResultBox) -> Self {
        Self::VulkanError(value)
    }
}
impl std::fmt::Display for GraphicsInitializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LayerEnumerationFailed(r) => write!(f, "vk layer enumeration failed: {r}"),
            Self::ExtensionEnumerationFailed(r) => {
                write!(f, "vk extension enumeration failed: {r}")
            }
            Self::VulkanError(r) => std::fmt::Display::fmt(r, f),
            Self::NoPhysicalDevices => f.write_str("no vulkan capable adapter found"),
            Self::NoSuitableGraphicsQueue => f.write_str("the adapter has no graphics queue"),
            Self::PresentationUnsupported => {
                f.write_str("the graphics queue cannot present to the window surface")
            }
            Self::NoSuitableSurfaceFormat => {
                f.write_str("the window surface offers no 32bit RGBA UNORM format")
            }
            Self::StencilFormatUnsupported(fmt) => write!(
                f,
                "format {fmt} cannot be used as a depth/stencil attachment on this device"
            ),
        }
    }
}
impl std::error::Error for GraphicsInitializationError {}

fn fixed_str(s: &[std::os::raw::c_char]) -> &str {
    let bytes = unsafe { std::slice::from_raw_parts(s.as_ptr().cast::<u8>(), s.len()) };

    std::ffi::CStr::from_bytes_until_nul(bytes)
        .ok()
        .and_then(|s| s.to_str().ok())
        .unwrap_or("<undecodable>")
}

/// Lists instance layers; true when the validation layer is usable for this build.
fn detect_validation_layer() -> Result<bool, GraphicsInitializationError> {
    let layers: Vec<_> = br::enumerate_layer_properties()
        .map_err(GraphicsInitializationError::LayerEnumerationFailed)?
        .into_iter()
        .collect();
    info!("Instance Layers: ");
    for l in &layers {
        info!("* {} :: {}", fixed_str(&l.layerName), l.specVersion);
    }

    let found = layers
        .iter()
        .any(|l| fixed_str(&l.layerName) == VALIDATION_LAYER);
    if cfg!(debug_assertions) && !found {
        warn!("Validation Layer is not found!");
    }

    Ok(cfg!(debug_assertions) && found)
}

/// Instance, adapter, device and the single graphics queue every submission goes through.
pub struct Graphics {
    pub(crate) adapter: br::PhysicalDeviceObject<InstanceObject>,
    pub(crate) device: DeviceObject,
    queue: parking_lot::Mutex<br::QueueObject<DeviceObject>>,
    queue_family: u32,
    transient_pool: br::CommandPoolObject<DeviceObject>,
    pub(crate) memory_types: MemoryTypeCatalog,
}
impl Graphics {
    pub(crate) fn new(
        app_name: &str,
        app_version: (u32, u32, u32),
        instance_extensions: Vec<&str>,
        device_extensions: Vec<&str>,
    ) -> Result<Self, GraphicsInitializationError> {
        let validation = detect_validation_layer()?;

        let mut ib = br::InstanceBuilder::new(app_name, app_version, "PeridotGlyph", (0, 1, 0));
        ib.add_extensions(instance_extensions.iter().copied());
        if validation {
            ib.add_layer(VALIDATION_LAYER);
        }
        let instance = SharedRef::new(ib.create()?);

        // first enumerated adapter; usually the primary GPU
        let adapter = instance
            .iter_physical_devices()?
            .next()
            .ok_or(GraphicsInitializationError::NoPhysicalDevices)?;
        info!("Adapter: {}", fixed_str(&adapter.properties().deviceName));
        let extension_count = adapter
            .enumerate_extension_properties(None)
            .map_err(GraphicsInitializationError::ExtensionEnumerationFailed)?
            .into_iter()
            .count();
        info!("{extension_count} device extensions available");

        let memory_types = MemoryTypeCatalog::new(&adapter);
        memory_types.log_summary();

        let queue_family = adapter
            .queue_family_properties()
            .find_matching_index(br::QueueFlags::GRAPHICS)
            .ok_or(GraphicsInitializationError::NoSuitableGraphicsQueue)?;
        let mut db = br::DeviceBuilder::new(&adapter);
        db.add_extensions(device_extensions.iter().copied())
            .add_queue(br::DeviceQueueCreateInfo::new(queue_family).add(0.0));
        if validation {
            db.add_layer(VALIDATION_LAYER);
        }
        let device = SharedRef::new(db.create()?.clone_parent());

        Ok(Self {
            transient_pool: br::CommandPoolBuilder::new(queue_family)
                .transient()
                .create(device.clone())?,
            queue: parking_lot::Mutex::new(device.clone().queue(queue_family, 0)),
            queue_family,
            adapter: adapter.clone_parent(),
            device,
            memory_types,
        })
    }

    /// Records one-time commands, submits them and blocks until the queue drained.
    pub fn submit_commands(
        &mut self,
        generator: impl FnOnce(
            br::CmdRecord<br::CommandBufferObject<DeviceObject>>,
        ) -> br::CmdRecord<br::CommandBufferObject<DeviceObject>>,
    ) -> br::Result<()> {
        let mut cb = TransientCommandBuffer::alloc(&mut self.transient_pool)?;
        generator(unsafe { cb.begin_once()? }).end()?;

        let q = self.queue.get_mut();
        q.submit(
            &[br::EmptySubmissionBatch.with_command_buffers(cb.as_slice())],
            None::<&mut br::FenceObject<DeviceObject>>,
        )?;
        q.wait()
    }

    pub fn submit_buffered_commands(
        &mut self,
        batches: &[impl br::SubmissionBatch],
        fence: &mut (impl br::Fence + br::VkHandleMut),
    ) -> br::Result<()> {
        self.queue.get_mut().submit(batches, Some(fence))
    }

    pub const fn adapter(&self) -> &br::PhysicalDeviceObject<InstanceObject> {
        &self.adapter
    }

    pub const fn device(&self) -> &DeviceObject {
        &self.device
    }

    pub const fn graphics_queue_family_index(&self) -> u32 {
        self.queue_family
    }

    pub fn graphics_queue_mut(&mut self) -> &mut br::QueueObject<DeviceObject> {
        self.queue.get_mut()
    }

    /// Fails unless `format` can back an optimal-tiled depth/stencil attachment.
    pub fn require_depth_stencil_format(
        &self,
        format: br::vk::VkFormat,
    ) -> Result<(), GraphicsInitializationError> {
        let props = self.adapter.format_properties(format);
        if (props.optimalTilingFeatures & br::vk::VK_FORMAT_FEATURE_DEPTH_STENCIL_ATTACHMENT_BIT)
            == 0
        {
            return Err(GraphicsInitializationError::StencilFormatUnsupported(format));
        }

        Ok(())
    }
}

/// Memory types of the adapter, by the two placements resources ask for.
pub struct MemoryTypeCatalog(Vec<br::vk::VkMemoryType>);
impl MemoryTypeCatalog {
    fn new(pd: &impl br::PhysicalDevice) -> Self {
        Self(pd.memory_properties().types().map(|t| t.clone()).collect())
    }

    fn find(&self, mask: u32, flags: br::MemoryPropertyFlags) -> Option<u32> {
        self.0
            .iter()
            .enumerate()
            .find(|(n, t)| (mask & (1 << n)) != 0 && (t.propertyFlags & flags.bits()) == flags.bits())
            .map(|(n, _)| n as u32)
    }

    pub fn device_local(&self, mask: u32) -> Option<u32> {
        self.find(mask, br::MemoryPropertyFlags::DEVICE_LOCAL)
    }

    /// Host-visible type index, and whether it is also coherent. Coherent types come first.
    pub fn host_visible(&self, mask: u32) -> Option<(u32, bool)> {
        self.find(
            mask,
            br::MemoryPropertyFlags::HOST_VISIBLE | br::MemoryPropertyFlags::HOST_COHERENT,
        )
        .map(|n| (n, true))
        .or_else(|| {
            self.find(mask, br::MemoryPropertyFlags::HOST_VISIBLE)
                .map(|n| (n, false))
        })
    }

    fn log_summary(&self) {
        info!("Memory Types: ");
        for (n, t) in self.0.iter().enumerate() {
            info!(
                "  #{n}: flags={:#x} heap={}",
                t.propertyFlags, t.heapIndex
            );
        }
    }
}
