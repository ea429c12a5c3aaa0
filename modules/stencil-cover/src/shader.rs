//! Shader modules and vertex input of the glyph pipelines

use bedrock::{self as br, VkHandle, VulkanStructure};
use log::debug;
use peridot_glyph::DeviceObject;
use peridot_glyph_outline::Vertex;
use std::path::{Path, PathBuf};

pub const VERTEX_BINDINGS: [br::vk::VkVertexInputBindingDescription; 1] =
    [br::vk::VkVertexInputBindingDescription {
        binding: 0,
        stride: Vertex::STRIDE,
        inputRate: br::vk::VK_VERTEX_INPUT_RATE_VERTEX,
    }];
pub const VERTEX_ATTRIBUTES: [br::vk::VkVertexInputAttributeDescription; 2] = [
    br::vk::VkVertexInputAttributeDescription {
        location: 0,
        binding: 0,
        format: br::vk::VK_FORMAT_R32G32_SFLOAT,
        offset: Vertex::POSITION_OFFSET,
    },
    br::vk::VkVertexInputAttributeDescription {
        location: 1,
        binding: 0,
        format: br::vk::VK_FORMAT_R32G32B32_SFLOAT,
        offset: Vertex::BARY_OFFSET,
    },
];

#[derive(Debug)]
pub enum ShaderLoadError {
    Io(PathBuf, std::io::Error),
    VulkanError(br::VkResultBox),
}
impl From<br::VkResultBox> for ShaderLoadError {
    fn from(value: br::VkResultBox) -> Self {
        Self::VulkanError(value)
    }
}
impl std::fmt::Display for ShaderLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(p, e) => write!(f, "failed to read shader {}: {e}", p.display()),
            Self::VulkanError(r) => write!(f, "failed to create shader module: {r}"),
        }
    }
}
impl std::error::Error for ShaderLoadError {}

/// Specialization constants made of consecutive 32-bit scalars, ids starting at 0.
#[derive(Debug, Clone)]
pub struct SpecConstants {
    entries: Vec<br::vk::VkSpecializationMapEntry>,
    data: Vec<u8>,
}
impl SpecConstants {
    pub fn from_f32s(values: &[f32]) -> Self {
        let entries = (0..values.len())
            .map(|n| br::vk::VkSpecializationMapEntry {
                constantID: n as _,
                offset: (n * 4) as _,
                size: 4,
            })
            .collect();
        let data = values.iter().flat_map(|v| v.to_ne_bytes()).collect();

        Self { entries, data }
    }

    /// (target_width, target_height) for the vertex stage.
    pub fn target_size(extent: &br::vk::VkExtent2D) -> Self {
        Self::from_f32s(&[extent.width as _, extent.height as _])
    }

    /// RGBA fill color for the cover fragment stage.
    pub fn fill_color(rgba: [f32; 4]) -> Self {
        Self::from_f32s(&rgba)
    }

    pub fn entries(&self) -> &[br::vk::VkSpecializationMapEntry] {
        &self.entries
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn info(&self) -> br::vk::VkSpecializationInfo {
        br::vk::VkSpecializationInfo {
            mapEntryCount: self.entries.len() as _,
            pMapEntries: self.entries.as_ptr(),
            dataSize: self.data.len(),
            pData: self.data.as_ptr() as *const _ as _,
        }
    }
}

/// The compiled shader modules: `fan.vert`, `curve.vert`, `curve.frag` and `fill.frag`.
pub struct GlyphShaders {
    fan_vertex: br::ShaderModuleObject<DeviceObject>,
    curve_vertex: br::ShaderModuleObject<DeviceObject>,
    curve_fragment: br::ShaderModuleObject<DeviceObject>,
    fill_fragment: br::ShaderModuleObject<DeviceObject>,
}
impl GlyphShaders {
    pub fn load(device: &DeviceObject, dir: &Path) -> Result<Self, ShaderLoadError> {
        let load = |name: &str| -> Result<br::ShaderModuleObject<DeviceObject>, ShaderLoadError> {
            let path = dir.join(format!("{name}.spv"));
            let bytes = std::fs::read(&path).map_err(|e| ShaderLoadError::Io(path.clone(), e))?;
            debug!("shader {} ({} bytes)", path.display(), bytes.len());

            device.clone().new_shader_module(&bytes).map_err(From::from)
        };

        Ok(Self {
            fan_vertex: load("fan.vert")?,
            curve_vertex: load("curve.vert")?,
            curve_fragment: load("curve.frag")?,
            fill_fragment: load("fill.frag")?,
        })
    }

    /// Winding fans: vertex stage only, no color output.
    pub fn fan_stencil<'m>(&'m self, target_size: &'m SpecConstants) -> ShaderStages<'m> {
        ShaderStages {
            vertex: &self.fan_vertex,
            vertex_spec: Some(target_size),
            fragment: None,
        }
    }

    /// Correction triangles: the fragment stage discards outside the curve.
    pub fn curve_stencil<'m>(&'m self, target_size: &'m SpecConstants) -> ShaderStages<'m> {
        ShaderStages {
            vertex: &self.curve_vertex,
            vertex_spec: Some(target_size),
            fragment: Some((&self.curve_fragment, None)),
        }
    }

    pub fn cover<'m>(
        &'m self,
        target_size: &'m SpecConstants,
        fill_color: &'m SpecConstants,
    ) -> ShaderStages<'m> {
        ShaderStages {
            vertex: &self.fan_vertex,
            vertex_spec: Some(target_size),
            fragment: Some((&self.fill_fragment, Some(fill_color))),
        }
    }
}

pub struct ShaderStages<'m> {
    vertex: &'m br::ShaderModuleObject<DeviceObject>,
    vertex_spec: Option<&'m SpecConstants>,
    fragment: Option<(
        &'m br::ShaderModuleObject<DeviceObject>,
        Option<&'m SpecConstants>,
    )>,
}
impl<'m> ShaderStages<'m> {
    pub fn generate_vps<'d>(
        &'d self,
        primitive_topo: br::vk::VkPrimitiveTopology,
    ) -> br::VertexProcessingStages<'d, &'d Self> {
        let bindings = unsafe {
            // repr(transparent)
            std::slice::from_raw_parts(
                VERTEX_BINDINGS.as_ptr() as *const br::VertexInputBindingDescription,
                VERTEX_BINDINGS.len(),
            )
        };

        br::VertexProcessingStages::new(self, bindings, &VERTEX_ATTRIBUTES, primitive_topo)
    }
}
impl br::PipelineShaderStageProvider for ShaderStages<'_> {
    type ExtraStorage = (
        Option<br::vk::VkSpecializationInfo>,
        Option<br::vk::VkSpecializationInfo>,
    );

    fn base_struct(
        &self,
        extra_storage: &Self::ExtraStorage,
    ) -> Vec<br::vk::VkPipelineShaderStageCreateInfo> {
        let mut v = vec![br::vk::VkPipelineShaderStageCreateInfo {
            sType: br::vk::VkPipelineShaderStageCreateInfo::TYPE,
            pNext: core::ptr::null(),
            flags: 0,
            stage: br::ShaderStage::VERTEX.0,
            module: self.vertex.native_ptr(),
            pName: unsafe { core::ffi::CStr::from_bytes_with_nul_unchecked(b"main\0").as_ptr() },
            pSpecializationInfo: extra_storage
                .0
                .as_ref()
                .map_or_else(core::ptr::null, |x| x as _),
        }];

        if let Some((f, _)) = self.fragment {
            v.push(br::vk::VkPipelineShaderStageCreateInfo {
                sType: br::vk::VkPipelineShaderStageCreateInfo::TYPE,
                pNext: core::ptr::null(),
                flags: 0,
                stage: br::ShaderStage::FRAGMENT.0,
                module: f.native_ptr(),
                pName: unsafe {
                    core::ffi::CStr::from_bytes_with_nul_unchecked(b"main\0").as_ptr()
                },
                pSpecializationInfo: extra_storage
                    .1
                    .as_ref()
                    .map_or_else(core::ptr::null, |x| x as _),
            });
        }

        v
    }

    fn make_extras(&self) -> Self::ExtraStorage {
        (
            self.vertex_spec.map(SpecConstants::info),
            self.fragment
                .and_then(|(_, s)| s)
                .map(SpecConstants::info),
        )
    }
}
