//! Stencil-then-Cover rendering: winding accumulation subpass, then the cover subpass

use bedrock as br;
use br::{Device, ImageSubresourceSlice};
use log::{debug, info};
use peridot_glyph::mthelper::SharedRef;
use peridot_glyph::{
    DeviceObject, Engine, FrameRenderer, GraphicsInitializationError, LayoutedPipeline,
    NativeLinker, ResourceAllocationError,
};
use peridot_glyph_outline::{GeometryCapacity, PackedLayout};

use crate::blending::ColorAttachmentBlending;
use crate::buffers::GeometryBuffers;
use crate::command::{
    BindGeometry, GraphicsCommand, GraphicsCommandCombiner, InRenderPass, NextSubpass, RangeDraw,
    Recording,
};
use crate::shader::{GlyphShaders, SpecConstants};
use crate::stencil::{StencilState, WindingFacing};

pub const STENCIL_FORMAT: br::vk::VkFormat = br::vk::VK_FORMAT_S8_UINT;

#[derive(Debug, Clone)]
pub struct RenderTargetConfig {
    /// requested extent; the surface may impose another one
    pub extent: br::vk::VkExtent2D,
    pub fill_color: [f32; 4],
    pub clear_color: [f32; 4],
    pub capacity: GeometryCapacity,
}
impl Default for RenderTargetConfig {
    fn default() -> Self {
        Self {
            extent: br::vk::VkExtent2D {
                width: 800,
                height: 800,
            },
            fill_color: [1.0; 4],
            clear_color: [0.0, 0.0, 0.0, 1.0],
            capacity: GeometryCapacity::default(),
        }
    }
}

#[derive(Debug)]
pub enum RendererError {
    VulkanError(br::VkResultBox),
    Allocation(ResourceAllocationError),
    Initialization(GraphicsInitializationError),
}
impl From<br::VkResultBox> for RendererError {
    fn from(value: br::VkResultBox) -> Self {
        Self::VulkanError(value)
    }
}
impl From<ResourceAllocationError> for RendererError {
    fn from(value: ResourceAllocationError) -> Self {
        Self::Allocation(value)
    }
}
impl From<GraphicsInitializationError> for RendererError {
    fn from(value: GraphicsInitializationError) -> Self {
        Self::Initialization(value)
    }
}
impl std::fmt::Display for RendererError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VulkanError(r) => write!(f, "vulkan error: {r}"),
            Self::Allocation(e) => write!(f, "allocation failed: {e}"),
            Self::Initialization(e) => std::fmt::Display::fmt(e, f),
        }
    }
}
impl std::error::Error for RendererError {}

type GlyphPipeline = LayoutedPipeline<
    br::PipelineObject<DeviceObject>,
    SharedRef<br::PipelineLayoutObject<DeviceObject>>,
>;
type Framebuffer = br::FramebufferObject<
    DeviceObject,
    SharedRef<dyn br::ImageView<ConcreteDevice = DeviceObject>>,
>;

/// The draw calls of one frame, derived from the named ranges of the packed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDraws {
    pub contours: Option<RangeDraw>,
    pub corrections: Option<RangeDraw>,
    pub cover: Option<RangeDraw>,
}
impl FrameDraws {
    pub const fn of_layout(layout: &PackedLayout) -> Self {
        Self {
            contours: RangeDraw::of(&layout.contour_triangles),
            corrections: RangeDraw::of(&layout.correction_triangles),
            cover: RangeDraw::of(&layout.bounds_quad),
        }
    }
}

pub struct StencilCoverRenderer {
    render_pass: br::RenderPassObject<DeviceObject>,
    framebuffers: Vec<Framebuffer>,
    /// indexed by [`WindingFacing`]
    fan_pipelines: [GlyphPipeline; 2],
    /// indexed by [`WindingFacing`]
    curve_pipelines: [GlyphPipeline; 2],
    cover_pipeline: GlyphPipeline,
    _stencil_buffer_view: SharedRef<br::ImageViewObject<peridot_glyph::Image>>,
    geometry: GeometryBuffers,
    draws: FrameDraws,
    extent: br::vk::VkExtent2D,
    clear_color: [f32; 4],
}
impl StencilCoverRenderer {
    pub fn new<NL: NativeLinker>(
        e: &Engine<NL>,
        shaders: &GlyphShaders,
        geometry: GeometryBuffers,
        config: &RenderTargetConfig,
    ) -> Result<Self, RendererError> {
        let g = e.graphics();
        g.require_depth_stencil_format(STENCIL_FORMAT)?;
        let extent = e.back_buffer_extent();
        let (target_layout, target_layout_transition_stage) = e.requesting_back_buffer_layout();

        let attachments = [
            br::AttachmentDescription::new(e.back_buffer_format(), target_layout, target_layout)
                .color_memory_op(br::LoadOp::Clear, br::StoreOp::Store),
            br::AttachmentDescription::new(
                STENCIL_FORMAT,
                br::ImageLayout::Undefined,
                br::ImageLayout::DepthStencilReadOnlyOpt,
            )
            .stencil_load_op(br::LoadOp::Clear),
        ];
        let subpasses = [
            br::SubpassDescription::new()
                .depth_stencil(1, br::ImageLayout::DepthStencilAttachmentOpt),
            br::SubpassDescription::new()
                .add_color_output(0, br::ImageLayout::ColorAttachmentOpt, None)
                .depth_stencil(1, br::ImageLayout::DepthStencilReadOnlyOpt),
        ];
        let spdep_entry = br::vk::VkSubpassDependency {
            srcSubpass: br::vk::VK_SUBPASS_EXTERNAL,
            dstSubpass: 0,
            srcStageMask: target_layout_transition_stage.0,
            // clears write at load time, so the transition must finish before early fragment tests
            dstStageMask: br::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                .early_fragment_tests()
                .0,
            srcAccessMask: 0,
            dstAccessMask: br::AccessFlags::COLOR_ATTACHMENT.write
                | br::AccessFlags::DEPTH_STENCIL_ATTACHMENT.write,
            dependencyFlags: br::vk::VK_DEPENDENCY_BY_REGION_BIT,
        };
        let spdep_stencil = br::vk::VkSubpassDependency {
            srcSubpass: 0,
            dstSubpass: 1,
            srcStageMask: br::PipelineStageFlags::LATE_FRAGMENT_TESTS.0,
            dstStageMask: br::PipelineStageFlags::EARLY_FRAGMENT_TESTS.0,
            srcAccessMask: br::AccessFlags::DEPTH_STENCIL_ATTACHMENT.write,
            dstAccessMask: br::AccessFlags::DEPTH_STENCIL_ATTACHMENT.read,
            dependencyFlags: br::vk::VK_DEPENDENCY_BY_REGION_BIT,
        };
        let render_pass = br::RenderPassBuilder::new()
            .add_attachments(attachments)
            .add_subpasses(subpasses)
            .add_dependencies([spdep_entry, spdep_stencil])
            .create(g.device().clone())?;

        let target_size = SpecConstants::target_size(&extent);
        let fill_color = SpecConstants::fill_color(config.fill_color);
        let fan_stages = shaders.fan_stencil(&target_size);
        let curve_stages = shaders.curve_stencil(&target_size);
        let cover_stages = shaders.cover(&target_size, &fill_color);

        let scissors = [extent.clone().into_rect(br::vk::VkOffset2D::ZERO)];
        let viewports = [scissors[0].make_viewport(0.0..1.0)];
        let empty_pl = SharedRef::new(
            br::PipelineLayoutBuilder::new(vec![], vec![]).create(g.device().clone())?,
        );

        let mut fan_vps = fan_stages.generate_vps(br::vk::VK_PRIMITIVE_TOPOLOGY_TRIANGLE_FAN);
        fan_vps.enable_primitive_restart(true);
        let mut pipebuild = br::GraphicsPipelineBuilder::<
            _,
            br::PipelineObject<DeviceObject>,
            _,
            _,
            _,
            _,
            _,
            _,
        >::new(&empty_pl, (&render_pass, 0), fan_vps);
        pipebuild
            .viewport_scissors(
                br::DynamicArrayState::Static(&viewports),
                br::DynamicArrayState::Static(&scissors),
            )
            .multisample_state(Some(br::MultisampleState::new()))
            .stencil_test_enable(true)
            .set_attachment_blends(vec![]);
        let build_winding_pair =
            |pipebuild: &mut br::GraphicsPipelineBuilder<_, _, _, _, _, _, _, _>| {
                WindingFacing::ALL.map(|f| {
                    pipebuild
                        .cull_mode(f.cull_mode())
                        .stencil_control(f.stencil_state().into_vk())
                        .create(
                            g.device().clone(),
                            None::<&br::PipelineCacheObject<DeviceObject>>,
                        )
                        .map(|p| LayoutedPipeline::combine(p, empty_pl.clone()))
                })
            };
        let [fan_front, fan_back] = build_winding_pair(&mut pipebuild);
        let fan_pipelines = [fan_front?, fan_back?];
        pipebuild.vertex_processing(
            curve_stages.generate_vps(br::vk::VK_PRIMITIVE_TOPOLOGY_TRIANGLE_LIST),
        );
        let [curve_front, curve_back] = build_winding_pair(&mut pipebuild);
        let curve_pipelines = [curve_front?, curve_back?];

        pipebuild
            .render_pass(&render_pass, 1)
            .vertex_processing(cover_stages.generate_vps(br::vk::VK_PRIMITIVE_TOPOLOGY_TRIANGLE_FAN))
            .cull_mode(br::vk::VK_CULL_MODE_NONE)
            .stencil_control(StencilState::cover_nonzero().into_vk())
            .set_attachment_blends(vec![ColorAttachmentBlending::Disabled.into_vk()]);
        let cover_pipeline = LayoutedPipeline::combine(
            pipebuild.create(
                g.device().clone(),
                None::<&br::PipelineCacheObject<DeviceObject>>,
            )?,
            empty_pl.clone(),
        );
        debug!("stencil-then-cover pipelines ready");

        let stencil_buffer = g.allocate_device_local_image(br::ImageDesc::new(
            extent.clone(),
            STENCIL_FORMAT,
            br::ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            br::ImageLayout::Undefined,
        ))?;
        let stencil_buffer_view = SharedRef::new(
            stencil_buffer
                .subresource_range(br::AspectMask::STENCIL, 0..1, 0..1)
                .view_builder()
                .create()?,
        );

        let framebuffers = e
            .iter_back_buffers()
            .map(|bb| {
                g.device().clone().new_framebuffer(
                    &render_pass,
                    vec![
                        bb as SharedRef<dyn br::ImageView<ConcreteDevice = DeviceObject>>,
                        stencil_buffer_view.clone(),
                    ],
                    &extent,
                    1,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "render target {}x{} with {} framebuffers",
            extent.width,
            extent.height,
            framebuffers.len()
        );

        Ok(Self {
            draws: FrameDraws::of_layout(geometry.layout()),
            render_pass,
            framebuffers,
            fan_pipelines,
            curve_pipelines,
            cover_pipeline,
            _stencil_buffer_view: stencil_buffer_view,
            geometry,
            extent,
            clear_color: config.clear_color,
        })
    }

    pub const fn render_area(&self) -> br::vk::VkRect2D {
        br::vk::VkExtent2D {
            width: self.extent.width,
            height: self.extent.height,
        }
        .into_rect(br::vk::VkOffset2D::ZERO)
    }

    pub fn commands<'s>(&'s self, framebuffer: &'s Framebuffer) -> impl GraphicsCommand + 's {
        let winding = |pipelines: &'s [GlyphPipeline; 2], draw: Option<RangeDraw>| {
            draw.map(|d| pipelines.iter().map(|p| p.then(d)).collect::<Vec<_>>())
        };
        let stencil_pass = (
            BindGeometry {
                vertices: self.geometry.vertices(),
                indices: self.geometry.indices(),
            },
            winding(&self.fan_pipelines, self.draws.contours),
            winding(&self.curve_pipelines, self.draws.corrections),
        );
        let cover_pass = self.draws.cover.map(|d| (&self.cover_pipeline).then(d));

        InRenderPass::new(
            &self.render_pass,
            framebuffer,
            self.render_area(),
            vec![
                br::ClearValue::color_f32(self.clear_color),
                br::ClearValue::depth_stencil(0.0, 0),
            ],
            (stencil_pass, NextSubpass, cover_pass),
        )
    }
}
impl FrameRenderer for StencilCoverRenderer {
    fn record_frame(&self, back_buffer_index: usize, rec: &mut Recording) {
        match self.framebuffers.get(back_buffer_index) {
            Some(fb) => self.commands(fb).execute(rec),
            None => log::warn!("no framebuffer for back buffer #{back_buffer_index}"),
        }
    }
}
