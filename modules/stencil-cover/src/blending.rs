use bedrock as br;

const ALL_COMPONENTS: u32 = br::vk::VK_COLOR_COMPONENT_A_BIT
    | br::vk::VK_COLOR_COMPONENT_B_BIT
    | br::vk::VK_COLOR_COMPONENT_G_BIT
    | br::vk::VK_COLOR_COMPONENT_R_BIT;

/// Blend state of a single color attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorAttachmentBlending {
    /// Fragment output replaces the attachment color.
    Disabled,
}
impl ColorAttachmentBlending {
    pub const fn into_vk(self) -> br::vk::VkPipelineColorBlendAttachmentState {
        match self {
            Self::Disabled => br::vk::VkPipelineColorBlendAttachmentState {
                blendEnable: false as _,
                srcColorBlendFactor: br::BlendFactor::One as _,
                dstColorBlendFactor: br::BlendFactor::Zero as _,
                colorBlendOp: br::BlendOp::Add as _,
                srcAlphaBlendFactor: br::BlendFactor::One as _,
                dstAlphaBlendFactor: br::BlendFactor::Zero as _,
                alphaBlendOp: br::BlendOp::Add as _,
                colorWriteMask: ALL_COMPONENTS,
            },
        }
    }
}
