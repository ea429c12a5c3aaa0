//! Stencil operation states of both subpasses

use bedrock as br;

/// Stencil update applied on each test outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StencilOpGroup {
    pub fail: br::vk::VkStencilOp,
    pub depth_fail: br::vk::VkStencilOp,
    pub pass: br::vk::VkStencilOp,
}
impl StencilOpGroup {
    /// The same operation whatever the outcome.
    pub const fn uniform(op: br::StencilOp) -> Self {
        Self {
            fail: op as _,
            depth_fail: op as _,
            pass: op as _,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StencilCompare {
    pub op: br::CompareOp,
    pub reference: u32,
    pub mask: u32,
}
impl StencilCompare {
    pub const fn new(op: br::CompareOp, reference: u32) -> Self {
        Self {
            op,
            reference,
            mask: 0xffff_ffff,
        }
    }

    pub const fn with_mask(self, mask: u32) -> Self {
        Self { mask, ..self }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StencilState {
    pub ops: StencilOpGroup,
    pub compare: StencilCompare,
    pub write_mask: u32,
}
impl StencilState {
    pub const fn new(op: br::StencilOp) -> Self {
        Self {
            ops: StencilOpGroup::uniform(op),
            compare: StencilCompare::new(br::CompareOp::Always, 0),
            write_mask: 0xffff_ffff,
        }
    }

    pub const fn with_compare(self, compare: StencilCompare) -> Self {
        Self { compare, ..self }
    }

    pub const fn with_write_mask(self, write_mask: u32) -> Self {
        Self { write_mask, ..self }
    }

    pub const fn into_vk(self) -> br::vk::VkStencilOpState {
        br::vk::VkStencilOpState {
            failOp: self.ops.fail,
            passOp: self.ops.pass,
            depthFailOp: self.ops.depth_fail,
            compareOp: self.compare.op as _,
            compareMask: self.compare.mask,
            writeMask: self.write_mask,
            reference: self.compare.reference,
        }
    }

    /// Winding accumulation for one facing: always passes, wraps on overflow.
    fn winding(op: br::StencilOp) -> Self {
        Self::new(op)
            .with_compare(StencilCompare::new(br::CompareOp::Always, 0).with_mask(0xff))
            .with_write_mask(0xff)
    }

    /// Front-facing triangles of the accumulation subpass.
    pub fn winding_increment() -> Self {
        Self::winding(br::StencilOp::IncrementWrap)
    }

    /// Back-facing triangles of the accumulation subpass.
    pub fn winding_decrement() -> Self {
        Self::winding(br::StencilOp::DecrementWrap)
    }

    /// Cover subpass: passes where the accumulated winding is non-zero, never writes.
    pub fn cover_nonzero() -> Self {
        Self::new(br::StencilOp::Keep)
            .with_compare(StencilCompare::new(br::CompareOp::NotEqual, 0).with_mask(0xff))
            .with_write_mask(0)
    }
}

/// Which facing a winding pipeline rasterizes; the other one is culled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindingFacing {
    Front,
    Back,
}
impl WindingFacing {
    pub const ALL: [Self; 2] = [Self::Front, Self::Back];

    pub const fn cull_mode(self) -> br::vk::VkCullModeFlags {
        match self {
            Self::Front => br::vk::VK_CULL_MODE_BACK_BIT,
            Self::Back => br::vk::VK_CULL_MODE_FRONT_BIT,
        }
    }

    pub fn stencil_state(self) -> StencilState {
        match self {
            Self::Front => StencilState::winding_increment(),
            Self::Back => StencilState::winding_decrement(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_wraps_on_every_outcome() {
        let s = StencilState::winding_increment().into_vk();
        let inc = br::StencilOp::IncrementWrap as br::vk::VkStencilOp;

        assert_eq!(s.passOp, inc);
        assert_eq!(s.failOp, inc);
        assert_eq!(s.depthFailOp, inc);
        assert_eq!(s.compareOp, br::CompareOp::Always as br::vk::VkCompareOp);
        assert_eq!(s.writeMask, 0xff);
    }

    #[test]
    fn decrement_wraps() {
        let s = StencilState::winding_decrement().into_vk();
        assert_eq!(
            s.passOp,
            br::StencilOp::DecrementWrap as br::vk::VkStencilOp
        );
        assert_eq!(s.compareMask, 0xff);
    }

    #[test]
    fn cover_tests_nonzero_without_writing() {
        let s = StencilState::cover_nonzero().into_vk();

        assert_eq!(s.compareOp, br::CompareOp::NotEqual as br::vk::VkCompareOp);
        assert_eq!(s.reference, 0);
        assert_eq!(s.compareMask, 0xff);
        assert_eq!(s.writeMask, 0);
        assert_eq!(s.passOp, br::StencilOp::Keep as br::vk::VkStencilOp);
    }

    #[test]
    fn uniform_group_uses_one_op_for_all_outcomes() {
        let keep = br::StencilOp::Keep as br::vk::VkStencilOp;

        assert_eq!(
            StencilOpGroup::uniform(br::StencilOp::Keep),
            StencilOpGroup {
                fail: keep,
                depth_fail: keep,
                pass: keep
            }
        );
    }

    #[test]
    fn facing_pairs_cull_the_opposite_side() {
        assert_eq!(WindingFacing::Front.cull_mode(), br::vk::VK_CULL_MODE_BACK_BIT);
        assert_eq!(WindingFacing::Back.cull_mode(), br::vk::VK_CULL_MODE_FRONT_BIT);
        assert_eq!(
            WindingFacing::Back.stencil_state().into_vk().passOp,
            br::StencilOp::DecrementWrap as br::vk::VkStencilOp
        );
    }
}
