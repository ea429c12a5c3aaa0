//! State Tracked Objects

use bedrock as br;

/// A fence paired with the host-side knowledge of whether work was submitted against it.
///
/// Waiting on a fence that was never submitted would block forever, so `wait` only touches the
/// device when the fence is known to be pending.
pub struct StateFence<Fence: br::Fence> {
    fence: Fence,
    pending: bool,
}
impl<Device: br::Device> StateFence<br::FenceObject<Device>> {
    /// Create a fence with Unsignaled state
    pub fn new(d: Device) -> br::Result<Self> {
        d.new_fence(false).map(|fence| Self {
            fence,
            pending: false,
        })
    }
}
impl<Fence: br::Fence + br::VkHandleMut> StateFence<Fence> {
    /// Marks the fence as pending on a submission.
    ///
    /// # Safety
    /// A queue submission that signals this fence must have been made.
    pub unsafe fn signal(&mut self) {
        self.pending = true;
    }

    /// Wait for the last submission if one is pending, then reset the fence.
    pub fn wait(&mut self) -> br::Result<()> {
        if self.pending {
            self.fence.wait()?;
            self.fence.reset()?;
            self.pending = false;
        }

        Ok(())
    }

    /// Return internal fence object
    pub fn inner_mut(&mut self) -> &mut Fence {
        &mut self.fence
    }
}
