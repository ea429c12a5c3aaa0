use bedrock as br;
use br::{CommandPool, Device};
use std::ops::{Deref, DerefMut};

use super::{DeviceObject, Graphics};

/// One primary command buffer per back buffer, owning the pool they came from.
///
/// The pool is reset as a whole, matching a frame loop that re-records everything each frame.
pub struct CommandBundle<Device: br::Device> {
    buffers: Vec<br::CommandBufferObject<Device>>,
    pool: br::CommandPoolObject<Device>,
}
impl CommandBundle<DeviceObject> {
    pub fn new(g: &Graphics, count: usize) -> br::Result<Self> {
        let mut pool =
            br::CommandPoolBuilder::new(g.graphics_queue_family_index()).create(g.device.clone())?;
        let buffers = pool.alloc(count as _, true)?;

        Ok(Self { buffers, pool })
    }
}
impl<Device: br::Device> CommandBundle<Device> {
    #[inline]
    pub fn reset(&mut self) -> br::Result<()> {
        self.pool.reset(true)
    }
}
impl<Device: br::Device> Deref for CommandBundle<Device> {
    type Target = [br::CommandBufferObject<Device>];

    fn deref(&self) -> &Self::Target {
        &self.buffers
    }
}
impl<Device: br::Device> DerefMut for CommandBundle<Device> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffers
    }
}
impl<Device: br::Device> Drop for CommandBundle<Device> {
    fn drop(&mut self) {
        unsafe {
            self.pool.free(&self.buffers);
        }
    }
}

/// A single command buffer from the transient pool, freed back when dropped.
pub(crate) struct TransientCommandBuffer<'p> {
    buffer: Vec<br::CommandBufferObject<DeviceObject>>,
    pool: &'p mut br::CommandPoolObject<DeviceObject>,
}
impl<'p> TransientCommandBuffer<'p> {
    pub fn alloc(pool: &'p mut br::CommandPoolObject<DeviceObject>) -> br::Result<Self> {
        Ok(Self {
            buffer: pool.alloc(1, true)?,
            pool,
        })
    }

    pub fn as_slice(&self) -> &[br::CommandBufferObject<DeviceObject>] {
        &self.buffer
    }
}
impl Deref for TransientCommandBuffer<'_> {
    type Target = br::CommandBufferObject<DeviceObject>;

    fn deref(&self) -> &Self::Target {
        &self.buffer[0]
    }
}
impl DerefMut for TransientCommandBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer[0]
    }
}
impl Drop for TransientCommandBuffer<'_> {
    fn drop(&mut self) {
        unsafe {
            self.pool.free(&self.buffer);
        }
    }
}
