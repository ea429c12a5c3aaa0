//! Memory-backed device resources
//!
//! Every resource here owns a dedicated memory allocation (no suballocation).

use bedrock as br;
use br::{Device, DeviceChild, DeviceMemory, MemoryBound, VkHandle, VulkanStructure};
use log::debug;

use crate::{DeviceObject, Graphics};

#[derive(Debug)]
pub enum ResourceAllocationError {
    VulkanError(br::VkResultBox),
    NoSuitableMemoryType { type_bits: u32 },
}
impl From<br::VkResultBox> for ResourceAllocationError {
    fn from(value: br::VkResultBox) -> Self {
        Self::VulkanError(value)
    }
}
impl std::fmt::Display for ResourceAllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VulkanError(r) => std::fmt::Display::fmt(r, f),
            Self::NoSuitableMemoryType { type_bits } => {
                write!(f, "no suitable memory type in mask {type_bits:08x}")
            }
        }
    }
}
impl std::error::Error for ResourceAllocationError {}

/// Pointer into a mapped memory range.
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct MappedPointer(core::ptr::NonNull<u8>);
impl MappedPointer {
    /// # Safety
    /// `byte_offset + size_of_val(values)` must lie within the mapped range and match `T`'s alignment.
    pub unsafe fn copy_slice_to<T: Copy>(&self, byte_offset: usize, values: &[T]) {
        core::slice::from_raw_parts_mut(self.0.as_ptr().add(byte_offset) as *mut T, values.len())
            .copy_from_slice(values)
    }
}

pub struct Buffer {
    object: br::BufferObject<DeviceObject>,
    memory: br::DeviceMemoryObject<DeviceObject>,
    requires_flushing: bool,
    byte_length: u64,
}
impl Buffer {
    fn bound(
        mut object: br::BufferObject<DeviceObject>,
        memory_index: u32,
        requires_flushing: bool,
        byte_length: u64,
    ) -> br::Result<Self> {
        let req = object.requirements();
        debug!(
            "allocate {} bytes (buffer of {byte_length} bytes) in type #{memory_index}",
            req.size
        );
        let memory = br::DeviceMemoryRequest::allocate(req.size as _, memory_index)
            .execute(object.device().clone())?;
        object.bind(&memory, 0)?;

        Ok(Self {
            object,
            memory,
            requires_flushing,
            byte_length,
        })
    }

    /// Maps the whole buffer for writing, flushing afterwards when the memory is not coherent.
    pub fn guard_map<R>(&mut self, op: impl FnOnce(MappedPointer) -> R) -> br::Result<R> {
        let ptr = unsafe { self.memory.map_raw(0..self.byte_length)? };
        let r = op(MappedPointer(unsafe {
            core::ptr::NonNull::new_unchecked(ptr as _)
        }));
        if self.requires_flushing {
            unsafe {
                self.memory
                    .device()
                    .flush_mapped_memory_ranges(&[br::vk::VkMappedMemoryRange {
                        sType: br::vk::VkMappedMemoryRange::TYPE,
                        pNext: core::ptr::null(),
                        memory: self.memory.native_ptr(),
                        offset: 0,
                        size: br::vk::VK_WHOLE_SIZE,
                    }])?;
            }
        }
        unsafe {
            self.memory.unmap();
        }

        Ok(r)
    }
}
impl br::VkHandle for Buffer {
    type Handle = <br::BufferObject<DeviceObject> as br::VkHandle>::Handle;

    fn native_ptr(&self) -> Self::Handle {
        self.object.native_ptr()
    }
}
impl br::VkHandleMut for Buffer {
    fn native_ptr_mut(&mut self) -> Self::Handle {
        self.object.native_ptr_mut()
    }
}
impl br::VkObject for Buffer {
    const TYPE: br::vk::VkObjectType = <br::BufferObject<DeviceObject> as br::VkObject>::TYPE;
}
impl br::DeviceChild for Buffer {
    type ConcreteDevice = DeviceObject;

    fn device(&self) -> &Self::ConcreteDevice {
        self.object.device()
    }
}
impl br::Buffer for Buffer {}

pub struct Image {
    object: br::ImageObject<DeviceObject>,
    _memory: br::DeviceMemoryObject<DeviceObject>,
}
impl br::VkHandle for Image {
    type Handle = <br::ImageObject<DeviceObject> as br::VkHandle>::Handle;

    fn native_ptr(&self) -> Self::Handle {
        self.object.native_ptr()
    }
}
impl br::VkHandleMut for Image {
    fn native_ptr_mut(&mut self) -> Self::Handle {
        self.object.native_ptr_mut()
    }
}
impl br::VkObject for Image {
    const TYPE: br::vk::VkObjectType = <br::ImageObject<DeviceObject> as br::VkObject>::TYPE;
}
impl br::DeviceChild for Image {
    type ConcreteDevice = DeviceObject;

    fn device(&self) -> &Self::ConcreteDevice {
        self.object.device()
    }
}
impl br::Image for Image {
    fn format(&self) -> br::vk::VkFormat {
        self.object.format()
    }

    fn size(&self) -> &br::vk::VkExtent3D {
        self.object.size()
    }

    fn dimension(&self) -> br::vk::VkImageViewType {
        self.object.dimension()
    }
}

/// Resource allocation
impl Graphics {
    pub fn allocate_device_local_buffer(
        &self,
        byte_length: u64,
        usage: br::BufferUsage,
    ) -> Result<Buffer, ResourceAllocationError> {
        let o = br::BufferDesc::new(byte_length as _, usage).create(self.device().clone())?;
        let req = o.requirements();
        let memory_type = self
            .memory_types
            .device_local(req.memoryTypeBits)
            .ok_or(ResourceAllocationError::NoSuitableMemoryType {
                type_bits: req.memoryTypeBits,
            })?;

        Buffer::bound(o, memory_type, false, byte_length).map_err(From::from)
    }

    /// Allocates a host-visible buffer for staging, preferring coherent memory.
    pub fn allocate_upload_buffer(
        &self,
        byte_length: u64,
        usage: br::BufferUsage,
    ) -> Result<Buffer, ResourceAllocationError> {
        let o = br::BufferDesc::new(byte_length as _, usage).create(self.device().clone())?;
        let req = o.requirements();
        let (memory_type, coherent) = self
            .memory_types
            .host_visible(req.memoryTypeBits)
            .ok_or(ResourceAllocationError::NoSuitableMemoryType {
                type_bits: req.memoryTypeBits,
            })?;

        Buffer::bound(o, memory_type, !coherent, byte_length).map_err(From::from)
    }

    pub fn allocate_device_local_image(
        &self,
        desc: br::ImageDesc,
    ) -> Result<Image, ResourceAllocationError> {
        let mut object = desc.create(self.device().clone())?;
        let req = object.requirements();
        let memory_type = self
            .memory_types
            .device_local(req.memoryTypeBits)
            .ok_or(ResourceAllocationError::NoSuitableMemoryType {
                type_bits: req.memoryTypeBits,
            })?;
        debug!(
            "allocate {} bytes for image in type #{memory_type}",
            req.size
        );
        let memory = br::DeviceMemoryRequest::allocate(req.size as _, memory_type)
            .execute(self.device().clone())?;
        object.bind(&memory, 0)?;

        Ok(Image {
            object,
            _memory: memory,
        })
    }
}
