//! Device-resident glyph geometry

use bedrock as br;
use log::debug;
use peridot_glyph::{Buffer, Graphics, ResourceAllocationError};
use peridot_glyph_outline::{
    CapacityError, GeometryCapacity, PackedGeometry, PackedLayout, Vertex,
};

use crate::command::{
    CopyToHead, GraphicsCommandCombiner, GraphicsCommandSubmission, TransferBarrier,
};

/// Start of the vertex block inside the staging buffer, after the index block.
pub fn staging_vertex_offset(index_bytes: u64) -> u64 {
    let align = std::mem::align_of::<Vertex>() as u64;

    (index_bytes + align - 1) / align * align
}

#[derive(Debug)]
pub enum UploadError {
    Capacity(CapacityError),
    Allocation(ResourceAllocationError),
}
impl From<CapacityError> for UploadError {
    fn from(value: CapacityError) -> Self {
        Self::Capacity(value)
    }
}
impl From<ResourceAllocationError> for UploadError {
    fn from(value: ResourceAllocationError) -> Self {
        Self::Allocation(value)
    }
}
impl From<br::VkResultBox> for UploadError {
    fn from(value: br::VkResultBox) -> Self {
        Self::Allocation(value.into())
    }
}
impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capacity(e) => std::fmt::Display::fmt(e, f),
            Self::Allocation(e) => std::fmt::Display::fmt(e, f),
        }
    }
}
impl std::error::Error for UploadError {}

/// Both packed streams in fixed-capacity device-local buffers, with their named draw ranges.
pub struct GeometryBuffers {
    vertices: Buffer,
    indices: Buffer,
    layout: PackedLayout,
}
impl GeometryBuffers {
    /// Stages the packed geometry once and copies it into device-local buffers.
    ///
    /// Blocks until both copies completed; the staging buffer is released on return.
    /// Nothing is allocated when either stream is larger than its device buffer.
    pub fn upload(
        g: &mut Graphics,
        geometry: &PackedGeometry,
        capacity: &GeometryCapacity,
    ) -> Result<Self, UploadError> {
        geometry.fits_within(capacity)?;

        let index_bytes = geometry.index_bytes();
        let vertex_bytes = geometry.vertex_bytes();
        let vertex_offset = staging_vertex_offset(index_bytes);
        debug!(
            "geometry upload: {index_bytes} index bytes, {vertex_bytes} vertex bytes (capacity {}/{})",
            capacity.index_bytes, capacity.vertex_bytes
        );

        let vertices = g.allocate_device_local_buffer(
            capacity.vertex_bytes,
            br::BufferUsage::VERTEX_BUFFER | br::BufferUsage::TRANSFER_DEST,
        )?;
        let indices = g.allocate_device_local_buffer(
            capacity.index_bytes,
            br::BufferUsage::INDEX_BUFFER | br::BufferUsage::TRANSFER_DEST,
        )?;
        let mut staging =
            g.allocate_upload_buffer(vertex_offset + vertex_bytes, br::BufferUsage::TRANSFER_SRC)?;
        staging.guard_map(|p| unsafe {
            p.copy_slice_to(0, &geometry.indices);
            p.copy_slice_to(vertex_offset as _, &geometry.vertices);
        })?;

        let upload = (
            CopyToHead::new(&staging, 0, &indices, index_bytes),
            CopyToHead::new(&staging, vertex_offset, &vertices, vertex_bytes),
        );
        let ready_for_input = TransferBarrier::before(br::PipelineStageFlags::VERTEX_INPUT)
            .buffer(&indices, index_bytes, br::AccessFlags::INDEX_READ)
            .buffer(&vertices, vertex_bytes, br::AccessFlags::VERTEX_ATTRIBUTE_READ);
        upload.then(ready_for_input).submit(g)?;

        Ok(Self {
            vertices,
            indices,
            layout: geometry.layout,
        })
    }

    pub const fn vertices(&self) -> &Buffer {
        &self.vertices
    }

    pub const fn indices(&self) -> &Buffer {
        &self.indices
    }

    pub const fn layout(&self) -> &PackedLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peridot_glyph_outline::{pack, tessellate, FixedPoint, FixedRect, OutlineCommand, StreamKind};

    #[test]
    fn geometry_packed_for_larger_buffers_is_refused() {
        let p = |x, y| FixedPoint::from_int(x, y);
        let mut commands = vec![OutlineCommand::MoveTo(p(0, 0))];
        // 250 coarse vertices: 5000 bytes
        for n in 1..250 {
            commands.push(OutlineCommand::LineTo(p(n, n % 5)));
        }
        let mut bounds = FixedRect::at(p(0, 0));
        bounds.include(p(250, 5));
        let geometry = tessellate(&commands, &bounds).expect("tessellation failed");
        let packed = pack(&geometry, &GeometryCapacity::uniform(8192)).expect("pack failed");

        let e: UploadError = packed
            .fits_within(&GeometryCapacity::default())
            .expect_err("default buffers are too small")
            .into();
        assert!(matches!(
            e,
            UploadError::Capacity(CapacityError {
                stream: StreamKind::Vertex,
                capacity_bytes: GeometryCapacity::DEFAULT_BYTES,
                ..
            })
        ));
        assert!(packed.fits_within(&GeometryCapacity::uniform(8192)).is_ok());
    }

    #[test]
    fn vertex_block_is_aligned_after_indices() {
        assert_eq!(staging_vertex_offset(0), 0);
        assert_eq!(staging_vertex_offset(8), 8);
        // 5 indices: 10 bytes
        assert_eq!(staging_vertex_offset(10), 12);
        assert_eq!(staging_vertex_offset(14), 16);
    }
}
