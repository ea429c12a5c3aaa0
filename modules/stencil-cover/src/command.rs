//! Recordable command fragments

use bedrock as br;
use br::vk::VkCommandBuffer;
use peridot_glyph_outline::DrawRange;

pub type Recording<'r> = br::CmdRecord<'r, dyn br::VkHandleMut<Handle = VkCommandBuffer>>;

pub trait GraphicsCommand {
    fn execute(&self, cb: &mut Recording);
}
impl<T: GraphicsCommand + ?Sized> GraphicsCommand for &'_ T {
    fn execute(&self, cb: &mut Recording) {
        T::execute(*self, cb)
    }
}

pub trait GraphicsCommandSubmission: GraphicsCommand {
    /// Records into a one-shot command buffer and waits for its completion.
    fn submit(&self, g: &mut peridot_glyph::Graphics) -> br::Result<()> {
        g.submit_commands(|mut r| {
            self.execute(&mut r.as_dyn_ref());
            r
        })
    }
}
impl<T: GraphicsCommand> GraphicsCommandSubmission for T {}

pub trait GraphicsCommandCombiner: GraphicsCommand + Sized {
    #[inline]
    fn then<C>(self, next: C) -> (Self, C) {
        (self, next)
    }
}
impl<T: GraphicsCommand + Sized> GraphicsCommandCombiner for T {}

impl<A: GraphicsCommand, B: GraphicsCommand> GraphicsCommand for (A, B) {
    fn execute(&self, cb: &mut Recording) {
        self.0.execute(cb);
        self.1.execute(cb);
    }
}
impl<A: GraphicsCommand, B: GraphicsCommand, C: GraphicsCommand> GraphicsCommand for (A, B, C) {
    fn execute(&self, cb: &mut Recording) {
        self.0.execute(cb);
        self.1.execute(cb);
        self.2.execute(cb);
    }
}
impl<T: GraphicsCommand> GraphicsCommand for [T] {
    fn execute(&self, cb: &mut Recording) {
        self.iter().for_each(|c| c.execute(cb));
    }
}
impl<T: GraphicsCommand> GraphicsCommand for Vec<T> {
    fn execute(&self, cb: &mut Recording) {
        self[..].execute(cb);
    }
}
impl<T: GraphicsCommand> GraphicsCommand for Option<T> {
    fn execute(&self, cb: &mut Recording) {
        if let Some(c) = self {
            c.execute(cb);
        }
    }
}

impl<P: br::Pipeline, L: br::PipelineLayout> GraphicsCommand
    for peridot_glyph::LayoutedPipeline<P, L>
{
    fn execute(&self, cb: &mut Recording) {
        self.bind(cb);
    }
}

/// Makes transfer writes to whole buffers visible to a later stage.
pub struct TransferBarrier {
    dst_stage: br::PipelineStageFlags,
    buffers: Vec<br::BufferMemoryBarrier>,
}
impl TransferBarrier {
    pub const fn before(dst_stage: br::PipelineStageFlags) -> Self {
        Self {
            dst_stage,
            buffers: Vec::new(),
        }
    }

    pub fn buffer(
        mut self,
        buffer: &impl br::VkHandle<Handle = br::vk::VkBuffer>,
        bytes: u64,
        dst_access: br::vk::VkAccessFlags,
    ) -> Self {
        self.buffers.push(br::BufferMemoryBarrier::new(
            buffer,
            0..bytes,
            br::AccessFlags::TRANSFER.write,
            dst_access,
        ));

        self
    }
}
impl GraphicsCommand for TransferBarrier {
    fn execute(&self, cb: &mut Recording) {
        let _ = cb.pipeline_barrier(
            br::PipelineStageFlags::TRANSFER,
            self.dst_stage,
            false,
            &[],
            &self.buffers,
            &[],
        );
    }
}

/// Copies `size` bytes from `src_offset` of the source to the head of the destination.
pub struct CopyToHead<S, D> {
    src: S,
    dst: D,
    region: [br::vk::VkBufferCopy; 1],
}
impl<S: br::VkHandle<Handle = br::vk::VkBuffer>, D: br::VkHandle<Handle = br::vk::VkBuffer>>
    CopyToHead<S, D>
{
    pub const fn new(src: S, src_offset: u64, dst: D, size: u64) -> Self {
        Self {
            src,
            dst,
            region: [br::vk::VkBufferCopy {
                srcOffset: src_offset,
                dstOffset: 0,
                size,
            }],
        }
    }
}
impl<S: br::VkHandle<Handle = br::vk::VkBuffer>, D: br::VkHandle<Handle = br::vk::VkBuffer>>
    GraphicsCommand for CopyToHead<S, D>
{
    fn execute(&self, cb: &mut Recording) {
        if self.region[0].size == 0 {
            return;
        }

        let _ = cb.copy_buffer(&self.src, &self.dst, &self.region);
    }
}

/// Runs `body` inside a render pass instance whose attachments are cleared on load.
pub struct InRenderPass<R, F, C> {
    render_pass: R,
    framebuffer: F,
    area: br::vk::VkRect2D,
    clear_values: Vec<br::ClearValue>,
    body: C,
}
impl<R: br::RenderPass, F: br::Framebuffer, C: GraphicsCommand> InRenderPass<R, F, C> {
    pub fn new(
        render_pass: R,
        framebuffer: F,
        area: br::vk::VkRect2D,
        clear_values: Vec<br::ClearValue>,
        body: C,
    ) -> Self {
        Self {
            render_pass,
            framebuffer,
            area,
            clear_values,
            body,
        }
    }
}
impl<R: br::RenderPass, F: br::Framebuffer, C: GraphicsCommand> GraphicsCommand
    for InRenderPass<R, F, C>
{
    fn execute(&self, cb: &mut Recording) {
        let _ = cb.begin_render_pass(
            &self.render_pass,
            &self.framebuffer,
            self.area.clone(),
            &self.clear_values,
            true,
        );
        self.body.execute(cb);
        let _ = cb.end_render_pass();
    }
}

pub struct NextSubpass;
impl GraphicsCommand for NextSubpass {
    fn execute(&self, cb: &mut Recording) {
        let _ = cb.next_subpass(true);
    }
}

/// Binds one vertex buffer at binding 0 and a 16-bit index buffer.
pub struct BindGeometry<V, I> {
    pub vertices: V,
    pub indices: I,
}
impl<V: br::VkHandle<Handle = br::vk::VkBuffer>, I: br::VkHandle<Handle = br::vk::VkBuffer>>
    GraphicsCommand for BindGeometry<V, I>
{
    fn execute(&self, cb: &mut Recording) {
        let _ = cb
            .bind_vertex_buffers(0, &[(&self.vertices, 0)])
            .bind_index_buffer(&self.indices, 0, br::IndexType::U16);
    }
}

/// Single instance indexed draw of a non-empty named range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeDraw(DrawRange);
impl RangeDraw {
    /// None for an empty range: nothing would be rasterized.
    pub const fn of(r: &DrawRange) -> Option<Self> {
        if r.is_empty() {
            None
        } else {
            Some(Self(*r))
        }
    }

    pub const fn range(&self) -> &DrawRange {
        &self.0
    }
}
impl GraphicsCommand for RangeDraw {
    fn execute(&self, cb: &mut Recording) {
        let _ = cb.draw_indexed(
            self.0.index_count,
            1,
            self.0.first_index,
            self.0.vertex_offset,
            0,
        );
    }
}
