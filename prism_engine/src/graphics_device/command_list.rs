/// CommandList trait - for recording one frame's GPU work

use crate::error::Result;
use crate::graphics_device::{
    AccessFlags, BufferHandle, CommandBufferHandle, DescriptorSetHandle, Extent2D, ImageHandle,
    ImageLayout, ImageViewHandle, PipelineHandle, PipelineLayoutHandle, PipelineStages,
    ShaderStages, SubresourceRange,
};

/// Command list for recording rendering commands
///
/// One command list exists per frame slot; it is reset by `begin()` and handed to
/// `GraphicsDevice::submit()` after `end()`. Recording calls between `begin` and
/// `end` are infallible at this level: misuse is a programmer error caught by the
/// backend's validation, not a runtime condition.
pub trait CommandList: Send {
    /// Opaque handle of the underlying command buffer (used by submission)
    fn handle(&self) -> CommandBufferHandle;

    /// Reset and begin recording
    fn begin(&mut self) -> Result<()>;

    /// End recording
    fn end(&mut self) -> Result<()>;

    /// Set the dynamic viewport
    fn set_viewport(&mut self, viewport: Viewport);

    /// Set the dynamic scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D);

    /// Record one pipeline barrier command carrying the given image barriers
    ///
    /// All barriers of one call share the union of their stage masks.
    fn pipeline_barrier(&mut self, barriers: &[ImageBarrier]);

    /// Begin dynamic rendering into the given attachments
    fn begin_rendering(&mut self, info: &RenderingInfo);

    /// End dynamic rendering
    fn end_rendering(&mut self);

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: PipelineHandle);

    /// Bind a descriptor set at `set_index` of `layout`
    fn bind_descriptor_set(
        &mut self,
        layout: PipelineLayoutHandle,
        set_index: u32,
        descriptor_set: DescriptorSetHandle,
    );

    /// Push constants to the pipeline layout
    fn push_constants(
        &mut self,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    );

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, offset: u64);

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, index_type: IndexType);

    /// Draw non-indexed vertices
    fn draw(&mut self, vertex_count: u32, first_vertex: u32);

    /// Draw indexed vertices
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32);

    /// Blit (scaled copy) between two images in transfer layouts
    fn blit_image(&mut self, blit: &ImageBlit);
}

/// One image's layout/access transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub src_stage: PipelineStages,
    pub dst_stage: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub range: SubresourceRange,
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with a [0, 1] depth range
    pub fn from_extent(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn from_extent(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, width: extent.width, height: extent.height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// One attachment of a dynamic rendering scope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingAttachment {
    pub view: ImageViewHandle,
    pub layout: ImageLayout,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// Attachments and render area of a dynamic rendering scope
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingInfo {
    pub area: Rect2D,
    pub color_attachments: Vec<RenderingAttachment>,
    pub depth_attachment: Option<RenderingAttachment>,
}

/// Type of indices in an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

/// Sampling filter used by blits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Full-image blit between two images of possibly different sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBlit {
    pub src_image: ImageHandle,
    pub src_layout: ImageLayout,
    pub src_extent: Extent2D,
    pub dst_image: ImageHandle,
    pub dst_layout: ImageLayout,
    pub dst_extent: Extent2D,
    pub filter: Filter,
}
