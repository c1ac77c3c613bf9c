/// VulkanCommandList - Vulkan implementation of the CommandList trait

use ash::vk;
use ash::vk::Handle;
use prism_engine::engine_error;
use prism_engine::prism::render::{
    BufferHandle, CommandBufferHandle, CommandList, DescriptorSetHandle, ImageBarrier, ImageBlit,
    IndexType, PipelineHandle, PipelineLayoutHandle, PipelineStages, Rect2D, RenderingAttachment,
    RenderingInfo, ShaderStages, Viewport,
};
use prism_engine::prism::{Error, Result};
use std::sync::Arc;

use crate::vulkan_format::{
    access_to_vk, clear_value_to_vk, filter_to_vk, index_type_to_vk, layout_to_vk,
    load_op_to_vk, range_to_vk, shader_stages_to_vk, stages_to_vk, store_op_to_vk,
};

/// Command list with its own pool and one primary command buffer
///
/// Handles received from the engine are raw Vulkan handles.
pub struct VulkanCommandList {
    device: Arc<ash::Device>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_rendering: bool,
}

impl VulkanCommandList {
    pub(crate) fn new(device: Arc<ash::Device>, graphics_queue_family: u32) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create command pool: {:?}", e);
                Error::BackendError(format!("Failed to create command pool: {:?}", e))
            })?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    device.destroy_command_pool(command_pool, None);
                    engine_error!("prism::vulkan", "Failed to allocate command buffer: {:?}", e);
                    return Err(Error::BackendError(format!(
                        "Failed to allocate command buffer: {:?}",
                        e
                    )));
                }
            };

            Ok(Self {
                device,
                command_pool,
                command_buffer,
                is_recording: false,
                in_rendering: false,
            })
        }
    }

    /// Underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn attachment_to_vk(attachment: &RenderingAttachment) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(vk::ImageView::from_raw(attachment.view.0))
            .image_layout(layout_to_vk(attachment.layout))
            .load_op(load_op_to_vk(attachment.load_op))
            .store_op(store_op_to_vk(attachment.store_op))
            .clear_value(clear_value_to_vk(attachment.clear))
    }
}

impl CommandList for VulkanCommandList {
    fn handle(&self) -> CommandBufferHandle {
        CommandBufferHandle(self.command_buffer.as_raw())
    }

    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;
        }

        self.is_recording = true;
        self.in_rendering = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        if self.in_rendering {
            return Err(Error::BackendError(
                "Rendering scope not ended before ending command list".to_string(),
            ));
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        debug_assert!(self.is_recording, "set_viewport outside begin/end");
        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
    }

    fn set_scissor(&mut self, scissor: Rect2D) {
        debug_assert!(self.is_recording, "set_scissor outside begin/end");
        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
    }

    fn pipeline_barrier(&mut self, barriers: &[ImageBarrier]) {
        debug_assert!(self.is_recording, "pipeline_barrier outside begin/end");
        debug_assert!(!self.in_rendering, "pipeline_barrier inside a rendering scope");
        if barriers.is_empty() {
            return;
        }

        let (src_stages, dst_stages) = barriers.iter().fold(
            (PipelineStages::empty(), PipelineStages::empty()),
            |(src, dst), barrier| (src | barrier.src_stage, dst | barrier.dst_stage),
        );

        let vk_barriers: Vec<vk::ImageMemoryBarrier> = barriers
            .iter()
            .map(|barrier| {
                vk::ImageMemoryBarrier::default()
                    .old_layout(layout_to_vk(barrier.old_layout))
                    .new_layout(layout_to_vk(barrier.new_layout))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(vk::Image::from_raw(barrier.image.0))
                    .subresource_range(range_to_vk(barrier.range))
                    .src_access_mask(access_to_vk(barrier.src_access))
                    .dst_access_mask(access_to_vk(barrier.dst_access))
            })
            .collect();

        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                stages_to_vk(src_stages),
                stages_to_vk(dst_stages),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &vk_barriers,
            );
        }
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) {
        debug_assert!(self.is_recording, "begin_rendering outside begin/end");
        debug_assert!(!self.in_rendering, "rendering scopes cannot nest");

        let color_attachments: Vec<vk::RenderingAttachmentInfo> =
            info.color_attachments.iter().map(Self::attachment_to_vk).collect();
        let depth_attachment = info.depth_attachment.as_ref().map(Self::attachment_to_vk);

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: info.area.x, y: info.area.y },
            extent: vk::Extent2D { width: info.area.width, height: info.area.height },
        };
        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth);
        }

        unsafe {
            self.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        self.in_rendering = true;
    }

    fn end_rendering(&mut self) {
        debug_assert!(self.in_rendering, "end_rendering without begin_rendering");
        unsafe {
            self.device.cmd_end_rendering(self.command_buffer);
        }
        self.in_rendering = false;
    }

    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk::Pipeline::from_raw(pipeline.0),
            );
        }
    }

    fn bind_descriptor_set(
        &mut self,
        layout: PipelineLayoutHandle,
        set_index: u32,
        descriptor_set: DescriptorSetHandle,
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk::PipelineLayout::from_raw(layout.0),
                set_index,
                &[vk::DescriptorSet::from_raw(descriptor_set.0)],
                &[],
            );
        }
    }

    fn push_constants(
        &mut self,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                vk::PipelineLayout::from_raw(layout.0),
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, offset: u64) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk::Buffer::from_raw(buffer.0)],
                &[offset],
            );
        }
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, index_type: IndexType) {
        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk::Buffer::from_raw(buffer.0),
                offset,
                index_type_to_vk(index_type),
            );
        }
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        debug_assert!(self.in_rendering, "draw outside a rendering scope");
        unsafe {
            self.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) {
        debug_assert!(self.in_rendering, "draw_indexed outside a rendering scope");
        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1,
                first_index,
                vertex_offset,
                0,
            );
        }
    }

    fn blit_image(&mut self, blit: &ImageBlit) {
        debug_assert!(!self.in_rendering, "blit_image inside a rendering scope");
        let color_layers = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let region = vk::ImageBlit {
            src_subresource: color_layers,
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: blit.src_extent.width as i32,
                    y: blit.src_extent.height as i32,
                    z: 1,
                },
            ],
            dst_subresource: color_layers,
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: blit.dst_extent.width as i32,
                    y: blit.dst_extent.height as i32,
                    z: 1,
                },
            ],
        };

        unsafe {
            self.device.cmd_blit_image(
                self.command_buffer,
                vk::Image::from_raw(blit.src_image.0),
                layout_to_vk(blit.src_layout),
                vk::Image::from_raw(blit.dst_image.0),
                layout_to_vk(blit.dst_layout),
                &[region],
                filter_to_vk(blit.filter),
            );
        }
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            // Frees the command buffer with it
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
