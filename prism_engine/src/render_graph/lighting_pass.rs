/// Deferred lighting: samples the G-buffer and depth, accumulates light into
/// an HDR target with a full-screen triangle.
///
/// Inputs must already be in `SHADER_READ`; this pass only transitions its
/// own output.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    BufferHandle, ClearValue, Extent2D, GpuAllocator, ImageLayout, ImageUsage, LoadOp, Rect2D,
    RenderingAttachment, RenderingInfo, StoreOp, TextureFormat,
};
use crate::render_graph::pass::{
    request_binding, FrameContext, PassBinding, PassBindingProvider, PassInputs, PassKind,
};
use crate::render_graph::scene_data::{DirectionalLight, LightData, PointLight};
use crate::resource::{ImageResource, ImageResourceBuilder, ImageState, SlotBuffers};

/// Images read by the lighting pass, owned by upstream passes
pub struct GBufferInputs<'a> {
    pub albedo: &'a ImageResource,
    pub normal: &'a ImageResource,
    pub depth: &'a ImageResource,
}

impl<'a> GBufferInputs<'a> {
    fn views(&self) -> Vec<crate::graphics_device::ImageViewHandle> {
        vec![self.albedo.view(), self.normal.view(), self.depth.view()]
    }
}

pub struct LightingPass {
    hdr: ImageResource,
    lights: SlotBuffers<LightData>,
    binding: PassBinding,
}

impl LightingPass {
    pub fn new(
        allocator: &Arc<dyn GpuAllocator>,
        provider: &mut dyn PassBindingProvider,
        format: TextureFormat,
        extent: Extent2D,
        scene_buffers: &[BufferHandle],
        gbuffer: &GBufferInputs<'_>,
    ) -> Result<Self> {
        let hdr = ImageResourceBuilder::new("hdr_light_accumulation")
            .format(format)
            .usage(ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED)
            .screen_sized(extent)
            .build(allocator)?;
        let lights = SlotBuffers::new(Arc::clone(allocator), "lights", scene_buffers.len())?;
        let binding = request_binding(
            provider,
            PassKind::Lighting,
            &Self::inputs(scene_buffers, &lights, gbuffer),
            scene_buffers.len(),
        )?;
        Ok(Self { hdr, lights, binding })
    }

    fn inputs(scene_buffers: &[BufferHandle], lights: &SlotBuffers<LightData>, gbuffer: &GBufferInputs<'_>) -> PassInputs {
        PassInputs {
            sampled_views: gbuffer.views(),
            scene_buffers: scene_buffers.to_vec(),
            light_buffers: lights.buffers().to_vec(),
        }
    }

    pub fn hdr(&self) -> &ImageResource {
        &self.hdr
    }

    pub fn binding(&self) -> &PassBinding {
        &self.binding
    }

    pub fn light_buffer(&self, frame_slot: usize) -> BufferHandle {
        self.lights.buffer(frame_slot)
    }

    /// Upload this frame's lights; the slot must have been waited on
    pub fn update_lights(&self, frame_slot: usize, directional: DirectionalLight, points: &[PointLight]) -> Result<()> {
        self.lights.write(frame_slot, &LightData::pack(directional, points))
    }

    pub fn record(&mut self, ctx: &mut FrameContext<'_>, gbuffer: &GBufferInputs<'_>) -> u32 {
        for input in [gbuffer.albedo, gbuffer.normal, gbuffer.depth] {
            assert_eq!(
                input.state(),
                ImageState::SHADER_READ,
                "lighting input '{}' is not shader-readable",
                input.name()
            );
        }

        self.hdr.discard_to(ctx.command_list, ImageState::COLOR_ATTACHMENT);

        ctx.command_list.begin_rendering(&RenderingInfo {
            area: Rect2D::from_extent(self.hdr.extent()),
            color_attachments: vec![RenderingAttachment {
                view: self.hdr.view(),
                layout: ImageLayout::ColorAttachment,
                load_op: LoadOp::DontCare,
                store_op: StoreOp::Store,
                clear: ClearValue::Color([0.0; 4]),
            }],
            depth_attachment: None,
        });
        let cmd = &mut *ctx.command_list;
        cmd.bind_pipeline(self.binding.pipeline);
        cmd.bind_descriptor_set(self.binding.layout, 0, self.binding.descriptor_set_for(ctx.frame_slot));
        // Full-screen triangle generated in the vertex shader
        cmd.draw(3, 0);
        cmd.end_rendering();

        self.hdr.transition_to(ctx.command_list, ImageState::SHADER_READ);
        1
    }

    pub fn resize(&mut self, extent: Extent2D) -> Result<()> {
        self.hdr.resize(extent)
    }

    pub fn rebind(
        &mut self,
        provider: &mut dyn PassBindingProvider,
        scene_buffers: &[BufferHandle],
        gbuffer: &GBufferInputs<'_>,
    ) -> Result<()> {
        self.binding = request_binding(
            provider,
            PassKind::Lighting,
            &Self::inputs(scene_buffers, &self.lights, gbuffer),
            scene_buffers.len(),
        )?;
        Ok(())
    }
}
