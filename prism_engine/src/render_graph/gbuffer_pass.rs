/// G-buffer pass: albedo + normal targets, one indexed draw per model.
///
/// Both targets are transitioned together in one barrier command.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    BufferHandle, ClearValue, Extent2D, GpuAllocator, ImageLayout, ImageUsage, LoadOp,
    PassFormats, Rect2D, RenderingAttachment, RenderingInfo, StoreOp,
};
use crate::render_graph::pass::{
    record_model_draws, request_binding, FrameContext, PassBinding, PassBindingProvider, PassInputs,
    PassKind,
};
use crate::render_graph::scene_data::DrawableModel;
use crate::resource::{ImageResource, ImageResourceBuilder, ImageState};

pub struct GBufferPass {
    albedo: ImageResource,
    normal: ImageResource,
    binding: PassBinding,
    clear_color: [f32; 4],
}

impl GBufferPass {
    pub fn new(
        allocator: &Arc<dyn GpuAllocator>,
        provider: &mut dyn PassBindingProvider,
        formats: &PassFormats,
        extent: Extent2D,
        scene_buffers: &[BufferHandle],
        clear_color: [f32; 4],
    ) -> Result<Self> {
        let usage = ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED;
        let albedo = ImageResourceBuilder::new("gbuffer_albedo")
            .format(formats.albedo)
            .usage(usage)
            .screen_sized(extent)
            .build(allocator)?;
        let normal = ImageResourceBuilder::new("gbuffer_normal")
            .format(formats.normal)
            .usage(usage)
            .screen_sized(extent)
            .build(allocator)?;
        let binding = request_binding(
            provider,
            PassKind::GBuffer,
            &Self::inputs(scene_buffers),
            scene_buffers.len(),
        )?;

        Ok(Self { albedo, normal, binding, clear_color })
    }

    fn inputs(scene_buffers: &[BufferHandle]) -> PassInputs {
        PassInputs {
            scene_buffers: scene_buffers.to_vec(),
            ..PassInputs::default()
        }
    }

    pub fn albedo(&self) -> &ImageResource {
        &self.albedo
    }

    pub fn normal(&self) -> &ImageResource {
        &self.normal
    }

    pub fn binding(&self) -> &PassBinding {
        &self.binding
    }

    pub fn record(&mut self, ctx: &mut FrameContext<'_>, models: &[DrawableModel]) -> u32 {
        ImageResource::discard_batch(
            ctx.command_list,
            &mut [&mut self.albedo, &mut self.normal],
            ImageState::COLOR_ATTACHMENT,
        );

        let target = |image: &ImageResource, clear: [f32; 4]| RenderingAttachment {
            view: image.view(),
            layout: ImageLayout::ColorAttachment,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear: ClearValue::Color(clear),
        };
        ctx.command_list.begin_rendering(&RenderingInfo {
            area: Rect2D::from_extent(self.albedo.extent()),
            color_attachments: vec![
                target(&self.albedo, self.clear_color),
                target(&self.normal, [0.0; 4]),
            ],
            depth_attachment: None,
        });
        let draws = record_model_draws(ctx, &self.binding, models);
        ctx.command_list.end_rendering();

        ImageResource::transition_batch(
            ctx.command_list,
            &mut [&mut self.albedo, &mut self.normal],
            ImageState::SHADER_READ,
        );
        draws
    }

    pub fn resize(&mut self, extent: Extent2D) -> Result<()> {
        self.albedo.resize(extent)?;
        self.normal.resize(extent)
    }

    pub fn rebind(&mut self, provider: &mut dyn PassBindingProvider, scene_buffers: &[BufferHandle]) -> Result<()> {
        self.binding = request_binding(
            provider,
            PassKind::GBuffer,
            &Self::inputs(scene_buffers),
            scene_buffers.len(),
        )?;
        Ok(())
    }
}
