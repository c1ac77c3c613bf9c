/// Depth pre-pass: opaque geometry, depth only.
///
/// Leaves its depth image in `SHADER_READ` for the lighting pass. The format
/// must be depth-only, since the image is sampled through a single-aspect view.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferHandle, ClearValue, Extent2D, GpuAllocator, ImageLayout, ImageUsage, LoadOp, Rect2D,
    RenderingAttachment, RenderingInfo, StoreOp, TextureFormat,
};
use crate::render_graph::pass::{
    record_model_draws, request_binding, FrameContext, PassBinding, PassBindingProvider, PassInputs,
    PassKind,
};
use crate::render_graph::scene_data::DrawableModel;
use crate::resource::{ImageResource, ImageResourceBuilder, ImageState};

pub struct DepthPrePass {
    depth: ImageResource,
    binding: PassBinding,
}

impl DepthPrePass {
    pub fn new(
        allocator: &Arc<dyn GpuAllocator>,
        provider: &mut dyn PassBindingProvider,
        format: TextureFormat,
        extent: Extent2D,
        scene_buffers: &[BufferHandle],
    ) -> Result<Self> {
        if !format.is_depth() || format.has_stencil() {
            return Err(Error::InvalidResource(format!(
                "depth pre-pass format {:?} is not a depth-only format",
                format
            )));
        }
        let depth = ImageResourceBuilder::new("depth")
            .format(format)
            .usage(ImageUsage::DEPTH_ATTACHMENT | ImageUsage::SAMPLED)
            .screen_sized(extent)
            .build(allocator)?;
        let binding = request_binding(
            provider,
            PassKind::DepthPrePass,
            &Self::inputs(scene_buffers),
            scene_buffers.len(),
        )?;
        Ok(Self { depth, binding })
    }

    fn inputs(scene_buffers: &[BufferHandle]) -> PassInputs {
        PassInputs {
            scene_buffers: scene_buffers.to_vec(),
            ..PassInputs::default()
        }
    }

    pub fn depth(&self) -> &ImageResource {
        &self.depth
    }

    pub fn binding(&self) -> &PassBinding {
        &self.binding
    }

    pub fn record(&mut self, ctx: &mut FrameContext<'_>, models: &[DrawableModel]) -> u32 {
        self.depth.discard_to(ctx.command_list, ImageState::DEPTH_ATTACHMENT);

        ctx.command_list.begin_rendering(&RenderingInfo {
            area: Rect2D::from_extent(self.depth.extent()),
            color_attachments: Vec::new(),
            depth_attachment: Some(RenderingAttachment {
                view: self.depth.view(),
                layout: ImageLayout::DepthAttachment,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear: ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            }),
        });
        let draws = record_model_draws(ctx, &self.binding, models);
        ctx.command_list.end_rendering();

        self.depth.transition_to(ctx.command_list, ImageState::SHADER_READ);
        draws
    }

    pub fn resize(&mut self, extent: Extent2D) -> Result<()> {
        self.depth.resize(extent)
    }

    pub fn rebind(&mut self, provider: &mut dyn PassBindingProvider, scene_buffers: &[BufferHandle]) -> Result<()> {
        self.binding = request_binding(
            provider,
            PassKind::DepthPrePass,
            &Self::inputs(scene_buffers),
            scene_buffers.len(),
        )?;
        Ok(())
    }
}
