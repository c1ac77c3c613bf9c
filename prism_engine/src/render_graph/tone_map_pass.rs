/// Tone-mapping: HDR light accumulation to a displayable 8-bit image.
///
/// The output ends in `TRANSFER_SRC` since it is blitted, not sampled.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::error::Result;
use crate::graphics_device::{
    ClearValue, Extent2D, GpuAllocator, ImageLayout, ImageUsage, LoadOp, Rect2D,
    RenderingAttachment, RenderingInfo, ShaderStages, StoreOp, TextureFormat, ToneMapOperator,
    ToneMapSettings,
};
use crate::render_graph::pass::{
    request_binding, FrameContext, PassBinding, PassBindingProvider, PassInputs, PassKind,
};
use crate::resource::{ImageResource, ImageResourceBuilder, ImageState};

/// Fragment push constants of the tone-map shader
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ToneMapPushConstants {
    pub exposure: f32,
    /// 0 = Reinhard, 1 = ACES
    pub operator: u32,
    pub _padding: [u32; 2],
}

impl From<ToneMapSettings> for ToneMapPushConstants {
    fn from(settings: ToneMapSettings) -> Self {
        Self {
            exposure: settings.exposure,
            operator: match settings.operator {
                ToneMapOperator::Reinhard => 0,
                ToneMapOperator::Aces => 1,
            },
            _padding: [0; 2],
        }
    }
}

pub struct ToneMapPass {
    output: ImageResource,
    binding: PassBinding,
    settings: ToneMapSettings,
}

impl ToneMapPass {
    pub fn new(
        allocator: &Arc<dyn GpuAllocator>,
        provider: &mut dyn PassBindingProvider,
        format: TextureFormat,
        extent: Extent2D,
        hdr: &ImageResource,
        frames_in_flight: usize,
        settings: ToneMapSettings,
    ) -> Result<Self> {
        let output = ImageResourceBuilder::new("tone_mapped")
            .format(format)
            .usage(ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_SRC)
            .screen_sized(extent)
            .build(allocator)?;
        let binding = request_binding(provider, PassKind::ToneMap, &Self::inputs(hdr), frames_in_flight)?;
        Ok(Self { output, binding, settings })
    }

    fn inputs(hdr: &ImageResource) -> PassInputs {
        PassInputs {
            sampled_views: vec![hdr.view()],
            ..PassInputs::default()
        }
    }

    pub fn output(&self) -> &ImageResource {
        &self.output
    }

    pub fn binding(&self) -> &PassBinding {
        &self.binding
    }

    pub fn settings(&self) -> ToneMapSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: ToneMapSettings) {
        self.settings = settings;
    }

    pub fn record(&mut self, ctx: &mut FrameContext<'_>, hdr: &ImageResource) -> u32 {
        assert_eq!(hdr.state(), ImageState::SHADER_READ, "tone-map input is not shader-readable");

        self.output.discard_to(ctx.command_list, ImageState::COLOR_ATTACHMENT);

        ctx.command_list.begin_rendering(&RenderingInfo {
            area: Rect2D::from_extent(self.output.extent()),
            color_attachments: vec![RenderingAttachment {
                view: self.output.view(),
                layout: ImageLayout::ColorAttachment,
                load_op: LoadOp::DontCare,
                store_op: StoreOp::Store,
                clear: ClearValue::Color([0.0; 4]),
            }],
            depth_attachment: None,
        });
        let constants = ToneMapPushConstants::from(self.settings);
        let cmd = &mut *ctx.command_list;
        cmd.bind_pipeline(self.binding.pipeline);
        cmd.bind_descriptor_set(self.binding.layout, 0, self.binding.descriptor_set_for(ctx.frame_slot));
        cmd.push_constants(self.binding.layout, ShaderStages::FRAGMENT, 0, bytemuck::bytes_of(&constants));
        cmd.draw(3, 0);
        cmd.end_rendering();

        self.output.transition_to(ctx.command_list, ImageState::TRANSFER_SRC);
        1
    }

    pub fn resize(&mut self, extent: Extent2D) -> Result<()> {
        self.output.resize(extent)
    }

    pub fn rebind(&mut self, provider: &mut dyn PassBindingProvider, hdr: &ImageResource, frames_in_flight: usize) -> Result<()> {
        self.binding = request_binding(provider, PassKind::ToneMap, &Self::inputs(hdr), frames_in_flight)?;
        Ok(())
    }
}
