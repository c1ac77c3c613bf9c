/// Per-frame context and the collaborator contracts shared by all passes

use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferHandle, CommandList, DescriptorSetHandle, Extent2D, ImageHandle, ImageViewHandle,
    PipelineHandle, PipelineLayoutHandle, Rect2D, ShaderStages, Viewport,
};
use crate::render_graph::scene_data::{DrawableModel, ModelPushConstants};

/// The five passes, in recording order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    DepthPrePass,
    GBuffer,
    Lighting,
    ToneMap,
    Blit,
}

impl PassKind {
    pub const ORDER: [PassKind; 5] = [
        PassKind::DepthPrePass,
        PassKind::GBuffer,
        PassKind::Lighting,
        PassKind::ToneMap,
        PassKind::Blit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PassKind::DepthPrePass => "depth_pre_pass",
            PassKind::GBuffer => "gbuffer",
            PassKind::Lighting => "lighting",
            PassKind::ToneMap => "tone_map",
            PassKind::Blit => "blit",
        }
    }
}

/// Per-frame state handed to each pass by reference.
///
/// Valid for one frame only; passes must not keep it.
pub struct FrameContext<'a> {
    /// Frame slot in use
    pub frame_slot: usize,
    /// Presentable image acquired for this frame
    pub image_index: u32,
    /// Surface extent this frame
    pub extent: Extent2D,
    /// Command list being recorded
    pub command_list: &'a mut dyn CommandList,
}

impl<'a> FrameContext<'a> {
    /// Set viewport and scissor to the full extent
    pub fn set_full_viewport(&mut self) {
        self.command_list.set_viewport(Viewport::from_extent(self.extent));
        self.command_list.set_scissor(Rect2D::from_extent(self.extent));
    }
}

/// Resources a pass's descriptor sets must point at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassInputs {
    /// Sampled image views, in binding order
    pub sampled_views: Vec<ImageViewHandle>,
    /// One `SceneGlobals` uniform buffer per frame slot
    pub scene_buffers: Vec<BufferHandle>,
    /// One `LightData` uniform buffer per frame slot (lighting only)
    pub light_buffers: Vec<BufferHandle>,
}

/// Ready-to-bind pipeline state of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassBinding {
    pub pipeline: PipelineHandle,
    pub layout: PipelineLayoutHandle,
    /// Either one set shared by all frame slots or exactly one per slot
    pub descriptor_sets: Vec<DescriptorSetHandle>,
}

impl PassBinding {
    /// Check the set count against the number of frame slots
    pub fn validate(&self, kind: PassKind, frames_in_flight: usize) -> Result<()> {
        let count = self.descriptor_sets.len();
        if count == 1 || count == frames_in_flight {
            Ok(())
        } else {
            Err(Error::InvalidResource(format!(
                "{} pass: {} descriptor sets for {} frame slots",
                kind.name(),
                count,
                frames_in_flight
            )))
        }
    }

    pub fn descriptor_set_for(&self, frame_slot: usize) -> DescriptorSetHandle {
        if self.descriptor_sets.len() == 1 {
            self.descriptor_sets[0]
        } else {
            self.descriptor_sets[frame_slot]
        }
    }
}

/// Descriptor/pipeline collaborator.
///
/// Asked once per drawing pass at construction and again after every resize,
/// since the sampled views change when pass images are reallocated.
pub trait PassBindingProvider: Send {
    fn pass_binding(&mut self, kind: PassKind, inputs: &PassInputs) -> Result<PassBinding>;
}

/// Work recorded after the blit, into the presentable image.
///
/// The image arrives in `ImageState::PRESENT`; an overlay that transitions it
/// must return it to that state before returning.
pub trait OverlayPass: Send {
    fn record(&mut self, ctx: &mut FrameContext<'_>, target: ImageHandle, target_view: ImageViewHandle);

    /// Called after the surface was rebuilt
    fn resize(&mut self, _extent: Extent2D) -> Result<()> {
        Ok(())
    }
}

/// Ask the provider for a binding and check it against the slot count
pub(crate) fn request_binding(
    provider: &mut dyn PassBindingProvider,
    kind: PassKind,
    inputs: &PassInputs,
    frames_in_flight: usize,
) -> Result<PassBinding> {
    let binding = provider.pass_binding(kind, inputs)?;
    binding.validate(kind, frames_in_flight)?;
    Ok(binding)
}

/// Bind `binding` and issue one indexed draw per model with its transform
/// as push constants. Returns the number of draws.
pub(crate) fn record_model_draws(
    ctx: &mut FrameContext<'_>,
    binding: &PassBinding,
    models: &[DrawableModel],
) -> u32 {
    let cmd = &mut *ctx.command_list;
    cmd.bind_pipeline(binding.pipeline);
    cmd.bind_descriptor_set(binding.layout, 0, binding.descriptor_set_for(ctx.frame_slot));

    let mut draws = 0;
    for model in models.iter().filter(|m| m.index_count > 0) {
        let constants = ModelPushConstants { model: model.transform };
        cmd.push_constants(binding.layout, ShaderStages::VERTEX, 0, bytemuck::bytes_of(&constants));
        cmd.bind_vertex_buffer(model.vertex_buffer, 0);
        cmd.bind_index_buffer(model.index_buffer, 0, model.index_type);
        cmd.draw_indexed(model.index_count, 0, 0);
        draws += 1;
    }
    draws
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
