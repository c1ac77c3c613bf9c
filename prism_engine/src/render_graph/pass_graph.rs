/// The fixed five-stage pass graph.
///
/// depth pre-pass -> G-buffer -> lighting -> tone-map -> blit. Ordering
/// between stages is carried entirely by the barriers each pass records into
/// the single frame command list.

use std::sync::Arc;

use crate::engine_debug;
use crate::error::Result;
use crate::graphics_device::{BufferHandle, Extent2D, Filter, FrameConfig, GpuAllocator};
use crate::render_graph::blit_pass::{BlitPass, PresentTarget};
use crate::render_graph::depth_pre_pass::DepthPrePass;
use crate::render_graph::gbuffer_pass::GBufferPass;
use crate::render_graph::lighting_pass::{GBufferInputs, LightingPass};
use crate::render_graph::pass::{FrameContext, PassBindingProvider};
use crate::render_graph::scene_data::SceneSource;
use crate::render_graph::tone_map_pass::ToneMapPass;

pub struct PassGraph {
    // Declared in reverse creation order so fields drop downstream-first
    blit: BlitPass,
    tone_map: ToneMapPass,
    lighting: LightingPass,
    gbuffer: GBufferPass,
    depth: DepthPrePass,
    provider: Box<dyn PassBindingProvider>,
    scene_buffers: Vec<BufferHandle>,
    extent: Extent2D,
}

impl PassGraph {
    /// Build every pass at `extent`.
    ///
    /// `scene_buffers` holds one `SceneGlobals` buffer per frame slot.
    pub fn new(
        allocator: &Arc<dyn GpuAllocator>,
        mut provider: Box<dyn PassBindingProvider>,
        config: &FrameConfig,
        extent: Extent2D,
        scene_buffers: &[BufferHandle],
    ) -> Result<Self> {
        let formats = &config.formats;
        let frames = scene_buffers.len();

        let depth = DepthPrePass::new(allocator, provider.as_mut(), formats.depth, extent, scene_buffers)?;
        let gbuffer = GBufferPass::new(allocator, provider.as_mut(), formats, extent, scene_buffers, config.clear_color)?;
        let lighting = LightingPass::new(
            allocator,
            provider.as_mut(),
            formats.hdr,
            extent,
            scene_buffers,
            &GBufferInputs {
                albedo: gbuffer.albedo(),
                normal: gbuffer.normal(),
                depth: depth.depth(),
            },
        )?;
        let tone_map = ToneMapPass::new(
            allocator,
            provider.as_mut(),
            formats.tone_mapped,
            extent,
            lighting.hdr(),
            frames,
            config.tone_map,
        )?;
        let blit = BlitPass::new(Filter::Nearest);

        engine_debug!("prism::pass_graph", "Built pass graph at {}x{}", extent.width, extent.height);
        Ok(Self {
            blit,
            tone_map,
            lighting,
            gbuffer,
            depth,
            provider,
            scene_buffers: scene_buffers.to_vec(),
            extent,
        })
    }

    /// Upload per-frame data owned by the passes (lights)
    pub fn update(&self, frame_slot: usize, scene: &dyn SceneSource) -> Result<()> {
        self.lighting
            .update_lights(frame_slot, scene.directional_light(), scene.point_lights())
    }

    /// Record all five passes in order. Returns the number of draws.
    pub fn record(&mut self, ctx: &mut FrameContext<'_>, scene: &dyn SceneSource, target: PresentTarget) -> u32 {
        let models = scene.models();
        let mut draws = 0;

        draws += self.depth.record(ctx, models);
        draws += self.gbuffer.record(ctx, models);
        draws += self.lighting.record(
            ctx,
            &GBufferInputs {
                albedo: self.gbuffer.albedo(),
                normal: self.gbuffer.normal(),
                depth: self.depth.depth(),
            },
        );
        draws += self.tone_map.record(ctx, self.lighting.hdr());
        self.blit.record(ctx, self.tone_map.output(), target);

        draws
    }

    /// Reallocate every screen-sized image at `extent` and re-request the
    /// bindings that reference them. The device must be idle.
    pub fn resize(&mut self, extent: Extent2D) -> Result<()> {
        if extent == self.extent {
            return Ok(());
        }
        self.depth.resize(extent)?;
        self.gbuffer.resize(extent)?;
        self.lighting.resize(extent)?;
        self.tone_map.resize(extent)?;
        self.extent = extent;

        let provider = self.provider.as_mut();
        self.depth.rebind(provider, &self.scene_buffers)?;
        self.gbuffer.rebind(provider, &self.scene_buffers)?;
        self.lighting.rebind(
            provider,
            &self.scene_buffers,
            &GBufferInputs {
                albedo: self.gbuffer.albedo(),
                normal: self.gbuffer.normal(),
                depth: self.depth.depth(),
            },
        )?;
        self.tone_map.rebind(provider, self.lighting.hdr(), self.scene_buffers.len())?;

        engine_debug!("prism::pass_graph", "Resized pass images to {}x{}", extent.width, extent.height);
        Ok(())
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn depth_pre_pass(&self) -> &DepthPrePass {
        &self.depth
    }

    pub fn gbuffer_pass(&self) -> &GBufferPass {
        &self.gbuffer
    }

    pub fn lighting_pass(&self) -> &LightingPass {
        &self.lighting
    }

    pub fn tone_map_pass(&self) -> &ToneMapPass {
        &self.tone_map
    }

    pub fn tone_map_pass_mut(&mut self) -> &mut ToneMapPass {
        &mut self.tone_map
    }

    pub fn blit_pass(&self) -> &BlitPass {
        &self.blit
    }
}

#[cfg(test)]
#[path = "pass_graph_tests.rs"]
mod tests;
