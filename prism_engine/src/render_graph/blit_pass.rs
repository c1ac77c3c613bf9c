/// Blit-to-swapchain: copies the tone-mapped image into the acquired
/// presentable image and leaves it ready for presentation.

use crate::graphics_device::{
    Extent2D, Filter, ImageBlit, ImageHandle, ImageLayout, SubresourceRange,
};
use crate::render_graph::pass::FrameContext;
use crate::resource::{transition_state, ImageResource, ImageState};

/// The presentable image of this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentTarget {
    pub image: ImageHandle,
    pub view: crate::graphics_device::ImageViewHandle,
    pub extent: Extent2D,
}

pub struct BlitPass {
    filter: Filter,
}

impl BlitPass {
    pub fn new(filter: Filter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// The surface owns the presentable image; its state is not tracked
    /// across frames, so it always starts from `ACQUIRED` (contents discarded).
    pub fn record(&mut self, ctx: &mut FrameContext<'_>, source: &ImageResource, target: PresentTarget) {
        assert_eq!(source.state(), ImageState::TRANSFER_SRC, "blit source is not a transfer source");

        let range = SubresourceRange::color();
        transition_state(ctx.command_list, target.image, ImageState::ACQUIRED, ImageState::TRANSFER_DST, range);

        ctx.command_list.blit_image(&ImageBlit {
            src_image: source.handle(),
            src_layout: ImageLayout::TransferSrc,
            src_extent: source.extent(),
            dst_image: target.image,
            dst_layout: ImageLayout::TransferDst,
            dst_extent: target.extent,
            filter: self.filter,
        });

        transition_state(ctx.command_list, target.image, ImageState::TRANSFER_DST, ImageState::PRESENT, range);
    }
}

impl Default for BlitPass {
    fn default() -> Self {
        Self::new(Filter::Nearest)
    }
}
