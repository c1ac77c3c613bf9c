/// Resource-transition protocol.
///
/// `transition` records exactly one barrier command moving an image between
/// access states. It performs no validation of its own: callers pick a pair
/// from the table expressed by the `ImageState` constants below, and a wrong
/// combination is caught by the backend's validation layer (fatal when
/// `Config::panic_on_error` is set).

use crate::graphics_device::{
    AccessFlags, CommandList, ImageBarrier, ImageHandle, ImageLayout, PipelineStages,
    SubresourceRange,
};

/// Pipeline stage + access mask + layout of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageState {
    pub stage: PipelineStages,
    pub access: AccessFlags,
    pub layout: ImageLayout,
}

impl ImageState {
    /// Freshly created, or contents about to be discarded
    pub const UNDEFINED: Self = Self {
        stage: PipelineStages::TOP_OF_PIPE,
        access: AccessFlags::empty(),
        layout: ImageLayout::Undefined,
    };

    /// Presentable image just acquired. The stage matches the submission's
    /// wait stage so the layout change runs after the acquire semaphore.
    pub const ACQUIRED: Self = Self {
        stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
        access: AccessFlags::empty(),
        layout: ImageLayout::Undefined,
    };

    pub const COLOR_ATTACHMENT: Self = Self {
        stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
        access: AccessFlags::COLOR_ATTACHMENT_WRITE,
        layout: ImageLayout::ColorAttachment,
    };

    pub const DEPTH_ATTACHMENT: Self = Self {
        stage: PipelineStages::EARLY_FRAGMENT_TESTS.union(PipelineStages::LATE_FRAGMENT_TESTS),
        access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            .union(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
        layout: ImageLayout::DepthAttachment,
    };

    /// Sampled by fragment shaders
    pub const SHADER_READ: Self = Self {
        stage: PipelineStages::FRAGMENT_SHADER,
        access: AccessFlags::SHADER_READ,
        layout: ImageLayout::ShaderReadOnly,
    };

    pub const TRANSFER_SRC: Self = Self {
        stage: PipelineStages::TRANSFER,
        access: AccessFlags::TRANSFER_READ,
        layout: ImageLayout::TransferSrc,
    };

    pub const TRANSFER_DST: Self = Self {
        stage: PipelineStages::TRANSFER,
        access: AccessFlags::TRANSFER_WRITE,
        layout: ImageLayout::TransferDst,
    };

    /// Handed to the presentation engine; no further GPU access this frame
    pub const PRESENT: Self = Self {
        stage: PipelineStages::BOTTOM_OF_PIPE,
        access: AccessFlags::empty(),
        layout: ImageLayout::PresentSrc,
    };

    /// Same stage and access, contents discarded
    pub fn discarded(self) -> Self {
        Self { layout: ImageLayout::Undefined, ..self }
    }
}

/// Build the barrier moving `image` from `src` to `dst`
pub fn image_barrier(
    image: ImageHandle,
    src: ImageState,
    dst: ImageState,
    range: SubresourceRange,
) -> ImageBarrier {
    ImageBarrier {
        image,
        src_stage: src.stage,
        dst_stage: dst.stage,
        src_access: src.access,
        dst_access: dst.access,
        old_layout: src.layout,
        new_layout: dst.layout,
        range,
    }
}

/// Record a single barrier moving `image` between two access states.
///
/// Transitioning *to* `Undefined` is never valid and aborts in debug builds.
#[allow(clippy::too_many_arguments)]
pub fn transition(
    cmd: &mut dyn CommandList,
    image: ImageHandle,
    src_stage: PipelineStages,
    dst_stage: PipelineStages,
    src_access: AccessFlags,
    dst_access: AccessFlags,
    old_layout: ImageLayout,
    new_layout: ImageLayout,
    range: SubresourceRange,
) {
    debug_assert!(
        new_layout != ImageLayout::Undefined,
        "transition of {:?} to the undefined layout",
        image
    );
    debug_assert!(!image.is_null(), "transition of a null image");

    cmd.pipeline_barrier(&[ImageBarrier {
        image,
        src_stage,
        dst_stage,
        src_access,
        dst_access,
        old_layout,
        new_layout,
        range,
    }]);
}

/// `transition` between two named states
pub fn transition_state(
    cmd: &mut dyn CommandList,
    image: ImageHandle,
    src: ImageState,
    dst: ImageState,
    range: SubresourceRange,
) {
    transition(
        cmd,
        image,
        src.stage,
        dst.stage,
        src.access,
        dst.access,
        src.layout,
        dst.layout,
        range,
    );
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
