/// Tests for ImageResource and its builder

use super::*;
use crate::graphics_device::mock_graphics_device::{MockCommand, MockGraphicsDevice};
use crate::graphics_device::{ImageAspects, ImageLayout};

fn allocator(device: &Arc<MockGraphicsDevice>) -> Arc<dyn GpuAllocator> {
    device.clone()
}

fn color_image(allocator: &Arc<dyn GpuAllocator>) -> ImageResource {
    ImageResourceBuilder::new("albedo")
        .format(TextureFormat::R8G8B8A8_UNORM)
        .usage(ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED)
        .screen_sized(Extent2D::new(640, 480))
        .build(allocator)
        .unwrap()
}

// ============================================================================
// Tests: Builder
// ============================================================================

#[test]
fn test_build_allocates_image() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let image = color_image(&alloc);

    assert_eq!(image.name(), "albedo");
    assert_eq!(image.extent(), Extent2D::new(640, 480));
    assert!(image.is_screen_sized());
    assert_eq!(image.state(), ImageState::UNDEFINED);

    let live = device.live_images();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].aspects, ImageAspects::COLOR);
}

#[test]
fn test_build_depth_uses_depth_aspect() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let depth = ImageResourceBuilder::new("depth")
        .format(TextureFormat::D32_SFLOAT)
        .usage(ImageUsage::DEPTH_ATTACHMENT | ImageUsage::SAMPLED)
        .extent(Extent2D::new(16, 16))
        .build(&alloc)
        .unwrap();

    assert!(!depth.is_screen_sized());
    assert_eq!(depth.range(), SubresourceRange::depth());
}

#[test]
fn test_build_without_extent_fails() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let result = ImageResourceBuilder::new("x")
        .usage(ImageUsage::SAMPLED)
        .build(&alloc);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(device.live_images().is_empty());
}

#[test]
fn test_build_without_usage_fails() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let result = ImageResourceBuilder::new("x").extent(Extent2D::new(4, 4)).build(&alloc);
    assert!(result.is_err());
}

#[test]
fn test_drop_frees_image() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    {
        let _image = color_image(&alloc);
        assert_eq!(device.live_images().len(), 1);
    }
    assert!(device.live_images().is_empty());
}

// ============================================================================
// Tests: Transitions
// ============================================================================

#[test]
fn test_transition_updates_state_immediately() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let mut image = color_image(&alloc);
    let mut cmd = device.new_command_list();
    cmd.begin().unwrap();

    image.transition_to(&mut cmd, ImageState::COLOR_ATTACHMENT);
    assert_eq!(image.state(), ImageState::COLOR_ATTACHMENT);

    image.transition_to(&mut cmd, ImageState::SHADER_READ);
    assert_eq!(image.state(), ImageState::SHADER_READ);

    let recorded = device.recording(cmd.handle());
    let MockCommand::Barrier(second) = &recorded[2] else {
        panic!("expected a barrier");
    };
    assert_eq!(second[0].old_layout, ImageLayout::ColorAttachment);
    assert_eq!(second[0].new_layout, ImageLayout::ShaderReadOnly);
}

#[test]
fn test_transition_round_trip_restores_state() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let mut image = color_image(&alloc);
    let mut cmd = device.new_command_list();
    cmd.begin().unwrap();
    image.discard_to(&mut cmd, ImageState::COLOR_ATTACHMENT);

    let original = image.state();
    image.transition_to(&mut cmd, ImageState::TRANSFER_SRC);
    image.transition_to(&mut cmd, original);

    assert_eq!(image.state(), original);
}

#[test]
fn test_discard_uses_undefined_old_layout_and_previous_scope() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let mut image = color_image(&alloc);
    let mut cmd = device.new_command_list();
    cmd.begin().unwrap();

    image.discard_to(&mut cmd, ImageState::COLOR_ATTACHMENT);
    image.transition_to(&mut cmd, ImageState::SHADER_READ);
    image.discard_to(&mut cmd, ImageState::COLOR_ATTACHMENT);

    let recorded = device.recording(cmd.handle());
    let MockCommand::Barrier(last) = recorded.last().unwrap() else {
        panic!("expected a barrier");
    };
    assert_eq!(last[0].old_layout, ImageLayout::Undefined);
    assert_eq!(last[0].src_stage, ImageState::SHADER_READ.stage);
    assert_eq!(last[0].src_access, ImageState::SHADER_READ.access);
}

#[test]
fn test_batch_records_one_command() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let mut a = color_image(&alloc);
    let mut b = color_image(&alloc);
    let mut cmd = device.new_command_list();
    cmd.begin().unwrap();

    ImageResource::discard_batch(&mut cmd, &mut [&mut a, &mut b], ImageState::COLOR_ATTACHMENT);

    let recorded = device.recording(cmd.handle());
    assert_eq!(recorded.len(), 2);
    let MockCommand::Barrier(barriers) = &recorded[1] else {
        panic!("expected a barrier");
    };
    assert_eq!(barriers.len(), 2);
    assert_eq!(barriers[0].image, a.handle());
    assert_eq!(barriers[1].image, b.handle());
    assert_eq!(a.state(), ImageState::COLOR_ATTACHMENT);
    assert_eq!(b.state(), ImageState::COLOR_ATTACHMENT);
}

#[test]
fn test_empty_batch_records_nothing() {
    let device = MockGraphicsDevice::new();
    let mut cmd = device.new_command_list();
    cmd.begin().unwrap();
    ImageResource::transition_batch(&mut cmd, &mut [], ImageState::SHADER_READ);
    assert_eq!(device.recording(cmd.handle()), vec![MockCommand::Begin]);
}

// ============================================================================
// Tests: Resize
// ============================================================================

#[test]
fn test_resize_reallocates_and_resets_state() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let mut image = color_image(&alloc);
    let old_handle = image.handle();
    let mut cmd = device.new_command_list();
    cmd.begin().unwrap();
    image.discard_to(&mut cmd, ImageState::SHADER_READ);

    image.resize(Extent2D::new(1024, 768)).unwrap();

    assert_ne!(image.handle(), old_handle);
    assert_eq!(image.extent(), Extent2D::new(1024, 768));
    assert_eq!(image.state(), ImageState::UNDEFINED);
    let live = device.live_images();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].extent, Extent2D::new(1024, 768));
}

#[test]
fn test_resize_same_extent_is_noop() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let mut image = color_image(&alloc);
    let handle = image.handle();
    image.resize(Extent2D::new(640, 480)).unwrap();
    assert_eq!(image.handle(), handle);
}

#[test]
fn test_resize_leaves_fixed_size_image_alone() {
    let device = MockGraphicsDevice::new();
    let alloc = allocator(&device);
    let mut image = ImageResourceBuilder::new("lut")
        .format(TextureFormat::R8G8B8A8_UNORM)
        .usage(ImageUsage::SAMPLED)
        .extent(Extent2D::new(32, 32))
        .build(&alloc)
        .unwrap();
    assert!(!image.is_screen_sized());
    let handle = image.handle();
    let mut cmd = device.new_command_list();
    cmd.begin().unwrap();
    image.discard_to(&mut cmd, ImageState::SHADER_READ);

    image.resize(Extent2D::new(1024, 768)).unwrap();

    assert_eq!(image.handle(), handle);
    assert_eq!(image.extent(), Extent2D::new(32, 32));
    assert_eq!(image.state(), ImageState::SHADER_READ);
    assert_eq!(device.live_images()[0].extent, Extent2D::new(32, 32));
}
