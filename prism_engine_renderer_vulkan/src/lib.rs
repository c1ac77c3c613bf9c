/*!
# Prism Engine - Vulkan Backend

Vulkan implementation of the `prism_engine` backend traits.

This crate implements `GraphicsDevice`, `GpuAllocator` and `SurfaceBackend`
on top of `ash` (Vulkan 1.3 with dynamic rendering) and `gpu-allocator`, and
records frames through `VulkanCommandList`.

## Example

```no_run
use std::sync::Arc;
use prism_engine::prism::BackendHandles;
use prism_engine::prism::host::SharedWindowState;
use prism_engine::prism::render::{Config, Extent2D};
use prism_engine_renderer_vulkan::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> prism_engine::prism::Result<()> {
let device = Arc::new(VulkanGraphicsDevice::new(window, Config::default())?);
let size = window.inner_size();
let state = Arc::new(SharedWindowState::new(Extent2D::new(size.width, size.height)));
let backend = BackendHandles::from_backend(device, state);
# let _ = backend;
# Ok(())
# }
```
*/

mod vulkan_format;
mod vulkan_command_list;
mod vulkan_device;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_command_list::VulkanCommandList;
pub use vulkan_device::VulkanGraphicsDevice;

// Re-export debug utilities
#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, print_validation_stats_report};
