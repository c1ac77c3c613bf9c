/*!
# Prism Engine

Frame pipeline and synchronization core of the Prism deferred renderer.

This crate is backend-agnostic: GPU work goes through the `GraphicsDevice`,
`GpuAllocator` and `SurfaceBackend` traits, implemented for Vulkan by
`prism_engine_renderer_vulkan`.

## Architecture

- **Resource transitions**: one barrier per state change, with the access
  state of every pass-owned image tracked in `ImageResource`
- **PresentableSurface**: swapchain negotiation, rebuild on resize or
  invalidation, acquire/present
- **FrameSyncSet**: per-frame-in-flight semaphores and fences
- **PassGraph**: depth pre-pass, G-buffer, lighting, tone-map, blit
- **FrameRenderer**: the wait / acquire / record / submit / present cycle
- **Host**: shared window state, the render thread and the winit bridge
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod resource;
pub mod frame;
pub mod render_graph;
pub mod host;

// Main prism namespace module
pub mod prism {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging entry point
    pub use crate::engine::Engine;

    // Frame orchestrator
    pub use crate::frame::{BackendHandles, FrameOutcome, FrameRenderer, FrameStats};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend-neutral device interface
    pub mod render {
        pub use crate::graphics_device::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod graph {
        pub use crate::render_graph::*;
    }

    pub mod host {
        pub use crate::host::*;
    }
}

// Re-export math library at crate root
pub use glam;
