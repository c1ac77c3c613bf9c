/// Graphics device module - backend-neutral GPU interface

// Module declarations
pub mod types;
pub mod command_list;
pub mod graphics_device;
pub mod allocator;
pub mod surface;
pub mod config;

// Re-export everything
pub use types::*;
pub use command_list::*;
pub use graphics_device::*;
pub use allocator::*;
pub use surface::*;
pub use config::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
