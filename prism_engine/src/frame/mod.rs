/// Frame module - surface, frame slots and the per-frame orchestrator

pub mod frame_sync;
pub mod presentable_surface;
pub mod frame_renderer;

pub use frame_sync::*;
pub use presentable_surface::*;
pub use frame_renderer::*;
