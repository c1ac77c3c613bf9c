/// Host module - the two-thread shape of an application: a control thread
/// owning the window and a render thread owning the frame orchestrator

pub mod shared_window_state;
pub mod render_loop;
pub mod window_event_bridge;

pub use shared_window_state::*;
pub use render_loop::*;
pub use window_event_bridge::*;
