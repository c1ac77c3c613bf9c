/// Resource module - image state tracking, the transition protocol and
/// per-slot uniform buffers

pub mod transition;
pub mod image_resource;
pub mod slot_buffers;

pub use transition::*;
pub use image_resource::*;
pub use slot_buffers::*;
