/// Render graph module - the five fixed passes and their contracts

pub mod scene_data;
pub mod pass;
pub mod depth_pre_pass;
pub mod gbuffer_pass;
pub mod lighting_pass;
pub mod tone_map_pass;
pub mod blit_pass;
pub mod pass_graph;

pub use scene_data::*;
pub use pass::*;
pub use depth_pre_pass::*;
pub use gbuffer_pass::*;
pub use lighting_pass::*;
pub use tone_map_pass::*;
pub use blit_pass::*;
pub use pass_graph::*;

// Test doubles for the scene and binding collaborators
#[cfg(test)]
pub mod test_collaborators;
