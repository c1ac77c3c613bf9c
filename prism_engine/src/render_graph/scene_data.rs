/// What the passes consume from the scene collaborator.
///
/// GPU-visible structs are `#[repr(C)]` + `Pod` and follow std140 alignment:
/// every `Vec3` is followed by a scalar so it fills a 16-byte slot.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::error::Result;
use crate::graphics_device::{BufferHandle, IndexType};

/// Maximum number of point lights uploaded per frame
pub const MAX_POINT_LIGHTS: usize = 16;

/// Camera data shared by every pass (set 0, binding 0)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneGlobals {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub _padding: f32,
}

impl SceneGlobals {
    pub fn new(view: Mat4, projection: Mat4, camera_position: Vec3) -> Self {
        Self {
            view,
            projection,
            view_projection: projection * view,
            camera_position,
            _padding: 0.0,
        }
    }
}

impl Default for SceneGlobals {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DirectionalLight {
    /// Points toward the light
    pub direction: Vec3,
    pub _padding: f32,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            _padding: 0.0,
            color,
            intensity,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    pub position: Vec3,
    /// Distance at which the contribution reaches zero
    pub radius: f32,
    pub color: Vec3,
    pub intensity: f32,
}

impl PointLight {
    pub fn new(position: Vec3, radius: f32, color: Vec3, intensity: f32) -> Self {
        Self { position, radius, color, intensity }
    }
}

/// Light block read by the lighting pass (set 1)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightData {
    pub directional: DirectionalLight,
    pub point_count: u32,
    pub _padding: [u32; 3],
    pub points: [PointLight; MAX_POINT_LIGHTS],
}

impl LightData {
    /// Pack a directional light and the first `MAX_POINT_LIGHTS` point lights
    pub fn pack(directional: DirectionalLight, points: &[PointLight]) -> Self {
        let mut data = Self {
            directional,
            ..Self::default()
        };
        let count = points.len().min(MAX_POINT_LIGHTS);
        data.points[..count].copy_from_slice(&points[..count]);
        data.point_count = count as u32;
        data
    }
}

/// Per-draw inline constants of the geometry passes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ModelPushConstants {
    pub model: Mat4,
}

/// One drawable: buffers plus its transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableModel {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub index_type: IndexType,
    pub transform: Mat4,
}

/// The scene collaborator polled by the orchestrator once per frame
pub trait SceneSource: Send {
    /// Advance animation/camera; called after the slot wait, before acquisition
    fn update(&mut self, _delta_seconds: f32) -> Result<()> {
        Ok(())
    }

    /// Models drawn by the depth pre-pass and the G-buffer pass
    fn models(&self) -> &[DrawableModel];

    /// Camera data for this frame
    fn globals(&self) -> SceneGlobals;

    fn directional_light(&self) -> DirectionalLight {
        DirectionalLight::new(Vec3::new(0.3, 1.0, 0.5), Vec3::ONE, 1.0)
    }

    fn point_lights(&self) -> &[PointLight] {
        &[]
    }
}

#[cfg(test)]
#[path = "scene_data_tests.rs"]
mod tests;
