/// Scene and binding collaborators for tests

use std::sync::{Arc, Mutex};

use glam::{Mat4, Vec3};

use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferHandle, DescriptorSetHandle, IndexType, PipelineHandle, PipelineLayoutHandle,
};
use crate::render_graph::pass::{PassBinding, PassBindingProvider, PassInputs, PassKind};
use crate::render_graph::scene_data::{DrawableModel, PointLight, SceneGlobals, SceneSource};

/// Fixed list of models and a fixed camera
pub struct TestScene {
    pub models: Vec<DrawableModel>,
    pub globals: SceneGlobals,
    pub points: Vec<PointLight>,
    pub updates: Arc<Mutex<u32>>,
}

impl TestScene {
    pub fn with_models(count: u32) -> Self {
        let models = (0..count)
            .map(|i| DrawableModel {
                vertex_buffer: BufferHandle(1000 + i as u64),
                index_buffer: BufferHandle(2000 + i as u64),
                index_count: 36,
                index_type: IndexType::U32,
                transform: Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
            })
            .collect();
        Self {
            models,
            globals: SceneGlobals::new(
                Mat4::look_at_rh(Vec3::new(0.0, 1.0, 4.0), Vec3::ZERO, Vec3::Y),
                Mat4::perspective_rh(1.0, 4.0 / 3.0, 0.1, 50.0),
                Vec3::new(0.0, 1.0, 4.0),
            ),
            points: vec![PointLight::new(Vec3::Y, 4.0, Vec3::ONE, 2.0)],
            updates: Arc::new(Mutex::new(0)),
        }
    }
}

impl SceneSource for TestScene {
    fn update(&mut self, _delta_seconds: f32) -> Result<()> {
        *self.updates.lock().unwrap() += 1;
        Ok(())
    }

    fn models(&self) -> &[DrawableModel] {
        &self.models
    }

    fn globals(&self) -> SceneGlobals {
        self.globals
    }

    fn point_lights(&self) -> &[PointLight] {
        &self.points
    }
}

/// Hands out fresh handles and records every request
#[derive(Clone, Default)]
pub struct RecordingBindingProvider {
    pub requests: Arc<Mutex<Vec<(PassKind, PassInputs)>>>,
    pub fail_on: Option<PassKind>,
}

impl RecordingBindingProvider {
    pub fn requests(&self) -> Vec<(PassKind, PassInputs)> {
        self.requests.lock().unwrap().clone()
    }
}

impl PassBindingProvider for RecordingBindingProvider {
    fn pass_binding(&mut self, kind: PassKind, inputs: &PassInputs) -> Result<PassBinding> {
        if self.fail_on == Some(kind) {
            return Err(Error::InitializationFailed(format!("no pipeline for {}", kind.name())));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push((kind, inputs.clone()));
        let base = 100 * requests.len() as u64;
        let set_count = inputs.scene_buffers.len().max(1) as u64;
        Ok(PassBinding {
            pipeline: PipelineHandle(base + 1),
            layout: PipelineLayoutHandle(base + 2),
            descriptor_sets: (0..set_count).map(|i| DescriptorSetHandle(base + 10 + i)).collect(),
        })
    }
}
