use glam::{Mat4, Vec3};

use crate::scene::Light;
use crate::world::{EntityId, Geometry, Material};

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Lighting state consumed by the renderer's uniform buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightParams {
    /// For directional lights, the light shines from here towards the origin.
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl From<Light> for LightParams {
    fn from(light: Light) -> Self {
        Self {
            position: light.position,
            color: light.color,
            intensity: light.intensity.max(0.0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DrawItem {
    pub entity: EntityId,
    pub geometry: Geometry,
    pub model: Mat4,
    pub material: Material,
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub camera: CameraParams,
    pub ambient: LightParams,
    pub directional: LightParams,
    pub background: Vec3,
    pub items: Vec<DrawItem>,
}
