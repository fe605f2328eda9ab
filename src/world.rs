use std::fmt;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::mesh::{CUBE_SIZE, PLANE_SIZE, SPHERE_RADIUS, TORUS_RADIUS, TORUS_TUBE};
use crate::picking::{PickShape, PickTarget};
use crate::scene::{ObjectType, SceneObject};

/// Stable handle for an entity; never reused within a [`World`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[cfg(test)]
    pub(crate) const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Sphere,
    Plane,
    Torus,
    Cuboid,
    /// Mesh loaded by name; bounds are in local space.
    Mesh {
        name: String,
        center: Vec3,
        radius: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub roughness: f32,
    pub metalness: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub geometry: Geometry,
    pub material: Material,
    pub position: Vec3,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Radians per second about Y.
    pub spin: f32,
    pub pickable: bool,
    base_yaw: f32,
}

impl Entity {
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }

    pub fn pick_shape(&self) -> PickShape {
        match &self.geometry {
            Geometry::Sphere => PickShape::Sphere {
                radius: SPHERE_RADIUS,
            },
            Geometry::Plane => PickShape::Plane {
                width: PLANE_SIZE,
                height: PLANE_SIZE,
            },
            Geometry::Torus => PickShape::Torus {
                major: TORUS_RADIUS,
                minor: TORUS_TUBE,
            },
            Geometry::Cuboid => PickShape::Cuboid {
                half_extents: Vec3::splat(CUBE_SIZE * 0.5),
            },
            Geometry::Mesh { center, radius, .. } => PickShape::Bounds {
                center: *center,
                radius: *radius,
            },
        }
    }
}

/// Description used to create an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDesc {
    pub name: String,
    pub geometry: Geometry,
    pub material: Material,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub spin: f32,
    pub pickable: bool,
}

impl EntityDesc {
    /// Converts a primitive scene object. Models need their mesh first, so they
    /// yield `None` here and are spawned by the asset pipeline.
    pub fn from_scene_object(object: &SceneObject) -> Option<Self> {
        let geometry = match object.object_type {
            ObjectType::Sphere => Geometry::Sphere,
            ObjectType::Plane => Geometry::Plane,
            ObjectType::Torus => Geometry::Torus,
            ObjectType::Box => Geometry::Cuboid,
            _ => return None,
        };
        Some(Self::with_geometry(object, geometry))
    }

    pub fn with_geometry(object: &SceneObject, geometry: Geometry) -> Self {
        Self {
            name: object.name.clone(),
            geometry,
            material: Material {
                color: object.color,
                roughness: object.roughness,
                metalness: object.metalness,
            },
            position: object.position,
            rotation: Vec3::new(
                object.rotation.x.to_radians(),
                object.rotation.y.to_radians(),
                object.rotation.z.to_radians(),
            ),
            scale: object.scale,
            spin: object.spin,
            pickable: object.pickable,
        }
    }
}

/// Entity store addressed by [`EntityId`].
///
/// Ids index directly into the slot vector; removed entities leave an empty
/// slot so ids stay stable.
#[derive(Debug, Default, Clone)]
pub struct World {
    slots: Vec<Option<Entity>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, desc: EntityDesc) -> EntityId {
        let id = EntityId(self.slots.len() as u32);
        self.slots.push(Some(Entity {
            id,
            name: desc.name,
            geometry: desc.geometry,
            material: desc.material,
            position: desc.position,
            rotation: desc.rotation,
            scale: desc.scale,
            spin: desc.spin,
            pickable: desc.pickable,
            base_yaw: desc.rotation.y,
        }));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn find(&self, name: &str) -> Option<&Entity> {
        self.iter().find(|entity| entity.name == name)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        self.get_mut(id)
            .map(|entity| entity.position = position)
            .is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pick_targets(&self) -> impl Iterator<Item = PickTarget> + '_ {
        self.iter()
            .filter(|entity| entity.pickable)
            .map(|entity| PickTarget {
                entity: entity.id,
                shape: entity.pick_shape(),
                model: entity.model_matrix(),
            })
    }

    /// Sets each spinning entity's yaw for `seconds` since start.
    pub fn apply_spin(&mut self, seconds: f32) {
        for entity in self.slots.iter_mut().flatten() {
            if entity.spin != 0.0 {
                entity.rotation.y = entity.base_yaw + entity.spin * seconds;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(name: &str) -> EntityDesc {
        let object = SceneObject {
            name: name.to_string(),
            object_type: ObjectType::Sphere,
            position: Vec3::new(0.0, 2.0, 0.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            spin: 0.5,
            ..SceneObject::default()
        };
        EntityDesc::from_scene_object(&object).unwrap()
    }

    #[test]
    fn ids_are_stable_across_removal() {
        let mut world = World::new();
        let a = world.spawn(sphere("A"));
        let b = world.spawn(sphere("B"));
        assert!(world.remove(a).is_some());
        assert!(world.get(a).is_none());
        assert_eq!(world.get(b).unwrap().name, "B");
        let c = world.spawn(sphere("C"));
        assert_ne!(c, a);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn set_position_reports_missing_entities() {
        let mut world = World::new();
        let id = world.spawn(sphere("A"));
        assert!(world.set_position(id, Vec3::ONE));
        assert_eq!(world.get(id).unwrap().position, Vec3::ONE);
        assert!(!world.set_position(EntityId::from_raw(42), Vec3::ONE));
    }

    #[test]
    fn spin_is_relative_to_initial_yaw() {
        let mut world = World::new();
        let id = world.spawn(sphere("A"));
        world.apply_spin(2.0);
        let yaw = world.get(id).unwrap().rotation.y;
        assert!((yaw - (90f32.to_radians() + 1.0)).abs() < 1e-5);
    }

    #[test]
    fn models_are_not_spawned_from_the_scene_directly() {
        let object = SceneObject {
            name: "Monkey".into(),
            object_type: ObjectType::Model,
            mesh: Some("monkey.obj".into()),
            ..SceneObject::default()
        };
        assert!(EntityDesc::from_scene_object(&object).is_none());
    }

    #[test]
    fn unpickable_entities_are_skipped() {
        let mut world = World::new();
        let mut desc = sphere("Hidden");
        desc.pickable = false;
        world.spawn(desc);
        let visible = world.spawn(sphere("Visible"));
        let targets: Vec<_> = world.pick_targets().collect();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].entity, visible);
    }
}
