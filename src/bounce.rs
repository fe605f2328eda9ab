use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::config::InteractionConfig;
use crate::world::{EntityId, World};

/// Shape of the bounce curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceProfile {
    pub duration_s: f32,
    pub jump_height: f32,
    pub frequency: f32,
    pub rebound_height: f32,
}

impl BounceProfile {
    pub fn from_config(config: &InteractionConfig) -> Self {
        Self {
            duration_s: config.bounce_duration_s,
            jump_height: config.bounce_jump_height,
            frequency: config.bounce_frequency,
            rebound_height: config.bounce_rebound_height,
        }
    }

    /// Vertical offset `elapsed` seconds into a bounce, never below zero.
    ///
    /// One damped arc during the first half second, then quick rebounds.
    pub fn offset(&self, elapsed: f32) -> f32 {
        let decay = (-elapsed * 3.0).exp();
        let offset = if elapsed < 0.5 {
            self.jump_height * (elapsed * TAU).sin() * decay
        } else {
            let rebound = elapsed - 0.5;
            (rebound * self.frequency * PI).sin() * decay * self.rebound_height
        };
        offset.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceEntry {
    pub start_ms: f64,
    /// Resting height captured when the entity was first bounced.
    pub original_y: f32,
}

/// Independent bounce animations keyed by entity.
#[derive(Debug, Clone)]
pub struct BounceAnimator {
    profile: BounceProfile,
    entries: HashMap<EntityId, BounceEntry>,
}

impl BounceAnimator {
    pub fn new(profile: BounceProfile) -> Self {
        Self {
            profile,
            entries: HashMap::new(),
        }
    }

    pub fn is_bouncing(&self, entity: EntityId) -> bool {
        self.entries.contains_key(&entity)
    }

    pub fn entry(&self, entity: EntityId) -> Option<&BounceEntry> {
        self.entries.get(&entity)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Starts or restarts a bounce. A restart keeps the resting height of the
    /// running bounce rather than the current, displaced one.
    pub fn start(&mut self, entity: EntityId, current_y: f32, now_ms: f64) {
        let original_y = self
            .entries
            .get(&entity)
            .map_or(current_y, |entry| entry.original_y);
        self.entries.insert(
            entity,
            BounceEntry {
                start_ms: now_ms,
                original_y,
            },
        );
    }

    /// Moves every bouncing entity and retires finished bounces.
    pub fn update(&mut self, now_ms: f64, world: &mut World) {
        let profile = self.profile;
        self.entries.retain(|&id, entry| {
            let Some(position) = world.get(id).map(|entity| entity.position) else {
                return false;
            };
            let elapsed = ((now_ms - entry.start_ms) / 1000.0) as f32;
            let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
            let finished = elapsed >= profile.duration_s;
            let y = if finished {
                entry.original_y
            } else {
                entry.original_y + profile.offset(elapsed)
            };
            world.set_position(id, Vec3::new(position.x, y, position.z));
            !finished
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ObjectType, SceneObject};
    use crate::world::EntityDesc;

    fn world_with_box(y: f32) -> (World, EntityId) {
        let mut world = World::new();
        let object = SceneObject {
            name: "Box".into(),
            object_type: ObjectType::Box,
            position: Vec3::new(0.0, y, 0.0),
            ..SceneObject::default()
        };
        let id = world.spawn(EntityDesc::from_scene_object(&object).unwrap());
        (world, id)
    }

    fn animator() -> BounceAnimator {
        BounceAnimator::new(BounceProfile::from_config(&InteractionConfig::default()))
    }

    #[test]
    fn bounce_starts_at_rest_and_restores_exactly() {
        let (mut world, id) = world_with_box(2.0);
        let mut bounces = animator();
        bounces.start(id, 2.0, 1_000.0);

        bounces.update(1_000.0, &mut world);
        assert_eq!(world.get(id).unwrap().position.y, 2.0);

        bounces.update(1_250.0, &mut world);
        let peak = world.get(id).unwrap().position.y;
        let expected = 2.0 + 1.5 * (0.25f32 * TAU).sin() * (-0.75f32).exp();
        assert!((peak - expected).abs() < 1e-5);

        bounces.update(2_500.0, &mut world);
        assert_eq!(world.get(id).unwrap().position.y, 2.0);
        assert!(!bounces.is_bouncing(id));
    }

    #[test]
    fn offset_never_dips_below_rest() {
        let profile = BounceProfile::from_config(&InteractionConfig::default());
        for step in 0..150 {
            assert!(profile.offset(step as f32 * 0.01) >= 0.0);
        }
        // Trough of the first rebound.
        assert_eq!(profile.offset(0.7), 0.0);
        assert!(profile.offset(0.55) > 0.0);
    }

    #[test]
    fn restart_keeps_the_original_rest_height() {
        let (mut world, id) = world_with_box(2.0);
        let mut bounces = animator();
        bounces.start(id, 2.0, 0.0);
        bounces.update(200.0, &mut world);
        let displaced = world.get(id).unwrap().position.y;
        assert!(displaced > 2.0);

        bounces.start(id, displaced, 200.0);
        assert_eq!(bounces.entry(id).unwrap().original_y, 2.0);
        assert_eq!(bounces.entry(id).unwrap().start_ms, 200.0);
        assert_eq!(bounces.active_count(), 1);

        bounces.update(1_700.0, &mut world);
        assert_eq!(world.get(id).unwrap().position.y, 2.0);
    }

    #[test]
    fn bounce_only_moves_the_entity_vertically() {
        let (mut world, id) = world_with_box(1.0);
        world.set_position(id, Vec3::new(3.0, 1.0, -4.0));
        let mut bounces = animator();
        bounces.start(id, 1.0, 0.0);

        bounces.update(300.0, &mut world);
        let position = world.get(id).unwrap().position;
        assert_eq!((position.x, position.z), (3.0, -4.0));
        assert!(position.y > 1.0);

        bounces.update(1_600.0, &mut world);
        assert_eq!(world.get(id).unwrap().position, Vec3::new(3.0, 1.0, -4.0));
    }

    #[test]
    fn entries_for_removed_entities_are_dropped() {
        let (mut world, id) = world_with_box(0.0);
        let mut bounces = animator();
        bounces.start(id, 0.0, 0.0);
        world.remove(id);
        bounces.update(100.0, &mut world);
        assert_eq!(bounces.active_count(), 0);
    }
}
