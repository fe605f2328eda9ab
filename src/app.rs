//! The per-frame driver.
//!
//! [`Viewer`] owns every controller and the entity store. Platform code feeds it
//! [`InputEvent`]s as they arrive and calls [`Viewer::tick`] once per frame; the
//! returned [`Frame`] is all a renderer needs.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use log::{debug, error, info};

use crate::assets::{AssetEvent, AssetLoader};
use crate::bounce::{BounceAnimator, BounceProfile};
use crate::camera::OrbitCamera;
use crate::config::InteractionConfig;
use crate::focus::FocusAnimator;
use crate::gesture::{ClickClassifier, ClickEvent, TouchOutput, TouchTracker};
use crate::input::{InputEvent, MouseButton};
use crate::mesh::Mesh;
use crate::picking::{intersect, Hit};
use crate::render::{CameraParams, DrawItem, Frame, LightParams};
use crate::scene::{Light, Scene};
use crate::world::{EntityDesc, Geometry, World};
use crate::zoom::MomentumZoom;

pub const DEFAULT_VIEWPORT: (u32, u32) = (1280, 720);

pub struct Viewer {
    config: InteractionConfig,
    world: World,
    camera: OrbitCamera,
    clicks: ClickClassifier,
    touches: TouchTracker,
    zoom: MomentumZoom,
    focus: FocusAnimator,
    bounces: BounceAnimator,
    assets: AssetLoader,
    meshes: HashMap<String, Mesh>,
    viewport: (u32, u32),
    start_ms: f64,
    ambient: Light,
    directional: Light,
    background: Vec3,
}

impl Viewer {
    /// Spawns the scene's primitives and queues its models on `assets`.
    pub fn new(scene: &Scene, mut assets: AssetLoader, now_ms: f64) -> Self {
        let config = scene.interaction.clone();
        let mut world = World::new();
        for object in scene.entities() {
            match EntityDesc::from_scene_object(object) {
                Some(desc) => {
                    world.spawn(desc);
                }
                None => assets.request(object.clone()),
            }
        }
        info!(
            "viewer ready: {} entities, {} model(s) loading",
            world.len(),
            assets.pending()
        );

        let mut camera = scene.camera();
        camera.set_viewport(DEFAULT_VIEWPORT.0, DEFAULT_VIEWPORT.1);

        Self {
            clicks: ClickClassifier::new(config.double_click_ms),
            touches: TouchTracker::new(config.click_drag_tolerance_px),
            zoom: MomentumZoom::new(&config),
            focus: FocusAnimator::new(config.focus_duration_s),
            bounces: BounceAnimator::new(BounceProfile::from_config(&config)),
            config,
            world,
            camera,
            assets,
            meshes: HashMap::new(),
            viewport: DEFAULT_VIEWPORT,
            start_ms: now_ms,
            ambient: scene.ambient_light(),
            directional: scene.directional_light(),
            background: scene.background,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn zoom(&self) -> &MomentumZoom {
        &self.zoom
    }

    pub fn focus(&self) -> &FocusAnimator {
        &self.focus
    }

    pub fn bounces(&self) -> &BounceAnimator {
        &self.bounces
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Mesh data for [`Geometry::Mesh`] entities, keyed by mesh name.
    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.get(name)
    }

    pub fn pending_assets(&self) -> usize {
        self.assets.pending()
    }

    pub fn handle_input(&mut self, event: InputEvent, now_ms: f64) {
        match event {
            InputEvent::Wheel { delta_y } => self.zoom.on_wheel_delta(delta_y, now_ms),
            InputEvent::Click { position } => self.click(position, now_ms),
            InputEvent::PointerDrag { button, delta } => {
                let height = self.viewport.1 as f32;
                if button == MouseButton::LEFT {
                    self.camera.rotate(delta, height);
                } else if button == MouseButton::MIDDLE || button == MouseButton::RIGHT {
                    self.camera.pan(delta, height);
                }
            }
            InputEvent::TouchStart { id, position } => {
                let output = self.touches.touch_start(id, position);
                self.apply_touch(output, now_ms);
            }
            InputEvent::TouchMove { id, position } => {
                let output = self.touches.touch_move(id, position);
                self.apply_touch(output, now_ms);
            }
            InputEvent::TouchEnd { id } => {
                let output = self.touches.touch_end(id);
                self.apply_touch(output, now_ms);
            }
            InputEvent::KeyDown(key) if key == self.config.recenter_key => {
                debug!("recentering on the origin");
                self.focus.start(Vec3::ZERO, self.camera.target, now_ms);
            }
            InputEvent::KeyDown(_) => {}
            InputEvent::Resize { width, height } => {
                self.viewport = (width.max(1), height.max(1));
                self.camera.set_viewport(self.viewport.0, self.viewport.1);
            }
        }
    }

    /// Advances every controller to `now_ms` and returns the frame to draw.
    pub fn tick(&mut self, now_ms: f64) -> Frame {
        for event in self.assets.drain() {
            self.on_asset(event);
        }
        if let Some(click) = self.clicks.poll(now_ms) {
            self.on_click_event(click, now_ms);
        }
        if let Some(target) = self.focus.update(now_ms) {
            self.camera.target = target;
        }
        self.zoom.update(&mut self.camera);
        self.bounces.update(now_ms, &mut self.world);
        self.world.apply_spin(self.seconds_since_start(now_ms));
        self.camera.update();
        self.frame()
    }

    /// Nearest pickable entity under a viewport pixel.
    pub fn hit_test(&self, screen: Vec2) -> Option<Hit> {
        let ndc = OrbitCamera::screen_to_ndc(screen, self.viewport);
        let ray = self.camera.ray_from_ndc(ndc);
        intersect(&ray, self.world.pick_targets()).into_iter().next()
    }

    pub fn frame(&self) -> Frame {
        Frame {
            camera: CameraParams {
                view_proj: self.camera.view_proj(),
                position: self.camera.position,
            },
            ambient: LightParams::from(self.ambient),
            directional: LightParams::from(self.directional),
            background: self.background,
            items: self
                .world
                .iter()
                .map(|entity| DrawItem {
                    entity: entity.id,
                    geometry: entity.geometry.clone(),
                    model: entity.model_matrix(),
                    material: entity.material,
                })
                .collect(),
        }
    }

    fn click(&mut self, position: Vec2, now_ms: f64) {
        if let Some(click) = self.clicks.on_click(position, now_ms) {
            self.on_click_event(click, now_ms);
        }
    }

    fn apply_touch(&mut self, output: TouchOutput, now_ms: f64) {
        self.camera.native_pan_enabled = !self.touches.is_multi_touch();
        if let Some(delta) = output.pinch_delta {
            self.zoom.on_pinch_delta(delta, now_ms);
        }
        if let Some(delta) = output.pan_delta {
            self.camera
                .touch_pan(delta, self.config.touch_pan_sensitivity);
        }
        if let Some(delta) = output.rotate_delta {
            self.camera.rotate(delta, self.viewport.1 as f32);
        }
        if let Some(position) = output.tap {
            self.click(position, now_ms);
        }
    }

    fn on_click_event(&mut self, click: ClickEvent, now_ms: f64) {
        match click {
            ClickEvent::Single(position) => {
                let Some(hit) = self.hit_test(position) else {
                    return;
                };
                let Some(entity) = self.world.get(hit.entity) else {
                    return;
                };
                debug!("bouncing {} {}", entity.name, hit.entity);
                let y = entity.position.y;
                self.bounces.start(hit.entity, y, now_ms);
            }
            ClickEvent::Double(position) => {
                let Some(hit) = self.hit_test(position) else {
                    return;
                };
                debug!(
                    "focusing on ({:.2}, {:.2}, {:.2})",
                    hit.point.x, hit.point.y, hit.point.z
                );
                self.focus.start(hit.point, self.camera.target, now_ms);
            }
        }
    }

    fn on_asset(&mut self, event: AssetEvent) {
        match event {
            AssetEvent::Loaded { object, mesh } => {
                let name = object.mesh.clone().unwrap_or_else(|| object.name.clone());
                let (center, radius) = mesh.bounding_sphere();
                self.meshes.insert(name.clone(), mesh);
                let geometry = Geometry::Mesh {
                    name,
                    center,
                    radius,
                };
                let id = self
                    .world
                    .spawn(EntityDesc::with_geometry(&object, geometry));
                info!("model {} loaded as {id}", object.name);
            }
            AssetEvent::Failed { object, error } => {
                error!("failed to load model {}: {error:#}", object.name);
            }
        }
    }

    fn seconds_since_start(&self, now_ms: f64) -> f32 {
        let seconds = ((now_ms - self.start_ms) / 1000.0) as f32;
        if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        }
    }
}

pub fn print_final_state(world: &World) {
    println!("Final object states:");
    for entity in world.iter() {
        println!(
            " - {} pos=({:.2}, {:.2}, {:.2}) color=({:.2}, {:.2}, {:.2})",
            entity.name,
            entity.position.x,
            entity.position.y,
            entity.position.z,
            entity.material.color.x,
            entity.material.color.y,
            entity.material.color.z
        );
    }
}
