//! Orbit-camera scene viewer.
//!
//! The crate is split into platform independent controllers (gesture
//! classification, momentum zoom, focus transitions, bounce animation, orbit
//! camera, picking) driven once per frame by [`Viewer`], and thin platform
//! layers that feed it input and draw the [`Frame`] it returns: a wgpu window
//! on native targets and a canvas on wasm32.

pub mod app;
pub mod assets;
pub mod bounce;
pub mod camera;
pub mod config;
pub mod error;
pub mod focus;
pub mod gesture;
pub mod input;
pub mod mesh;
pub mod obj;
pub mod picking;
pub mod render;
pub mod scene;
#[cfg(target_arch = "wasm32")]
pub mod web;
pub mod world;
pub mod zoom;

pub use app::{print_final_state, Viewer};
pub use assets::{AssetEvent, AssetLoader};
pub use bounce::{BounceAnimator, BounceProfile};
pub use camera::OrbitCamera;
pub use config::InteractionConfig;
pub use error::SceneError;
pub use focus::FocusAnimator;
pub use gesture::{ClickClassifier, ClickEvent, TouchTracker};
pub use input::{InputEvent, KeyCode, MouseButton, NamedKey};
pub use mesh::Mesh;
pub use obj::load_obj_from_str;
pub use picking::{intersect, Hit, PickShape, Ray};
pub use render::{CameraParams, DrawItem, Frame, LightParams, Renderer};
pub use scene::{Light, Scene, SceneObject};
pub use world::{Entity, EntityId, Geometry, Material, World};
pub use zoom::MomentumZoom;
