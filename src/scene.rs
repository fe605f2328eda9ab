use std::fmt;

use glam::Vec3;
use log::warn;
use roxmltree::{Document, Node};

use crate::camera::OrbitCamera;
use crate::config::InteractionConfig;
use crate::error::SceneError;
use crate::input::KeyCode;

type Result<T> = std::result::Result<T, SceneError>;

/// Runtime representation of a scene file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub lights: Vec<Light>,
    pub background: Vec3,
    pub interaction: InteractionConfig,
}

impl Scene {
    /// Parses the scene XML. Any malformed value is an error.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        let mut objects = Vec::new();

        for node in root.descendants().filter(|n| n.has_tag_name("object")) {
            let mut object = SceneObject::default();
            object.name = optional_text(&node, "name").ok_or(SceneError::MissingTag { tag: "name" })?;
            object.object_type = match optional_text(&node, "type") {
                Some(text) => ObjectType::parse(&text)?,
                None => ObjectType::Box,
            };
            object.mesh = optional_text(&node, "mesh");
            object.color = parse_color(&node, "color", object.color)?;
            object.position = parse_vec3(&node, "position", object.position)?;
            object.rotation = parse_vec3(&node, "rotation", object.rotation)?;
            object.scale = parse_vec3(&node, "scale", object.scale)?;
            object.target = parse_vec3(&node, "target", object.target)?;
            object.fov = parse_f32(&node, "fov", object.fov)?;
            object.intensity = parse_f32(&node, "intensity", object.intensity)?;
            object.roughness = parse_f32(&node, "roughness", object.roughness)?.clamp(0.0, 1.0);
            object.metalness = parse_f32(&node, "metalness", object.metalness)?.clamp(0.0, 1.0);
            object.spin = parse_f32(&node, "spin", object.spin)?;
            object.pickable = parse_bool(&node, "pickable", object.pickable)?;
            if object.object_type == ObjectType::Model && object.mesh.is_none() {
                return Err(SceneError::MissingMesh(object.name));
            }
            objects.push(object);
        }

        let lights = objects
            .iter()
            .filter_map(|obj| {
                let kind = match obj.object_type {
                    ObjectType::Ambient => LightKind::Ambient,
                    ObjectType::Directional => LightKind::Directional,
                    _ => return None,
                };
                Some(Light {
                    kind,
                    position: obj.position,
                    color: obj.color,
                    intensity: obj.intensity,
                })
            })
            .collect();

        let background = parse_color(&root, "background", default_background())?;
        let mut interaction = InteractionConfig::default();
        if let Some(block) = root.children().find(|n| n.has_tag_name("interaction")) {
            apply_interaction(&block, &mut interaction)?;
        }

        Ok(Self {
            objects,
            lights,
            background,
            interaction,
        })
    }

    /// Builds the orbit camera from the first camera object, if any.
    pub fn camera(&self) -> OrbitCamera {
        let mut camera = self
            .objects
            .iter()
            .find(|o| o.object_type == ObjectType::Camera)
            .map(|camera| OrbitCamera::new(camera.position, camera.target, camera.fov))
            .unwrap_or_else(|| OrbitCamera::new(Vec3::splat(3.0), Vec3::ZERO, 75.0));
        camera.apply_config(&self.interaction);
        camera
    }

    /// Objects that become world entities.
    pub fn entities(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| o.object_type.is_entity())
    }

    pub fn ambient_light(&self) -> Light {
        self.lights
            .iter()
            .copied()
            .find(|light| light.kind == LightKind::Ambient)
            .unwrap_or(Light {
                kind: LightKind::Ambient,
                position: Vec3::ZERO,
                color: Vec3::ONE,
                intensity: 0.4,
            })
    }

    pub fn directional_light(&self) -> Light {
        self.lights
            .iter()
            .copied()
            .find(|light| light.kind == LightKind::Directional)
            .unwrap_or(Light {
                kind: LightKind::Directional,
                position: Vec3::new(1.0, 2.0, 1.0),
                color: Vec3::ONE,
                intensity: 0.8,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Camera,
    Ambient,
    Directional,
    Sphere,
    Plane,
    Torus,
    Box,
    Model,
}

impl ObjectType {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(match text.to_ascii_lowercase().as_str() {
            "camera" => Self::Camera,
            "ambient" => Self::Ambient,
            "directional" => Self::Directional,
            "sphere" => Self::Sphere,
            "plane" => Self::Plane,
            "torus" => Self::Torus,
            "box" | "cube" => Self::Box,
            "model" => Self::Model,
            _ => return Err(SceneError::UnknownType(text.to_string())),
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Ambient => "ambient",
            Self::Directional => "directional",
            Self::Sphere => "sphere",
            Self::Plane => "plane",
            Self::Torus => "torus",
            Self::Box => "box",
            Self::Model => "model",
        }
    }

    pub fn is_entity(self) -> bool {
        matches!(
            self,
            Self::Sphere | Self::Plane | Self::Torus | Self::Box | Self::Model
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scene object as written in the scene file.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub object_type: ObjectType,
    pub mesh: Option<String>,
    pub color: Vec3,
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub target: Vec3,
    pub fov: f32,
    pub intensity: f32,
    pub roughness: f32,
    pub metalness: f32,
    /// Angular speed about Y in radians per second.
    pub spin: f32,
    pub pickable: bool,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            object_type: ObjectType::Box,
            mesh: None,
            color: Vec3::ONE,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            target: Vec3::ZERO,
            fov: 75.0,
            intensity: 1.0,
            roughness: 0.4,
            metalness: 0.1,
            spin: 0.0,
            pickable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    /// Shines from `position` towards the origin.
    Directional,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

fn default_background() -> Vec3 {
    Vec3::new(0.03, 0.03, 0.05)
}

fn apply_interaction(block: &Node<'_, '_>, config: &mut InteractionConfig) -> Result<()> {
    for child in block.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        let text = child.text().map(str::trim).unwrap_or_default();
        let number = || -> Result<f32> {
            text.parse::<f32>().map_err(|_| SceneError::Number {
                tag: tag.to_string(),
                value: text.to_string(),
            })
        };
        match tag {
            "zoom-friction" => config.zoom_friction = number()?,
            "zoom-sensitivity" => config.zoom_sensitivity = number()?,
            "zoom-max-velocity" => config.zoom_max_velocity = number()?,
            "zoom-epsilon" => config.zoom_epsilon = number()?,
            "zoom-min-distance" => config.zoom_min_distance = number()?,
            "fast-scroll-threshold-ms" => config.fast_scroll_threshold_ms = f64::from(number()?),
            "fast-scroll-multiplier" => config.fast_scroll_multiplier = number()?,
            "pinch-scale" => config.pinch_scale = number()?,
            "touch-pan-sensitivity" => config.touch_pan_sensitivity = number()?,
            "double-click-ms" => config.double_click_ms = f64::from(number()?),
            "click-drag-tolerance-px" => config.click_drag_tolerance_px = number()?,
            "focus-duration" => config.focus_duration_s = number()?,
            "bounce-duration" => config.bounce_duration_s = number()?,
            "bounce-jump-height" => config.bounce_jump_height = number()?,
            "bounce-frequency" => config.bounce_frequency = number()?,
            "bounce-rebound-height" => config.bounce_rebound_height = number()?,
            "orbit-damping" => config.orbit_damping_factor = number()?,
            "orbit-rotate-speed" => config.orbit_rotate_speed = number()?,
            "orbit-pan-speed" => config.orbit_pan_speed = number()?,
            "recenter-key" => {
                config.recenter_key = KeyCode::from_name(text)
                    .ok_or_else(|| SceneError::UnknownKey(text.to_string()))?
            }
            other => warn!("ignoring unknown interaction setting <{other}>"),
        }
    }
    Ok(())
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components<const N: usize>(node: &Node<'_, '_>, tag: &str) -> Result<Option<[f32; N]>> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(None);
    };
    let invalid = || SceneError::Components {
        tag: tag.to_string(),
        expected: N,
        value: value.clone(),
    };
    let numbers = value
        .split_whitespace()
        .map(|component| component.parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<Vec<f32>>>()?;
    let array: [f32; N] = numbers.try_into().map_err(|_| invalid())?;
    Ok(Some(array))
}

fn parse_vec3(node: &Node<'_, '_>, tag: &str, default: Vec3) -> Result<Vec3> {
    Ok(parse_components::<3>(node, tag)?.map_or(default, Vec3::from_array))
}

fn parse_color(node: &Node<'_, '_>, tag: &str, default: Vec3) -> Result<Vec3> {
    Ok(parse_components::<3>(node, tag)?.map_or(default, |rgb| Vec3::from_array(rgb) / 255.0))
}

fn parse_f32(node: &Node<'_, '_>, tag: &str, default: f32) -> Result<f32> {
    match optional_text(node, tag) {
        Some(value) => value.parse::<f32>().map_err(|_| SceneError::Number {
            tag: tag.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_bool(node: &Node<'_, '_>, tag: &str, default: bool) -> Result<bool> {
    match optional_text(node, tag).as_deref() {
        Some("true" | "yes" | "1") => Ok(true),
        Some("false" | "no" | "0") => Ok(false),
        Some(other) => Err(SceneError::Number {
            tag: tag.to_string(),
            value: other.to_string(),
        }),
        None => Ok(default),
    }
}
