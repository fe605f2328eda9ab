use anyhow::{anyhow, Result};
use glam::{Mat4, Vec3};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::common::{DrawItem, Frame};
use crate::mesh::{CUBE_SIZE, PLANE_SIZE, SPHERE_RADIUS, TORUS_RADIUS, TORUS_TUBE};
use crate::world::Geometry;

/// Minimal renderer backed by a 2D canvas for WebAssembly builds.
///
/// Every entity is drawn as a shaded disc at its projected bounding sphere,
/// back to front.
pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    size: (u32, u32),
}

impl Renderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;

        let size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            size,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Updates the canvas dimensions to match the browser layout.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 == 0 || new_size.1 == 0 {
            return;
        }
        self.size = new_size;
        self.canvas.set_width(new_size.0);
        self.canvas.set_height(new_size.1);
    }

    pub fn render(&mut self, frame: &Frame) -> Result<(), JsValue> {
        let (width, height) = (f64::from(self.size.0), f64::from(self.size.1));
        self.context
            .set_fill_style(&JsValue::from_str(&css_color(frame.background)));
        self.context.fill_rect(0.0, 0.0, width, height);

        let mut discs: Vec<Disc> = frame
            .items
            .iter()
            .filter_map(|item| Disc::project(item, frame, self.size))
            .collect();
        discs.sort_by(|a, b| b.depth.total_cmp(&a.depth));

        for disc in &discs {
            self.context
                .set_fill_style(&JsValue::from_str(&css_color(disc.color)));
            self.context.begin_path();
            self.context
                .arc(disc.x, disc.y, disc.radius, 0.0, std::f64::consts::TAU)?;
            self.context.fill();
        }
        Ok(())
    }
}

struct Disc {
    x: f64,
    y: f64,
    radius: f64,
    depth: f32,
    color: Vec3,
}

impl Disc {
    fn project(item: &DrawItem, frame: &Frame, size: (u32, u32)) -> Option<Self> {
        let (local_center, local_radius) = local_bounds(&item.geometry);
        let center = item.model.transform_point3(local_center);
        let radius = local_radius * max_scale(&item.model);

        let clip = frame.camera.view_proj * center.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let edge = frame.camera.view_proj * (center + Vec3::Y * radius).extend(1.0);
        let edge_y = if edge.w > 0.0 { edge.y / edge.w } else { ndc.y };

        let (width, height) = (f64::from(size.0), f64::from(size.1));
        let to_view = (frame.camera.position - center).normalize_or_zero();
        let to_light = frame.directional.position.normalize_or_zero();
        let lambert = to_view.dot(to_light).max(0.0);
        let light = frame.ambient.color * frame.ambient.intensity
            + frame.directional.color * frame.directional.intensity * lambert;

        Some(Self {
            x: (f64::from(ndc.x) + 1.0) * 0.5 * width,
            y: (1.0 - f64::from(ndc.y)) * 0.5 * height,
            radius: (f64::from((edge_y - ndc.y).abs()) * 0.5 * height).max(1.0),
            depth: ndc.z,
            color: (item.material.color * light).min(Vec3::ONE),
        })
    }
}

fn local_bounds(geometry: &Geometry) -> (Vec3, f32) {
    match geometry {
        Geometry::Sphere => (Vec3::ZERO, SPHERE_RADIUS),
        Geometry::Plane => (Vec3::ZERO, PLANE_SIZE * std::f32::consts::FRAC_1_SQRT_2),
        Geometry::Torus => (Vec3::ZERO, TORUS_RADIUS + TORUS_TUBE),
        Geometry::Cuboid => (Vec3::ZERO, CUBE_SIZE * 0.5 * 3f32.sqrt()),
        Geometry::Mesh { center, radius, .. } => (*center, *radius),
    }
}

fn max_scale(model: &Mat4) -> f32 {
    model
        .x_axis
        .truncate()
        .length()
        .max(model.y_axis.truncate().length())
        .max(model.z_axis.truncate().length())
}

fn css_color(color: Vec3) -> String {
    let rgb = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    format!("rgb({}, {}, {})", rgb.x as u8, rgb.y as u8, rgb.z as u8)
}
