//! Ray casting against the pickable entities of the world.

use glam::{Mat4, Vec2, Vec3};

use crate::world::EntityId;

const PARALLEL_EPSILON: f32 = 1e-8;
const MARCH_EPSILON: f32 = 1e-4;
const MARCH_STEPS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Always unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Local-space collision volume of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickShape {
    Sphere { radius: f32 },
    /// Double-sided rectangle in the local XY plane.
    Plane { width: f32, height: f32 },
    Cuboid { half_extents: Vec3 },
    /// Ring around the local Z axis.
    Torus { major: f32, minor: f32 },
    /// Bounding sphere for meshes without an analytic shape.
    Bounds { center: Vec3, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickTarget {
    pub entity: EntityId,
    pub shape: PickShape,
    pub model: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub entity: EntityId,
    pub point: Vec3,
    pub distance: f32,
}

/// Returns every candidate the ray passes through, nearest first.
pub fn intersect<I>(ray: &Ray, candidates: I) -> Vec<Hit>
where
    I: IntoIterator<Item = PickTarget>,
{
    let mut hits: Vec<Hit> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = intersect_target(ray, &candidate)?;
            Some(Hit {
                entity: candidate.entity,
                point: ray.at(distance),
                distance,
            })
        })
        .collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

fn intersect_target(ray: &Ray, target: &PickTarget) -> Option<f32> {
    let determinant = target.model.determinant();
    if !determinant.is_finite() || determinant.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inverse = target.model.inverse();
    // The direction is left unnormalized so the ray parameter stays in world units.
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);
    let t = match target.shape {
        PickShape::Sphere { radius } => sphere(origin, direction, Vec3::ZERO, radius),
        PickShape::Bounds { center, radius } => sphere(origin, direction, center, radius),
        PickShape::Plane { width, height } => plane(origin, direction, width, height),
        PickShape::Cuboid { half_extents } => cuboid(origin, direction, half_extents),
        PickShape::Torus { major, minor } => torus(origin, direction, major, minor),
    }?;
    (t.is_finite() && t >= 0.0).then_some(t)
}

fn sphere_span(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<(f32, f32)> {
    let to_origin = origin - center;
    let a = direction.length_squared();
    if a < PARALLEL_EPSILON {
        return None;
    }
    let b = 2.0 * to_origin.dot(direction);
    let c = to_origin.length_squared() - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);
    (far >= 0.0).then_some((near, far))
}

fn sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let (near, far) = sphere_span(origin, direction, center, radius)?;
    Some(if near >= 0.0 { near } else { far })
}

fn plane(origin: Vec3, direction: Vec3, width: f32, height: f32) -> Option<f32> {
    if direction.z.abs() < PARALLEL_EPSILON {
        return None;
    }
    let t = -origin.z / direction.z;
    if t < 0.0 {
        return None;
    }
    let point = origin + direction * t;
    (point.x.abs() <= width * 0.5 && point.y.abs() <= height * 0.5).then_some(t)
}

fn cuboid(origin: Vec3, direction: Vec3, half_extents: Vec3) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        let h = half_extents[axis];
        if d.abs() < PARALLEL_EPSILON {
            if o.abs() > h {
                return None;
            }
            continue;
        }
        let t1 = (-h - o) / d;
        let t2 = (h - o) / d;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }
    if t_max < t_min.max(0.0) {
        return None;
    }
    Some(if t_min >= 0.0 { t_min } else { t_max })
}

fn torus_distance(point: Vec3, major: f32, minor: f32) -> f32 {
    let ring = Vec2::new(point.x, point.y).length() - major;
    Vec2::new(ring, point.z).length() - minor
}

fn torus(origin: Vec3, direction: Vec3, major: f32, minor: f32) -> Option<f32> {
    let scale = direction.length();
    if scale < PARALLEL_EPSILON {
        return None;
    }
    let unit = direction / scale;
    let (enter, exit) = sphere_span(origin, unit, Vec3::ZERO, major + minor)?;
    let mut s = enter.max(0.0);
    for _ in 0..MARCH_STEPS {
        let distance = torus_distance(origin + unit * s, major, minor);
        if distance < MARCH_EPSILON {
            return Some(s / scale);
        }
        s += distance;
        if s > exit {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;

    fn target(id: u32, shape: PickShape, translation: Vec3) -> PickTarget {
        PickTarget {
            entity: EntityId::from_raw(id),
            shape,
            model: Mat4::from_translation(translation),
        }
    }

    fn forward_ray() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z)
    }

    #[test]
    fn sphere_hit_reports_front_surface() {
        let hits = intersect(
            &forward_ray(),
            [target(1, PickShape::Sphere { radius: 0.5 }, Vec3::ZERO)],
        );
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 9.5).abs() < 1e-5);
        assert!(hits[0].point.distance(Vec3::new(0.0, 0.0, 0.5)) < 1e-5);
    }

    #[test]
    fn hits_are_sorted_nearest_first() {
        let hits = intersect(
            &forward_ray(),
            [
                target(1, PickShape::Sphere { radius: 0.5 }, Vec3::new(0.0, 0.0, -3.0)),
                target(
                    2,
                    PickShape::Cuboid {
                        half_extents: Vec3::splat(0.5),
                    },
                    Vec3::new(0.0, 0.0, 2.0),
                ),
                target(
                    3,
                    PickShape::Plane {
                        width: 1.0,
                        height: 1.0,
                    },
                    Vec3::ZERO,
                ),
            ],
        );
        let order: Vec<u32> = hits.iter().map(|hit| hit.entity.raw()).collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert!((hits[0].distance - 7.5).abs() < 1e-5);
        assert!((hits[1].distance - 10.0).abs() < 1e-5);
    }

    #[test]
    fn miss_returns_nothing() {
        let hits = intersect(
            &forward_ray(),
            [target(1, PickShape::Sphere { radius: 0.5 }, Vec3::new(3.0, 0.0, 0.0))],
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn ray_through_torus_hole_misses() {
        let ring = PickShape::Torus {
            major: 0.5,
            minor: 0.2,
        };
        assert!(intersect(&forward_ray(), [target(1, ring, Vec3::ZERO)]).is_empty());

        let through_tube = Ray::new(Vec3::new(0.5, 0.0, 10.0), Vec3::NEG_Z);
        let hits = intersect(&through_tube, [target(1, ring, Vec3::ZERO)]);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 9.8).abs() < 1e-3);
    }

    #[test]
    fn scaled_and_rotated_plane_uses_local_space() {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::new(4.0, 1.0, 1.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::ZERO,
        );
        let plane = PickTarget {
            entity: EntityId::from_raw(9),
            shape: PickShape::Plane {
                width: 1.0,
                height: 1.0,
            },
            model,
        };
        // Rotated a quarter turn about Y, the plane now faces +X and spans z in [-2, 2].
        let side_ray = Ray::new(Vec3::new(10.0, 0.0, 1.5), Vec3::NEG_X);
        let hits = intersect(&side_ray, [plane]);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 10.0).abs() < 1e-4);
        let past_edge = Ray::new(Vec3::new(10.0, 0.0, 3.0), Vec3::NEG_X);
        assert!(intersect(&past_edge, [plane]).is_empty());
    }

    #[test]
    fn origin_inside_sphere_hits_far_side() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hits = intersect(&ray, [target(4, PickShape::Sphere { radius: 2.0 }, Vec3::ZERO)]);
        assert!((hits[0].distance - 2.0).abs() < 1e-5);
    }
}
