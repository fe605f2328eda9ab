//! Triangle meshes for the built-in primitives.
//!
//! Vertices are interleaved as `position.xyz` followed by `normal.xyz`. The
//! dimensions match the unit primitives the scene file refers to; size them
//! with the object's `<scale>`.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

pub const FLOATS_PER_VERTEX: usize = 6;

pub const SPHERE_RADIUS: f32 = 0.5;
pub const PLANE_SIZE: f32 = 1.0;
pub const TORUS_RADIUS: f32 = 0.5;
pub const TORUS_TUBE: f32 = 0.2;
pub const CUBE_SIZE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let start = index * FLOATS_PER_VERTEX;
        Vec3::from_slice(&self.vertices[start..start + 3])
    }

    pub(crate) fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&position.to_array());
        self.vertices.extend_from_slice(&normal.to_array());
        index
    }

    /// Center of the axis-aligned bounds and the radius enclosing every vertex.
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        if self.vertex_count() == 0 {
            return (Vec3::ZERO, 0.0);
        }
        let (min, max) = (0..self.vertex_count())
            .map(|i| self.position(i))
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(p), hi.max(p))
            });
        let center = (min + max) * 0.5;
        let radius = (0..self.vertex_count())
            .map(|i| self.position(i).distance(center))
            .fold(0.0f32, f32::max);
        (center, radius)
    }

    /// Replaces normals with area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertex_count()];
        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| triangle[k] as usize);
            let (pa, pb, pc) = (self.position(a), self.position(b), self.position(c));
            let normal = (pb - pa).cross(pc - pa);
            if normal.length_squared() > f32::EPSILON {
                accum[a] += normal;
                accum[b] += normal;
                accum[c] += normal;
            }
        }
        for (i, normal) in accum.into_iter().enumerate() {
            let start = i * FLOATS_PER_VERTEX + 3;
            self.vertices[start..start + 3].copy_from_slice(&normal.normalize_or_zero().to_array());
        }
    }

    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut mesh = Self::default();
        for y in 0..=height_segments {
            let v = y as f32 / height_segments as f32;
            let phi = v * PI;
            for x in 0..=width_segments {
                let u = x as f32 / width_segments as f32;
                let theta = u * TAU;
                let normal = Vec3::new(
                    -theta.cos() * phi.sin(),
                    phi.cos(),
                    theta.sin() * phi.sin(),
                );
                mesh.push_vertex(normal * radius, normal);
            }
        }
        let stride = width_segments + 1;
        for y in 0..height_segments {
            for x in 0..width_segments {
                let a = y * stride + x + 1;
                let b = y * stride + x;
                let c = (y + 1) * stride + x;
                let d = (y + 1) * stride + x + 1;
                if y != 0 {
                    mesh.indices.extend_from_slice(&[a, b, d]);
                }
                if y != height_segments - 1 {
                    mesh.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        mesh
    }

    /// Rectangle in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (w, h) = (width * 0.5, height * 0.5);
        let mut mesh = Self::default();
        for corner in [
            Vec3::new(-w, -h, 0.0),
            Vec3::new(w, -h, 0.0),
            Vec3::new(w, h, 0.0),
            Vec3::new(-w, h, 0.0),
        ] {
            mesh.push_vertex(corner, Vec3::Z);
        }
        mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);
        mesh
    }

    /// Ring of `radius` around the Z axis with a tube of `tube`.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial_segments = radial_segments.max(3);
        let tubular_segments = tubular_segments.max(3);
        let mut mesh = Self::default();
        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * TAU;
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * TAU;
                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                mesh.push_vertex(position, (position - center).normalize_or_zero());
            }
        }
        let stride = tubular_segments + 1;
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = stride * j + i - 1;
                let b = stride * (j - 1) + i - 1;
                let c = stride * (j - 1) + i;
                let d = stride * j + i;
                mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        mesh
    }

    /// Axis-aligned box with flat-shaded faces.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let mut mesh = Self::default();
        for normal in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
            // Two axes spanning the face, ordered so the winding faces `normal`.
            let side = if normal.y.abs() > 0.5 { Vec3::Z } else { Vec3::Y };
            let tangent = side.cross(normal);
            let base = mesh.vertex_count() as u32;
            for (s, t) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = (normal + tangent * s + side * t) * h;
                mesh.push_vertex(corner, normal);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_indices_valid(mesh: &Mesh) {
        assert_eq!(mesh.indices.len() % 3, 0);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|&index| index < count));
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = Mesh::sphere(SPHERE_RADIUS, 16, 8);
        assert_indices_valid(&mesh);
        for i in 0..mesh.vertex_count() {
            assert!((mesh.position(i).length() - SPHERE_RADIUS).abs() < 1e-5);
        }
        let (center, radius) = mesh.bounding_sphere();
        assert!(center.length() < 1e-5);
        assert!((radius - SPHERE_RADIUS).abs() < 1e-4);
    }

    #[test]
    fn torus_fits_inside_its_outer_radius() {
        let mesh = Mesh::torus(TORUS_RADIUS, TORUS_TUBE, 12, 48);
        assert_indices_valid(&mesh);
        let (_, radius) = mesh.bounding_sphere();
        assert!(radius <= TORUS_RADIUS + TORUS_TUBE + 1e-4);
    }

    #[test]
    fn cuboid_faces_point_outwards() {
        let mesh = Mesh::cuboid(Vec3::splat(CUBE_SIZE));
        assert_indices_valid(&mesh);
        assert_eq!(mesh.vertex_count(), 24);
        for triangle in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| mesh.position(triangle[k] as usize));
            let winding = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(winding.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn plane_normals_face_z() {
        let mut mesh = Mesh::plane(PLANE_SIZE, PLANE_SIZE);
        mesh.compute_normals();
        for chunk in mesh.vertices.chunks_exact(FLOATS_PER_VERTEX) {
            assert!(Vec3::new(chunk[3], chunk[4], chunk[5]).distance(Vec3::Z) < 1e-6);
        }
    }
}
