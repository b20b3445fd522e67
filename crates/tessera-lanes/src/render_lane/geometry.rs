// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Procedural geometry: the fixed scene and the unit light volumes.

use glam::Vec3;
use std::f32::consts::{PI, TAU};
use tessera_core::renderer::mesh::{MeshData, Vertex};

pub const GROUND_HALF_EXTENT: f32 = 5.0;
pub const GROUND_COLOR: Vec3 = Vec3::new(0.18, 0.36, 0.20);
pub const WALL_HEIGHT: f32 = 2.5;
pub const WALL_OFFSET: f32 = 3.0;
pub const WALL_A_COLOR: Vec3 = Vec3::new(0.70, 0.25, 0.25);
pub const WALL_B_COLOR: Vec3 = Vec3::new(0.25, 0.45, 0.70);

pub const SPHERE_STACKS: u32 = 16;
pub const SPHERE_SLICES: u32 = 24;
pub const CONE_SLICES: u32 = 24;

/// The ground quad on the XZ plane, facing +Y.
pub fn ground() -> MeshData {
    let e = GROUND_HALF_EXTENT;
    let mut mesh = MeshData::default();
    mesh.push_quad(
        [
            Vec3::new(-e, 0.0, -e),
            Vec3::new(-e, 0.0, e),
            Vec3::new(e, 0.0, e),
            Vec3::new(e, 0.0, -e),
        ],
        Vec3::Y,
        GROUND_COLOR,
    );
    mesh
}

/// Wall A at `x = -3`, facing +X.
pub fn wall_a() -> MeshData {
    let (x, e, h) = (-WALL_OFFSET, GROUND_HALF_EXTENT, WALL_HEIGHT);
    let mut mesh = MeshData::default();
    mesh.push_quad(
        [
            Vec3::new(x, 0.0, e),
            Vec3::new(x, 0.0, -e),
            Vec3::new(x, h, -e),
            Vec3::new(x, h, e),
        ],
        Vec3::X,
        WALL_A_COLOR,
    );
    mesh
}

/// Wall B at `x = 3`, facing -X.
pub fn wall_b() -> MeshData {
    let (x, e, h) = (WALL_OFFSET, GROUND_HALF_EXTENT, WALL_HEIGHT);
    let mut mesh = MeshData::default();
    mesh.push_quad(
        [
            Vec3::new(x, 0.0, -e),
            Vec3::new(x, 0.0, e),
            Vec3::new(x, h, e),
            Vec3::new(x, h, -e),
        ],
        Vec3::NEG_X,
        WALL_B_COLOR,
    );
    mesh
}

/// Unit UV sphere, outward winding counter-clockwise.
pub fn unit_sphere(stacks: u32, slices: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let p = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            mesh.vertices.push(Vertex::new(p, p, Vec3::ONE));
        }
    }
    let row = slices + 1;
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = stack * row + slice;
            let b = a + row;
            mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    mesh
}

/// Unit cone with its apex at the origin and a unit-radius base at `z = 1`.
pub fn unit_cone(slices: u32) -> MeshData {
    let mut mesh = MeshData::default();
    mesh.vertices.push(Vertex::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::ONE));
    let base_center = Vec3::Z;
    mesh.vertices.push(Vertex::new(base_center, Vec3::Z, Vec3::ONE));
    for slice in 0..slices {
        let theta = TAU * slice as f32 / slices as f32;
        let p = Vec3::new(theta.cos(), theta.sin(), 1.0);
        mesh.vertices.push(Vertex::new(p, p.normalize(), Vec3::ONE));
    }
    for slice in 0..slices {
        let current = 2 + slice;
        let next = 2 + (slice + 1) % slices;
        mesh.indices.extend_from_slice(&[0, next, current]);
        mesh.indices.extend_from_slice(&[1, current, next]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face_normal(mesh: &MeshData, tri: usize) -> Vec3 {
        let i = &mesh.indices[tri * 3..tri * 3 + 3];
        let p = |k: usize| Vec3::from(mesh.vertices[i[k] as usize].position);
        (p(1) - p(0)).cross(p(2) - p(0)).normalize()
    }

    #[test]
    fn test_winding_matches_normals() {
        for (mesh, normal) in [(ground(), Vec3::Y), (wall_a(), Vec3::X), (wall_b(), Vec3::NEG_X)] {
            for tri in 0..2 {
                assert_relative_eq!(face_normal(&mesh, tri), normal, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_sphere_is_unit_and_outward() {
        let sphere = unit_sphere(SPHERE_STACKS, SPHERE_SLICES);
        assert_eq!(sphere.vertices.len() as u32, (SPHERE_STACKS + 1) * (SPHERE_SLICES + 1));
        for v in &sphere.vertices {
            assert_relative_eq!(Vec3::from(v.position).length(), 1.0, epsilon = 1e-5);
        }
        // A triangle away from the poles.
        let tri = (SPHERE_STACKS as usize / 2) * SPHERE_SLICES as usize * 2;
        let i = &sphere.indices[tri * 3..tri * 3 + 3];
        let centroid = i
            .iter()
            .map(|&k| Vec3::from(sphere.vertices[k as usize].position))
            .sum::<Vec3>()
            / 3.0;
        assert!(face_normal(&sphere, tri).dot(centroid) > 0.0);
    }

    #[test]
    fn test_cone_spans_apex_to_base() {
        let cone = unit_cone(CONE_SLICES);
        assert_eq!(cone.indices.len() as u32, CONE_SLICES * 6);
        let z_max = cone.vertices.iter().map(|v| v.position[2]).fold(f32::MIN, f32::max);
        let z_min = cone.vertices.iter().map(|v| v.position[2]).fold(f32::MAX, f32::min);
        assert_eq!((z_min, z_max), (0.0, 1.0));
        assert!(face_normal(&cone, 1).z > 0.0);
    }
}
