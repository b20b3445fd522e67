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


//! CPU rendition of the per-tile light test.
//!
//! Mirrors the culling compute shader so the bounds and the sphere test
//! can be checked without a GPU.

use glam::{Mat4, Vec2, Vec3};
use tessera_core::math::{Aabb, Sphere};
use tessera_core::renderer::tiled::{TileDepthRange, TileGrid};
use tessera_core::renderer::GpuLight;

/// View-space bounds of the slab a tile covers between its depth range.
///
/// `None` for tiles with no geometry.
pub fn tile_view_bounds(
    grid: &TileGrid,
    x: u32,
    y: u32,
    range: TileDepthRange,
    inverse_projection: Mat4,
) -> Option<Aabb> {
    if range.is_empty() {
        return None;
    }
    let screen = Vec2::new(grid.width as f32, grid.height as f32);
    let (pixel_min, pixel_max) = grid.pixel_bounds(x, y);
    let pixel_min = Vec2::new(pixel_min[0] as f32, pixel_min[1] as f32);
    let pixel_max = Vec2::new(pixel_max[0] as f32, pixel_max[1] as f32);
    // Pixel rows grow downwards while NDC y grows upwards.
    let ndc_min = Vec2::new(
        pixel_min.x / screen.x * 2.0 - 1.0,
        1.0 - pixel_max.y / screen.y * 2.0,
    );
    let ndc_max = Vec2::new(
        pixel_max.x / screen.x * 2.0 - 1.0,
        1.0 - pixel_min.y / screen.y * 2.0,
    );

    let corners: Vec<Vec3> = (0..8u32)
        .map(|corner| {
            let ndc = Vec3::new(
                if corner & 1 != 0 { ndc_max.x } else { ndc_min.x },
                if corner & 2 != 0 { ndc_max.y } else { ndc_min.y },
                if corner & 4 != 0 { range.max } else { range.min },
            );
            inverse_projection.project_point3(ndc)
        })
        .collect();
    Aabb::from_points(&corners)
}

/// Indices of the lights touching `bounds`, in light order, capped at
/// `max_lights`.
pub fn cull_lights(bounds: &Aabb, lights: &[GpuLight], max_lights: u32) -> Vec<u32> {
    lights
        .iter()
        .enumerate()
        .filter(|(_, light)| {
            bounds.intersects_sphere(&Sphere::new(light.view_position(), light.radius()))
        })
        .map(|(index, _)| index as u32)
        .take(max_lights as usize)
        .collect()
}

/// The light list the culling shader produces for tile (`x`, `y`).
pub fn cull_tile_cpu(
    grid: &TileGrid,
    x: u32,
    y: u32,
    range: TileDepthRange,
    projection: Mat4,
    lights: &[GpuLight],
    max_lights: u32,
) -> Vec<u32> {
    tile_view_bounds(grid, x, y, range, projection.inverse())
        .map(|bounds| cull_lights(&bounds, lights, max_lights))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::tiled::TileSize;

    fn light(position: Vec3, radius: f32) -> GpuLight {
        GpuLight {
            position_radius: [position.x, position.y, position.z, radius],
            ..GpuLight::default()
        }
    }

    #[test]
    fn test_slab_sphere_overlap() {
        let slab = Aabb::from_min_max(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 10.0));
        let lights = [
            light(Vec3::new(0.0, 0.0, 7.0), 1.0),
            light(Vec3::new(0.0, 0.0, 20.0), 1.0),
            light(Vec3::new(1.5, 0.0, 7.0), 1.0),
        ];
        assert_eq!(cull_lights(&slab, &lights, 128), vec![0, 2]);
    }

    #[test]
    fn test_cap_keeps_first_lights() {
        let slab = Aabb::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));
        let lights = vec![light(Vec3::ZERO, 1.0); 10];
        assert_eq!(cull_lights(&slab, &lights, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_tile_has_no_lights() {
        let grid = TileGrid::new(64, 64, TileSize::X16);
        let projection = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let lights = [light(Vec3::new(0.0, 0.0, -5.0), 50.0)];
        let culled = cull_tile_cpu(&grid, 0, 0, TileDepthRange::EMPTY, projection, &lights, 128);
        assert!(culled.is_empty());
    }

    #[test]
    fn test_tile_bounds_follow_screen_position() {
        let grid = TileGrid::new(64, 64, TileSize::X16);
        let projection = Mat4::orthographic_rh(-32.0, 32.0, -32.0, 32.0, 0.0, 100.0);
        let range = TileDepthRange { min: 0.1, max: 0.2 };

        // Top-left tile in pixels is the upper-left corner of view space.
        let bounds = tile_view_bounds(&grid, 0, 0, range, projection.inverse()).unwrap();
        assert!((bounds.min.x + 32.0).abs() < 1e-3);
        assert!((bounds.max.x + 16.0).abs() < 1e-3);
        assert!((bounds.max.y - 32.0).abs() < 1e-3);
        assert!((bounds.min.y - 16.0).abs() < 1e-3);
        assert!((bounds.max.z + 10.0).abs() < 1e-3);
        assert!((bounds.min.z + 20.0).abs() < 1e-3);

        let lights = [
            light(Vec3::new(-24.0, 24.0, -15.0), 1.0),
            light(Vec3::new(24.0, -24.0, -15.0), 1.0),
        ];
        assert_eq!(cull_tile_cpu(&grid, 0, 0, range, projection, &lights, 128), vec![0]);
        assert_eq!(cull_tile_cpu(&grid, 3, 3, range, projection, &lights, 128), vec![1]);
    }
}
