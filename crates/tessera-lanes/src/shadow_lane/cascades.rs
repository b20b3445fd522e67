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

//! Cascade splits and the orthographic light projections that cover them.

use glam::{Mat4, Vec3};
use tessera_core::math::{frustum_corners, stable_up, Aabb};
use tessera_core::renderer::shadow::{CASCADE_STANDOFF, MAX_CASCADES};

/// One directional cascade in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cascade {
    pub view_projection: Mat4,
    /// Positive view-space distance where this cascade ends.
    pub split: f32,
}

/// What the cascade fit needs to know about the camera and the sun.
#[derive(Debug, Clone, Copy)]
pub struct CascadeInputs {
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space direction the light travels in.
    pub light_direction: Vec3,
    pub near: f32,
    pub far: f32,
}

/// Split distances of `count` cascades between `near` and `far`.
///
/// Blends a logarithmic and a uniform distribution by `lambda`. The values
/// are strictly increasing and the last one is exactly `far`.
pub fn cascade_splits(near: f32, far: f32, count: usize, lambda: f32) -> Vec<f32> {
    let count = count.clamp(1, MAX_CASCADES);
    let near = near.max(f32::EPSILON);
    let far = far.max(near + f32::EPSILON);
    let lambda = lambda.clamp(0.0, 1.0);
    (1..=count)
        .map(|i| {
            if i == count {
                return far;
            }
            let p = i as f32 / count as f32;
            let log_split = near * (far / near).powf(p);
            let uniform_split = near + (far - near) * p;
            lambda * (log_split - uniform_split) + uniform_split
        })
        .collect()
}

/// Fits one orthographic light projection around each cascade slice.
///
/// Each slice's light-space box is padded by `z_padding` on both depth sides
/// and its centre is snapped to whole shadow-map texels so the maps do not
/// shimmer while the camera moves.
pub fn fit_cascades(
    inputs: &CascadeInputs,
    splits: &[f32],
    resolution: u32,
    z_padding: f32,
) -> Vec<Cascade> {
    let corners = frustum_corners((inputs.projection * inputs.view).inverse());
    let (near_corners, far_corners) = corners.split_at(4);
    let depth_range = (inputs.far - inputs.near).max(f32::EPSILON);
    let direction = inputs.light_direction.normalize_or(Vec3::NEG_Y);
    let up = stable_up(direction);

    let mut previous = inputs.near;
    splits
        .iter()
        .map(|&split| {
            let t0 = (previous - inputs.near) / depth_range;
            let t1 = (split - inputs.near) / depth_range;
            previous = split;

            let mut slice = [Vec3::ZERO; 8];
            for (i, (near, far)) in near_corners.iter().zip(far_corners).enumerate() {
                slice[i] = near.lerp(*far, t0);
                slice[i + 4] = near.lerp(*far, t1);
            }
            let centroid = slice.iter().copied().sum::<Vec3>() / 8.0;
            let light_view = Mat4::look_at_rh(
                centroid - direction * CASCADE_STANDOFF,
                centroid,
                up,
            );
            let light_space = slice.map(|corner| light_view.transform_point3(corner));
            let bounds = Aabb::from_points(&light_space)
                .unwrap_or_else(|| Aabb::from_min_max(Vec3::ZERO, Vec3::ZERO));

            let half = bounds.half_extents();
            let half_extent = half.x.max(half.y).max(f32::EPSILON);
            let texel = half_extent * 2.0 / resolution.max(1) as f32;
            let center = bounds.center();
            let snapped_x = (center.x / texel).floor() * texel;
            let snapped_y = (center.y / texel).floor() * texel;

            let min_z = bounds.min.z - z_padding;
            let max_z = bounds.max.z + z_padding;
            let projection = Mat4::orthographic_rh(
                snapped_x - half_extent,
                snapped_x + half_extent,
                snapped_y - half_extent,
                snapped_y + half_extent,
                -max_z,
                -min_z,
            );
            Cascade {
                view_projection: projection * light_view,
                split,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ortho_inputs(pan: f32) -> CascadeInputs {
        let view = Mat4::from_translation(Vec3::new(-pan, 0.0, -15.0))
            * Mat4::from_rotation_x(35.264f32.to_radians())
            * Mat4::from_rotation_y(45f32.to_radians());
        CascadeInputs {
            view,
            projection: Mat4::orthographic_rh(-16.0, 16.0, -9.0, 9.0, 1.0, 100.0),
            light_direction: Vec3::new(-0.3, -1.0, -0.4).normalize(),
            near: 1.0,
            far: 100.0,
        }
    }

    #[test]
    fn test_splits_strictly_increase_to_far() {
        for count in 1..=MAX_CASCADES {
            for lambda in [0.0, 0.25, 0.6, 1.0] {
                let splits = cascade_splits(1.0, 100.0, count, lambda);
                assert_eq!(splits.len(), count);
                assert!(splits.windows(2).all(|w| w[0] < w[1]), "{splits:?}");
                assert_eq!(*splits.last().unwrap(), 100.0);
                assert!(splits[0] > 1.0);
            }
        }
    }

    #[test]
    fn test_uniform_and_log_extremes() {
        let uniform = cascade_splits(1.0, 100.0, 3, 0.0);
        assert_relative_eq!(uniform[0], 34.0, epsilon = 1e-4);
        let log = cascade_splits(1.0, 100.0, 2, 1.0);
        assert_relative_eq!(log[0], 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_slice_corners_land_inside_their_cascade() {
        let inputs = ortho_inputs(0.0);
        let splits = cascade_splits(inputs.near, inputs.far, 3, 0.6);
        let cascades = fit_cascades(&inputs, &splits, 2048, 10.0);
        assert_eq!(cascades.len(), 3);

        let inverse_view = inputs.view.inverse();
        let mut previous = inputs.near;
        for cascade in &cascades {
            let middle = (previous + cascade.split) * 0.5;
            let world = inverse_view.transform_point3(Vec3::new(0.0, 0.0, -middle));
            let ndc = cascade.view_projection.project_point3(world);
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{ndc:?}");
            assert!((0.0..=1.0).contains(&ndc.z), "{ndc:?}");
            previous = cascade.split;
        }
    }

    #[test]
    fn test_small_pan_moves_by_whole_texels() {
        let splits = cascade_splits(1.0, 100.0, 1, 0.6);
        let a = fit_cascades(&ortho_inputs(0.0), &splits, 2048, 10.0)[0];
        let b = fit_cascades(&ortho_inputs(0.0001), &splits, 2048, 10.0)[0];
        let origin_a = a.view_projection.project_point3(Vec3::ZERO);
        let origin_b = b.view_projection.project_point3(Vec3::ZERO);
        // A pan far below one texel keeps the snapped projection still.
        assert_relative_eq!(origin_a.x, origin_b.x, epsilon = 1e-4);
        assert_relative_eq!(origin_a.y, origin_b.y, epsilon = 1e-4);
    }
}
