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

//! Shadow tunables and the uniform layouts shared with the shaders.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Upper bound on directional cascades.
pub const MAX_CASCADES: usize = 4;
/// Spot casters accepted per frame.
pub const MAX_SPOT_SHADOWS: usize = 4;
/// Point casters accepted per frame.
pub const MAX_POINT_SHADOWS: usize = 2;
/// Cube faces of a point caster.
pub const POINT_FACES: usize = 6;

/// Distance of the cascade eye from the cascade centre along `-light_dir`.
pub const CASCADE_STANDOFF: f32 = 50.0;
/// Near plane of spot and point shadow projections.
pub const LOCAL_SHADOW_NEAR: f32 = 0.1;
/// Smallest far plane of spot and point shadow projections.
pub const LOCAL_SHADOW_MIN_FAR: f32 = 0.2;

/// Dynamic uniform offsets must be multiples of this.
pub const UNIFORM_SLOT_ALIGN: u64 = 256;

/// Index of an accepted caster within its class for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowSlot(pub usize);

/// Shadow configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub cascade_count: u32,
    pub cascade_resolution: u32,
    /// Blend between uniform (0) and logarithmic (1) split distribution.
    pub split_lambda: f32,
    pub bias_min: f32,
    pub bias_slope: f32,
    pub pcf_radius: u32,
    /// Extra depth added to both sides of every cascade box.
    pub z_padding: f32,
    pub spot_resolution: u32,
    pub point_resolution: u32,
    pub directional_update_every: u32,
    pub spot_update_every: u32,
    pub point_update_every: u32,
    pub depth_bias_constant: i32,
    pub depth_bias_slope: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cascade_count: 3,
            cascade_resolution: 2048,
            split_lambda: 0.6,
            bias_min: 0.0015,
            bias_slope: 0.0045,
            pcf_radius: 1,
            z_padding: 10.0,
            spot_resolution: 1024,
            point_resolution: 512,
            directional_update_every: 1,
            spot_update_every: 1,
            point_update_every: 1,
            depth_bias_constant: 2,
            depth_bias_slope: 4.0,
        }
    }
}

impl ShadowSettings {
    /// Clamps every field into its supported range.
    pub fn sanitized(mut self) -> Self {
        self.cascade_count = self.cascade_count.clamp(1, MAX_CASCADES as u32);
        self.split_lambda = self.split_lambda.clamp(0.0, 1.0);
        self.cascade_resolution = self.cascade_resolution.max(1);
        self.spot_resolution = self.spot_resolution.max(1);
        self.point_resolution = self.point_resolution.max(1);
        self.directional_update_every = self.directional_update_every.max(1);
        self.spot_update_every = self.spot_update_every.max(1);
        self.point_update_every = self.point_update_every.max(1);
        self
    }
}

/// Returns `true` when a class refreshing every `update_every` frames
/// renders on `frame`.
#[inline]
pub fn refreshes_on(frame: u64, update_every: u32) -> bool {
    update_every <= 1 || frame % u64::from(update_every) == 0
}

/// Per-layer uniform of the depth-only passes, one 256-byte slot each.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowPassUniform {
    pub view_projection: [[f32; 4]; 4],
    pub _padding: [[f32; 4]; 12],
}

impl ShadowPassUniform {
    pub fn new(view_projection: Mat4) -> Self {
        Self {
            view_projection: view_projection.to_cols_array_2d(),
            _padding: [[0.0; 4]; 12],
        }
    }
}

/// Everything the lighting shaders need to sample shadows.
///
/// Matrices map view-space positions to the caster's clip space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowUniforms {
    pub cascade_view_to_light: [[[f32; 4]; 4]; MAX_CASCADES],
    pub spot_view_to_light: [[[f32; 4]; 4]; MAX_SPOT_SHADOWS],
    pub point_view_to_light: [[[f32; 4]; 4]; MAX_POINT_SHADOWS * POINT_FACES],
    pub inverse_view: [[f32; 4]; 4],
    /// View-space far distance of each cascade (positive).
    pub cascade_splits: [f32; 4],
    /// Per spot caster: bias min, bias slope, unused, unused.
    pub spot_bias: [[f32; 4]; MAX_SPOT_SHADOWS],
    /// Per point caster: world position, disk radius.
    pub point_position: [[f32; 4]; MAX_POINT_SHADOWS],
    /// Bias min, bias slope, PCF radius, point disk radius.
    pub params: [f32; 4],
    /// 1/cascade res, 1/spot res, 1/point res, unused.
    pub texel_size: [f32; 4],
    /// Cascade count, spot count, point count, enabled flag.
    pub counts: [u32; 4],
}

impl Default for ShadowUniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            cascade_view_to_light: [identity; MAX_CASCADES],
            spot_view_to_light: [identity; MAX_SPOT_SHADOWS],
            point_view_to_light: [identity; MAX_POINT_SHADOWS * POINT_FACES],
            inverse_view: identity,
            cascade_splits: [0.0; 4],
            spot_bias: [[0.0; 4]; MAX_SPOT_SHADOWS],
            point_position: [[0.0; 4]; MAX_POINT_SHADOWS],
            params: [0.0; 4],
            texel_size: [0.0; 4],
            counts: [0; 4],
        }
    }
}

impl ShadowUniforms {
    pub fn set_point_position(&mut self, slot: ShadowSlot, position: Vec3, disk_radius: f32) {
        if let Some(entry) = self.point_position.get_mut(slot.0) {
            *entry = position.extend(disk_radius).to_array();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_ranges() {
        let settings = ShadowSettings {
            cascade_count: 9,
            split_lambda: 1.5,
            spot_update_every: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.cascade_count, 4);
        assert_eq!(settings.split_lambda, 1.0);
        assert_eq!(settings.spot_update_every, 1);

        let settings = ShadowSettings {
            cascade_count: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.cascade_count, 1);
    }

    #[test]
    fn test_refresh_throttle() {
        assert!(refreshes_on(7, 1));
        assert!(refreshes_on(6, 3));
        assert!(!refreshes_on(7, 3));
        assert!(refreshes_on(0, 2));
    }

    #[test]
    fn test_layouts() {
        assert_eq!(std::mem::size_of::<ShadowPassUniform>() as u64, UNIFORM_SLOT_ALIGN);
        assert_eq!(std::mem::size_of::<ShadowUniforms>() % 16, 0);
    }
}
