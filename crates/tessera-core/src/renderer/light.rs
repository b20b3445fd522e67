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

//! Light authoring records and their GPU layout.

use crate::math::LinearRgba;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Type-specific part of a dynamic light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Omnidirectional light bounded by its radius.
    Point,
    /// Cone light aimed at `target`. Angles are half-angles in radians.
    Spot {
        target: Vec3,
        inner_angle: f32,
        outer_angle: f32,
    },
}

/// Depth bias of a shadow-casting light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCast {
    pub bias_min: f32,
    pub bias_slope: f32,
}

/// An authored dynamic light.
///
/// The record never changes after scene build; the animated position is
/// derived from it every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDesc {
    /// World position before animation.
    pub base_position: Vec3,
    /// Influence distance.
    pub radius: f32,
    pub color: LinearRgba,
    pub intensity: f32,
    pub kind: LightKind,
    /// Animation phase offset in radians.
    pub phase: f32,
    /// `Some` when the light wants a shadow map.
    pub shadow: Option<ShadowCast>,
}

impl LightDesc {
    pub fn is_spot(&self) -> bool {
        matches!(self.kind, LightKind::Spot { .. })
    }
}

/// The single directional light and the ambient term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// World-space direction the light travels in.
    pub direction: Vec3,
    pub color: LinearRgba,
    pub intensity: f32,
    pub ambient: LinearRgba,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.3, -1.0, -0.4).normalize(),
            color: LinearRgba::WHITE,
            intensity: 0.7,
            ambient: LinearRgba::rgb(0.06, 0.06, 0.07),
        }
    }
}

/// Which shadow map a packed light samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ShadowKind {
    None = 0,
    Spot = 1,
    Point = 2,
}

/// GPU layout of one dynamic light. Five `vec4`s, 80 bytes.
///
/// Positions and directions are in view space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// xyz: position, w: radius.
    pub position_radius: [f32; 4],
    /// rgb: colour, w: intensity.
    pub color_intensity: [f32; 4],
    /// xyz: direction (spot only), w: type tag.
    pub direction_type: [f32; 4],
    /// cos(inner), cos(outer), radius, tan(outer).
    pub spot_params: [f32; 4],
    /// Shadow slot (-1 for none), [`ShadowKind`], unused, unused.
    pub shadow: [i32; 4],
}

impl GpuLight {
    /// Type tag of a point light.
    pub const TYPE_POINT: f32 = 0.0;
    /// Type tag of a spot light.
    pub const TYPE_SPOT: f32 = 1.0;

    pub fn is_spot(&self) -> bool {
        self.direction_type[3] == Self::TYPE_SPOT
    }

    pub fn view_position(&self) -> Vec3 {
        Vec3::new(
            self.position_radius[0],
            self.position_radius[1],
            self.position_radius[2],
        )
    }

    pub fn radius(&self) -> f32 {
        self.position_radius[3]
    }

    /// Shadow slot and kind, `None` when the light casts no shadow this frame.
    pub fn shadow_slot(&self) -> Option<(usize, ShadowKind)> {
        let kind = match self.shadow[1] {
            1 => ShadowKind::Spot,
            2 => ShadowKind::Point,
            _ => return None,
        };
        usize::try_from(self.shadow[0]).ok().map(|slot| (slot, kind))
    }
}

impl Default for GpuLight {
    fn default() -> Self {
        Self {
            position_radius: [0.0, 0.0, 0.0, 1.0],
            color_intensity: [1.0, 1.0, 1.0, 1.0],
            direction_type: [0.0, 0.0, -1.0, Self::TYPE_POINT],
            spot_params: [0.0; 4],
            shadow: [-1, ShadowKind::None as i32, 0, 0],
        }
    }
}

/// Where each light type lives in the packed array.
///
/// Point lights occupy `0..point_count`, spot lights follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightRanges {
    pub point_count: u32,
    pub spot_count: u32,
}

impl LightRanges {
    pub const fn total(&self) -> u32 {
        self.point_count + self.spot_count
    }

    /// Index of the first spot light.
    pub const fn spot_offset(&self) -> u32 {
        self.point_count
    }
}
