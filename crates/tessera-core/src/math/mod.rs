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

//! Math primitives used by the renderer.
//!
//! Linear algebra comes from `glam`; this module adds the few geometric
//! helpers the lighting code needs on top of it.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// The factor to convert degrees to radians (PI / 180.0).
pub const DEG_TO_RAD: f32 = PI / 180.0;

pub mod color;
pub mod geometry;

pub use self::color::LinearRgba;
pub use self::geometry::{frustum_corners, stable_up, Aabb, Sphere};
pub use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};

/// Converts degrees to radians.
#[inline]
pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * DEG_TO_RAD
}

/// Checks if two floats are approximately equal using [`EPSILON`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}
