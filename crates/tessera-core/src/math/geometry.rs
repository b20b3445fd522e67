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

//! Geometric primitives shared by the tile culler and the shadow system.

use glam::{Mat4, Vec3, Vec4};

/// An Axis-Aligned Bounding Box (AABB).
///
/// Represented by its minimum and maximum corners. The tile culler builds
/// one per screen tile in view space; the cascade fitter builds one per
/// cascade in light space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// The corner with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any merge will overwrite.
    pub const INVALID: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Creates a box from two corners, sorting each axis.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box enclosing all `points`. Returns `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(points.iter().fold(Self::INVALID, |aabb, p| aabb.merged_with_point(*p)))
    }

    /// Grows the box to contain `point`.
    #[inline]
    pub fn merged_with_point(&self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// `true` when `min <= max` on every axis.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// The point of the box closest to `point` (the point itself when inside).
    #[inline]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    /// Sphere-vs-box overlap using the closest point on the box.
    ///
    /// Touching counts as overlapping.
    #[inline]
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let d = self.closest_point(sphere.center) - sphere.center;
        d.length_squared() <= sphere.radius * sphere.radius
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Unprojects the 8 corners of the clip-space cube through `inverse`.
///
/// Corners are ordered near plane first (`z = 0`), then far plane (`z = 1`);
/// within a plane the order is top-left, top-right, bottom-left,
/// bottom-right. Corner `c` and `c + 4` therefore lie on the same frustum
/// edge, which is what the cascade slicing relies on. Depth is zero-to-one,
/// matching the projection matrices built with `glam`'s `*_rh` helpers.
pub fn frustum_corners(inverse: Mat4) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    let mut i = 0;
    for z in [0.0, 1.0] {
        for y in [1.0, -1.0] {
            for x in [-1.0, 1.0] {
                let p = inverse * Vec4::new(x, y, z, 1.0);
                corners[i] = p.truncate() / p.w;
                i += 1;
            }
        }
    }
    corners
}

/// An up vector usable with `look_at` for a light travelling along `dir`.
///
/// Falls back to `+Z` when `dir` is nearly vertical so the view basis never
/// degenerates.
#[inline]
pub fn stable_up(dir: Vec3) -> Vec3 {
    if dir.normalize_or_zero().dot(Vec3::Y).abs() > 0.95 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(&[
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 2.0, 0.5),
            Vec3::new(0.0, 0.0, 7.0),
        ])
        .unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.5));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 7.0));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn test_sphere_inside_and_outside() {
        let slab = Aabb::from_min_max(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 10.0));
        assert!(slab.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 7.0), 1.0)));
        assert!(!slab.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 20.0), 1.0)));
        // Just touching the far face.
        assert!(slab.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 11.0), 1.0)));
    }

    #[test]
    fn test_frustum_corners_identity() {
        let corners = frustum_corners(Mat4::IDENTITY);
        assert_eq!(corners[0], Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(corners[3], Vec3::new(1.0, -1.0, 0.0));
        assert_eq!(corners[4], Vec3::new(-1.0, 1.0, 1.0));
        for c in 0..4 {
            assert_relative_eq!(corners[c].x, corners[c + 4].x);
            assert_relative_eq!(corners[c].y, corners[c + 4].y);
        }
    }

    #[test]
    fn test_stable_up_switches_for_vertical_light() {
        assert_eq!(stable_up(Vec3::new(-0.3, -1.0, -0.4)), Vec3::Y);
        assert_eq!(stable_up(Vec3::NEG_Y), Vec3::Z);
    }
}
