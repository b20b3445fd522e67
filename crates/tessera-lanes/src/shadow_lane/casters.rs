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

//! Local shadow casters and their light-space projections.

use glam::{Mat4, Vec3};
use std::f32::consts::FRAC_PI_2;
use tessera_core::math::stable_up;
use tessera_core::renderer::light::ShadowCast;
use tessera_core::renderer::shadow::{
    ShadowSlot, LOCAL_SHADOW_MIN_FAR, LOCAL_SHADOW_NEAR, POINT_FACES,
};

/// A spot or point light asking for a shadow map this frame, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalCaster {
    pub position: Vec3,
    /// Unit cone axis. Ignored for point casters.
    pub direction: Vec3,
    pub radius: f32,
    /// Outer half-angle in radians. Ignored for point casters.
    pub outer_angle: f32,
    pub bias: ShadowCast,
}

/// Accepts local casters into fixed-capacity slots.
pub trait ShadowRegistrar {
    fn register_spot_shadow(&mut self, caster: &LocalCaster, inverse_view: Mat4)
        -> Option<ShadowSlot>;

    fn register_point_shadow(&mut self, caster: &LocalCaster) -> Option<ShadowSlot>;
}

/// Rejects every caster. Used where no shadow system is running.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShadows;

impl ShadowRegistrar for NoShadows {
    fn register_spot_shadow(&mut self, _: &LocalCaster, _: Mat4) -> Option<ShadowSlot> {
        None
    }

    fn register_point_shadow(&mut self, _: &LocalCaster) -> Option<ShadowSlot> {
        None
    }
}

fn local_far(radius: f32) -> f32 {
    radius.max(LOCAL_SHADOW_MIN_FAR)
}

/// Perspective view-projection covering the full cone of a spot caster.
pub fn spot_view_projection(caster: &LocalCaster) -> Mat4 {
    let direction = caster.direction.normalize_or(Vec3::NEG_Y);
    let view = Mat4::look_at_rh(
        caster.position,
        caster.position + direction,
        stable_up(direction),
    );
    let projection = Mat4::perspective_rh(
        2.0 * caster.outer_angle,
        1.0,
        LOCAL_SHADOW_NEAR,
        local_far(caster.radius),
    );
    projection * view
}

/// Look direction and up vector of each cube face, in layer order.
const CUBE_FACES: [(Vec3, Vec3); POINT_FACES] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// One 90 degree view-projection per cube face of a point caster.
pub fn point_face_view_projections(caster: &LocalCaster) -> [Mat4; POINT_FACES] {
    let projection = Mat4::perspective_rh(
        FRAC_PI_2,
        1.0,
        LOCAL_SHADOW_NEAR,
        local_far(caster.radius),
    );
    CUBE_FACES.map(|(direction, up)| {
        projection * Mat4::look_at_rh(caster.position, caster.position + direction, up)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn caster() -> LocalCaster {
        LocalCaster {
            position: Vec3::new(1.0, 4.0, 0.0),
            direction: Vec3::NEG_Y,
            radius: 8.0,
            outer_angle: 25f32.to_radians(),
            bias: ShadowCast {
                bias_min: 0.001,
                bias_slope: 0.004,
            },
        }
    }

    #[test]
    fn test_spot_axis_projects_to_map_centre() {
        let vp = spot_view_projection(&caster());
        let clip = vp * Vec3::new(1.0, 0.0, 0.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_spot_far_plane_is_radius() {
        let vp = spot_view_projection(&caster());
        let clip = vp * Vec3::new(1.0, -4.0, 0.0).extend(1.0);
        assert_relative_eq!(clip.z / clip.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_point_faces_cover_their_axis() {
        let caster = caster();
        let faces = point_face_view_projections(&caster);
        for (face, (direction, _)) in faces.iter().zip(CUBE_FACES) {
            let clip = *face * (caster.position + direction * 2.0).extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
            assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
            assert!(ndc.z > 0.0 && ndc.z < 1.0);
        }
    }

    #[test]
    fn test_tiny_radius_keeps_a_valid_depth_range() {
        let caster = LocalCaster {
            radius: 0.0,
            ..caster()
        };
        let vp = spot_view_projection(&caster);
        assert!(vp.is_finite());
    }
}
