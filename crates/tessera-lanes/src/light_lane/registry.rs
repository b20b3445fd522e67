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

//! The authored light population and its animation.

use glam::Vec3;
use std::f32::consts::TAU;
use tessera_core::math::{degrees_to_radians, LinearRgba};
use tessera_core::renderer::light::{LightDesc, LightKind, ShadowCast};
use tessera_core::renderer::shadow::ShadowSettings;

pub const DEFAULT_POINT_LIGHTS: usize = 32;
pub const DEFAULT_SPOT_LIGHTS: usize = 8;

const POINT_RING_RADIUS: f32 = 4.5;
const POINT_HEIGHT: f32 = 1.2;
const POINT_RADIUS: f32 = 6.0;
const SPOT_RING_RADIUS: f32 = 2.5;
const SPOT_HEIGHT: f32 = 4.0;
const SPOT_RADIUS: f32 = 8.0;
const SPOT_COLOR: LinearRgba = LinearRgba::rgb(0.55, 0.70, 0.95);
const SPOT_INTENSITY: f32 = 1.4;
const SPOT_INNER_DEGREES: f32 = 15.0;
const SPOT_OUTER_DEGREES: f32 = 25.0;

/// Point lights that request a shadow map.
const SHADOWED_POINTS: [usize; 2] = [0, 16];

/// Orbit and bob amplitudes of one light type.
#[derive(Debug, Clone, Copy)]
struct Motion {
    orbit: f32,
    bob: f32,
}

const POINT_MOTION: Motion = Motion {
    orbit: 0.55,
    bob: 0.35,
};
const SPOT_MOTION: Motion = Motion {
    orbit: 2.25,
    bob: 2.15,
};

/// A light at one instant, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedLight<'a> {
    pub desc: &'a LightDesc,
    pub position: Vec3,
    /// Unit direction of a spot light, zero for point lights.
    pub direction: Vec3,
}

/// Owns the authored lights. Records never change after construction.
#[derive(Debug, Clone, Default)]
pub struct LightRegistry {
    lights: Vec<LightDesc>,
}

impl LightRegistry {
    pub fn new(lights: Vec<LightDesc>) -> Self {
        Self { lights }
    }

    /// The fixed ring of 32 point and 8 spot lights.
    ///
    /// Even spot lights and point lights 0 and 16 cast shadows with the
    /// configured bias.
    pub fn build_default(shadows: &ShadowSettings) -> Self {
        let cast = ShadowCast {
            bias_min: shadows.bias_min,
            bias_slope: shadows.bias_slope,
        };
        let mut lights = Vec::with_capacity(DEFAULT_POINT_LIGHTS + DEFAULT_SPOT_LIGHTS);

        for i in 0..DEFAULT_POINT_LIGHTS {
            let angle = TAU * i as f32 / DEFAULT_POINT_LIGHTS as f32;
            let channel = |offset: f32| 0.4 + 0.6 * (angle + offset).sin();
            lights.push(LightDesc {
                base_position: Vec3::new(
                    angle.cos() * POINT_RING_RADIUS,
                    POINT_HEIGHT,
                    angle.sin() * POINT_RING_RADIUS,
                ),
                radius: POINT_RADIUS,
                color: LinearRgba::rgb(channel(0.0), channel(2.1), channel(4.2)),
                intensity: 1.0,
                kind: LightKind::Point,
                phase: angle,
                shadow: SHADOWED_POINTS.contains(&i).then_some(cast),
            });
        }

        for i in 0..DEFAULT_SPOT_LIGHTS {
            let angle = TAU * i as f32 / DEFAULT_SPOT_LIGHTS as f32;
            lights.push(LightDesc {
                base_position: Vec3::new(
                    angle.cos() * SPOT_RING_RADIUS,
                    SPOT_HEIGHT,
                    angle.sin() * SPOT_RING_RADIUS,
                ),
                radius: SPOT_RADIUS,
                color: SPOT_COLOR,
                intensity: SPOT_INTENSITY,
                kind: LightKind::Spot {
                    target: Vec3::ZERO,
                    inner_angle: degrees_to_radians(SPOT_INNER_DEGREES),
                    outer_angle: degrees_to_radians(SPOT_OUTER_DEGREES),
                },
                phase: angle,
                shadow: (i % 2 == 0).then_some(cast),
            });
        }

        log::debug!(
            "LightRegistry: built {} point and {} spot lights",
            DEFAULT_POINT_LIGHTS,
            DEFAULT_SPOT_LIGHTS
        );
        Self { lights }
    }

    pub fn lights(&self) -> &[LightDesc] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.lights.iter().filter(|light| !light.is_spot()).count()
    }

    pub fn spot_count(&self) -> usize {
        self.lights.iter().filter(|light| light.is_spot()).count()
    }

    /// Every light at `time` seconds, in authoring order.
    pub fn animate(&self, time: f32) -> impl Iterator<Item = AnimatedLight<'_>> {
        self.lights.iter().map(move |desc| animate(desc, time))
    }
}

/// Orbits and bobs `desc` around its base position.
pub fn animate(desc: &LightDesc, time: f32) -> AnimatedLight<'_> {
    let motion = if desc.is_spot() {
        SPOT_MOTION
    } else {
        POINT_MOTION
    };
    let phase = desc.phase + time;
    let position = desc.base_position
        + Vec3::new(
            motion.orbit * (phase * 0.7).cos(),
            motion.bob * (phase * 1.3).sin(),
            motion.orbit * (phase * 0.9).sin(),
        );
    let direction = match desc.kind {
        LightKind::Spot { target, .. } => (target - position).normalize_or_zero(),
        LightKind::Point => Vec3::ZERO,
    };
    AnimatedLight {
        desc,
        position,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_population() {
        let registry = LightRegistry::build_default(&ShadowSettings::default());
        assert_eq!(registry.len(), 40);
        assert_eq!(registry.point_count(), 32);
        assert_eq!(registry.spot_count(), 8);

        let shadowed_points = registry
            .lights()
            .iter()
            .filter(|l| !l.is_spot() && l.shadow.is_some())
            .count();
        let shadowed_spots = registry
            .lights()
            .iter()
            .filter(|l| l.is_spot() && l.shadow.is_some())
            .count();
        assert_eq!(shadowed_points, 2);
        assert_eq!(shadowed_spots, 4);
    }

    #[test]
    fn test_build_is_deterministic() {
        let settings = ShadowSettings::default();
        assert_eq!(
            LightRegistry::build_default(&settings).lights(),
            LightRegistry::build_default(&settings).lights()
        );
    }

    #[test]
    fn test_first_point_light() {
        let registry = LightRegistry::build_default(&ShadowSettings::default());
        let first = &registry.lights()[0];
        assert_relative_eq!(first.base_position, Vec3::new(4.5, 1.2, 0.0));
        assert_relative_eq!(first.color.r, 0.4);
        assert_relative_eq!(first.color.g, 0.4 + 0.6 * 2.1f32.sin());
        assert_eq!(first.radius, 6.0);
    }

    #[test]
    fn test_animation_at_time_zero() {
        let registry = LightRegistry::build_default(&ShadowSettings::default());
        let first = animate(&registry.lights()[0], 0.0);
        // phase 0: cos(0) = 1 on x, sin(0) = 0 elsewhere.
        assert_relative_eq!(first.position, Vec3::new(4.5 + 0.55, 1.2, 0.0));
        assert_eq!(first.direction, Vec3::ZERO);
    }

    #[test]
    fn test_spot_points_at_target() {
        let registry = LightRegistry::build_default(&ShadowSettings::default());
        for light in registry.animate(3.7).filter(|l| l.desc.is_spot()) {
            let to_target = (Vec3::ZERO - light.position).normalize();
            assert_relative_eq!(light.direction, to_target, epsilon = 1e-5);
        }
    }
}
