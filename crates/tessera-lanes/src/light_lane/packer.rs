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

//! Per-frame packing of the animated lights into their GPU layout.

use glam::{Mat3, Mat4, Vec3};
use tessera_core::renderer::light::{GpuLight, LightKind, LightRanges, ShadowKind};

use super::registry::{AnimatedLight, LightRegistry};
use crate::shadow_lane::{LocalCaster, ShadowRegistrar};

/// The lights of one frame, ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedLights {
    /// Point lights first, then spot lights.
    pub lights: Vec<GpuLight>,
    pub ranges: LightRanges,
    /// The eye sits inside at least one light volume.
    pub camera_inside_volume: bool,
}

/// Turns the registry into [`PackedLights`] every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightPacker;

impl LightPacker {
    /// Animates every light to `time`, moves it into the space of `view`
    /// and asks `shadows` for a slot when the light casts shadows.
    ///
    /// Point lights register before spot lights, each in authoring order.
    pub fn pack(
        registry: &LightRegistry,
        view: Mat4,
        time: f32,
        shadows: &mut dyn ShadowRegistrar,
    ) -> PackedLights {
        let inverse_view = view.inverse();
        let view_rotation = Mat3::from_mat4(view);
        let mut camera_inside_volume = false;

        let (points, spots): (Vec<_>, Vec<_>) =
            registry.animate(time).partition(|light| !light.desc.is_spot());
        let ranges = LightRanges {
            point_count: points.len() as u32,
            spot_count: spots.len() as u32,
        };

        let mut lights = Vec::with_capacity(registry.len());
        for light in points.iter().chain(spots.iter()) {
            let view_position = view.transform_point3(light.position);
            if view_position.length() < light.desc.radius {
                camera_inside_volume = true;
            }
            let shadow = register_shadow(light, inverse_view, shadows);
            lights.push(pack_light(light, view_position, view_rotation, shadow));
        }

        log::trace!(
            "LightPacker: packed {} point and {} spot lights (inside volume: {})",
            ranges.point_count,
            ranges.spot_count,
            camera_inside_volume
        );
        PackedLights {
            lights,
            ranges,
            camera_inside_volume,
        }
    }
}

fn register_shadow(
    light: &AnimatedLight<'_>,
    inverse_view: Mat4,
    shadows: &mut dyn ShadowRegistrar,
) -> [i32; 4] {
    let none = [-1, ShadowKind::None as i32, 0, 0];
    let Some(bias) = light.desc.shadow else {
        return none;
    };
    let outer_angle = match light.desc.kind {
        LightKind::Spot { outer_angle, .. } => outer_angle,
        LightKind::Point => 0.0,
    };
    let caster = LocalCaster {
        position: light.position,
        direction: light.direction,
        radius: light.desc.radius,
        outer_angle,
        bias,
    };
    let (slot, kind) = if light.desc.is_spot() {
        (
            shadows.register_spot_shadow(&caster, inverse_view),
            ShadowKind::Spot,
        )
    } else {
        (shadows.register_point_shadow(&caster), ShadowKind::Point)
    };
    match slot.and_then(|slot| i32::try_from(slot.0).ok()) {
        Some(slot) => [slot, kind as i32, 0, 0],
        None => none,
    }
}

fn pack_light(
    light: &AnimatedLight<'_>,
    view_position: Vec3,
    view_rotation: Mat3,
    shadow: [i32; 4],
) -> GpuLight {
    let desc = light.desc;
    let (direction, type_tag, spot_params) = match desc.kind {
        LightKind::Spot {
            inner_angle,
            outer_angle,
            ..
        } => (
            (view_rotation * light.direction).normalize_or_zero(),
            GpuLight::TYPE_SPOT,
            [
                inner_angle.cos(),
                outer_angle.cos(),
                desc.radius,
                outer_angle.tan(),
            ],
        ),
        LightKind::Point => (Vec3::NEG_Z, GpuLight::TYPE_POINT, [0.0; 4]),
    };
    GpuLight {
        position_radius: view_position.extend(desc.radius).to_array(),
        color_intensity: desc.color.to_vec3().extend(desc.intensity).to_array(),
        direction_type: direction.extend(type_tag).to_array(),
        spot_params,
        shadow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tessera_core::math::LinearRgba;
    use tessera_core::renderer::light::{LightDesc, ShadowCast};
    use tessera_core::renderer::shadow::{ShadowSettings, ShadowSlot, MAX_SPOT_SHADOWS};

    use crate::shadow_lane::NoShadows;

    /// Hands out slots up to a fixed capacity, like the shadow system.
    #[derive(Default)]
    struct CountingRegistrar {
        spots: usize,
        points: usize,
    }

    impl ShadowRegistrar for CountingRegistrar {
        fn register_spot_shadow(&mut self, _: &LocalCaster, _: Mat4) -> Option<ShadowSlot> {
            (self.spots < MAX_SPOT_SHADOWS).then(|| {
                self.spots += 1;
                ShadowSlot(self.spots - 1)
            })
        }

        fn register_point_shadow(&mut self, _: &LocalCaster) -> Option<ShadowSlot> {
            self.points += 1;
            Some(ShadowSlot(self.points - 1))
        }
    }

    fn camera() -> Mat4 {
        Mat4::look_at_rh(Vec3::new(0.0, 15.0, 15.0), Vec3::ZERO, Vec3::Y)
    }

    fn spot(index: usize) -> LightDesc {
        LightDesc {
            base_position: Vec3::new(index as f32, 4.0, 0.0),
            radius: 8.0,
            color: LinearRgba::WHITE,
            intensity: 1.0,
            kind: LightKind::Spot {
                target: Vec3::ZERO,
                inner_angle: 15f32.to_radians(),
                outer_angle: 25f32.to_radians(),
            },
            phase: 0.0,
            shadow: Some(ShadowCast {
                bias_min: 0.001,
                bias_slope: 0.004,
            }),
        }
    }

    #[test]
    fn test_points_precede_spots() {
        let mut lights = vec![spot(0)];
        lights.extend(
            LightRegistry::build_default(&ShadowSettings::default())
                .lights()
                .iter()
                .copied(),
        );
        lights.push(spot(1));
        let registry = LightRegistry::new(lights);

        let packed = LightPacker::pack(&registry, camera(), 1.5, &mut NoShadows);
        assert_eq!(packed.ranges.point_count, 32);
        assert_eq!(packed.ranges.spot_count, 10);
        let first_spot = packed.lights.iter().position(GpuLight::is_spot).unwrap();
        assert_eq!(first_spot, packed.ranges.spot_offset() as usize);
        assert!(packed.lights[first_spot..].iter().all(GpuLight::is_spot));
    }

    #[test]
    fn test_view_space_transform() {
        let registry = LightRegistry::build_default(&ShadowSettings::default());
        let view = camera();
        let packed = LightPacker::pack(&registry, view, 0.25, &mut NoShadows);

        for (light, gpu) in registry
            .animate(0.25)
            .filter(|l| !l.desc.is_spot())
            .zip(&packed.lights)
        {
            assert_relative_eq!(
                gpu.view_position(),
                view.transform_point3(light.position),
                epsilon = 1e-4
            );
        }
        for gpu in &packed.lights[packed.ranges.spot_offset() as usize..] {
            let direction = Vec3::from_slice(&gpu.direction_type[..3]);
            assert_relative_eq!(direction.length(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(gpu.spot_params[1], 25f32.to_radians().cos());
            assert_relative_eq!(gpu.spot_params[3], 25f32.to_radians().tan());
        }
    }

    #[test]
    fn test_camera_inside_flag() {
        let registry = LightRegistry::new(vec![spot(0)]);
        let far_camera = Mat4::look_at_rh(Vec3::new(0.0, 40.0, 40.0), Vec3::ZERO, Vec3::Y);
        let packed = LightPacker::pack(&registry, far_camera, 0.0, &mut NoShadows);
        assert!(!packed.camera_inside_volume);

        let position = super::super::registry::animate(&registry.lights()[0], 0.0).position;
        let near_camera = Mat4::look_at_rh(position + Vec3::Y, position, Vec3::Z);
        let packed = LightPacker::pack(&registry, near_camera, 0.0, &mut NoShadows);
        assert!(packed.camera_inside_volume);
    }

    #[test]
    fn test_shadow_slots_respect_capacity() {
        let registry = LightRegistry::new((0..MAX_SPOT_SHADOWS + 1).map(spot).collect());
        let mut registrar = CountingRegistrar::default();
        let packed = LightPacker::pack(&registry, camera(), 0.0, &mut registrar);

        let slots: Vec<_> = packed.lights.iter().map(GpuLight::shadow_slot).collect();
        assert_eq!(slots[0], Some((0, ShadowKind::Spot)));
        assert_eq!(slots[MAX_SPOT_SHADOWS - 1], Some((MAX_SPOT_SHADOWS - 1, ShadowKind::Spot)));
        assert_eq!(slots[MAX_SPOT_SHADOWS], None);
    }

    #[test]
    fn test_default_population_registers_points_then_spots() {
        let registry = LightRegistry::build_default(&ShadowSettings::default());
        let mut registrar = CountingRegistrar::default();
        let packed = LightPacker::pack(&registry, camera(), 0.0, &mut registrar);
        assert_eq!(registrar.points, 2);
        assert_eq!(registrar.spots, 4);
        assert_eq!(packed.lights[0].shadow_slot(), Some((0, ShadowKind::Point)));
        assert_eq!(packed.lights[16].shadow_slot(), Some((1, ShadowKind::Point)));
        assert_eq!(packed.lights[1].shadow_slot(), None);
    }
}
