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

//! Additive light-volume accumulation for the deferred path.
//!
//! Point lights are drawn as instanced spheres and spot lights as instanced
//! cones over the light accumulation target. The packed light array keeps
//! each type contiguous, so one draw per type covers it with the instance
//! range selecting the lights.

use std::sync::Arc;

use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::renderer::light::LightRanges;
use tessera_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutId, BlendState,
    ColorTargetState, CommandEncoder, CompareFunction, CullMode, DepthStencilState,
    GraphicsDevice, Operations, PipelineLayoutId, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, RenderPipelineId, ResourceError,
};

use super::buffer::LightBuffer;
use crate::render_lane::geometry::{unit_cone, unit_sphere};
use crate::render_lane::layouts::SHADOW_GROUP;
use crate::render_lane::pipeline::{
    create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec,
};
use crate::render_lane::{
    FrameUniformBuffer, GpuMesh, RenderTargets, Target, TargetBinding, GBUFFER_TARGETS,
};
use crate::shaders::ShaderId;

pub const LIGHT_VOLUMES_PASS: &str = "light_volumes";

const SPHERE_STACKS: u32 = 12;
const SPHERE_SLICES: u32 = 16;
const CONE_SLICES: u32 = 16;

/// Rasterisation state of the volumes relative to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeSide {
    /// Back faces culled, depth tested against the scene.
    Outside,
    /// Front faces culled. The remaining back faces pass only where they lie
    /// behind the scene, so a volume around the eye lights just the surfaces
    /// inside it.
    Inside,
}

impl VolumeSide {
    fn from_camera(camera_inside: bool) -> Self {
        if camera_inside {
            VolumeSide::Inside
        } else {
            VolumeSide::Outside
        }
    }

    fn cull_mode(self) -> CullMode {
        match self {
            VolumeSide::Outside => CullMode::Back,
            VolumeSide::Inside => CullMode::Front,
        }
    }

    fn depth_compare(self) -> CompareFunction {
        match self {
            VolumeSide::Outside => CompareFunction::LessEqual,
            VolumeSide::Inside => CompareFunction::GreaterEqual,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct VolumePipelines {
    point: RenderPipelineId,
    spot: RenderPipelineId,
}

#[derive(Debug, Default)]
struct VolumeGpuResources {
    layout: Option<PipelineLayoutId>,
    outside: Option<VolumePipelines>,
    inside: Option<VolumePipelines>,
    surfaces_layout: Option<BindGroupLayoutId>,
    lights_layout: Option<BindGroupLayoutId>,
    surfaces: TargetBinding,
    lights: Option<BindGroupId>,
    lights_generation: u64,
}

/// Accumulates point and spot lighting with one instanced draw per type.
#[derive(Debug)]
pub struct LightVolumeRenderer {
    gpu: VolumeGpuResources,
    sphere: GpuMesh,
    cone: GpuMesh,
}

impl Default for LightVolumeRenderer {
    fn default() -> Self {
        Self {
            gpu: VolumeGpuResources::default(),
            sphere: GpuMesh::new("light volume sphere"),
            cone: GpuMesh::new("light volume cone"),
        }
    }
}

impl LightVolumeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the bind groups whose targets or light buffer were reallocated.
    pub fn prepare(
        &mut self,
        device: &dyn GraphicsDevice,
        targets: &RenderTargets,
        lights: &LightBuffer,
    ) -> Result<(), LaneError> {
        let (Some(surfaces_layout), Some(lights_layout)) =
            (self.gpu.surfaces_layout, self.gpu.lights_layout)
        else {
            return Err(LaneError::NotInitialized);
        };
        self.gpu.surfaces.refresh(
            device,
            surfaces_layout,
            "light volume surfaces",
            targets,
            &GBUFFER_TARGETS,
        )?;

        if self.gpu.lights.is_some() && self.gpu.lights_generation == lights.generation() {
            return Ok(());
        }
        let buffer = lights.buffer().ok_or(LaneError::NotInitialized)?;
        if let Some(old) = self.gpu.lights.take() {
            let _ = device.destroy_bind_group(old);
        }
        let group = device
            .create_bind_group(&BindGroupDescriptor {
                label: Some("light volume lights"),
                layout: lights_layout,
                entries: &[BindGroupEntry::buffer(0, buffer)],
            })
            .map_err(LaneError::execution)?;
        self.gpu.lights = Some(group);
        self.gpu.lights_generation = lights.generation();
        Ok(())
    }

    /// Adds every light's contribution onto the accumulation target.
    ///
    /// The scene depth of the G-buffer pass is bound read-only for the depth
    /// test.
    pub fn encode(
        &self,
        encoder: &mut dyn CommandEncoder,
        frame: &FrameUniformBuffer,
        targets: &RenderTargets,
        ranges: LightRanges,
        camera_inside: bool,
        shadow_group: BindGroupId,
    ) -> Result<(), LaneError> {
        let side = VolumeSide::from_camera(camera_inside);
        let pipelines = match side {
            VolumeSide::Outside => self.gpu.outside,
            VolumeSide::Inside => self.gpu.inside,
        };
        let (Some(pipelines), Some(surfaces), Some(lights)) =
            (pipelines, self.gpu.surfaces.get(), self.gpu.lights)
        else {
            return Err(LaneError::NotInitialized);
        };
        targets.log_if_incomplete(LIGHT_VOLUMES_PASS, &[(Target::Light, Target::Light.format())]);
        let light = targets.view(Target::Light).ok_or(LaneError::NotInitialized)?;
        let depth = targets.view(Target::Depth).ok_or(LaneError::NotInitialized)?;

        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(LIGHT_VOLUMES_PASS),
            color_attachments: &[RenderPassColorAttachment {
                view: light,
                ops: Operations::load(),
            }],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(Operations::load()),
            }),
        });
        pass.set_bind_group(0, frame.bind_group(), &[]);
        pass.set_bind_group(1, surfaces, &[]);
        pass.set_bind_group(2, lights, &[]);
        pass.set_bind_group(SHADOW_GROUP, shadow_group, &[]);

        if ranges.point_count > 0 {
            pass.set_pipeline(pipelines.point);
            self.sphere.draw_instances(pass.as_mut(), 0..ranges.point_count);
        }
        if ranges.spot_count > 0 {
            pass.set_pipeline(pipelines.spot);
            self.cone
                .draw_instances(pass.as_mut(), ranges.spot_offset()..ranges.total());
        }
        Ok(())
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        let mut gpu = std::mem::take(&mut self.gpu);
        gpu.surfaces.release(device);
        if let Some(lights) = gpu.lights {
            let _ = device.destroy_bind_group(lights);
        }
        let pipelines = [gpu.outside, gpu.inside]
            .into_iter()
            .flatten()
            .flat_map(|p| [Some(p.point), Some(p.spot)]);
        release_pipelines(device, pipelines, [gpu.layout]);
        self.sphere.release(device);
        self.cone.release(device);
    }

    fn build(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let device = deps.device();
        self.sphere
            .upload(device, &unit_sphere(SPHERE_STACKS, SPHERE_SLICES))
            .map_err(LaneError::init)?;
        self.cone
            .upload(device, &unit_cone(CONE_SLICES))
            .map_err(LaneError::init)?;

        let layouts = deps.layouts;
        let layout = deps.pipeline_layout(
            "light volumes",
            &[layouts.frame, layouts.surfaces, layouts.volume_lights, layouts.shadow],
        )?;
        self.gpu.layout = Some(layout);
        self.gpu.surfaces_layout = Some(layouts.surfaces);
        self.gpu.lights_layout = Some(layouts.volume_lights);

        let targets = [ColorTargetState {
            blend: Some(BlendState::ADDITIVE),
            ..ColorTargetState::replace(Target::Light.format())
        }];
        let (outside, inside) = deps.with_module(ShaderId::LightVolume, |module| {
            let mut created = Vec::with_capacity(4);
            let mut build = |label: &str,
                             vertex_entry: &str,
                             side: VolumeSide|
             -> Result<RenderPipelineId, ResourceError> {
                let pipeline = create_render_pipeline(
                    device,
                    module,
                    layout,
                    &RenderPipelineSpec {
                        label,
                        vertex_entry,
                        fragment_entry: Some("fs_main"),
                        mesh_vertices: true,
                        targets: &targets,
                        cull_mode: Some(side.cull_mode()),
                        depth: Some(DepthStencilState::depth32(false, side.depth_compare())),
                    },
                )?;
                created.push(pipeline);
                Ok(pipeline)
            };
            let result = (|| {
                let outside = VolumePipelines {
                    point: build("light volume point", "vs_point", VolumeSide::Outside)?,
                    spot: build("light volume spot", "vs_spot", VolumeSide::Outside)?,
                };
                let inside = VolumePipelines {
                    point: build("light volume point inside", "vs_point", VolumeSide::Inside)?,
                    spot: build("light volume spot inside", "vs_spot", VolumeSide::Inside)?,
                };
                Ok::<_, ResourceError>((outside, inside))
            })();
            if result.is_err() {
                for pipeline in created {
                    let _ = device.destroy_render_pipeline(pipeline);
                }
            }
            result
        })?;
        self.gpu.outside = Some(outside);
        self.gpu.inside = Some(inside);
        Ok(())
    }
}

impl Lane for LightVolumeRenderer {
    fn strategy_name(&self) -> &'static str {
        "LightVolumes"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Lighting
    }

    fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError> {
        let deps = LaneDeps::from_context(ctx)?;
        self.build(&deps).inspect_err(|_| self.release(deps.device()))
    }

    fn on_shutdown(&mut self, ctx: &LaneContext) {
        if let Some(device) = ctx.get::<Arc<dyn GraphicsDevice>>() {
            self.release(device.as_ref());
        }
    }

    fn is_initialized(&self) -> bool {
        self.gpu.outside.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::TestRig;
    use crate::shadow_lane::ShadowSystem;
    use tessera_core::renderer::shadow::ShadowSettings;
    use tessera_core::renderer::testing::RecordedCommand;
    use tessera_core::renderer::GpuLight;

    struct Fixture {
        rig: TestRig,
        shadows: ShadowSystem,
        lights: LightBuffer,
        volumes: LightVolumeRenderer,
    }

    fn fixture() -> Fixture {
        let rig = TestRig::new();
        let mut shadows = ShadowSystem::new(ShadowSettings::default());
        shadows.on_initialize(&rig.ctx).unwrap();
        let mut lights = LightBuffer::new();
        lights.upload(&rig.device, &[GpuLight::default(); 40]).unwrap();
        let mut volumes = LightVolumeRenderer::new();
        volumes.on_initialize(&rig.ctx).unwrap();
        volumes.prepare(&rig.device, &rig.targets, &lights).unwrap();
        Fixture {
            rig,
            shadows,
            lights,
            volumes,
        }
    }

    const RANGES: LightRanges = LightRanges {
        point_count: 32,
        spot_count: 8,
    };

    fn encode(f: &Fixture, camera_inside: bool) -> Vec<RecordedCommand> {
        f.rig.device.clear_commands();
        let mut encoder = f.rig.device.create_command_encoder(None);
        f.volumes
            .encode(
                encoder.as_mut(),
                &f.rig.frame,
                &f.rig.targets,
                RANGES,
                camera_inside,
                f.shadows.sampling_group().unwrap(),
            )
            .unwrap();
        drop(encoder);
        f.rig.device.commands()
    }

    fn pipelines(commands: &[RecordedCommand]) -> Vec<RenderPipelineId> {
        commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::SetRenderPipeline(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_one_instanced_draw_per_type() {
        let f = fixture();
        let commands = encode(&f, false);
        let draws: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::DrawIndexed { instances, .. } => Some(instances.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![0..32, 32..40]);
        assert_eq!(
            commands[0],
            RecordedCommand::BeginRenderPass {
                label: LIGHT_VOLUMES_PASS.into(),
                color_views: vec![f.rig.targets.view(Target::Light).unwrap()],
                depth_view: f.rig.targets.view(Target::Depth),
            }
        );
    }

    #[test]
    fn test_camera_inside_switches_pipelines() {
        let f = fixture();
        let outside = pipelines(&encode(&f, false));
        let inside = pipelines(&encode(&f, true));
        assert_eq!(outside.len(), 2);
        assert_eq!(inside.len(), 2);
        assert!(outside.iter().all(|p| !inside.contains(p)));
    }

    #[test]
    fn test_light_group_follows_buffer_reallocation() {
        let mut f = fixture();
        let first = f.volumes.gpu.lights;
        f.lights.upload(&f.rig.device, &[GpuLight::default(); 40]).unwrap();
        f.volumes.prepare(&f.rig.device, &f.rig.targets, &f.lights).unwrap();
        assert_eq!(f.volumes.gpu.lights, first);

        f.lights.upload(&f.rig.device, &[GpuLight::default(); 12]).unwrap();
        f.volumes.prepare(&f.rig.device, &f.rig.targets, &f.lights).unwrap();
        assert_ne!(f.volumes.gpu.lights, first);
    }

    #[test]
    fn test_empty_ranges_draw_nothing() {
        let f = fixture();
        f.rig.device.clear_commands();
        let mut encoder = f.rig.device.create_command_encoder(None);
        f.volumes
            .encode(
                encoder.as_mut(),
                &f.rig.frame,
                &f.rig.targets,
                LightRanges::default(),
                false,
                f.shadows.sampling_group().unwrap(),
            )
            .unwrap();
        drop(encoder);
        assert!(!f
            .rig
            .device
            .commands()
            .iter()
            .any(|c| matches!(c, RecordedCommand::DrawIndexed { .. })));
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut f = fixture();
        f.volumes.on_shutdown(&f.rig.ctx);
        f.shadows.on_shutdown(&f.rig.ctx);
        f.lights.release(&f.rig.device);
        f.rig.release();
        assert_eq!(f.rig.device.live_resource_count(), 0);
    }

    #[test]
    fn test_inside_volumes_keep_the_depth_test() {
        let inside = VolumeSide::from_camera(true);
        assert_eq!(inside.cull_mode(), CullMode::Front);
        assert_eq!(inside.depth_compare(), CompareFunction::GreaterEqual);
        assert_eq!(
            VolumeSide::from_camera(false).depth_compare(),
            CompareFunction::LessEqual
        );
    }

    #[test]
    fn test_volume_pipelines_blend_additively_with_depth_test() {
        let f = fixture();
        let outside = f.volumes.gpu.outside.unwrap();
        let inside = f.volumes.gpu.inside.unwrap();
        let sides = [
            (outside.point, CullMode::Back),
            (outside.spot, CullMode::Back),
            (inside.point, CullMode::Front),
            (inside.spot, CullMode::Front),
        ];
        for (id, cull) in sides {
            let record = f.rig.device.render_pipeline(id).unwrap();
            assert_eq!(record.color_targets.len(), 1);
            assert_eq!(record.color_targets[0].blend, Some(BlendState::ADDITIVE));
            assert_eq!(record.primitive.cull_mode, Some(cull));
            let depth = record.depth_stencil.unwrap();
            assert!(!depth.depth_write_enabled);
            assert_ne!(depth.depth_compare, CompareFunction::Always);
        }
    }
}
