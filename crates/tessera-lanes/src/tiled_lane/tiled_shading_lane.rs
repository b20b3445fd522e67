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


//! Forward shading against the per-tile light lists.

use std::sync::Arc;

use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::math::LinearRgba;
use tessera_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutId, ColorTargetState,
    CommandEncoder, CompareFunction, DepthStencilState, GraphicsDevice, Operations,
    PipelineLayoutId, RenderPassColorAttachment, RenderPassDepthStencilAttachment,
    RenderPassDescriptor, RenderPipelineId, TextureFormat,
};

use super::culler::TileCuller;
use crate::light_lane::LightBuffer;
use crate::render_lane::layouts::SHADOW_GROUP;
use crate::render_lane::pipeline::{
    create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec,
};
use crate::render_lane::{FrameUniformBuffer, RenderTargets, SceneMeshes, Target};
use crate::shaders::ShaderId;

pub const TILED_SHADING_PASS: &str = "tiled_shading";

/// Outputs of the shading pass, in attachment order. The surfaces are
/// written as well so the composite debug views work on this path.
pub const TILED_SHADING_TARGETS: [Target; 4] = [
    Target::Light,
    Target::Albedo,
    Target::Normal,
    Target::LinearDepth,
];

fn attachments() -> [(Target, TextureFormat); 4] {
    TILED_SHADING_TARGETS.map(|target| (target, target.format()))
}

#[derive(Debug, Default)]
struct TiledGpuResources {
    layout: Option<PipelineLayoutId>,
    pipeline: Option<RenderPipelineId>,
    lights_layout: Option<BindGroupLayoutId>,
    lights: Option<BindGroupId>,
    lights_key: (u64, u64),
    empty: Option<BindGroupId>,
}

/// Shades every visible fragment once with the lights of its tile.
///
/// Depth comes from the prepass and is only tested here, so overdraw costs
/// nothing beyond the depth test.
#[derive(Debug, Default)]
pub struct TiledShadingLane {
    gpu: TiledGpuResources,
}

impl TiledShadingLane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the light-list bind group when the light buffer or the tile
    /// buffers were reallocated.
    pub fn prepare(
        &mut self,
        device: &dyn GraphicsDevice,
        culler: &TileCuller,
        lights: &LightBuffer,
    ) -> Result<(), LaneError> {
        let layout = self.gpu.lights_layout.ok_or(LaneError::NotInitialized)?;
        let key = (lights.generation(), culler.generation());
        if self.gpu.lights.is_some() && self.gpu.lights_key == key {
            return Ok(());
        }
        let (Some(light_buffer), Some(meta), Some(indices)) =
            (lights.buffer(), culler.meta_buffer(), culler.index_buffer())
        else {
            return Err(LaneError::NotInitialized);
        };
        let group = device
            .create_bind_group(&BindGroupDescriptor {
                label: Some("tiled lights"),
                layout,
                entries: &[
                    BindGroupEntry::buffer(0, light_buffer),
                    BindGroupEntry::buffer(1, meta),
                    BindGroupEntry::buffer(2, indices),
                ],
            })
            .map_err(LaneError::execution)?;
        if let Some(old) = self.gpu.lights.replace(group) {
            let _ = device.destroy_bind_group(old);
        }
        self.gpu.lights_key = key;
        Ok(())
    }

    pub fn encode(
        &self,
        encoder: &mut dyn CommandEncoder,
        frame: &FrameUniformBuffer,
        scene: &SceneMeshes,
        targets: &RenderTargets,
        shadow_group: BindGroupId,
    ) -> Result<(), LaneError> {
        let (Some(pipeline), Some(lights), Some(empty)) =
            (self.gpu.pipeline, self.gpu.lights, self.gpu.empty)
        else {
            return Err(LaneError::NotInitialized);
        };
        targets.log_if_incomplete(TILED_SHADING_PASS, &attachments());
        let view = |target| targets.view(target).ok_or(LaneError::NotInitialized);
        // Linear depth 0 marks the background for the composite pass.
        let clear = Operations::clear(LinearRgba::TRANSPARENT);
        let color_attachments = [
            RenderPassColorAttachment {
                view: view(Target::Light)?,
                ops: Operations::clear(LinearRgba::BLACK),
            },
            RenderPassColorAttachment {
                view: view(Target::Albedo)?,
                ops: clear,
            },
            RenderPassColorAttachment {
                view: view(Target::Normal)?,
                ops: clear,
            },
            RenderPassColorAttachment {
                view: view(Target::LinearDepth)?,
                ops: clear,
            },
        ];

        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(TILED_SHADING_PASS),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: view(Target::Depth)?,
                depth_ops: Some(Operations::load()),
            }),
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, frame.bind_group(), &[]);
        pass.set_bind_group(1, lights, &[]);
        pass.set_bind_group(2, empty, &[]);
        pass.set_bind_group(SHADOW_GROUP, shadow_group, &[]);
        scene.draw_casters(pass.as_mut());
        Ok(())
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        let gpu = std::mem::take(&mut self.gpu);
        for group in [gpu.lights, gpu.empty].into_iter().flatten() {
            let _ = device.destroy_bind_group(group);
        }
        release_pipelines(device, [gpu.pipeline], [gpu.layout]);
    }

    fn build(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let layouts = deps.layouts;
        let layout = deps.pipeline_layout(
            "tiled shading",
            &[layouts.frame, layouts.tiled_lights, layouts.empty, layouts.shadow],
        )?;
        self.gpu.layout = Some(layout);
        self.gpu.lights_layout = Some(layouts.tiled_lights);
        self.gpu.empty = Some(
            layouts
                .empty_bind_group(deps.device())
                .map_err(LaneError::init)?,
        );
        let targets =
            TILED_SHADING_TARGETS.map(|target| ColorTargetState::replace(target.format()));
        let pipeline = deps.with_module(ShaderId::TiledShading, |module| {
            create_render_pipeline(
                deps.device(),
                module,
                layout,
                &RenderPipelineSpec {
                    label: "tiled shading",
                    vertex_entry: "vs_main",
                    fragment_entry: Some("fs_main"),
                    mesh_vertices: true,
                    targets: &targets,
                    cull_mode: None,
                    depth: Some(DepthStencilState::depth32(false, CompareFunction::LessEqual)),
                },
            )
        })?;
        self.gpu.pipeline = Some(pipeline);
        Ok(())
    }
}

impl Lane for TiledShadingLane {
    fn strategy_name(&self) -> &'static str {
        "TiledShading"
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
        self.gpu.pipeline.is_some()
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
        culler: TileCuller,
        lane: TiledShadingLane,
    }

    fn fixture() -> Fixture {
        let rig = TestRig::new();
        let mut shadows = ShadowSystem::new(ShadowSettings::default());
        shadows.on_initialize(&rig.ctx).unwrap();
        let mut lights = LightBuffer::new();
        lights.upload(&rig.device, &[GpuLight::default(); 8]).unwrap();
        let mut culler = TileCuller::default();
        culler.ensure(&rig.device, 64, 64).unwrap();
        let mut lane = TiledShadingLane::new();
        lane.on_initialize(&rig.ctx).unwrap();
        lane.prepare(&rig.device, &culler, &lights).unwrap();
        Fixture {
            rig,
            shadows,
            lights,
            culler,
            lane,
        }
    }

    #[test]
    fn test_writes_light_and_surfaces_over_prepass_depth() {
        let f = fixture();
        let mut encoder = f.rig.device.create_command_encoder(None);
        f.lane
            .encode(
                encoder.as_mut(),
                &f.rig.frame,
                &f.rig.scene,
                &f.rig.targets,
                f.shadows.sampling_group().unwrap(),
            )
            .unwrap();
        drop(encoder);

        let commands = f.rig.device.commands();
        let begin = commands
            .iter()
            .find(|c| matches!(c, RecordedCommand::BeginRenderPass { .. }))
            .unwrap();
        let colors: Vec<_> = TILED_SHADING_TARGETS
            .iter()
            .map(|target| f.rig.targets.view(*target).unwrap())
            .collect();
        assert_eq!(
            *begin,
            RecordedCommand::BeginRenderPass {
                label: TILED_SHADING_PASS.into(),
                color_views: colors,
                depth_view: f.rig.targets.view(Target::Depth),
            }
        );
        let groups: Vec<u32> = commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::SetBindGroup { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(groups, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_light_group_follows_tile_reallocation() {
        let mut f = fixture();
        let first = f.lane.gpu.lights;
        f.lane.prepare(&f.rig.device, &f.culler, &f.lights).unwrap();
        assert_eq!(f.lane.gpu.lights, first);

        f.culler.ensure(&f.rig.device, 128, 64).unwrap();
        f.lane.prepare(&f.rig.device, &f.culler, &f.lights).unwrap();
        assert_ne!(f.lane.gpu.lights, first);
    }

    #[test]
    fn test_attachment_formats_match_targets() {
        let rig = TestRig::new();
        assert!(rig.targets.validate(TILED_SHADING_PASS, &attachments()).is_ok());
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut f = fixture();
        f.lane.on_shutdown(&f.rig.ctx);
        f.shadows.on_shutdown(&f.rig.ctx);
        f.culler.release(&f.rig.device);
        f.lights.release(&f.rig.device);
        f.rig.release();
        assert_eq!(f.rig.device.live_resource_count(), 0);
    }
}
