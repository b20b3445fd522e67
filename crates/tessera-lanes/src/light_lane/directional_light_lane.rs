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

//! Full-screen directional light and ambient over the G-buffer.

use std::sync::Arc;

use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::math::LinearRgba;
use tessera_core::renderer::{
    BindGroupId, BindGroupLayoutId, ColorTargetState, CommandEncoder, GraphicsDevice, Operations,
    PipelineLayoutId, RenderPassColorAttachment, RenderPassDescriptor, RenderPipelineId,
};

use crate::render_lane::layouts::SHADOW_GROUP;
use crate::render_lane::pipeline::{
    create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec,
};
use crate::render_lane::{FrameUniformBuffer, RenderTargets, Target, TargetBinding, GBUFFER_TARGETS};
use crate::shaders::ShaderId;

pub const DIRECTIONAL_LIGHT_PASS: &str = "directional_light";

#[derive(Debug, Default)]
struct DirectionalGpuResources {
    layout: Option<PipelineLayoutId>,
    pipeline: Option<RenderPipelineId>,
    surfaces_layout: Option<BindGroupLayoutId>,
    surfaces: TargetBinding,
    empty: Option<BindGroupId>,
}

/// Starts the light accumulation of the deferred path: clears it, then
/// writes ambient plus the shadowed sun for every covered pixel.
#[derive(Debug, Default)]
pub struct DirectionalLightLane {
    gpu: DirectionalGpuResources,
}

impl DirectionalLightLane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(
        &mut self,
        device: &dyn GraphicsDevice,
        targets: &RenderTargets,
    ) -> Result<(), LaneError> {
        let layout = self.gpu.surfaces_layout.ok_or(LaneError::NotInitialized)?;
        self.gpu
            .surfaces
            .refresh(device, layout, "directional surfaces", targets, &GBUFFER_TARGETS)?;
        Ok(())
    }

    pub fn encode(
        &self,
        encoder: &mut dyn CommandEncoder,
        frame: &FrameUniformBuffer,
        targets: &RenderTargets,
        shadow_group: BindGroupId,
    ) -> Result<(), LaneError> {
        let (Some(pipeline), Some(surfaces), Some(empty)) =
            (self.gpu.pipeline, self.gpu.surfaces.get(), self.gpu.empty)
        else {
            return Err(LaneError::NotInitialized);
        };
        targets.log_if_incomplete(
            DIRECTIONAL_LIGHT_PASS,
            &[(Target::Light, Target::Light.format())],
        );
        let light = targets.view(Target::Light).ok_or(LaneError::NotInitialized)?;
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(DIRECTIONAL_LIGHT_PASS),
            color_attachments: &[RenderPassColorAttachment {
                view: light,
                ops: Operations::clear(LinearRgba::BLACK),
            }],
            depth_stencil_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, frame.bind_group(), &[]);
        pass.set_bind_group(1, surfaces, &[]);
        pass.set_bind_group(2, empty, &[]);
        pass.set_bind_group(SHADOW_GROUP, shadow_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        let mut gpu = std::mem::take(&mut self.gpu);
        gpu.surfaces.release(device);
        if let Some(empty) = gpu.empty {
            let _ = device.destroy_bind_group(empty);
        }
        release_pipelines(device, [gpu.pipeline], [gpu.layout]);
    }

    fn build(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let layouts = deps.layouts;
        let layout = deps.pipeline_layout(
            "directional light",
            &[layouts.frame, layouts.surfaces, layouts.empty, layouts.shadow],
        )?;
        self.gpu.layout = Some(layout);
        self.gpu.surfaces_layout = Some(layouts.surfaces);
        self.gpu.empty = Some(
            layouts
                .empty_bind_group(deps.device())
                .map_err(LaneError::init)?,
        );
        let targets = [ColorTargetState::replace(Target::Light.format())];
        let pipeline = deps.with_module(ShaderId::DeferredDirectional, |module| {
            create_render_pipeline(
                deps.device(),
                module,
                layout,
                &RenderPipelineSpec {
                    label: "directional light",
                    vertex_entry: "vs_fullscreen",
                    fragment_entry: Some("fs_main"),
                    mesh_vertices: false,
                    targets: &targets,
                    cull_mode: None,
                    depth: None,
                },
            )
        })?;
        self.gpu.pipeline = Some(pipeline);
        Ok(())
    }
}

impl Lane for DirectionalLightLane {
    fn strategy_name(&self) -> &'static str {
        "DirectionalLight"
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

    #[test]
    fn test_clears_light_and_binds_four_groups() {
        let mut rig = TestRig::new();
        let mut shadows = ShadowSystem::new(ShadowSettings::default());
        shadows.on_initialize(&rig.ctx).unwrap();
        let mut lane = DirectionalLightLane::new();
        lane.on_initialize(&rig.ctx).unwrap();
        lane.prepare(&rig.device, &rig.targets).unwrap();

        let mut encoder = rig.device.create_command_encoder(None);
        lane.encode(
            encoder.as_mut(),
            &rig.frame,
            &rig.targets,
            shadows.sampling_group().unwrap(),
        )
        .unwrap();
        drop(encoder);

        let commands = rig.device.commands();
        assert_eq!(
            commands[0],
            RecordedCommand::BeginRenderPass {
                label: DIRECTIONAL_LIGHT_PASS.into(),
                color_views: vec![rig.targets.view(Target::Light).unwrap()],
                depth_view: None,
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

        lane.on_shutdown(&rig.ctx);
        shadows.on_shutdown(&rig.ctx);
        rig.release();
        assert_eq!(rig.device.live_resource_count(), 0);
    }

    #[test]
    fn test_encode_before_prepare_fails() {
        let rig = TestRig::new();
        let mut lane = DirectionalLightLane::new();
        lane.on_initialize(&rig.ctx).unwrap();
        let mut encoder = rig.device.create_command_encoder(None);
        let result = lane.encode(
            encoder.as_mut(),
            &rig.frame,
            &rig.targets,
            BindGroupId(0),
        );
        assert!(matches!(result, Err(LaneError::NotInitialized)));
    }
}
