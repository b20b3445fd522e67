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

//! Depth-only rasterisation feeding the tile depth bounds.

use std::sync::Arc;

use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::renderer::{
    CommandEncoder, CompareFunction, DepthStencilState, GraphicsDevice, Operations,
    PipelineLayoutId, RenderPassDepthStencilAttachment, RenderPassDescriptor, RenderPipelineId,
};

use super::frame_uniforms::FrameUniformBuffer;
use super::pipeline::{create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec};
use super::scene::SceneMeshes;
use super::targets::{RenderTargets, Target};
use crate::shaders::ShaderId;

pub const DEPTH_PREPASS_PASS: &str = "depth_prepass";

/// Writes scene depth for the whole scene, ground included, so that tiles
/// covering only the ground still get a depth range.
#[derive(Debug, Default)]
pub struct DepthPrepassLane {
    layout: Option<PipelineLayoutId>,
    pipeline: Option<RenderPipelineId>,
}

impl DepthPrepassLane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(
        &self,
        encoder: &mut dyn CommandEncoder,
        frame: &FrameUniformBuffer,
        scene: &SceneMeshes,
        targets: &RenderTargets,
    ) -> Result<(), LaneError> {
        let pipeline = self.pipeline.ok_or(LaneError::NotInitialized)?;
        let depth = targets.view(Target::Depth).ok_or(LaneError::NotInitialized)?;
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(DEPTH_PREPASS_PASS),
            color_attachments: &[],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(Operations::clear(1.0)),
            }),
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, frame.bind_group(), &[]);
        scene.draw_casters(pass.as_mut());
        Ok(())
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        release_pipelines(device, [self.pipeline.take()], [self.layout.take()]);
    }
}

impl Lane for DepthPrepassLane {
    fn strategy_name(&self) -> &'static str {
        "DepthPrepass"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Geometry
    }

    fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError> {
        let deps = LaneDeps::from_context(ctx)?;
        let layout = deps.pipeline_layout("depth prepass", &[deps.layouts.frame])?;
        self.layout = Some(layout);
        let pipeline = deps.with_module(ShaderId::DepthPrepass, |module| {
            create_render_pipeline(
                deps.device(),
                module,
                layout,
                &RenderPipelineSpec {
                    label: "depth prepass",
                    vertex_entry: "vs_main",
                    fragment_entry: None,
                    mesh_vertices: true,
                    targets: &[],
                    cull_mode: None,
                    depth: Some(DepthStencilState::depth32(true, CompareFunction::Less)),
                },
            )
        });
        match pipeline {
            Ok(pipeline) => {
                self.pipeline = Some(pipeline);
                Ok(())
            }
            Err(err) => {
                self.release(deps.device());
                Err(err)
            }
        }
    }

    fn on_shutdown(&mut self, ctx: &LaneContext) {
        if let Some(device) = ctx.get::<Arc<dyn GraphicsDevice>>() {
            self.release(device.as_ref());
        }
    }

    fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::TestRig;
    use tessera_core::renderer::testing::RecordedCommand;

    #[test]
    fn test_depth_only_pass_draws_every_caster() {
        let rig = TestRig::new();
        let mut lane = DepthPrepassLane::new();
        lane.on_initialize(&rig.ctx).unwrap();

        let mut encoder = rig.device.create_command_encoder(None);
        lane.encode(encoder.as_mut(), &rig.frame, &rig.scene, &rig.targets)
            .unwrap();
        drop(encoder);

        let commands = rig.device.commands();
        assert_eq!(
            commands[0],
            RecordedCommand::BeginRenderPass {
                label: DEPTH_PREPASS_PASS.into(),
                color_views: vec![],
                depth_view: rig.targets.view(Target::Depth),
            }
        );
        let draws = commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::DrawIndexed { .. }))
            .count();
        assert_eq!(draws, 3);
    }

    #[test]
    fn test_encode_before_init_fails() {
        let rig = TestRig::new();
        let lane = DepthPrepassLane::new();
        let mut encoder = rig.device.create_command_encoder(None);
        assert!(matches!(
            lane.encode(encoder.as_mut(), &rig.frame, &rig.scene, &rig.targets),
            Err(LaneError::NotInitialized)
        ));
    }
}
