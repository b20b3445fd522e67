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

//! Single-pass forward shading with the sun only.

use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::renderer::{
    ColorTargetState, CommandEncoder, CompareFunction, DepthStencilState, FrameTarget,
    GraphicsDevice, Operations, PipelineLayoutId, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, RenderPipelineId, TextureFormat,
};

use super::frame_uniforms::FrameUniformBuffer;
use super::pipeline::{create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec};
use super::scene::SceneMeshes;
use super::targets::{RenderTargets, Target};
use super::BACKGROUND_COLOR;
use crate::shaders::ShaderId;

pub const FORWARD_PASS: &str = "forward";

#[derive(Debug, Default)]
struct ForwardGpuResources {
    layout: Option<PipelineLayoutId>,
    ground_pipeline: Option<RenderPipelineId>,
    opaque_pipeline: Option<RenderPipelineId>,
}

/// Draws the scene straight into the backbuffer, lit by the directional
/// light alone.
#[derive(Debug, Default)]
pub struct ForwardLane {
    gpu: ForwardGpuResources,
    output_format: Option<TextureFormat>,
}

impl ForwardLane {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let format = deps
            .device
            .surface_format()
            .unwrap_or(TextureFormat::Bgra8UnormSrgb);
        let layout = deps.pipeline_layout("forward", &[deps.layouts.frame])?;
        self.gpu.layout = Some(layout);
        let targets = [ColorTargetState::replace(format)];
        let (ground, opaque) = deps.with_module(ShaderId::Forward, |module| {
            let mut spec = RenderPipelineSpec {
                label: "forward ground",
                vertex_entry: "vs_main",
                fragment_entry: Some("fs_main"),
                mesh_vertices: true,
                targets: &targets,
                cull_mode: None,
                depth: Some(DepthStencilState::depth32(false, CompareFunction::LessEqual)),
            };
            let ground = create_render_pipeline(deps.device(), module, layout, &spec)?;
            spec.label = "forward opaque";
            spec.depth = Some(DepthStencilState::depth32(true, CompareFunction::Less));
            match create_render_pipeline(deps.device(), module, layout, &spec) {
                Ok(opaque) => Ok((ground, opaque)),
                Err(err) => {
                    let _ = deps.device.destroy_render_pipeline(ground);
                    Err(err)
                }
            }
        })?;
        self.gpu.ground_pipeline = Some(ground);
        self.gpu.opaque_pipeline = Some(opaque);
        self.output_format = Some(format);
        Ok(())
    }

    pub fn encode(
        &self,
        encoder: &mut dyn CommandEncoder,
        frame: &FrameUniformBuffer,
        scene: &SceneMeshes,
        targets: &RenderTargets,
        output: &FrameTarget,
    ) -> Result<(), LaneError> {
        let (Some(ground), Some(opaque)) = (self.gpu.ground_pipeline, self.gpu.opaque_pipeline)
        else {
            return Err(LaneError::NotInitialized);
        };
        let depth = targets.view(Target::Depth).ok_or(LaneError::NotInitialized)?;
        if self.output_format != Some(output.format) {
            log::error!(
                "ForwardLane: backbuffer is {:?}, pipeline writes {:?}",
                output.format,
                self.output_format
            );
        }

        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(FORWARD_PASS),
            color_attachments: &[RenderPassColorAttachment {
                view: output.color,
                ops: Operations::clear(BACKGROUND_COLOR),
            }],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(Operations::clear(1.0)),
            }),
        });
        pass.set_bind_group(0, frame.bind_group(), &[]);
        pass.set_pipeline(ground);
        scene.draw_ground(pass.as_mut());
        pass.set_pipeline(opaque);
        scene.draw_opaque(pass.as_mut());
        Ok(())
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        let gpu = std::mem::take(&mut self.gpu);
        release_pipelines(device, [gpu.ground_pipeline, gpu.opaque_pipeline], [gpu.layout]);
    }
}

impl Lane for ForwardLane {
    fn strategy_name(&self) -> &'static str {
        "Forward"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Geometry
    }

    fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError> {
        let deps = LaneDeps::from_context(ctx)?;
        let result = self.build(&deps);
        if result.is_err() {
            self.release(deps.device());
        }
        result
    }

    fn on_shutdown(&mut self, ctx: &LaneContext) {
        if let Some(device) = ctx.get::<std::sync::Arc<dyn GraphicsDevice>>() {
            self.release(device.as_ref());
        }
    }

    fn is_initialized(&self) -> bool {
        self.gpu.ground_pipeline.is_some() && self.gpu.opaque_pipeline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::TestRig;
    use tessera_core::renderer::testing::RecordedCommand;

    #[test]
    fn test_ground_drawn_before_walls() {
        let mut rig = TestRig::new();
        let mut lane = ForwardLane::new();
        lane.on_initialize(&rig.ctx).unwrap();
        assert!(lane.is_initialized());

        let mut encoder = rig.device.create_command_encoder(None);
        lane.encode(encoder.as_mut(), &rig.frame, &rig.scene, &rig.targets, &rig.output)
            .unwrap();
        drop(encoder);

        assert_eq!(rig.device.pass_labels(), vec![FORWARD_PASS]);
        let draws = rig
            .device
            .commands()
            .iter()
            .filter(|c| matches!(c, RecordedCommand::DrawIndexed { .. }))
            .count();
        assert_eq!(draws, 3);

        lane.on_shutdown(&rig.ctx);
        assert!(!lane.is_initialized());
        rig.release();
        assert_eq!(rig.device.live_resource_count(), 0);
    }

    #[test]
    fn test_shader_failure_leaves_nothing_behind() {
        let rig = TestRig::new();
        rig.device.fail_shader("forward");
        let before = rig.device.live_resource_count();
        let mut lane = ForwardLane::new();
        assert!(matches!(
            lane.on_initialize(&rig.ctx),
            Err(LaneError::InitializationFailed(_))
        ));
        assert!(!lane.is_initialized());
        assert_eq!(rig.device.live_resource_count(), before);
    }
}
