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

//! G-buffer fill for the deferred path.

use std::sync::Arc;

use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::math::LinearRgba;
use tessera_core::renderer::{
    ColorTargetState, CommandEncoder, CompareFunction, DepthStencilState, GraphicsDevice,
    Operations, PipelineLayoutId, RenderPassColorAttachment, RenderPassDepthStencilAttachment,
    RenderPassDescriptor, RenderPipelineId, TextureFormat,
};

use super::frame_uniforms::FrameUniformBuffer;
use super::pipeline::{create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec};
use super::scene::SceneMeshes;
use super::targets::{RenderTargets, Target};
use crate::shaders::ShaderId;

pub const GBUFFER_PASS: &str = "gbuffer";

/// Surfaces written by the G-buffer pass, in attachment order.
pub const GBUFFER_TARGETS: [Target; 3] = [Target::Albedo, Target::Normal, Target::LinearDepth];

fn attachments() -> [(Target, TextureFormat); 3] {
    GBUFFER_TARGETS.map(|target| (target, target.format()))
}

#[derive(Debug, Default)]
struct GBufferGpuResources {
    layout: Option<PipelineLayoutId>,
    ground_pipeline: Option<RenderPipelineId>,
    opaque_pipeline: Option<RenderPipelineId>,
}

/// Rasterises albedo/metallic, normal/roughness and linear depth.
///
/// The ground is drawn first without writing depth; the walls then
/// overwrite it where they cover it.
#[derive(Debug, Default)]
pub struct GBufferLane {
    gpu: GBufferGpuResources,
}

impl GBufferLane {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let layout = deps.pipeline_layout("gbuffer", &[deps.layouts.frame])?;
        self.gpu.layout = Some(layout);
        let targets = GBUFFER_TARGETS.map(|target| ColorTargetState::replace(target.format()));
        let (ground, opaque) = deps.with_module(ShaderId::GBuffer, |module| {
            let mut spec = RenderPipelineSpec {
                label: "gbuffer ground",
                vertex_entry: "vs_main",
                fragment_entry: Some("fs_main"),
                mesh_vertices: true,
                targets: &targets,
                cull_mode: None,
                depth: Some(DepthStencilState::depth32(false, CompareFunction::LessEqual)),
            };
            let ground = create_render_pipeline(deps.device(), module, layout, &spec)?;
            spec.label = "gbuffer opaque";
            spec.depth = Some(DepthStencilState::depth32(true, CompareFunction::Less));
            create_render_pipeline(deps.device(), module, layout, &spec)
                .map(|opaque| (ground, opaque))
                .inspect_err(|_| {
                    let _ = deps.device.destroy_render_pipeline(ground);
                })
        })?;
        self.gpu.ground_pipeline = Some(ground);
        self.gpu.opaque_pipeline = Some(opaque);
        Ok(())
    }

    pub fn encode(
        &self,
        encoder: &mut dyn CommandEncoder,
        frame: &FrameUniformBuffer,
        scene: &SceneMeshes,
        targets: &RenderTargets,
    ) -> Result<(), LaneError> {
        let (Some(ground), Some(opaque)) = (self.gpu.ground_pipeline, self.gpu.opaque_pipeline)
        else {
            return Err(LaneError::NotInitialized);
        };
        targets.log_if_incomplete(GBUFFER_PASS, &attachments());
        let view = |target| targets.view(target).ok_or(LaneError::NotInitialized);
        let clear = Operations::clear(LinearRgba::TRANSPARENT);
        let color_attachments = [
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
            label: Some(GBUFFER_PASS),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: view(Target::Depth)?,
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

impl Lane for GBufferLane {
    fn strategy_name(&self) -> &'static str {
        "GBuffer"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Geometry
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
        self.gpu.ground_pipeline.is_some() && self.gpu.opaque_pipeline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::TestRig;
    use tessera_core::renderer::testing::RecordedCommand;

    #[test]
    fn test_writes_three_surfaces_and_depth() {
        let rig = TestRig::new();
        let mut lane = GBufferLane::new();
        lane.on_initialize(&rig.ctx).unwrap();

        let mut encoder = rig.device.create_command_encoder(None);
        lane.encode(encoder.as_mut(), &rig.frame, &rig.scene, &rig.targets)
            .unwrap();
        drop(encoder);

        let expected_colors: Vec<_> = GBUFFER_TARGETS
            .iter()
            .map(|target| rig.targets.view(*target).unwrap())
            .collect();
        assert_eq!(
            rig.device.commands()[0],
            RecordedCommand::BeginRenderPass {
                label: GBUFFER_PASS.into(),
                color_views: expected_colors,
                depth_view: rig.targets.view(Target::Depth),
            }
        );
    }

    #[test]
    fn test_attachment_formats_match_targets() {
        let rig = TestRig::new();
        assert!(rig.targets.validate(GBUFFER_PASS, &attachments()).is_ok());
    }
}
