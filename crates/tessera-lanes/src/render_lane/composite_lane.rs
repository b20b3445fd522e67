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

//! Resolve of the light accumulation to the backbuffer, with debug views.

use std::sync::Arc;

use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::renderer::{
    BindGroupLayoutId, ColorTargetState, CommandEncoder, FrameTarget, GraphicsDevice, Operations,
    PipelineLayoutId, RenderPassColorAttachment, RenderPassDescriptor, RenderPipelineId,
    TextureFormat,
};

use super::frame_uniforms::FrameUniformBuffer;
use super::pipeline::{create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec};
use super::targets::{RenderTargets, Target, TargetBinding};
use super::BACKGROUND_COLOR;
use crate::shaders::ShaderId;

pub const COMPOSITE_PASS: &str = "composite";

/// Inputs of the composite shader, in binding order.
const COMPOSITE_INPUTS: [Target; 4] = [
    Target::Light,
    Target::Albedo,
    Target::Normal,
    Target::LinearDepth,
];

#[derive(Debug, Default)]
struct CompositeGpuResources {
    layout: Option<PipelineLayoutId>,
    pipeline: Option<RenderPipelineId>,
    inputs_layout: Option<BindGroupLayoutId>,
    inputs: TargetBinding,
}

/// Tonemaps the accumulated light (or shows an intermediate surface) into
/// the backbuffer. Pixels with no geometry get the background colour.
#[derive(Debug, Default)]
pub struct CompositeLane {
    gpu: CompositeGpuResources,
    output_format: Option<TextureFormat>,
}

impl CompositeLane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the input bind group after the targets were reallocated.
    pub fn prepare(
        &mut self,
        device: &dyn GraphicsDevice,
        targets: &RenderTargets,
    ) -> Result<(), LaneError> {
        let layout = self.gpu.inputs_layout.ok_or(LaneError::NotInitialized)?;
        self.gpu
            .inputs
            .refresh(device, layout, "composite inputs", targets, &COMPOSITE_INPUTS)?;
        Ok(())
    }

    pub fn encode(
        &self,
        encoder: &mut dyn CommandEncoder,
        frame: &FrameUniformBuffer,
        output: &FrameTarget,
    ) -> Result<(), LaneError> {
        let (Some(pipeline), Some(inputs)) = (self.gpu.pipeline, self.gpu.inputs.get()) else {
            return Err(LaneError::NotInitialized);
        };
        if self.output_format != Some(output.format) {
            log::error!(
                "CompositeLane: backbuffer is {:?}, pipeline writes {:?}",
                output.format,
                self.output_format
            );
        }
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(COMPOSITE_PASS),
            color_attachments: &[RenderPassColorAttachment {
                view: output.color,
                ops: Operations::clear(BACKGROUND_COLOR),
            }],
            depth_stencil_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, frame.bind_group(), &[]);
        pass.set_bind_group(1, inputs, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        let mut gpu = std::mem::take(&mut self.gpu);
        gpu.inputs.release(device);
        release_pipelines(device, [gpu.pipeline], [gpu.layout]);
    }
}

impl Lane for CompositeLane {
    fn strategy_name(&self) -> &'static str {
        "Composite"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Composite
    }

    fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError> {
        let deps = LaneDeps::from_context(ctx)?;
        let format = deps
            .device
            .surface_format()
            .unwrap_or(TextureFormat::Bgra8UnormSrgb);
        let layout = deps.pipeline_layout(
            "composite",
            &[deps.layouts.frame, deps.layouts.composite],
        )?;
        self.gpu.layout = Some(layout);
        self.gpu.inputs_layout = Some(deps.layouts.composite);
        let targets = [ColorTargetState::replace(format)];
        let pipeline = deps.with_module(ShaderId::Composite, |module| {
            create_render_pipeline(
                deps.device(),
                module,
                layout,
                &RenderPipelineSpec {
                    label: "composite",
                    vertex_entry: "vs_fullscreen",
                    fragment_entry: Some("fs_main"),
                    mesh_vertices: false,
                    targets: &targets,
                    cull_mode: None,
                    depth: None,
                },
            )
        });
        match pipeline {
            Ok(pipeline) => {
                self.gpu.pipeline = Some(pipeline);
                self.output_format = Some(format);
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
        self.gpu.pipeline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::TestRig;
    use tessera_core::renderer::testing::RecordedCommand;
    use tessera_core::renderer::BindGroupId;

    fn bind_group_at(rig: &TestRig, index: u32) -> Option<BindGroupId> {
        rig.device.commands().iter().rev().find_map(|c| match c {
            RecordedCommand::SetBindGroup {
                index: i, bind_group, ..
            } if *i == index => Some(*bind_group),
            _ => None,
        })
    }

    #[test]
    fn test_fullscreen_triangle_into_backbuffer() {
        let rig = TestRig::new();
        let mut lane = CompositeLane::new();
        lane.on_initialize(&rig.ctx).unwrap();
        lane.prepare(&rig.device, &rig.targets).unwrap();

        let mut encoder = rig.device.create_command_encoder(None);
        lane.encode(encoder.as_mut(), &rig.frame, &rig.output).unwrap();
        drop(encoder);

        let commands = rig.device.commands();
        assert_eq!(
            commands[0],
            RecordedCommand::BeginRenderPass {
                label: COMPOSITE_PASS.into(),
                color_views: vec![rig.output.color],
                depth_view: None,
            }
        );
        assert!(commands.contains(&RecordedCommand::Draw {
            vertices: 0..3,
            instances: 0..1
        }));
    }

    #[test]
    fn test_inputs_rebound_after_resize_only() {
        let mut rig = TestRig::new();
        let mut lane = CompositeLane::new();
        lane.on_initialize(&rig.ctx).unwrap();
        lane.prepare(&rig.device, &rig.targets).unwrap();
        let first = lane.gpu.inputs.get();

        lane.prepare(&rig.device, &rig.targets).unwrap();
        assert_eq!(lane.gpu.inputs.get(), first);

        rig.targets.ensure(&rig.device, 32, 32).unwrap();
        lane.prepare(&rig.device, &rig.targets).unwrap();
        assert_ne!(lane.gpu.inputs.get(), first);

        let mut encoder = rig.device.create_command_encoder(None);
        lane.encode(encoder.as_mut(), &rig.frame, &rig.output).unwrap();
        drop(encoder);
        assert_eq!(bind_group_at(&rig, 1), lane.gpu.inputs.get());
    }
}
