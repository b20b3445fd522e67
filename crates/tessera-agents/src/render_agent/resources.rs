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


//! Per-path GPU state shared by the strategies.

use std::sync::Arc;

use tessera_core::lane::{Lane, LaneContext, LaneError};
use tessera_core::math::Mat4;
use tessera_core::renderer::light::LightRanges;
use tessera_core::renderer::shadow::ShadowSettings;
use tessera_core::renderer::tiled::TileGrid;
use tessera_core::renderer::{
    BindGroupId, CommandEncoder, DebugView, DirectionalLight, FrameTarget,
    GraphicsDevice, TextureFormat,
};
use tessera_lanes::light_lane::LightBuffer;
use tessera_lanes::render_lane::{
    FrameInputs, FrameUniformBuffer, FrameUniforms, LaneDeps, RenderTargets, SceneMeshes,
    Target,
};
use tessera_lanes::shadow_lane::{
    ShadowPasses, SHADOW_DIRECTIONAL_PASS, SHADOW_POINT_PASS, SHADOW_SPOT_PASS,
};
use tessera_lanes::{LightPacker, LightRegistry, ShadowSystem};

use super::error::AgentError;
use super::passes::unknown_pass;

/// Camera and timing inputs of one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView {
    pub view: Mat4,
    pub projection: Mat4,
    pub near: f32,
    pub far: f32,
    pub width: u32,
    pub height: u32,
    /// Seconds since the agent started, drives the light animation.
    pub time: f32,
    pub debug_view: DebugView,
    pub sun: DirectionalLight,
}

fn is_srgb(format: TextureFormat) -> bool {
    matches!(
        format,
        TextureFormat::Bgra8UnormSrgb | TextureFormat::Rgba8UnormSrgb
    )
}

/// Runs `on_initialize` and tags a failure with the lane's name.
pub fn init_lane(lane: &mut dyn Lane, ctx: &LaneContext) -> Result<(), AgentError> {
    lane.on_initialize(ctx).map_err(|source| {
        log::error!(
            "{} lane '{}' failed to initialize: {source}",
            lane.lane_kind(),
            lane.strategy_name()
        );
        AgentError::LaneInit {
            lane: lane.strategy_name(),
            source,
        }
    })
}

/// Frame uniforms, scene meshes and screen targets. Every path owns one.
#[derive(Debug)]
pub struct SceneResources {
    device: Arc<dyn GraphicsDevice>,
    pub frame: FrameUniformBuffer,
    pub scene: SceneMeshes,
    pub targets: RenderTargets,
}

impl SceneResources {
    pub fn create(ctx: &LaneContext) -> Result<Self, AgentError> {
        Self::with_targets(ctx, RenderTargets::new())
    }

    /// Depth is the only screen target; color goes straight to the backbuffer.
    pub fn create_forward(ctx: &LaneContext) -> Result<Self, AgentError> {
        Self::with_targets(ctx, RenderTargets::with_targets(&Target::DEPTH_ONLY))
    }

    fn with_targets(ctx: &LaneContext, targets: RenderTargets) -> Result<Self, AgentError> {
        let deps = LaneDeps::from_context(ctx)?;
        let device = Arc::clone(deps.device);
        let frame = FrameUniformBuffer::new(device.as_ref(), &deps.layouts)?;
        let scene = SceneMeshes::upload(device.as_ref())
            .inspect_err(|_| frame.release(device.as_ref()))?;
        Ok(Self {
            device,
            frame,
            scene,
            targets,
        })
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// Returns `true` when the targets were reallocated.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool, AgentError> {
        Ok(self.targets.ensure(self.device.as_ref(), width, height)?)
    }

    pub fn write_uniforms(
        &self,
        view: &FrameView,
        debug_view: DebugView,
        lights: LightRanges,
        tiles: Option<(TileGrid, u32)>,
        output: &FrameTarget,
    ) -> Result<(), AgentError> {
        let uniforms = FrameUniforms::from_inputs(&FrameInputs {
            view: view.view,
            projection: view.projection,
            near: view.near,
            far: view.far,
            width: view.width,
            height: view.height,
            sun: &view.sun,
            debug_view,
            lights,
            tiles,
            output_srgb: is_srgb(output.format),
        });
        Ok(self.frame.write(self.device.as_ref(), &uniforms)?)
    }

    pub fn release(mut self) {
        let device = self.device.as_ref();
        self.scene.release(device);
        self.targets.release(device);
        self.frame.release(device);
    }
}

/// What the light update of one frame produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct LitFrame {
    pub ranges: LightRanges,
    pub camera_inside: bool,
    pub shadow_passes: ShadowPasses,
}

/// The animated point and spot lights with their shadow maps.
#[derive(Debug)]
pub struct DynamicLights {
    registry: LightRegistry,
    buffer: LightBuffer,
    shadows: ShadowSystem,
}

impl DynamicLights {
    pub fn new(settings: &ShadowSettings) -> Self {
        Self {
            registry: LightRegistry::build_default(settings),
            buffer: LightBuffer::new(),
            shadows: ShadowSystem::new(*settings),
        }
    }

    /// A shadow shader failure leaves the lights working without shadows.
    /// Only a failure to create the shadow resources themselves is returned.
    pub fn init(&mut self, ctx: &LaneContext) -> Result<(), AgentError> {
        match self.shadows.on_initialize(ctx) {
            Ok(()) => Ok(()),
            Err(err) if self.shadows.is_initialized() => {
                log::warn!("DynamicLights: continuing without shadows: {err}");
                Ok(())
            }
            Err(source) => Err(AgentError::LaneInit {
                lane: self.shadows.strategy_name(),
                source,
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.shadows.is_initialized()
    }

    pub fn shadows(&self) -> &ShadowSystem {
        &self.shadows
    }

    pub fn buffer(&self) -> &LightBuffer {
        &self.buffer
    }

    /// Opens the shadow frame, animates and packs the lights, uploads them
    /// and schedules the shadow passes.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        view: &FrameView,
    ) -> Result<LitFrame, AgentError> {
        self.shadows.begin_frame();
        self.shadows.update_directional(
            view.view,
            view.projection,
            view.sun.direction,
            view.near,
            view.far,
        );
        let packed = LightPacker::pack(&self.registry, view.view, view.time, &mut self.shadows);
        self.buffer.upload(device, &packed.lights)?;
        let shadow_passes = self.shadows.prepare(device)?;
        Ok(LitFrame {
            ranges: packed.ranges,
            camera_inside: packed.camera_inside_volume,
            shadow_passes,
        })
    }

    pub fn shadow_group(&self) -> Result<BindGroupId, LaneError> {
        self.shadows.sampling_group().ok_or(LaneError::NotInitialized)
    }

    /// Records the shadow pass called `pass`.
    pub fn encode_shadow_pass(
        &self,
        pass: &str,
        encoder: &mut dyn CommandEncoder,
        scene: &SceneMeshes,
    ) -> Result<(), LaneError> {
        match pass {
            SHADOW_DIRECTIONAL_PASS => self.shadows.encode_directional(encoder, scene),
            SHADOW_SPOT_PASS => self.shadows.encode_spot(encoder, scene),
            SHADOW_POINT_PASS => self.shadows.encode_point(encoder, scene),
            other => Err(unknown_pass(other)),
        }
    }

    pub fn release(&mut self, ctx: &LaneContext) {
        self.shadows.on_shutdown(ctx);
        if let Some(device) = ctx.get::<Arc<dyn GraphicsDevice>>() {
            self.buffer.release(device.as_ref());
        }
    }
}
