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


use tessera_core::lane::{Lane, LaneContext, LaneError};
use tessera_core::renderer::shadow::ShadowSettings;
use tessera_core::renderer::tiled::TiledConfig;
use tessera_core::renderer::{CommandEncoder, FrameTarget, PassList, RenderPath};
use tessera_lanes::render_lane::{
    CompositeLane, DepthPrepassLane, COMPOSITE_PASS, DEPTH_PREPASS_PASS,
};
use tessera_lanes::tiled_lane::{
    TiledShadingLane, TILED_SHADING_PASS, TILE_DEPTH_REDUCE_PASS, TILE_LIGHT_CULL_PASS,
};
use tessera_lanes::TileCuller;

use super::error::AgentError;
use super::passes::{record_passes, tiled_passes};
use super::resources::{init_lane, DynamicLights, FrameView, SceneResources};
use super::strategy::RenderStrategy;

/// Depth prepass, compute tile culling, tiled forward shading, composite.
#[derive(Debug)]
pub struct TiledComputeStrategy {
    prepass: DepthPrepassLane,
    culler: TileCuller,
    shading: TiledShadingLane,
    composite: CompositeLane,
    lights: DynamicLights,
    resources: Option<SceneResources>,
    size: (u32, u32),
}

impl TiledComputeStrategy {
    pub fn new(config: TiledConfig, shadows: &ShadowSettings) -> Self {
        Self {
            prepass: DepthPrepassLane::new(),
            culler: TileCuller::new(config),
            shading: TiledShadingLane::new(),
            composite: CompositeLane::new(),
            lights: DynamicLights::new(shadows),
            resources: None,
            size: (0, 0),
        }
    }

    pub fn culler(&self) -> &TileCuller {
        &self.culler
    }

    pub fn lights(&self) -> &DynamicLights {
        &self.lights
    }

    /// Screen targets first, then the tile buffers sized from them.
    fn resize_resources(&mut self, width: u32, height: u32) -> Result<(), AgentError> {
        let Some(resources) = self.resources.as_mut() else {
            return Ok(());
        };
        resources.resize(width, height)?;
        self.culler.ensure(resources.device(), width, height)?;
        Ok(())
    }
}

impl RenderStrategy for TiledComputeStrategy {
    fn path(&self) -> RenderPath {
        RenderPath::TiledCompute
    }

    fn build_scene(&mut self, ctx: &LaneContext) -> Result<(), AgentError> {
        init_lane(&mut self.prepass, ctx)?;
        init_lane(&mut self.culler, ctx)?;
        init_lane(&mut self.shading, ctx)?;
        init_lane(&mut self.composite, ctx)?;
        self.lights.init(ctx)?;

        self.resources = Some(SceneResources::create(ctx)?);
        let (width, height) = self.size;
        self.resize_resources(width, height)
    }

    fn handle_resize(&mut self, width: u32, height: u32) -> Result<(), AgentError> {
        self.size = (width, height);
        self.resize_resources(width, height)
    }

    fn render_frame(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        view: &FrameView,
        output: &FrameTarget,
    ) -> Result<PassList, AgentError> {
        let resources = self
            .resources
            .as_ref()
            .ok_or(AgentError::SceneNotBuilt(RenderPath::TiledCompute))?;
        let device = resources.device();
        let grid = self.culler.grid().ok_or(LaneError::NotInitialized)?;
        let max_lights = self.culler.config().max_lights_per_tile;

        let lit = self.lights.update(device, view)?;
        resources.write_uniforms(
            view,
            view.debug_view,
            lit.ranges,
            Some((grid, max_lights)),
            output,
        )?;
        self.culler.prepare(
            device,
            &resources.targets,
            self.lights.buffer(),
            view.projection,
            lit.ranges.total(),
        )?;
        self.shading
            .prepare(device, &self.culler, self.lights.buffer())?;
        self.composite.prepare(device, &resources.targets)?;
        let shadow_group = self.lights.shadow_group()?;

        let list = tiled_passes(lit.shadow_passes);
        record_passes(&list, encoder, |pass, encoder| match pass {
            DEPTH_PREPASS_PASS => self.prepass.encode(
                encoder,
                &resources.frame,
                &resources.scene,
                &resources.targets,
            ),
            TILE_DEPTH_REDUCE_PASS => self.culler.encode_depth_reduce(encoder),
            TILE_LIGHT_CULL_PASS => self.culler.encode_light_cull(encoder),
            TILED_SHADING_PASS => self.shading.encode(
                encoder,
                &resources.frame,
                &resources.scene,
                &resources.targets,
                shadow_group,
            ),
            COMPOSITE_PASS => self.composite.encode(encoder, &resources.frame, output),
            shadow => self
                .lights
                .encode_shadow_pass(shadow, encoder, &resources.scene),
        })?;
        Ok(list)
    }

    fn is_ready(&self) -> bool {
        self.prepass.is_initialized()
            && self.culler.is_initialized()
            && self.shading.is_initialized()
            && self.composite.is_initialized()
            && self.lights.is_ready()
            && self.culler.grid().is_some()
            && self
                .resources
                .as_ref()
                .is_some_and(|resources| resources.targets.is_allocated())
    }

    fn shutdown(&mut self, ctx: &LaneContext) {
        self.prepass.on_shutdown(ctx);
        self.culler.on_shutdown(ctx);
        self.shading.on_shutdown(ctx);
        self.composite.on_shutdown(ctx);
        self.lights.release(ctx);
        if let Some(resources) = self.resources.take() {
            resources.release();
        }
    }
}
