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


use tessera_core::lane::{Lane, LaneContext};
use tessera_core::renderer::shadow::ShadowSettings;
use tessera_core::renderer::{CommandEncoder, FrameTarget, PassList, RenderPath};
use tessera_lanes::light_lane::{
    DirectionalLightLane, LightVolumeRenderer, DIRECTIONAL_LIGHT_PASS, LIGHT_VOLUMES_PASS,
};
use tessera_lanes::render_lane::{CompositeLane, GBufferLane, COMPOSITE_PASS, GBUFFER_PASS};

use super::error::AgentError;
use super::passes::{deferred_passes, record_passes};
use super::resources::{init_lane, DynamicLights, FrameView, SceneResources};
use super::strategy::RenderStrategy;

/// G-buffer, full-screen directional light, additive light volumes, composite.
#[derive(Debug)]
pub struct DeferredStrategy {
    gbuffer: GBufferLane,
    directional: DirectionalLightLane,
    volumes: LightVolumeRenderer,
    composite: CompositeLane,
    lights: DynamicLights,
    resources: Option<SceneResources>,
    size: (u32, u32),
}

impl DeferredStrategy {
    pub fn new(shadows: &ShadowSettings) -> Self {
        Self {
            gbuffer: GBufferLane::new(),
            directional: DirectionalLightLane::new(),
            volumes: LightVolumeRenderer::new(),
            composite: CompositeLane::new(),
            lights: DynamicLights::new(shadows),
            resources: None,
            size: (0, 0),
        }
    }

    pub fn lights(&self) -> &DynamicLights {
        &self.lights
    }
}

impl RenderStrategy for DeferredStrategy {
    fn path(&self) -> RenderPath {
        RenderPath::Deferred41
    }

    fn build_scene(&mut self, ctx: &LaneContext) -> Result<(), AgentError> {
        init_lane(&mut self.gbuffer, ctx)?;
        init_lane(&mut self.directional, ctx)?;
        init_lane(&mut self.volumes, ctx)?;
        init_lane(&mut self.composite, ctx)?;
        self.lights.init(ctx)?;

        let mut resources = SceneResources::create(ctx)?;
        let (width, height) = self.size;
        let resized = resources.resize(width, height);
        self.resources = Some(resources);
        resized.map(|_| ())
    }

    fn handle_resize(&mut self, width: u32, height: u32) -> Result<(), AgentError> {
        self.size = (width, height);
        match self.resources.as_mut() {
            Some(resources) => resources.resize(width, height).map(|_| ()),
            None => Ok(()),
        }
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
            .ok_or(AgentError::SceneNotBuilt(RenderPath::Deferred41))?;
        let device = resources.device();

        let lit = self.lights.update(device, view)?;
        resources.write_uniforms(view, view.debug_view, lit.ranges, None, output)?;
        self.directional.prepare(device, &resources.targets)?;
        self.volumes
            .prepare(device, &resources.targets, self.lights.buffer())?;
        self.composite.prepare(device, &resources.targets)?;
        let shadow_group = self.lights.shadow_group()?;

        let list = deferred_passes(lit.shadow_passes);
        record_passes(&list, encoder, |pass, encoder| match pass {
            GBUFFER_PASS => self.gbuffer.encode(
                encoder,
                &resources.frame,
                &resources.scene,
                &resources.targets,
            ),
            DIRECTIONAL_LIGHT_PASS => self.directional.encode(
                encoder,
                &resources.frame,
                &resources.targets,
                shadow_group,
            ),
            LIGHT_VOLUMES_PASS => self.volumes.encode(
                encoder,
                &resources.frame,
                &resources.targets,
                lit.ranges,
                lit.camera_inside,
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
        self.gbuffer.is_initialized()
            && self.directional.is_initialized()
            && self.volumes.is_initialized()
            && self.composite.is_initialized()
            && self.lights.is_ready()
            && self
                .resources
                .as_ref()
                .is_some_and(|resources| resources.targets.is_allocated())
    }

    fn shutdown(&mut self, ctx: &LaneContext) {
        self.gbuffer.on_shutdown(ctx);
        self.directional.on_shutdown(ctx);
        self.volumes.on_shutdown(ctx);
        self.composite.on_shutdown(ctx);
        self.lights.release(ctx);
        if let Some(resources) = self.resources.take() {
            resources.release();
        }
    }
}
