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
use tessera_core::renderer::light::LightRanges;
use tessera_core::renderer::{CommandEncoder, DebugView, FrameTarget, PassList, RenderPath};
use tessera_lanes::render_lane::{ForwardLane, FORWARD_PASS};

use super::error::AgentError;
use super::passes::{record_passes, simple_forward_passes, unknown_pass};
use super::resources::{init_lane, FrameView, SceneResources};
use super::strategy::RenderStrategy;

/// One forward pass lit by the directional light and the ambient term.
#[derive(Debug, Default)]
pub struct SimpleForwardStrategy {
    forward: ForwardLane,
    resources: Option<SceneResources>,
    size: (u32, u32),
}

impl SimpleForwardStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderStrategy for SimpleForwardStrategy {
    fn path(&self) -> RenderPath {
        RenderPath::SimpleForward
    }

    fn build_scene(&mut self, ctx: &LaneContext) -> Result<(), AgentError> {
        init_lane(&mut self.forward, ctx)?;
        let mut resources = SceneResources::create_forward(ctx)?;
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
            .ok_or(AgentError::SceneNotBuilt(self.path()))?;
        // Without intermediate targets every debug view shows the final image.
        resources.write_uniforms(view, DebugView::Final, LightRanges::default(), None, output)?;

        let list = simple_forward_passes();
        record_passes(&list, encoder, |pass, encoder| match pass {
            FORWARD_PASS => self.forward.encode(
                encoder,
                &resources.frame,
                &resources.scene,
                &resources.targets,
                output,
            ),
            other => Err(unknown_pass(other)),
        })?;
        Ok(list)
    }

    fn is_ready(&self) -> bool {
        self.forward.is_initialized()
            && self
                .resources
                .as_ref()
                .is_some_and(|resources| resources.targets.is_allocated())
    }

    fn shutdown(&mut self, ctx: &LaneContext) {
        self.forward.on_shutdown(ctx);
        if let Some(resources) = self.resources.take() {
            resources.release();
        }
    }
}
