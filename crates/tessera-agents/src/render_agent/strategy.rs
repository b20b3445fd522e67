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


//! The per-path frame strategies.
//!
//! One strategy is chosen from the render path at startup and drives every
//! frame afterwards, so the frame loop never branches on the path itself.

use tessera_core::config::RendererConfig;
use tessera_core::lane::LaneContext;
use tessera_core::renderer::{CommandEncoder, FrameTarget, PassList, RenderPath};

use super::deferred::DeferredStrategy;
use super::error::AgentError;
use super::resources::FrameView;
use super::simple_forward::SimpleForwardStrategy;
use super::tiled::TiledComputeStrategy;

/// Builds, resizes and renders one render path.
pub trait RenderStrategy: Send {
    fn path(&self) -> RenderPath;

    /// Creates every pipeline and the scene resources of the path.
    ///
    /// On error the strategy stays unready and releases nothing; whatever was
    /// built is given back by [`shutdown`](Self::shutdown).
    fn build_scene(&mut self, ctx: &LaneContext) -> Result<(), AgentError>;

    /// Re-derives every size-dependent resource. The size is remembered and
    /// applied by [`build_scene`](Self::build_scene) if the scene is not
    /// built yet.
    fn handle_resize(&mut self, width: u32, height: u32) -> Result<(), AgentError>;

    /// Records one frame into `encoder` and returns the pass list it followed.
    fn render_frame(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        view: &FrameView,
        output: &FrameTarget,
    ) -> Result<PassList, AgentError>;

    /// `false` until the scene is built, and forever after a failed build.
    fn is_ready(&self) -> bool;

    fn shutdown(&mut self, ctx: &LaneContext);
}

/// The strategy implementing `path`, configured from `config`.
pub fn strategy_for(path: RenderPath, config: &RendererConfig) -> Box<dyn RenderStrategy> {
    match path {
        RenderPath::SimpleForward => Box::new(SimpleForwardStrategy::new()),
        RenderPath::Deferred41 => Box::new(DeferredStrategy::new(&config.shadows)),
        RenderPath::TiledCompute => {
            Box::new(TiledComputeStrategy::new(config.tiled, &config.shadows))
        }
    }
}
