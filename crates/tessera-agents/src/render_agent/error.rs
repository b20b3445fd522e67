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


use tessera_core::lane::LaneError;
use tessera_core::renderer::ResourceError;
use tessera_lanes::render_lane::SceneError;
use thiserror::Error;

/// Failures surfaced by the render agent and its path strategies.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("GPU resource error: {0}")]
    Resource(#[from] ResourceError),
    #[error("Scene setup failed: {0}")]
    Scene(#[from] SceneError),
    #[error("Lane '{lane}' failed to initialize: {source}")]
    LaneInit {
        lane: &'static str,
        #[source]
        source: LaneError,
    },
    #[error("Pass '{pass}' failed: {source}")]
    Pass {
        pass: &'static str,
        #[source]
        source: LaneError,
    },
    #[error(transparent)]
    Lane(#[from] LaneError),
    #[error("The scene of the {0} path was never built")]
    SceneNotBuilt(tessera_core::renderer::RenderPath),
}
