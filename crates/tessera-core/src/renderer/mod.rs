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

//! Backend-agnostic rendering contracts.
//!
//! This module defines the common language of the renderer: the abstract
//! [`GraphicsDevice`] / [`CommandEncoder`] / [`RenderSystem`] traits, the
//! resource descriptors they consume, and the CPU-side layouts of the data
//! the shaders read. The `wgpu` implementation lives in `tessera-infra`;
//! `tessera-lanes` and `tessera-agents` only ever talk to these traits.

pub mod api;
pub mod capabilities;
pub mod debug_view;
pub mod error;
pub mod frame_graph;
pub mod light;
pub mod mesh;
pub mod path;
pub mod shadow;
pub mod tiled;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use self::api::*;
pub use self::capabilities::{AdapterInfo, ApiVersion, GpuCapabilities, GraphicsBackendType};
pub use self::debug_view::DebugView;
pub use self::error::{PipelineError, RenderError, ResourceError, ShaderError};
pub use self::frame_graph::{FrameHazard, FrameSlot, PassKind, PassList, PassNode, PlannedStep};
pub use self::light::{DirectionalLight, GpuLight, LightDesc, LightKind, ShadowCast};
pub use self::path::{select_render_path, PathDecision, RenderPath, RenderPathSelector};
pub use self::traits::{
    CommandEncoder, ComputePass, FrameTarget, GraphicsDevice, RenderPass, RenderSystem,
};
