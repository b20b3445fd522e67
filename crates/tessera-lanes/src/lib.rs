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


//! # Tessera Lanes
//!
//! The GPU passes of the renderer. Each lane owns its pipelines and bind
//! groups, builds them from a [`tessera_core::lane::LaneContext`] and
//! records its pass into a command encoder on request. Which lanes run and
//! in what order is decided by the strategies in `tessera-agents`.

pub mod light_lane;
pub mod render_lane;
pub mod shaders;
pub mod shadow_lane;
pub mod tiled_lane;

pub use light_lane::{LightPacker, LightRegistry, PackedLights};
pub use shaders::{ShaderId, ShaderLibrary};
pub use shadow_lane::ShadowSystem;
pub use tiled_lane::TileCuller;
