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


//! The frame orchestrator.
//!
//! The render path is decided once, from the device capabilities, when the
//! [`RenderAgent`] is built. A [`RenderStrategy`] per path owns the lanes
//! of that path and records each frame from a declared pass list, issuing
//! memory barriers where the list's compute writes require them.

mod agent;
mod deferred;
mod error;
mod passes;
mod resources;
mod simple_forward;
mod strategy;
mod tiled;

pub use agent::{FrameOutcome, InputResponse, RenderAgent};
pub use deferred::DeferredStrategy;
pub use error::AgentError;
pub use passes::{deferred_passes, record_passes, simple_forward_passes, tiled_passes};
pub use resources::{DynamicLights, FrameView, LitFrame, SceneResources};
pub use simple_forward::SimpleForwardStrategy;
pub use strategy::{strategy_for, RenderStrategy};
pub use tiled::TiledComputeStrategy;
