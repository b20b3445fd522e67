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


//! # Tessera Agents
//!
//! The orchestration layer of the renderer: the isometric camera, the
//! per-path frame strategies and the [`RenderAgent`] that owns them and
//! turns input, resizes and frame requests into lane calls.

pub mod camera;
pub mod render_agent;

pub use camera::IsoCamera;
pub use render_agent::{AgentError, FrameOutcome, InputResponse, RenderAgent};
