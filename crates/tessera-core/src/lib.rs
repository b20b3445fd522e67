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

//! Foundational crate of the tessera renderer.
//!
//! Holds the backend-agnostic contracts (GPU resource ids, descriptors and
//! device traits), the CPU-side data layouts shared with the shaders, the
//! render path decision and the per-frame pass planning. Nothing in here
//! talks to a real GPU; `tessera-infra` provides the `wgpu` implementation.

pub mod config;
pub mod lane;
pub mod math;
pub mod platform;
pub mod renderer;

pub use config::RendererConfig;
