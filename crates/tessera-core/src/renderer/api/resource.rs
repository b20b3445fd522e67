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

//! Opaque handles to GPU resources.
//!
//! Every resource is owned by the backend and addressed by a small `Copy`
//! id. The component that created a resource is its only owner and is
//! responsible for destroying it through the same device.

macro_rules! resource_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub usize);
        )*
    };
}

resource_id!(
    /// A handle to a GPU buffer.
    BufferId,
    /// A handle to a GPU texture.
    TextureId,
    /// A handle to a view into a texture.
    TextureViewId,
    /// A handle to a sampler.
    SamplerId,
    /// A handle to a compiled shader module.
    ShaderModuleId,
    /// A handle to a render pipeline.
    RenderPipelineId,
    /// A handle to a compute pipeline.
    ComputePipelineId,
    /// A handle to a pipeline layout.
    PipelineLayoutId,
    /// A handle to a bind group layout.
    BindGroupLayoutId,
    /// A handle to a bind group.
    BindGroupId,
    /// A handle to a finished, not yet submitted, command buffer.
    CommandBufferId,
);
