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

//! Pipeline construction shared by the lanes.

use std::borrow::Cow;
use std::sync::Arc;

use tessera_core::lane::{LaneContext, LaneError};
use tessera_core::renderer::mesh::Vertex;
use tessera_core::renderer::{
    BindGroupLayoutId, ColorTargetState, CullMode, DepthStencilState, GraphicsDevice,
    PipelineLayoutId, PrimitiveState, RenderPipelineDescriptor, RenderPipelineId, ResourceError,
    ShaderModuleId,
};

use super::layouts::SharedLayouts;
use crate::shaders::{ShaderId, ShaderLibrary};

/// Collaborators every lane pulls out of its [`LaneContext`].
pub struct LaneDeps<'a> {
    pub device: &'a Arc<dyn GraphicsDevice>,
    pub library: &'a Arc<ShaderLibrary>,
    pub layouts: SharedLayouts,
}

impl<'a> LaneDeps<'a> {
    pub fn from_context(ctx: &'a LaneContext) -> Result<Self, LaneError> {
        Ok(Self {
            device: ctx.require::<Arc<dyn GraphicsDevice>>()?,
            library: ctx.require::<Arc<ShaderLibrary>>()?,
            layouts: *ctx.require::<SharedLayouts>()?,
        })
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// Compiles `shader`, hands the module to `build` and destroys the
    /// module afterwards; pipelines keep what they need.
    pub fn with_module<T>(
        &self,
        shader: ShaderId,
        build: impl FnOnce(ShaderModuleId) -> Result<T, ResourceError>,
    ) -> Result<T, LaneError> {
        let module = self
            .library
            .module(self.device(), shader)
            .map_err(LaneError::init)?;
        let result = build(module);
        let _ = self.device.destroy_shader_module(module);
        result.map_err(LaneError::init)
    }

    pub fn pipeline_layout(
        &self,
        label: &str,
        groups: &[BindGroupLayoutId],
    ) -> Result<PipelineLayoutId, LaneError> {
        SharedLayouts::pipeline_layout(self.device(), label, groups).map_err(LaneError::init)
    }
}

/// The variable part of a mesh or full-screen render pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipelineSpec<'a> {
    pub label: &'a str,
    pub vertex_entry: &'a str,
    /// `None` for depth-only pipelines.
    pub fragment_entry: Option<&'a str>,
    /// `false` for full-screen triangles generated from `vertex_index`.
    pub mesh_vertices: bool,
    pub targets: &'a [ColorTargetState],
    pub cull_mode: Option<CullMode>,
    pub depth: Option<DepthStencilState>,
}

pub fn create_render_pipeline(
    device: &dyn GraphicsDevice,
    module: ShaderModuleId,
    layout: PipelineLayoutId,
    spec: &RenderPipelineSpec<'_>,
) -> Result<RenderPipelineId, ResourceError> {
    let vertex_buffers = if spec.mesh_vertices {
        vec![Vertex::layout()]
    } else {
        Vec::new()
    };
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(Cow::Borrowed(spec.label)),
        layout: Some(layout),
        vertex_shader_module: module,
        vertex_entry_point: Cow::Borrowed(spec.vertex_entry),
        vertex_buffers_layout: Cow::Owned(vertex_buffers),
        fragment_shader_module: spec.fragment_entry.map(|_| module),
        fragment_entry_point: spec.fragment_entry.map(Cow::Borrowed),
        color_target_states: Cow::Borrowed(spec.targets),
        primitive_state: PrimitiveState::triangles(spec.cull_mode),
        depth_stencil_state: spec.depth.clone(),
    })
}

/// Destroys whichever of the ids are set.
pub fn release_pipelines(
    device: &dyn GraphicsDevice,
    pipelines: impl IntoIterator<Item = Option<RenderPipelineId>>,
    layouts: impl IntoIterator<Item = Option<PipelineLayoutId>>,
) {
    for pipeline in pipelines.into_iter().flatten() {
        let _ = device.destroy_render_pipeline(pipeline);
    }
    for layout in layouts.into_iter().flatten() {
        let _ = device.destroy_pipeline_layout(layout);
    }
}
