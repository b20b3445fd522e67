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

use crate::renderer::api::*;
use crate::renderer::capabilities::{AdapterInfo, GpuCapabilities};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// The resource factory of a graphics backend.
///
/// Every `create_*` hands back an id owned by the caller, who must pass it
/// to the matching `destroy_*` when done. Destroying an unknown id reports
/// [`ResourceError::NotFound`].
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Reports the capability level used by render path selection.
    fn capabilities(&self) -> GpuCapabilities;

    /// Describes the adapter the device was created on.
    fn adapter_info(&self) -> AdapterInfo;

    /// The format of the presentable surface, if there is one.
    fn surface_format(&self) -> Option<TextureFormat>;

    /// Compiles a shader module.
    /// ## Errors
    /// * `ResourceError::Shader` - If compilation fails.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError>;

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError>;

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError>;

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError>;

    /// Creates a render pipeline.
    /// ## Errors
    /// * `ResourceError::Pipeline` - If a module or layout is unknown or the backend rejects the state.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError>;

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError>;

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError>;

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError>;

    fn create_bind_group(&self, descriptor: &BindGroupDescriptor)
        -> Result<BindGroupId, ResourceError>;

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Creates a new GPU buffer with undefined contents.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with `data`.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Writes `data` at `offset`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write would run past the end of the buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    fn create_texture_view(
        &self,
        texture_id: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError>;

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError>;

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a new command encoder to record GPU commands.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits a previously finished command buffer to the queue.
    fn submit_command_buffer(&self, command_buffer: CommandBufferId);
}
