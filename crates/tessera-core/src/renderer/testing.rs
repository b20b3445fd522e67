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

//! A recording [`GraphicsDevice`] for tests.
//!
//! Hands out increasing ids, remembers what every id was created with and
//! appends every recorded command to a shared log. Nothing is executed.

use crate::renderer::api::*;
use crate::renderer::capabilities::{AdapterInfo, GpuCapabilities, GraphicsBackendType};
use crate::renderer::error::{PipelineError, ResourceError, ShaderError};
use crate::renderer::frame_graph::RecordedStep;
use crate::renderer::traits::{CommandEncoder, ComputePass, GraphicsDevice, RenderPass};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

/// One command as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass {
        label: String,
        color_views: Vec<TextureViewId>,
        depth_view: Option<TextureViewId>,
    },
    BeginComputePass {
        label: String,
    },
    EndPass,
    Barrier(BarrierScope),
    SetRenderPipeline(RenderPipelineId),
    SetComputePipeline(ComputePipelineId),
    SetBindGroup {
        index: u32,
        bind_group: BindGroupId,
        offsets: Vec<u32>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: BufferId,
    },
    SetIndexBuffer(BufferId),
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        instances: Range<u32>,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    Finish(CommandBufferId),
}

#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TextureRecord {
    pub label: Option<String>,
    pub size: Extent3D,
    pub format: TextureFormat,
}

/// The state a render pipeline was created with.
#[derive(Debug, Clone)]
pub struct RenderPipelineRecord {
    pub label: Option<String>,
    pub color_targets: Vec<ColorTargetState>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
}

#[derive(Debug, Default)]
struct RecordingState {
    next_id: usize,
    buffers: HashMap<BufferId, BufferRecord>,
    textures: HashMap<TextureId, TextureRecord>,
    views: HashMap<TextureViewId, TextureId>,
    samplers: HashMap<SamplerId, Option<String>>,
    shaders: HashMap<ShaderModuleId, Option<String>>,
    bind_group_layouts: HashMap<BindGroupLayoutId, usize>,
    pipeline_layouts: HashMap<PipelineLayoutId, usize>,
    render_pipelines: HashMap<RenderPipelineId, RenderPipelineRecord>,
    compute_pipelines: HashMap<ComputePipelineId, Option<String>>,
    bind_groups: HashMap<BindGroupId, Option<String>>,
    commands: Vec<RecordedCommand>,
    submitted: Vec<CommandBufferId>,
    buffer_allocations: usize,
    texture_allocations: usize,
    failing_shader_labels: Vec<String>,
    failing_write_labels: Vec<String>,
}

impl RecordingState {
    fn next(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }
}

fn remove<K: std::hash::Hash + Eq, V>(
    map: &mut HashMap<K, V>,
    key: &K,
) -> Result<(), ResourceError> {
    map.remove(key).map(|_| ()).ok_or(ResourceError::NotFound)
}

/// The mock device. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct RecordingDevice {
    state: Arc<Mutex<RecordingState>>,
    capabilities: GpuCapabilities,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new(GpuCapabilities::full())
    }
}

impl RecordingDevice {
    pub fn new(capabilities: GpuCapabilities) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecordingState::default())),
            capabilities,
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every later shader module whose label contains `label` fail to compile.
    pub fn fail_shader(&self, label: &str) {
        self.state().failing_shader_labels.push(label.to_string());
    }

    /// Makes every later write into a buffer whose label contains `label` fail.
    pub fn fail_buffer_writes(&self, label: &str) {
        self.state().failing_write_labels.push(label.to_string());
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Pass labels and barriers in recording order.
    pub fn pass_stream(&self) -> Vec<RecordedStep> {
        self.state()
            .commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::BeginRenderPass { label, .. }
                | RecordedCommand::BeginComputePass { label } => {
                    Some(RecordedStep::Pass(label.clone()))
                }
                RecordedCommand::Barrier(_) => Some(RecordedStep::Barrier),
                _ => None,
            })
            .collect()
    }

    pub fn pass_labels(&self) -> Vec<String> {
        self.pass_stream()
            .into_iter()
            .filter_map(|step| match step {
                RecordedStep::Pass(label) => Some(label),
                RecordedStep::Barrier => None,
            })
            .collect()
    }

    pub fn submitted(&self) -> Vec<CommandBufferId> {
        self.state().submitted.clone()
    }

    pub fn buffer(&self, id: BufferId) -> Option<BufferRecord> {
        self.state().buffers.get(&id).cloned()
    }

    pub fn texture(&self, id: TextureId) -> Option<TextureRecord> {
        self.state().textures.get(&id).cloned()
    }

    pub fn render_pipeline(&self, id: RenderPipelineId) -> Option<RenderPipelineRecord> {
        self.state().render_pipelines.get(&id).cloned()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.state().buffers.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.state().textures.len()
    }

    /// Every live resource of any kind.
    pub fn live_resource_count(&self) -> usize {
        let state = self.state();
        state.buffers.len()
            + state.textures.len()
            + state.views.len()
            + state.samplers.len()
            + state.shaders.len()
            + state.bind_group_layouts.len()
            + state.pipeline_layouts.len()
            + state.render_pipelines.len()
            + state.compute_pipelines.len()
            + state.bind_groups.len()
    }

    /// Buffers created since the device was made, destroyed ones included.
    pub fn buffer_allocations(&self) -> usize {
        self.state().buffer_allocations
    }

    pub fn texture_allocations(&self) -> usize {
        self.state().texture_allocations
    }
}

impl GraphicsDevice for RecordingDevice {
    fn capabilities(&self) -> GpuCapabilities {
        self.capabilities
    }

    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "Recording Device".to_string(),
            backend: GraphicsBackendType::Unknown,
            driver_info: format!("{} (mock)", self.capabilities.version),
        }
    }

    fn surface_format(&self) -> Option<TextureFormat> {
        Some(TextureFormat::Bgra8UnormSrgb)
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let mut state = self.state();
        let label = descriptor.label.unwrap_or_default();
        if state
            .failing_shader_labels
            .iter()
            .any(|failing| label.contains(failing.as_str()))
        {
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details: "rejected by recording device".to_string(),
            }
            .into());
        }
        let id = ShaderModuleId(state.next());
        state.shaders.insert(id, descriptor.label.map(str::to_string));
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        remove(&mut self.state().shaders, &id)
    }

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let mut state = self.state();
        let id = BindGroupLayoutId(state.next());
        state.bind_group_layouts.insert(id, descriptor.entries.len());
        Ok(id)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        remove(&mut self.state().bind_group_layouts, &id)
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let mut state = self.state();
        if let Some(missing) = descriptor
            .bind_group_layouts
            .iter()
            .find(|layout| !state.bind_group_layouts.contains_key(*layout))
        {
            return Err(PipelineError::LayoutCreationFailed(format!(
                "unknown bind group layout {missing:?}"
            ))
            .into());
        }
        let id = PipelineLayoutId(state.next());
        state
            .pipeline_layouts
            .insert(id, descriptor.bind_group_layouts.len());
        Ok(id)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        remove(&mut self.state().pipeline_layouts, &id)
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let mut state = self.state();
        let label = descriptor.label.as_deref().unwrap_or("render pipeline");
        let modules_known = state.shaders.contains_key(&descriptor.vertex_shader_module)
            && descriptor
                .fragment_shader_module
                .is_none_or(|module| state.shaders.contains_key(&module));
        if !modules_known {
            return Err(PipelineError::CompilationFailed {
                label: Some(label.to_string()),
                details: "unknown shader module".to_string(),
            }
            .into());
        }
        let id = RenderPipelineId(state.next());
        state.render_pipelines.insert(
            id,
            RenderPipelineRecord {
                label: descriptor.label.as_ref().map(|l| l.to_string()),
                color_targets: descriptor.color_target_states.to_vec(),
                primitive: descriptor.primitive_state,
                depth_stencil: descriptor.depth_stencil_state.clone(),
            },
        );
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        remove(&mut self.state().render_pipelines, &id)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let mut state = self.state();
        if !state.shaders.contains_key(&descriptor.module) {
            return Err(PipelineError::CompilationFailed {
                label: Some(
                    descriptor
                        .label
                        .as_deref()
                        .unwrap_or("compute pipeline")
                        .to_string(),
                ),
                details: "unknown shader module".to_string(),
            }
            .into());
        }
        let id = ComputePipelineId(state.next());
        state
            .compute_pipelines
            .insert(id, descriptor.label.as_ref().map(|l| l.to_string()));
        Ok(id)
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        remove(&mut self.state().compute_pipelines, &id)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut state = self.state();
        if !state.bind_group_layouts.contains_key(&descriptor.layout) {
            return Err(ResourceError::NotFound);
        }
        let id = BindGroupId(state.next());
        state
            .bind_groups
            .insert(id, descriptor.label.map(str::to_string));
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        remove(&mut self.state().bind_groups, &id)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state();
        let id = BufferId(state.next());
        state.buffer_allocations += 1;
        state.buffers.insert(
            id,
            BufferRecord {
                label: descriptor.label.as_ref().map(|l| l.to_string()),
                size: descriptor.size,
                usage: descriptor.usage,
                data: vec![0; descriptor.size as usize],
            },
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let id = self.create_buffer(&BufferDescriptor {
            size: descriptor.size.max(data.len() as u64),
            ..descriptor.clone()
        })?;
        self.write_buffer(id, 0, data)?;
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        let failing = state.failing_write_labels.clone();
        let buffer = state.buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if let Some(label) = &buffer.label {
            if failing.iter().any(|f| label.contains(f.as_str())) {
                return Err(ResourceError::BackendError(format!("write into {label} failed")));
            }
        }
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.data.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        remove(&mut self.state().buffers, &id)
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let mut state = self.state();
        let id = TextureId(state.next());
        state.texture_allocations += 1;
        state.textures.insert(
            id,
            TextureRecord {
                label: descriptor.label.as_ref().map(|l| l.to_string()),
                size: descriptor.size,
                format: descriptor.format,
            },
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.views.retain(|_, texture| *texture != id);
        remove(&mut state.textures, &id)
    }

    fn create_texture_view(
        &self,
        texture_id: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        let mut state = self.state();
        let texture = state
            .textures
            .get(&texture_id)
            .ok_or(ResourceError::NotFound)?;
        let layers = descriptor.array_layer_count.unwrap_or(1);
        if descriptor.base_array_layer + layers > texture.size.depth_or_array_layers {
            return Err(ResourceError::OutOfBounds);
        }
        let id = TextureViewId(state.next());
        state.views.insert(id, texture_id);
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        remove(&mut self.state().views, &id)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let mut state = self.state();
        let id = SamplerId(state.next());
        state
            .samplers
            .insert(id, descriptor.label.as_ref().map(|l| l.to_string()));
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        remove(&mut self.state().samplers, &id)
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(RecordingEncoder {
            state: self.state.clone(),
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) {
        self.state().submitted.push(command_buffer);
    }
}

/// Encoder of the [`RecordingDevice`].
pub struct RecordingEncoder {
    state: Arc<Mutex<RecordingState>>,
}

fn push(state: &Arc<Mutex<RecordingState>>, command: RecordedCommand) {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .commands
        .push(command);
}

impl CommandEncoder for RecordingEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        push(
            &self.state,
            RecordedCommand::BeginRenderPass {
                label: descriptor.label.unwrap_or_default().to_string(),
                color_views: descriptor
                    .color_attachments
                    .iter()
                    .map(|attachment| attachment.view)
                    .collect(),
                depth_view: descriptor
                    .depth_stencil_attachment
                    .map(|attachment| attachment.view),
            },
        );
        Box::new(RecordingPass {
            state: self.state.clone(),
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass + 'encoder> {
        push(
            &self.state,
            RecordedCommand::BeginComputePass {
                label: descriptor.label.unwrap_or_default().to_string(),
            },
        );
        Box::new(RecordingPass {
            state: self.state.clone(),
        })
    }

    fn memory_barrier(&mut self, scope: BarrierScope) {
        push(&self.state, RecordedCommand::Barrier(scope));
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let id = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            CommandBufferId(state.next())
        };
        push(&self.state, RecordedCommand::Finish(id));
        id
    }
}

/// A render or compute pass of the [`RecordingEncoder`].
pub struct RecordingPass {
    state: Arc<Mutex<RecordingState>>,
}

impl Drop for RecordingPass {
    fn drop(&mut self) {
        push(&self.state, RecordedCommand::EndPass);
    }
}

impl RenderPass for RecordingPass {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        push(&self.state, RecordedCommand::SetRenderPipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]) {
        push(
            &self.state,
            RecordedCommand::SetBindGroup {
                index,
                bind_group,
                offsets: offsets.to_vec(),
            },
        );
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, _offset: u64) {
        push(&self.state, RecordedCommand::SetVertexBuffer { slot, buffer });
    }

    fn set_index_buffer(&mut self, buffer: BufferId, _offset: u64, _index_format: IndexFormat) {
        push(&self.state, RecordedCommand::SetIndexBuffer(buffer));
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        push(&self.state, RecordedCommand::Draw { vertices, instances });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, instances: Range<u32>) {
        push(&self.state, RecordedCommand::DrawIndexed { indices, instances });
    }
}

impl ComputePass for RecordingPass {
    fn set_pipeline(&mut self, pipeline: ComputePipelineId) {
        push(&self.state, RecordedCommand::SetComputePipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]) {
        RenderPass::set_bind_group(self, index, bind_group, offsets);
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        push(&self.state, RecordedCommand::Dispatch { x, y, z });
    }
}
