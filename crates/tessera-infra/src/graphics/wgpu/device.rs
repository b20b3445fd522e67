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


use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wgpu::util::DeviceExt;

use tessera_core::renderer::api::{
    BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutId, BindingResource,
    BindingType, BufferDescriptor, BufferId, CommandBufferId, ComputePipelineDescriptor,
    ComputePipelineId, PipelineLayoutDescriptor, PipelineLayoutId, RenderPipelineDescriptor,
    RenderPipelineId, SamplerDescriptor, SamplerId, ShaderModuleDescriptor, ShaderModuleId,
    ShaderSourceData, TextureDescriptor, TextureFormat, TextureId, TextureViewDescriptor,
    TextureViewId,
};
use tessera_core::renderer::traits::CommandEncoder;
use tessera_core::renderer::{
    AdapterInfo, GpuCapabilities, GraphicsDevice, PipelineError, ResourceError, ShaderError,
};

use super::command::WgpuCommandEncoder;
use super::conversions::IntoWgpu;

/// An id-keyed table of live `wgpu` objects.
#[derive(Debug)]
struct Registry<T> {
    kind: &'static str,
    entries: Mutex<HashMap<usize, Arc<T>>>,
    next_id: AtomicUsize,
}

impl<T> Registry<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<usize, Arc<T>>>, ResourceError> {
        self.entries.lock().map_err(|e| {
            ResourceError::BackendError(format!("Mutex poisoned ({}): {e}", self.kind))
        })
    }

    fn insert(&self, value: T) -> Result<usize, ResourceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()?.insert(id, Arc::new(value));
        Ok(id)
    }

    fn get(&self, id: usize) -> Option<Arc<T>> {
        match self.lock() {
            Ok(entries) => entries.get(&id).cloned(),
            Err(e) => {
                log::error!("{e}");
                None
            }
        }
    }

    fn lookup(&self, id: usize) -> Result<Arc<T>, ResourceError> {
        self.get(id).ok_or(ResourceError::NotFound)
    }

    fn remove(&self, id: usize) -> Result<Arc<T>, ResourceError> {
        self.lock()?.remove(&id).ok_or(ResourceError::NotFound)
    }

    fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.lock() {
            entries.clear();
        }
    }
}

#[derive(Debug)]
struct WgpuDeviceInternal {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: AdapterInfo,
    capabilities: GpuCapabilities,
    surface_format: Option<TextureFormat>,

    shader_modules: Registry<wgpu::ShaderModule>,
    bind_group_layouts: Registry<wgpu::BindGroupLayout>,
    pipeline_layouts: Registry<wgpu::PipelineLayout>,
    render_pipelines: Registry<wgpu::RenderPipeline>,
    compute_pipelines: Registry<wgpu::ComputePipeline>,
    bind_groups: Registry<wgpu::BindGroup>,
    buffers: Registry<wgpu::Buffer>,
    textures: Registry<wgpu::Texture>,
    texture_views: Registry<wgpu::TextureView>,
    samplers: Registry<wgpu::Sampler>,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    next_command_buffer_id: AtomicUsize,
}

/// A clonable, thread-safe handle to the `wgpu` device and queue.
///
/// Every resource is stored behind an abstract id. Command encoders keep a
/// clone of this handle to resolve ids while recording.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

impl WgpuDevice {
    pub(crate) fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        adapter_info: AdapterInfo,
        capabilities: GpuCapabilities,
        surface_format: Option<TextureFormat>,
    ) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                device,
                queue,
                adapter_info,
                capabilities,
                surface_format,
                shader_modules: Registry::new("shader_modules"),
                bind_group_layouts: Registry::new("bind_group_layouts"),
                pipeline_layouts: Registry::new("pipeline_layouts"),
                render_pipelines: Registry::new("render_pipelines"),
                compute_pipelines: Registry::new("compute_pipelines"),
                bind_groups: Registry::new("bind_groups"),
                buffers: Registry::new("buffers"),
                textures: Registry::new("textures"),
                texture_views: Registry::new("texture_views"),
                samplers: Registry::new("samplers"),
                pending_command_buffers: Mutex::new(HashMap::new()),
                next_command_buffer_id: AtomicUsize::new(0),
            }),
        }
    }

    /// Runs `create` inside a validation error scope and reports whatever
    /// the scope caught through `on_error`.
    fn validated<R>(
        &self,
        create: impl FnOnce(&wgpu::Device) -> R,
        on_error: impl FnOnce(String) -> ResourceError,
    ) -> Result<R, ResourceError> {
        let device = &self.internal.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(device);
        match pollster::block_on(device.pop_error_scope()) {
            Some(error) => Err(on_error(error.to_string())),
            None => Ok(value),
        }
    }

    pub(crate) fn render_pipeline(&self, id: RenderPipelineId) -> Option<Arc<wgpu::RenderPipeline>> {
        self.internal.render_pipelines.get(id.0)
    }

    pub(crate) fn compute_pipeline(
        &self,
        id: ComputePipelineId,
    ) -> Option<Arc<wgpu::ComputePipeline>> {
        self.internal.compute_pipelines.get(id.0)
    }

    pub(crate) fn bind_group(&self, id: BindGroupId) -> Option<Arc<wgpu::BindGroup>> {
        self.internal.bind_groups.get(id.0)
    }

    pub(crate) fn buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        self.internal.buffers.get(id.0)
    }

    pub(crate) fn texture_view(&self, id: TextureViewId) -> Option<Arc<wgpu::TextureView>> {
        self.internal.texture_views.get(id.0)
    }

    /// Registers a view of a texture the device does not own, such as the
    /// current swapchain image.
    pub(crate) fn register_external_view(
        &self,
        texture: &wgpu::Texture,
        label: &str,
    ) -> Result<TextureViewId, ResourceError> {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            ..Default::default()
        });
        self.internal.texture_views.insert(view).map(TextureViewId)
    }

    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let id = CommandBufferId(
            self.internal
                .next_command_buffer_id
                .fetch_add(1, Ordering::Relaxed),
        );
        match self.internal.pending_command_buffers.lock() {
            Ok(mut pending) => {
                pending.insert(id, buffer);
            }
            Err(e) => log::error!("Mutex poisoned (pending_command_buffers): {e}"),
        }
        id
    }

    /// Number of live resources across all registries, for leak checks on
    /// shutdown.
    pub fn live_resource_count(&self) -> usize {
        let i = &self.internal;
        i.shader_modules.len()
            + i.bind_group_layouts.len()
            + i.pipeline_layouts.len()
            + i.render_pipelines.len()
            + i.compute_pipelines.len()
            + i.bind_groups.len()
            + i.buffers.len()
            + i.textures.len()
            + i.texture_views.len()
            + i.samplers.len()
    }

    /// Drops every registered object. Ids handed out before stay invalid.
    pub(crate) fn clear(&self) {
        let i = &self.internal;
        i.bind_groups.clear();
        i.render_pipelines.clear();
        i.compute_pipelines.clear();
        i.pipeline_layouts.clear();
        i.bind_group_layouts.clear();
        i.shader_modules.clear();
        i.texture_views.clear();
        i.textures.clear();
        i.samplers.clear();
        i.buffers.clear();
        if let Ok(mut pending) = i.pending_command_buffers.lock() {
            pending.clear();
        }
    }
}

fn label_of<'a>(label: &'a Option<Cow<'_, str>>) -> Option<&'a str> {
    label.as_deref()
}

impl GraphicsDevice for WgpuDevice {
    fn capabilities(&self) -> GpuCapabilities {
        self.internal.capabilities
    }

    fn adapter_info(&self) -> AdapterInfo {
        self.internal.adapter_info.clone()
    }

    fn surface_format(&self) -> Option<TextureFormat> {
        self.internal.surface_format
    }

    // --- Shaders ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let source = match &descriptor.source {
            ShaderSourceData::Wgsl(code) => wgpu::ShaderSource::Wgsl(code.clone()),
        };
        let label = descriptor.label.unwrap_or("unnamed");
        log::debug!("WgpuDevice: Creating shader module '{label}'");

        let module = self.validated(
            |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: descriptor.label,
                    source,
                })
            },
            |details| {
                ShaderError::CompilationError {
                    label: label.to_string(),
                    details,
                }
                .into()
            },
        )?;

        let id = ShaderModuleId(self.internal.shader_modules.insert(module)?);
        log::info!("WgpuDevice: Created shader module '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.internal
            .shader_modules
            .remove(id.0)
            .map(drop)
            .map_err(|_| ShaderError::NotFound { id }.into())
    }

    // --- Layouts ---

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: match entry.ty {
                    BindingType::Buffer {
                        ty,
                        has_dynamic_offset,
                        min_binding_size,
                    } => wgpu::BindingType::Buffer {
                        ty: ty.into_wgpu(),
                        has_dynamic_offset,
                        min_binding_size,
                    },
                    BindingType::Texture {
                        sample_type,
                        view_dimension,
                    } => wgpu::BindingType::Texture {
                        sample_type: sample_type.into_wgpu(),
                        view_dimension: view_dimension.into_wgpu(),
                        multisampled: false,
                    },
                    BindingType::Sampler(ty) => wgpu::BindingType::Sampler(ty.into_wgpu()),
                },
                count: None,
            })
            .collect();

        let layout = self.validated(
            |device| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: descriptor.label,
                    entries: &entries,
                })
            },
            |details| PipelineError::LayoutCreationFailed(details).into(),
        )?;
        self.internal
            .bind_group_layouts
            .insert(layout)
            .map(BindGroupLayoutId)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.internal.bind_group_layouts.remove(id.0).map(drop)
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let layouts = descriptor
            .bind_group_layouts
            .iter()
            .map(|id| {
                self.internal.bind_group_layouts.get(id.0).ok_or_else(|| {
                    PipelineError::LayoutCreationFailed(format!(
                        "unknown bind group layout {id:?}"
                    ))
                    .into()
                })
            })
            .collect::<Result<Vec<_>, ResourceError>>()?;
        let refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().map(AsRef::as_ref).collect();

        let layout = self.validated(
            |device| {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: label_of(&descriptor.label),
                    bind_group_layouts: &refs,
                    push_constant_ranges: &[],
                })
            },
            |details| PipelineError::LayoutCreationFailed(details).into(),
        )?;
        self.internal
            .pipeline_layouts
            .insert(layout)
            .map(PipelineLayoutId)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        self.internal.pipeline_layouts.remove(id.0).map(drop)
    }

    // --- Pipelines ---

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or("unnamed").to_string();
        log::debug!("WgpuDevice: Creating render pipeline '{label}'");

        let compile_error = |details: String| -> ResourceError {
            PipelineError::CompilationFailed {
                label: Some(label.clone()),
                details,
            }
            .into()
        };
        let module = |id: ShaderModuleId| {
            self.internal
                .shader_modules
                .get(id.0)
                .ok_or_else(|| compile_error(format!("unknown shader module {id:?}")))
        };

        let vertex_module = module(descriptor.vertex_shader_module)?;
        let fragment_module = descriptor
            .fragment_shader_module
            .map(module)
            .transpose()?;
        let layout = descriptor
            .layout
            .map(|id| {
                self.internal.pipeline_layouts.get(id.0).ok_or_else(|| {
                    ResourceError::from(PipelineError::LayoutCreationFailed(format!(
                        "unknown pipeline layout {id:?}"
                    )))
                })
            })
            .transpose()?;

        // wgpu borrows the attribute slices, so they are collected first.
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = descriptor
            .vertex_buffers_layout
            .iter()
            .map(|layout| layout.attributes.iter().map(IntoWgpu::into_wgpu).collect())
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = descriptor
            .vertex_buffers_layout
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.array_stride,
                step_mode: layout.step_mode.into_wgpu(),
                attributes,
            })
            .collect();
        let targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_target_states
            .iter()
            .map(|target| Some(target.into_wgpu()))
            .collect();

        let fragment = match (&fragment_module, &descriptor.fragment_entry_point) {
            (Some(module), Some(entry)) => Some(wgpu::FragmentState {
                module,
                entry_point: Some(entry.as_ref()),
                compilation_options: Default::default(),
                targets: &targets,
            }),
            (None, None) => None,
            _ => {
                return Err(compile_error(
                    "fragment module and entry point must be given together".into(),
                ))
            }
        };

        let pipeline = self.validated(
            |device| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&label),
                    layout: layout.as_deref(),
                    vertex: wgpu::VertexState {
                        module: &vertex_module,
                        entry_point: Some(descriptor.vertex_entry_point.as_ref()),
                        compilation_options: Default::default(),
                        buffers: &vertex_buffers,
                    },
                    primitive: descriptor.primitive_state.into_wgpu(),
                    depth_stencil: descriptor
                        .depth_stencil_state
                        .as_ref()
                        .map(IntoWgpu::into_wgpu),
                    multisample: wgpu::MultisampleState::default(),
                    fragment,
                    multiview: None,
                    cache: None,
                })
            },
            compile_error,
        )?;

        let id = RenderPipelineId(self.internal.render_pipelines.insert(pipeline)?);
        log::info!("WgpuDevice: Created render pipeline '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        self.internal
            .render_pipelines
            .remove(id.0)
            .map(drop)
            .map_err(|_| PipelineError::InvalidRenderPipeline { id }.into())
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or("unnamed").to_string();
        let compile_error = |details: String| -> ResourceError {
            PipelineError::CompilationFailed {
                label: Some(label.clone()),
                details,
            }
            .into()
        };

        let module = self
            .internal
            .shader_modules
            .get(descriptor.module.0)
            .ok_or_else(|| compile_error(format!("unknown shader module {:?}", descriptor.module)))?;
        let layout = match descriptor.layout {
            Some(id) => Some(self.internal.pipeline_layouts.get(id.0).ok_or_else(|| {
                ResourceError::from(PipelineError::LayoutCreationFailed(format!(
                    "unknown pipeline layout {id:?}"
                )))
            })?),
            None => None,
        };

        let pipeline = self.validated(
            |device| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&label),
                    layout: layout.as_deref(),
                    module: &module,
                    entry_point: Some(descriptor.entry_point.as_ref()),
                    compilation_options: Default::default(),
                    cache: None,
                })
            },
            compile_error,
        )?;

        let id = ComputePipelineId(self.internal.compute_pipelines.insert(pipeline)?);
        log::info!("WgpuDevice: Created compute pipeline '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        self.internal
            .compute_pipelines
            .remove(id.0)
            .map(drop)
            .map_err(|_| PipelineError::InvalidComputePipeline { id }.into())
    }

    // --- Bind groups ---

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let layout = self.internal.bind_group_layouts.lookup(descriptor.layout.0)?;

        enum Resolved {
            Buffer(Arc<wgpu::Buffer>, u64, Option<std::num::NonZeroU64>),
            View(Arc<wgpu::TextureView>),
            Sampler(Arc<wgpu::Sampler>),
        }
        let resolved = descriptor
            .entries
            .iter()
            .map(|entry| {
                Ok(match entry.resource {
                    BindingResource::Buffer(binding) => Resolved::Buffer(
                        self.internal.buffers.lookup(binding.buffer.0)?,
                        binding.offset,
                        binding.size,
                    ),
                    BindingResource::TextureView(id) => {
                        Resolved::View(self.internal.texture_views.lookup(id.0)?)
                    }
                    BindingResource::Sampler(id) => {
                        Resolved::Sampler(self.internal.samplers.lookup(id.0)?)
                    }
                })
            })
            .collect::<Result<Vec<_>, ResourceError>>()?;

        let entries: Vec<wgpu::BindGroupEntry> = descriptor
            .entries
            .iter()
            .zip(&resolved)
            .map(|(entry, resource)| wgpu::BindGroupEntry {
                binding: entry.binding,
                resource: match resource {
                    Resolved::Buffer(buffer, offset, size) => {
                        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset: *offset,
                            size: *size,
                        })
                    }
                    Resolved::View(view) => wgpu::BindingResource::TextureView(view),
                    Resolved::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                },
            })
            .collect();

        let group = self.validated(
            |device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: descriptor.label,
                    layout: &layout,
                    entries: &entries,
                })
            },
            ResourceError::BackendError,
        )?;
        self.internal.bind_groups.insert(group).map(BindGroupId)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        self.internal.bind_groups.remove(id.0).map(drop)
    }

    // --- Buffers ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let buffer = self.internal.device.create_buffer(&wgpu::BufferDescriptor {
            label: label_of(&descriptor.label),
            size: descriptor.size,
            usage: descriptor.usage.into_wgpu(),
            mapped_at_creation: descriptor.mapped_at_creation,
        });
        let id = BufferId(self.internal.buffers.insert(buffer)?);
        log::trace!(
            "WgpuDevice: Created buffer {:?} ({} bytes) with ID: {id:?}",
            descriptor.label,
            descriptor.size
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let buffer = self
            .internal
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: label_of(&descriptor.label),
                contents: data,
                usage: descriptor.usage.into_wgpu(),
            });
        self.internal.buffers.insert(buffer).map(BufferId)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffer = self.internal.buffers.lookup(id.0)?;
        if offset + data.len() as u64 > buffer.size() {
            return Err(ResourceError::OutOfBounds);
        }
        self.internal.queue.write_buffer(&buffer, offset, data);
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let buffer = self.internal.buffers.remove(id.0)?;
        buffer.destroy();
        Ok(())
    }

    // --- Textures ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let texture = self.internal.device.create_texture(&wgpu::TextureDescriptor {
            label: label_of(&descriptor.label),
            size: descriptor.size.into_wgpu(),
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.format.into_wgpu(),
            usage: descriptor.usage.into_wgpu(),
            view_formats: &[],
        });
        let id = TextureId(self.internal.textures.insert(texture)?);
        log::debug!(
            "WgpuDevice: Created texture {:?} {}x{}x{} ({:?}) with ID: {id:?}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth_or_array_layers,
            descriptor.format
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let texture = self.internal.textures.remove(id.0)?;
        texture.destroy();
        Ok(())
    }

    fn create_texture_view(
        &self,
        texture_id: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        let texture = self.internal.textures.lookup(texture_id.0)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: label_of(&descriptor.label),
            dimension: descriptor.dimension.map(IntoWgpu::into_wgpu),
            aspect: descriptor.aspect.into_wgpu(),
            base_array_layer: descriptor.base_array_layer,
            array_layer_count: descriptor.array_layer_count,
            ..Default::default()
        });
        self.internal.texture_views.insert(view).map(TextureViewId)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        self.internal.texture_views.remove(id.0).map(drop)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let address_mode = descriptor.address_mode.into_wgpu();
        let sampler = self.internal.device.create_sampler(&wgpu::SamplerDescriptor {
            label: label_of(&descriptor.label),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: descriptor.mag_filter.into_wgpu(),
            min_filter: descriptor.min_filter.into_wgpu(),
            compare: descriptor.compare.map(IntoWgpu::into_wgpu),
            ..Default::default()
        });
        self.internal.samplers.insert(sampler).map(SamplerId)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.internal.samplers.remove(id.0).map(drop)
    }

    // --- Commands ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let encoder = self
            .internal
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label });
        Box::new(WgpuCommandEncoder::new(encoder, self.clone()))
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) {
        let buffer = match self.internal.pending_command_buffers.lock() {
            Ok(mut pending) => pending.remove(&command_buffer),
            Err(e) => {
                log::error!("Mutex poisoned (pending_command_buffers): {e}");
                return;
            }
        };
        match buffer {
            Some(buffer) => {
                self.internal.queue.submit(std::iter::once(buffer));
            }
            None => log::warn!(
                "WgpuDevice: Command buffer {command_buffer:?} was already submitted or never finished."
            ),
        }
    }
}
