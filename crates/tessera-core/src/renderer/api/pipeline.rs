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

//! Shader modules and pipeline state descriptors.

use super::buffer::IndexFormat;
use super::flags::ColorWrites;
use super::resource::{BindGroupLayoutId, PipelineLayoutId, ShaderModuleId};
use super::texture::TextureFormat;
use std::borrow::Cow;

/// Source code of a shader module.
#[derive(Debug, Clone)]
pub enum ShaderSourceData<'a> {
    Wgsl(Cow<'a, str>),
}

/// Describes a shader module to compile.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    pub label: Option<&'a str>,
    pub source: ShaderSourceData<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Sint32x4,
}

impl VertexFormat {
    pub const fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 | VertexFormat::Sint32x4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub shader_location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct VertexBufferLayout<'a> {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: Cow<'a, [VertexAttribute]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    #[default]
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimitiveState {
    pub topology: PrimitiveTopology,
    pub strip_index_format: Option<IndexFormat>,
    pub front_face: FrontFace,
    pub cull_mode: Option<CullMode>,
}

impl PrimitiveState {
    /// Triangle list, counter-clockwise front faces, the given culling.
    pub const fn triangles(cull_mode: Option<CullMode>) -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Constant and slope-scaled depth offset applied while rasterizing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthBiasState {
    pub constant: i32,
    pub slope_scale: f32,
    pub clamp: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
    pub bias: DepthBiasState,
}

impl DepthStencilState {
    pub fn depth32(depth_write_enabled: bool, depth_compare: CompareFunction) -> Self {
        Self {
            format: TextureFormat::Depth32Float,
            depth_write_enabled,
            depth_compare,
            bias: DepthBiasState::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendState {
    /// `dst = src + dst` on every channel.
    pub const ADDITIVE: Self = {
        let add = BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::One,
            operation: BlendOperation::Add,
        };
        Self {
            color: add,
            alpha: add,
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub blend: Option<BlendState>,
    pub write_mask: ColorWrites,
}

impl ColorTargetState {
    /// Opaque write of every channel.
    pub const fn replace(format: TextureFormat) -> Self {
        Self {
            format,
            blend: None,
            write_mask: ColorWrites::ALL,
        }
    }
}

/// Describes a render pipeline.
///
/// A pipeline with no fragment module is depth-only.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    pub label: Option<Cow<'a, str>>,
    pub layout: Option<PipelineLayoutId>,
    pub vertex_shader_module: ShaderModuleId,
    pub vertex_entry_point: Cow<'a, str>,
    pub vertex_buffers_layout: Cow<'a, [VertexBufferLayout<'a>]>,
    pub fragment_shader_module: Option<ShaderModuleId>,
    pub fragment_entry_point: Option<Cow<'a, str>>,
    pub color_target_states: Cow<'a, [ColorTargetState]>,
    pub primitive_state: PrimitiveState,
    pub depth_stencil_state: Option<DepthStencilState>,
}

/// Describes a compute pipeline.
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor<'a> {
    pub label: Option<Cow<'a, str>>,
    pub layout: Option<PipelineLayoutId>,
    pub module: ShaderModuleId,
    pub entry_point: Cow<'a, str>,
}

/// Describes a pipeline layout as an ordered list of bind group layouts.
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    pub label: Option<Cow<'a, str>>,
    pub bind_group_layouts: &'a [BindGroupLayoutId],
}
