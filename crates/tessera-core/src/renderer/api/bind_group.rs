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

//! Defines data structures for bind groups and bind group layouts.
//!
//! Bind groups are how buffers, textures and samplers reach the shaders.

use super::flags::ShaderStageFlags;
use super::resource::{BindGroupLayoutId, BufferId, SamplerId, TextureViewId};
use super::texture::TextureViewDimension;
use std::num::NonZeroU64;

/// A single binding slot in a bind group layout.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutEntry {
    /// The binding index, matching `@binding(n)` in WGSL.
    pub binding: u32,
    pub visibility: ShaderStageFlags,
    pub ty: BindingType,
}

impl BindGroupLayoutEntry {
    pub fn uniform(binding: u32, visibility: ShaderStageFlags) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        }
    }

    /// A uniform binding addressed with a dynamic offset; `size` is the
    /// byte size of one element.
    pub fn dynamic_uniform(binding: u32, visibility: ShaderStageFlags, size: u64) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(size),
            },
        }
    }

    pub fn storage(binding: u32, visibility: ShaderStageFlags, read_only: bool) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        }
    }

    pub fn texture(
        binding: u32,
        visibility: ShaderStageFlags,
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
    ) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Texture {
                sample_type,
                view_dimension,
            },
        }
    }

    pub fn sampler(binding: u32, visibility: ShaderStageFlags, ty: SamplerBindingType) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Sampler(ty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferBindingType {
    Uniform,
    Storage { read_only: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSampleType {
    Float { filterable: bool },
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerBindingType {
    Filtering,
    NonFiltering,
    Comparison,
}

#[derive(Debug, Clone)]
pub enum BindingType {
    Buffer {
        ty: BufferBindingType,
        has_dynamic_offset: bool,
        min_binding_size: Option<NonZeroU64>,
    },
    Texture {
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
    },
    Sampler(SamplerBindingType),
}

#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    pub label: Option<&'a str>,
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A range of a buffer bound to a slot.
#[derive(Debug, Clone, Copy)]
pub struct BufferBinding {
    pub buffer: BufferId,
    pub offset: u64,
    /// `None` binds the rest of the buffer.
    pub size: Option<NonZeroU64>,
}

#[derive(Debug, Clone, Copy)]
pub enum BindingResource {
    Buffer(BufferBinding),
    TextureView(TextureViewId),
    Sampler(SamplerId),
}

#[derive(Debug, Clone, Copy)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub resource: BindingResource,
}

impl BindGroupEntry {
    /// Binds the whole buffer.
    pub fn buffer(binding: u32, buffer: BufferId) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(BufferBinding {
                buffer,
                offset: 0,
                size: None,
            }),
        }
    }

    /// Binds `size` bytes starting at `offset`.
    pub fn buffer_range(binding: u32, buffer: BufferId, offset: u64, size: u64) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(BufferBinding {
                buffer,
                offset,
                size: NonZeroU64::new(size),
            }),
        }
    }

    pub fn texture(binding: u32, view: TextureViewId) -> Self {
        Self {
            binding,
            resource: BindingResource::TextureView(view),
        }
    }

    pub fn sampler(binding: u32, sampler: SamplerId) -> Self {
        Self {
            binding,
            resource: BindingResource::Sampler(sampler),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    pub label: Option<&'a str>,
    pub layout: BindGroupLayoutId,
    pub entries: &'a [BindGroupEntry],
}
