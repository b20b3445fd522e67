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

//! Textures, views and samplers.

use super::flags::TextureUsage;
use super::pipeline::CompareFunction;
use std::borrow::Cow;

/// Texture formats used by the renderer's targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    R32Float,
    Depth32Float,
}

impl TextureFormat {
    /// Bytes per texel.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::R32Float
            | TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }

    pub const fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }
}

/// Size of a texture. `depth_or_array_layers` is the layer count for 2D arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    pub const fn layered(width: u32, height: u32, layers: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: layers,
        }
    }

    pub const fn flat(width: u32, height: u32) -> Self {
        Self::layered(width, height, 1)
    }
}

/// Describes a 2D (optionally layered) texture.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    pub label: Option<Cow<'a, str>>,
    pub size: Extent3D,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl<'a> TextureDescriptor<'a> {
    /// A single-mip, single-sample render target that shaders may also sample.
    pub fn render_target(label: &'a str, size: Extent3D, format: TextureFormat) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size,
            mip_level_count: 1,
            sample_count: 1,
            format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        }
    }
}

/// How a view interprets its texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    D2,
    D2Array,
    Cube,
    CubeArray,
}

/// Which aspect of the texture a view exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureAspect {
    #[default]
    All,
    DepthOnly,
}

/// Describes a view into a texture.
#[derive(Debug, Clone, Default)]
pub struct TextureViewDescriptor<'a> {
    pub label: Option<Cow<'a, str>>,
    /// `None` inherits the texture's own dimension.
    pub dimension: Option<TextureViewDimension>,
    pub aspect: TextureAspect,
    pub base_array_layer: u32,
    /// `None` covers every layer from `base_array_layer` onwards.
    pub array_layer_count: Option<u32>,
}

impl<'a> TextureViewDescriptor<'a> {
    /// A 2D view of a single array layer, used as a render attachment.
    pub fn layer(label: &'a str, layer: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            dimension: Some(TextureViewDimension::D2),
            aspect: TextureAspect::All,
            base_array_layer: layer,
            array_layer_count: Some(1),
        }
    }

    /// A view over every layer of an array texture, used for sampling.
    pub fn array(label: &'a str) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            dimension: Some(TextureViewDimension::D2Array),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Describes a sampler.
#[derive(Debug, Clone, Default)]
pub struct SamplerDescriptor<'a> {
    pub label: Option<Cow<'a, str>>,
    pub address_mode: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    /// When set, the sampler is a comparison sampler (shadow lookups).
    pub compare: Option<CompareFunction>,
}
