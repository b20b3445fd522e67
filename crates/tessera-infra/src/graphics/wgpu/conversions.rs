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


//! Conversions from `tessera-core` descriptors to their `wgpu` counterparts.

use tessera_core::math::LinearRgba;
use tessera_core::renderer::api::{
    AddressMode, BlendComponent, BlendFactor, BlendOperation, BlendState, BufferBindingType,
    BufferUsage, ColorTargetState, ColorWrites, CompareFunction, CullMode, DepthBiasState,
    DepthStencilState, Extent3D, FilterMode, FrontFace, IndexFormat, LoadOp, Operations,
    PrimitiveState, PrimitiveTopology, SamplerBindingType, ShaderStageFlags, StoreOp,
    TextureAspect, TextureFormat, TextureSampleType, TextureUsage, TextureViewDimension,
    VertexAttribute, VertexFormat, VertexStepMode,
};

/// A local extension trait to convert our types into `wgpu` types.
/// Keeps the `.into_wgpu()` syntax without running into the orphan rules.
pub trait IntoWgpu<T> {
    fn into_wgpu(self) -> T;
}

/// The inverse direction, used for formats reported by the surface.
pub trait FromWgpu<T>: Sized {
    fn from_wgpu(value: T) -> Option<Self>;
}

// --- Textures ---

impl IntoWgpu<wgpu::TextureFormat> for TextureFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }
}

impl FromWgpu<wgpu::TextureFormat> for TextureFormat {
    fn from_wgpu(value: wgpu::TextureFormat) -> Option<Self> {
        Some(match value {
            wgpu::TextureFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Rgba8UnormSrgb => TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm => TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb => TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba16Float => TextureFormat::Rgba16Float,
            wgpu::TextureFormat::R32Float => TextureFormat::R32Float,
            wgpu::TextureFormat::Depth32Float => TextureFormat::Depth32Float,
            _ => return None,
        })
    }
}

impl IntoWgpu<wgpu::Extent3d> for Extent3D {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }
}

impl IntoWgpu<wgpu::TextureViewDimension> for TextureViewDimension {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureViewDimension::D2 => wgpu::TextureViewDimension::D2,
            TextureViewDimension::D2Array => wgpu::TextureViewDimension::D2Array,
            TextureViewDimension::Cube => wgpu::TextureViewDimension::Cube,
            TextureViewDimension::CubeArray => wgpu::TextureViewDimension::CubeArray,
        }
    }
}

impl IntoWgpu<wgpu::TextureAspect> for TextureAspect {
    fn into_wgpu(self) -> wgpu::TextureAspect {
        match self {
            TextureAspect::All => wgpu::TextureAspect::All,
            TextureAspect::DepthOnly => wgpu::TextureAspect::DepthOnly,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

// --- Flags ---
// The bit layouts are kept identical to wgpu's, so truncation only drops
// bits wgpu does not know about.

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        wgpu::BufferUsages::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        wgpu::TextureUsages::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::ShaderStages> for ShaderStageFlags {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        let mut stages = wgpu::ShaderStages::NONE;
        if self.contains(ShaderStageFlags::VERTEX) {
            stages |= wgpu::ShaderStages::VERTEX;
        }
        if self.contains(ShaderStageFlags::FRAGMENT) {
            stages |= wgpu::ShaderStages::FRAGMENT;
        }
        if self.contains(ShaderStageFlags::COMPUTE) {
            stages |= wgpu::ShaderStages::COMPUTE;
        }
        stages
    }
}

impl IntoWgpu<wgpu::ColorWrites> for ColorWrites {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        wgpu::ColorWrites::from_bits_truncate(self.bits())
    }
}

// --- Bindings ---

impl IntoWgpu<wgpu::BufferBindingType> for BufferBindingType {
    fn into_wgpu(self) -> wgpu::BufferBindingType {
        match self {
            BufferBindingType::Uniform => wgpu::BufferBindingType::Uniform,
            BufferBindingType::Storage { read_only } => {
                wgpu::BufferBindingType::Storage { read_only }
            }
        }
    }
}

impl IntoWgpu<wgpu::TextureSampleType> for TextureSampleType {
    fn into_wgpu(self) -> wgpu::TextureSampleType {
        match self {
            TextureSampleType::Float { filterable } => wgpu::TextureSampleType::Float { filterable },
            TextureSampleType::Depth => wgpu::TextureSampleType::Depth,
        }
    }
}

impl IntoWgpu<wgpu::SamplerBindingType> for SamplerBindingType {
    fn into_wgpu(self) -> wgpu::SamplerBindingType {
        match self {
            SamplerBindingType::Filtering => wgpu::SamplerBindingType::Filtering,
            SamplerBindingType::NonFiltering => wgpu::SamplerBindingType::NonFiltering,
            SamplerBindingType::Comparison => wgpu::SamplerBindingType::Comparison,
        }
    }
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Sint32x4 => wgpu::VertexFormat::Sint32x4,
        }
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for VertexStepMode {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            VertexStepMode::Vertex => wgpu::VertexStepMode::Vertex,
            VertexStepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl IntoWgpu<wgpu::VertexAttribute> for &VertexAttribute {
    fn into_wgpu(self) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            format: self.format.into_wgpu(),
            offset: self.offset,
            shader_location: self.shader_location,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IntoWgpu<wgpu::PrimitiveState> for PrimitiveState {
    fn into_wgpu(self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: self.topology.into_wgpu(),
            strip_index_format: self.strip_index_format.map(IntoWgpu::into_wgpu),
            front_face: match self.front_face {
                FrontFace::Ccw => wgpu::FrontFace::Ccw,
                FrontFace::Cw => wgpu::FrontFace::Cw,
            },
            cull_mode: self.cull_mode.map(|mode| match mode {
                CullMode::Front => wgpu::Face::Front,
                CullMode::Back => wgpu::Face::Back,
            }),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<wgpu::DepthBiasState> for DepthBiasState {
    fn into_wgpu(self) -> wgpu::DepthBiasState {
        wgpu::DepthBiasState {
            constant: self.constant,
            slope_scale: self.slope_scale,
            clamp: self.clamp,
        }
    }
}

impl IntoWgpu<wgpu::DepthStencilState> for &DepthStencilState {
    fn into_wgpu(self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: self.format.into_wgpu(),
            depth_write_enabled: self.depth_write_enabled,
            depth_compare: self.depth_compare.into_wgpu(),
            stencil: wgpu::StencilState::default(),
            bias: self.bias.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        }
    }
}

impl IntoWgpu<wgpu::BlendComponent> for BlendComponent {
    fn into_wgpu(self) -> wgpu::BlendComponent {
        wgpu::BlendComponent {
            src_factor: self.src_factor.into_wgpu(),
            dst_factor: self.dst_factor.into_wgpu(),
            operation: match self.operation {
                BlendOperation::Add => wgpu::BlendOperation::Add,
                BlendOperation::Max => wgpu::BlendOperation::Max,
            },
        }
    }
}

impl IntoWgpu<wgpu::BlendState> for BlendState {
    fn into_wgpu(self) -> wgpu::BlendState {
        wgpu::BlendState {
            color: self.color.into_wgpu(),
            alpha: self.alpha.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::ColorTargetState> for &ColorTargetState {
    fn into_wgpu(self) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format: self.format.into_wgpu(),
            blend: self.blend.map(IntoWgpu::into_wgpu),
            write_mask: self.write_mask.into_wgpu(),
        }
    }
}

// --- Pass operations ---

impl IntoWgpu<wgpu::Color> for LinearRgba {
    fn into_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

impl IntoWgpu<wgpu::Operations<wgpu::Color>> for Operations<LinearRgba> {
    fn into_wgpu(self) -> wgpu::Operations<wgpu::Color> {
        wgpu::Operations {
            load: match self.load {
                LoadOp::Load => wgpu::LoadOp::Load,
                LoadOp::Clear(color) => wgpu::LoadOp::Clear(color.into_wgpu()),
            },
            store: self.store.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::Operations<f32>> for Operations<f32> {
    fn into_wgpu(self) -> wgpu::Operations<f32> {
        wgpu::Operations {
            load: match self.load {
                LoadOp::Load => wgpu::LoadOp::Load,
                LoadOp::Clear(depth) => wgpu::LoadOp::Clear(depth),
            },
            store: self.store.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::StoreOp> for StoreOp {
    fn into_wgpu(self) -> wgpu::StoreOp {
        match self {
            StoreOp::Store => wgpu::StoreOp::Store,
            StoreOp::Discard => wgpu::StoreOp::Discard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_bits_match_wgpu() {
        let usage = BufferUsage::STORAGE | BufferUsage::COPY_DST;
        assert_eq!(
            usage.into_wgpu(),
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
        );
        let tex = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
        assert_eq!(
            tex.into_wgpu(),
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
        );
        assert_eq!(ColorWrites::ALL.into_wgpu(), wgpu::ColorWrites::ALL);
    }

    #[test]
    fn test_shader_stages() {
        assert_eq!(
            ShaderStageFlags::VERTEX_FRAGMENT.into_wgpu(),
            wgpu::ShaderStages::VERTEX_FRAGMENT
        );
        assert_eq!(
            ShaderStageFlags::COMPUTE.into_wgpu(),
            wgpu::ShaderStages::COMPUTE
        );
    }

    #[test]
    fn test_surface_format_round_trip() {
        let format = TextureFormat::Bgra8UnormSrgb;
        assert_eq!(TextureFormat::from_wgpu(format.into_wgpu()), Some(format));
        assert_eq!(TextureFormat::from_wgpu(wgpu::TextureFormat::Rgb10a2Unorm), None);
    }

    #[test]
    fn test_clear_ops() {
        let ops: wgpu::Operations<f32> = Operations::clear(1.0f32).into_wgpu();
        assert_eq!(ops.load, wgpu::LoadOp::Clear(1.0));
        assert_eq!(ops.store, wgpu::StoreOp::Store);
    }
}
