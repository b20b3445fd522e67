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

//! CPU-side mesh data and the interleaved vertex layout.

use crate::renderer::api::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::borrow::Cow;

/// Floats per vertex: position, normal, colour.
pub const VERTEX_FLOATS: usize = 9;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

const VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        shader_location: 0,
        format: VertexFormat::Float32x3,
        offset: 0,
    },
    VertexAttribute {
        shader_location: 1,
        format: VertexFormat::Float32x3,
        offset: 12,
    },
    VertexAttribute {
        shader_location: 2,
        format: VertexFormat::Float32x3,
        offset: 24,
    },
];

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color: color.to_array(),
        }
    }

    /// The vertex buffer layout every mesh pipeline uses.
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: Cow::Borrowed(&VERTEX_ATTRIBUTES),
        }
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Appends a quad given its corners in counter-clockwise order.
    pub fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, color: Vec3) {
        let base = self.vertices.len() as u32;
        self.vertices
            .extend(corners.iter().map(|&corner| Vertex::new(corner, normal, color)));
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_nine_tight_floats() {
        assert_eq!(std::mem::size_of::<Vertex>(), VERTEX_FLOATS * 4);
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 36);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn test_push_quad() {
        let mut mesh = MeshData::default();
        assert!(mesh.is_empty());
        mesh.push_quad([Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y], Vec3::Z, Vec3::ONE);
        mesh.push_quad([Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y], Vec3::Z, Vec3::ONE);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(&mesh.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }
}
