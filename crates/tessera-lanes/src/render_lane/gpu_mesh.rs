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

//! Vertex and index buffers of one mesh.

use std::borrow::Cow;
use tessera_core::renderer::mesh::MeshData;
use tessera_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, IndexFormat, RenderPass,
    ResourceError,
};

/// A mesh resident on the GPU.
///
/// Created empty; [`upload`](Self::upload) fills it and [`release`](Self::release)
/// gives the buffers back. Uploading again replaces the previous buffers.
#[derive(Debug, Default)]
pub struct GpuMesh {
    label: &'static str,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    index_count: u32,
}

impl GpuMesh {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            ..Default::default()
        }
    }

    /// Uploads `mesh`, replacing any previous contents.
    pub fn upload(&mut self, device: &dyn GraphicsDevice, mesh: &MeshData) -> Result<(), ResourceError> {
        self.release(device);
        if mesh.is_empty() {
            log::warn!("GpuMesh: '{}' has no geometry, nothing uploaded", self.label);
            return Ok(());
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);

        let vertex_buffer = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Owned(format!("{} vertices", self.label))),
                size: vertex_bytes.len() as u64,
                usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
                mapped_at_creation: false,
            },
            vertex_bytes,
        )?;
        let index_buffer = match device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Owned(format!("{} indices", self.label))),
                size: index_bytes.len() as u64,
                usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
                mapped_at_creation: false,
            },
            index_bytes,
        ) {
            Ok(id) => id,
            Err(e) => {
                let _ = device.destroy_buffer(vertex_buffer);
                return Err(e);
            }
        };

        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        self.index_count = mesh.indices.len() as u32;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some() && self.index_count > 0
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Records one indexed draw. Does nothing for an invalid mesh.
    pub fn draw(&self, pass: &mut dyn RenderPass) {
        self.draw_instances(pass, 0..1);
    }

    /// Records `count` instances starting at instance 0.
    pub fn draw_instanced(&self, pass: &mut dyn RenderPass, count: u32) {
        self.draw_instances(pass, 0..count);
    }

    /// Records the given instance range. `instance_index` in the shader
    /// starts at `instances.start`.
    pub fn draw_instances(&self, pass: &mut dyn RenderPass, instances: std::ops::Range<u32>) {
        let (Some(vertex_buffer), Some(index_buffer)) = (self.vertex_buffer, self.index_buffer)
        else {
            return;
        };
        if instances.is_empty() {
            return;
        }
        pass.set_vertex_buffer(0, vertex_buffer, 0);
        pass.set_index_buffer(index_buffer, 0, IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }

    /// Destroys the buffers. Safe to call repeatedly.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        for buffer in [self.vertex_buffer.take(), self.index_buffer.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("GpuMesh: Failed to destroy buffer of '{}': {}", self.label, e);
            }
        }
        self.index_count = 0;
    }
}
