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

use crate::renderer::api::{
    BarrierScope, BindGroupId, BufferId, CommandBufferId, ComputePassDescriptor,
    ComputePipelineId, IndexFormat, RenderPassDescriptor, RenderPipelineId,
};
use std::ops::Range;

/// An active render pass. The pass ends when the object is dropped.
pub trait RenderPass {
    /// Sets the active render pipeline for subsequent draw calls.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Binds a bind group, with one offset per dynamic binding in its layout.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]);

    /// Binds a vertex buffer to a specific slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64);

    /// Binds an index buffer for indexed drawing.
    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, index_format: IndexFormat);

    /// Records a non-indexed draw call.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Records an indexed draw call.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}

/// An active compute pass. The pass ends when the object is dropped.
pub trait ComputePass {
    fn set_pipeline(&mut self, pipeline: ComputePipelineId);

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]);

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);
}

/// Records a sequence of GPU commands into a command buffer.
///
/// Only one pass can be open at a time since each borrows the encoder
/// mutably.
pub trait CommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder>;

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass + 'encoder>;

    /// Makes writes of every previous pass visible to the passes that follow.
    ///
    /// Must be recorded between passes, never inside one.
    fn memory_barrier(&mut self, scope: BarrierScope);

    /// Finalizes the command recording and returns a handle to the resulting command buffer.
    fn finish(self: Box<Self>) -> CommandBufferId;
}
