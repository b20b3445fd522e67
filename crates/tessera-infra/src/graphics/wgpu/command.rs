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


use std::ops::Range;
use std::sync::Arc;

use tessera_core::renderer::api::{
    BarrierScope, BindGroupId, BufferId, CommandBufferId, ComputePassDescriptor,
    ComputePipelineId, IndexFormat, RenderPassDescriptor, RenderPipelineId,
};
use tessera_core::renderer::traits::{CommandEncoder, ComputePass, RenderPass};

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;

pub struct WgpuRenderPass<'a> {
    pass: wgpu::RenderPass<'a>,
    device: &'a WgpuDevice,
}

impl RenderPass for WgpuRenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        match self.device.render_pipeline(pipeline) {
            Some(pipeline) => self.pass.set_pipeline(&pipeline),
            None => log::warn!("WgpuRenderPass: RenderPipelineId {pipeline:?} not found."),
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]) {
        match self.device.bind_group(bind_group) {
            Some(group) => self.pass.set_bind_group(index, group.as_ref(), offsets),
            None => log::warn!("WgpuRenderPass: BindGroupId {bind_group:?} not found."),
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64) {
        match self.device.buffer(buffer) {
            Some(raw) => self.pass.set_vertex_buffer(slot, raw.slice(offset..)),
            None => log::warn!("WgpuRenderPass: Vertex BufferId {buffer:?} not found."),
        }
    }

    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, index_format: IndexFormat) {
        match self.device.buffer(buffer) {
            Some(raw) => self
                .pass
                .set_index_buffer(raw.slice(offset..), index_format.into_wgpu()),
            None => log::warn!("WgpuRenderPass: Index BufferId {buffer:?} not found."),
        }
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }
}

pub struct WgpuComputePass<'a> {
    pass: wgpu::ComputePass<'a>,
    device: &'a WgpuDevice,
}

impl ComputePass for WgpuComputePass<'_> {
    fn set_pipeline(&mut self, pipeline: ComputePipelineId) {
        match self.device.compute_pipeline(pipeline) {
            Some(pipeline) => self.pass.set_pipeline(&pipeline),
            None => log::warn!("WgpuComputePass: ComputePipelineId {pipeline:?} not found."),
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId, offsets: &[u32]) {
        match self.device.bind_group(bind_group) {
            Some(group) => self.pass.set_bind_group(index, group.as_ref(), offsets),
            None => log::warn!("WgpuComputePass: BindGroupId {bind_group:?} not found."),
        }
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.pass.dispatch_workgroups(x, y, z);
    }
}

/// Records into a `wgpu::CommandEncoder`, resolving abstract ids through
/// the device that created it.
pub struct WgpuCommandEncoder {
    encoder: wgpu::CommandEncoder,
    device: WgpuDevice,
}

impl WgpuCommandEncoder {
    pub(crate) fn new(encoder: wgpu::CommandEncoder, device: WgpuDevice) -> Self {
        Self { encoder, device }
    }
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        // Views are resolved up front; the pass only needs them while it is
        // being opened.
        let color_views: Vec<Option<Arc<wgpu::TextureView>>> = descriptor
            .color_attachments
            .iter()
            .map(|attachment| {
                let view = self.device.texture_view(attachment.view);
                if view.is_none() {
                    log::warn!(
                        "WgpuCommandEncoder: color attachment {:?} not found in pass {:?}.",
                        attachment.view,
                        descriptor.label
                    );
                }
                view
            })
            .collect();
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = descriptor
            .color_attachments
            .iter()
            .zip(&color_views)
            .map(|(attachment, view)| {
                view.as_ref().map(|view| wgpu::RenderPassColorAttachment {
                    view: view.as_ref(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: attachment.ops.into_wgpu(),
                })
            })
            .collect();

        let depth_view = descriptor
            .depth_stencil_attachment
            .as_ref()
            .and_then(|attachment| self.device.texture_view(attachment.view));
        let depth_stencil_attachment = descriptor
            .depth_stencil_attachment
            .as_ref()
            .zip(depth_view.as_ref())
            .map(|(attachment, view)| wgpu::RenderPassDepthStencilAttachment {
                view: view.as_ref(),
                depth_ops: attachment.depth_ops.map(IntoWgpu::into_wgpu),
                stencil_ops: None,
            });

        let pass = self
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: descriptor.label,
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                ..Default::default()
            });

        Box::new(WgpuRenderPass {
            pass,
            device: &self.device,
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass + 'encoder> {
        let pass = self
            .encoder
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: descriptor.label,
                timestamp_writes: None,
            });
        Box::new(WgpuComputePass {
            pass,
            device: &self.device,
        })
    }

    fn memory_barrier(&mut self, scope: BarrierScope) {
        // wgpu tracks resource usage between passes and inserts the matching
        // pipeline barriers on submission.
        log::trace!("WgpuCommandEncoder: memory barrier ({scope:?})");
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let Self { encoder, device } = *self;
        device.register_command_buffer(encoder.finish())
    }
}
