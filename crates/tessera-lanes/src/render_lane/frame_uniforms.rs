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

//! Per-frame camera and sun uniforms shared by every scene pass.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};
use tessera_core::renderer::light::{DirectionalLight, LightRanges};
use tessera_core::renderer::tiled::TileGrid;
use tessera_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BufferDescriptor, BufferId, BufferUsage,
    DebugView, GraphicsDevice, ResourceError,
};

use super::layouts::SharedLayouts;

/// GPU layout of `FrameUniforms` in `common.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    pub screen: [f32; 4],
    pub params: [u32; 4],
    pub tiles: [u32; 4],
}

/// Everything a frame's uniforms are derived from.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub view: Mat4,
    pub projection: Mat4,
    pub near: f32,
    pub far: f32,
    pub width: u32,
    pub height: u32,
    pub sun: &'a DirectionalLight,
    pub debug_view: DebugView,
    pub lights: LightRanges,
    /// Tile grid and per-tile capacity on the tiled path.
    pub tiles: Option<(TileGrid, u32)>,
    pub output_srgb: bool,
}

impl FrameUniforms {
    pub fn from_inputs(inputs: &FrameInputs<'_>) -> Self {
        let view_direction = (Mat3::from_mat4(inputs.view) * inputs.sun.direction).normalize_or_zero();
        let (tiles_x, tiles_y, tile_size, max_lights) = inputs
            .tiles
            .map(|(grid, max)| (grid.tiles_x, grid.tiles_y, grid.tile_size, max))
            .unwrap_or((0, 0, 1, 0));
        Self {
            view: inputs.view.to_cols_array_2d(),
            projection: inputs.projection.to_cols_array_2d(),
            view_projection: (inputs.projection * inputs.view).to_cols_array_2d(),
            inverse_projection: inputs.projection.inverse().to_cols_array_2d(),
            light_direction: view_direction.extend(inputs.sun.intensity).to_array(),
            light_color: inputs.sun.color.to_vec4().to_array(),
            ambient: inputs.sun.ambient.to_vec4().to_array(),
            screen: [
                inputs.width as f32,
                inputs.height as f32,
                inputs.near,
                inputs.far,
            ],
            params: [
                inputs.debug_view.index(),
                inputs.lights.point_count,
                inputs.lights.spot_count,
                u32::from(inputs.output_srgb),
            ],
            tiles: [tiles_x, tiles_y, tile_size, max_lights],
        }
    }
}

/// The uniform buffer holding [`FrameUniforms`] and its bind group.
#[derive(Debug)]
pub struct FrameUniformBuffer {
    buffer: BufferId,
    bind_group: BindGroupId,
}

impl FrameUniformBuffer {
    pub fn new(device: &dyn GraphicsDevice, layouts: &SharedLayouts) -> Result<Self, ResourceError> {
        let buffer = device.create_buffer(&BufferDescriptor::writable(
            "frame uniforms",
            std::mem::size_of::<FrameUniforms>() as u64,
            BufferUsage::UNIFORM,
        ))?;
        let bind_group = device
            .create_bind_group(&BindGroupDescriptor {
                label: Some("frame uniforms"),
                layout: layouts.frame,
                entries: &[BindGroupEntry::buffer(0, buffer)],
            })
            .inspect_err(|_| {
                let _ = device.destroy_buffer(buffer);
            })?;
        Ok(Self { buffer, bind_group })
    }

    pub fn write(&self, device: &dyn GraphicsDevice, uniforms: &FrameUniforms) -> Result<(), ResourceError> {
        device.write_buffer(self.buffer, 0, bytemuck::bytes_of(uniforms))
    }

    pub fn bind_group(&self) -> BindGroupId {
        self.bind_group
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn release(&self, device: &dyn GraphicsDevice) {
        let _ = device.destroy_bind_group(self.bind_group);
        let _ = device.destroy_buffer(self.buffer);
    }
}
