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


//! Two-pass compute light culling over screen tiles.
//!
//! `tile_depth_reduce` reduces the prepass depth to one min/max pair per
//! tile. `tile_light_cull` then tests every light sphere against the
//! view-space slab of each tile and writes the surviving indices into the
//! tile's fixed slot of the shared index list. The second pass reads what
//! the first wrote, so a storage barrier has to separate them.

use std::borrow::Cow;
use std::sync::Arc;

use glam::Mat4;
use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::renderer::tiled::{TileCullUniforms, TileGrid, TileMeta, TiledConfig};
use tessera_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindGroupLayoutId, BufferDescriptor, BufferId, BufferUsage,
    CommandEncoder, ComputePassDescriptor, ComputePipelineDescriptor, ComputePipelineId,
    GraphicsDevice, PipelineLayoutId, ResourceError, ShaderStageFlags, TextureSampleType,
    TextureViewDimension,
};

use crate::light_lane::LightBuffer;
use crate::render_lane::{LaneDeps, RenderTargets, Target};
use crate::shaders::ShaderId;

pub const TILE_DEPTH_REDUCE_PASS: &str = "tile_depth_reduce";
pub const TILE_LIGHT_CULL_PASS: &str = "tile_light_cull";

/// Edge of the culling workgroup, in tiles.
const CULL_WORKGROUP: u32 = 8;

/// Workgroups of the culling dispatch for `grid`.
pub fn cull_dispatch(grid: &TileGrid) -> (u32, u32) {
    (
        grid.tiles_x.div_ceil(CULL_WORKGROUP),
        grid.tiles_y.div_ceil(CULL_WORKGROUP),
    )
}

/// The per-resolution buffers of the culler.
#[derive(Debug, Clone, Copy)]
struct TileBuffers {
    uniforms: BufferId,
    depth_ranges: BufferId,
    meta: BufferId,
    indices: BufferId,
}

impl TileBuffers {
    fn ids(&self) -> [BufferId; 4] {
        [self.uniforms, self.depth_ranges, self.meta, self.indices]
    }
}

/// A bind group plus the generations of everything it references.
#[derive(Debug, Default)]
struct KeyedGroup {
    group: Option<BindGroupId>,
    key: (u64, u64),
}

impl KeyedGroup {
    fn current(&self, key: (u64, u64)) -> Option<BindGroupId> {
        self.group.filter(|_| self.key == key)
    }

    fn replace(&mut self, device: &dyn GraphicsDevice, group: BindGroupId, key: (u64, u64)) {
        self.release(device);
        self.group = Some(group);
        self.key = key;
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        if let Some(group) = self.group.take() {
            let _ = device.destroy_bind_group(group);
        }
    }
}

#[derive(Debug, Default)]
struct CullerGpuResources {
    reduce_layout: Option<BindGroupLayoutId>,
    cull_layout: Option<BindGroupLayoutId>,
    pipeline_layouts: Vec<PipelineLayoutId>,
    reduce_pipeline: Option<ComputePipelineId>,
    cull_pipeline: Option<ComputePipelineId>,
    reduce_group: KeyedGroup,
    cull_group: KeyedGroup,
}

/// Builds the per-tile light lists of the tiled path.
#[derive(Debug)]
pub struct TileCuller {
    config: TiledConfig,
    grid: Option<TileGrid>,
    buffers: Option<TileBuffers>,
    generation: u64,
    gpu: CullerGpuResources,
}

impl TileCuller {
    pub fn new(config: TiledConfig) -> Self {
        Self {
            config,
            grid: None,
            buffers: None,
            generation: 0,
            gpu: CullerGpuResources::default(),
        }
    }

    pub fn config(&self) -> TiledConfig {
        self.config
    }

    pub fn grid(&self) -> Option<TileGrid> {
        self.grid
    }

    /// Bumped whenever the tile buffers are reallocated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn meta_buffer(&self) -> Option<BufferId> {
        self.buffers.map(|b| b.meta)
    }

    pub fn index_buffer(&self) -> Option<BufferId> {
        self.buffers.map(|b| b.indices)
    }

    /// Sizes the tile buffers for a `width` x `height` framebuffer.
    ///
    /// Returns `true` when they were (re)allocated. A call with the current
    /// size or a zero size keeps the existing buffers.
    pub fn ensure(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
    ) -> Result<bool, ResourceError> {
        if width == 0 || height == 0 {
            return Ok(false);
        }
        let grid = TileGrid::new(width, height, self.config.tile_size);
        if self.buffers.is_some() && self.grid == Some(grid) {
            return Ok(false);
        }

        self.release_buffers(device);
        let tiles = u64::from(grid.tile_count());
        let max = self.config.max_lights_per_tile;
        let mut created = Vec::with_capacity(4);
        let mut create = |label: &str, size: u64, usage: BufferUsage| {
            let id = device.create_buffer(&BufferDescriptor::writable(label, size, usage))?;
            created.push(id);
            Ok::<_, ResourceError>(id)
        };
        let result = (|| {
            let buffers = TileBuffers {
                uniforms: create(
                    "tile cull uniforms",
                    std::mem::size_of::<TileCullUniforms>() as u64,
                    BufferUsage::UNIFORM,
                )?,
                depth_ranges: create("tile depth ranges", tiles * 8, BufferUsage::STORAGE)?,
                meta: create(
                    "tile meta",
                    tiles * std::mem::size_of::<TileMeta>() as u64,
                    BufferUsage::STORAGE,
                )?,
                indices: create(
                    "tile light indices",
                    tiles * u64::from(max.max(1)) * 4,
                    BufferUsage::STORAGE,
                )?,
            };
            device.write_buffer(
                buffers.meta,
                0,
                bytemuck::cast_slice(&grid.initial_meta(max)),
            )?;
            Ok::<_, ResourceError>(buffers)
        })();
        let buffers = match result {
            Ok(buffers) => buffers,
            Err(err) => {
                for id in created {
                    let _ = device.destroy_buffer(id);
                }
                return Err(err);
            }
        };

        self.buffers = Some(buffers);
        self.grid = Some(grid);
        self.generation += 1;
        log::debug!(
            "TileCuller: {}x{} tiles of {}px for {width}x{height}",
            grid.tiles_x,
            grid.tiles_y,
            grid.tile_size
        );
        Ok(true)
    }

    /// Uploads this frame's culling uniforms and rebuilds the bind groups
    /// whose inputs were reallocated.
    pub fn prepare(
        &mut self,
        device: &dyn GraphicsDevice,
        targets: &RenderTargets,
        lights: &LightBuffer,
        projection: Mat4,
        light_count: u32,
    ) -> Result<(), LaneError> {
        let (Some(grid), Some(buffers)) = (self.grid, self.buffers) else {
            return Err(LaneError::NotInitialized);
        };
        let (Some(reduce_layout), Some(cull_layout)) =
            (self.gpu.reduce_layout, self.gpu.cull_layout)
        else {
            return Err(LaneError::NotInitialized);
        };
        let uniforms = TileCullUniforms::new(
            &grid,
            projection,
            self.config.max_lights_per_tile,
            light_count,
        );
        device
            .write_buffer(buffers.uniforms, 0, bytemuck::bytes_of(&uniforms))
            .map_err(LaneError::execution)?;

        let reduce_key = (targets.generation(), self.generation);
        if self.gpu.reduce_group.current(reduce_key).is_none() {
            let depth = targets.view(Target::Depth).ok_or(LaneError::NotInitialized)?;
            let group = device
                .create_bind_group(&BindGroupDescriptor {
                    label: Some("tile depth reduce"),
                    layout: reduce_layout,
                    entries: &[
                        BindGroupEntry::buffer(0, buffers.uniforms),
                        BindGroupEntry::texture(1, depth),
                        BindGroupEntry::buffer(2, buffers.depth_ranges),
                    ],
                })
                .map_err(LaneError::execution)?;
            self.gpu.reduce_group.replace(device, group, reduce_key);
        }

        let cull_key = (lights.generation(), self.generation);
        if self.gpu.cull_group.current(cull_key).is_none() {
            let light_buffer = lights.buffer().ok_or(LaneError::NotInitialized)?;
            let group = device
                .create_bind_group(&BindGroupDescriptor {
                    label: Some("tile light cull"),
                    layout: cull_layout,
                    entries: &[
                        BindGroupEntry::buffer(0, buffers.uniforms),
                        BindGroupEntry::buffer(1, buffers.depth_ranges),
                        BindGroupEntry::buffer(2, light_buffer),
                        BindGroupEntry::buffer(3, buffers.meta),
                        BindGroupEntry::buffer(4, buffers.indices),
                    ],
                })
                .map_err(LaneError::execution)?;
            self.gpu.cull_group.replace(device, group, cull_key);
        }
        Ok(())
    }

    /// One workgroup per tile.
    pub fn encode_depth_reduce(&self, encoder: &mut dyn CommandEncoder) -> Result<(), LaneError> {
        let (Some(grid), Some(pipeline), Some(group)) =
            (self.grid, self.gpu.reduce_pipeline, self.gpu.reduce_group.group)
        else {
            return Err(LaneError::NotInitialized);
        };
        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some(TILE_DEPTH_REDUCE_PASS),
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, group, &[]);
        pass.dispatch_workgroups(grid.tiles_x, grid.tiles_y, 1);
        Ok(())
    }

    /// One invocation per tile, in 8x8 workgroups.
    pub fn encode_light_cull(&self, encoder: &mut dyn CommandEncoder) -> Result<(), LaneError> {
        let (Some(grid), Some(pipeline), Some(group)) =
            (self.grid, self.gpu.cull_pipeline, self.gpu.cull_group.group)
        else {
            return Err(LaneError::NotInitialized);
        };
        let (x, y) = cull_dispatch(&grid);
        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some(TILE_LIGHT_CULL_PASS),
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, group, &[]);
        pass.dispatch_workgroups(x, y, 1);
        Ok(())
    }

    fn release_buffers(&mut self, device: &dyn GraphicsDevice) {
        self.gpu.reduce_group.release(device);
        self.gpu.cull_group.release(device);
        if let Some(buffers) = self.buffers.take() {
            for id in buffers.ids() {
                let _ = device.destroy_buffer(id);
            }
        }
        self.grid = None;
    }

    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        self.release_buffers(device);
        let gpu = std::mem::take(&mut self.gpu);
        for pipeline in [gpu.reduce_pipeline, gpu.cull_pipeline].into_iter().flatten() {
            let _ = device.destroy_compute_pipeline(pipeline);
        }
        for layout in gpu.pipeline_layouts {
            let _ = device.destroy_pipeline_layout(layout);
        }
        for layout in [gpu.reduce_layout, gpu.cull_layout].into_iter().flatten() {
            let _ = device.destroy_bind_group_layout(layout);
        }
    }

    fn build(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let device = deps.device();
        let mut layout = |label: &str, entries: &[BindGroupLayoutEntry]| {
            device
                .create_bind_group_layout(&BindGroupLayoutDescriptor {
                    label: Some(label),
                    entries,
                })
                .map_err(LaneError::init)
        };
        let compute = ShaderStageFlags::COMPUTE;
        let reduce_layout = layout(
            "tile depth reduce",
            &[
                BindGroupLayoutEntry::uniform(0, compute),
                BindGroupLayoutEntry::texture(
                    1,
                    compute,
                    TextureSampleType::Depth,
                    TextureViewDimension::D2,
                ),
                BindGroupLayoutEntry::storage(2, compute, false),
            ],
        )?;
        self.gpu.reduce_layout = Some(reduce_layout);
        let cull_layout = layout(
            "tile light cull",
            &[
                BindGroupLayoutEntry::uniform(0, compute),
                BindGroupLayoutEntry::storage(1, compute, true),
                BindGroupLayoutEntry::storage(2, compute, true),
                BindGroupLayoutEntry::storage(3, compute, false),
                BindGroupLayoutEntry::storage(4, compute, false),
            ],
        )?;
        self.gpu.cull_layout = Some(cull_layout);

        self.gpu.reduce_pipeline = Some(self.compute_pipeline(
            deps,
            ShaderId::TileDepthReduce,
            TILE_DEPTH_REDUCE_PASS,
            reduce_layout,
        )?);
        self.gpu.cull_pipeline = Some(self.compute_pipeline(
            deps,
            ShaderId::TileLightCull,
            TILE_LIGHT_CULL_PASS,
            cull_layout,
        )?);
        Ok(())
    }

    fn compute_pipeline(
        &mut self,
        deps: &LaneDeps<'_>,
        shader: ShaderId,
        label: &str,
        group: BindGroupLayoutId,
    ) -> Result<ComputePipelineId, LaneError> {
        let layout = deps.pipeline_layout(label, &[group])?;
        self.gpu.pipeline_layouts.push(layout);
        deps.with_module(shader, |module| {
            deps.device.create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(Cow::Borrowed(label)),
                layout: Some(layout),
                module,
                entry_point: Cow::Borrowed("cs_main"),
            })
        })
    }
}

impl Default for TileCuller {
    fn default() -> Self {
        Self::new(TiledConfig::default())
    }
}

impl Lane for TileCuller {
    fn strategy_name(&self) -> &'static str {
        "TileCuller"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Compute
    }

    fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError> {
        let deps = LaneDeps::from_context(ctx)?;
        self.build(&deps).inspect_err(|_| self.release(deps.device()))
    }

    fn on_shutdown(&mut self, ctx: &LaneContext) {
        if let Some(device) = ctx.get::<Arc<dyn GraphicsDevice>>() {
            self.release(device.as_ref());
        }
    }

    fn is_initialized(&self) -> bool {
        self.gpu.reduce_pipeline.is_some() && self.gpu.cull_pipeline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::TestRig;
    use tessera_core::renderer::testing::RecordedCommand;
    use tessera_core::renderer::tiled::TileSize;
    use tessera_core::renderer::GpuLight;

    fn culler(rig: &TestRig, lights: &LightBuffer) -> TileCuller {
        let mut culler = TileCuller::default();
        culler.on_initialize(&rig.ctx).unwrap();
        culler.ensure(&rig.device, 100, 40).unwrap();
        culler
            .prepare(&rig.device, &rig.targets, lights, Mat4::IDENTITY, 3)
            .unwrap();
        culler
    }

    fn light_buffer(rig: &TestRig, count: usize) -> LightBuffer {
        let mut lights = LightBuffer::new();
        lights.upload(&rig.device, &vec![GpuLight::default(); count]).unwrap();
        lights
    }

    #[test]
    fn test_dispatch_sizes() {
        let grid = TileGrid::new(1280, 720, TileSize::X16);
        assert_eq!((grid.tiles_x, grid.tiles_y), (80, 45));
        assert_eq!(cull_dispatch(&grid), (10, 6));
    }

    #[test]
    fn test_buffers_sized_for_grid() {
        let rig = TestRig::new();
        let lights = light_buffer(&rig, 3);
        let culler = culler(&rig, &lights);
        let grid = culler.grid().unwrap();
        assert_eq!((grid.tiles_x, grid.tiles_y), (7, 3));

        let meta = rig.device.buffer(culler.meta_buffer().unwrap()).unwrap();
        assert_eq!(meta.size, 21 * 8);
        let last: TileMeta = bytemuck::pod_read_unaligned(&meta.data[20 * 8..21 * 8]);
        assert_eq!(last, TileMeta { offset: 20 * 128, count: 0 });

        let indices = rig.device.buffer(culler.index_buffer().unwrap()).unwrap();
        assert_eq!(indices.size, 21 * 128 * 4);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let rig = TestRig::new();
        let mut culler = TileCuller::default();
        assert!(culler.ensure(&rig.device, 100, 40).unwrap());
        let allocations = rig.device.buffer_allocations();
        assert!(!culler.ensure(&rig.device, 100, 40).unwrap());
        assert!(!culler.ensure(&rig.device, 0, 40).unwrap());
        assert_eq!(rig.device.buffer_allocations(), allocations);
        assert_eq!(culler.generation(), 1);

        assert!(culler.ensure(&rig.device, 200, 40).unwrap());
        assert_eq!(culler.generation(), 2);
        culler.release(&rig.device);
    }

    #[test]
    fn test_two_passes_with_expected_dispatches() {
        let rig = TestRig::new();
        let lights = light_buffer(&rig, 3);
        let culler = culler(&rig, &lights);
        rig.device.clear_commands();

        let mut encoder = rig.device.create_command_encoder(None);
        culler.encode_depth_reduce(encoder.as_mut()).unwrap();
        culler.encode_light_cull(encoder.as_mut()).unwrap();
        drop(encoder);

        let dispatches: Vec<_> = rig
            .device
            .commands()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    RecordedCommand::Dispatch { .. } | RecordedCommand::BeginComputePass { .. }
                )
            })
            .collect();
        assert_eq!(
            dispatches,
            vec![
                RecordedCommand::BeginComputePass {
                    label: TILE_DEPTH_REDUCE_PASS.into()
                },
                RecordedCommand::Dispatch { x: 7, y: 3, z: 1 },
                RecordedCommand::BeginComputePass {
                    label: TILE_LIGHT_CULL_PASS.into()
                },
                RecordedCommand::Dispatch { x: 1, y: 1, z: 1 },
            ]
        );
    }

    #[test]
    fn test_uniforms_written_on_prepare() {
        let rig = TestRig::new();
        let lights = light_buffer(&rig, 3);
        let culler = culler(&rig, &lights);
        let record = rig.device.buffer(culler.buffers.unwrap().uniforms).unwrap();
        let uniforms: TileCullUniforms = bytemuck::pod_read_unaligned(&record.data);
        assert_eq!(uniforms.screen_size, [100, 40]);
        assert_eq!(uniforms.tile_count, [7, 3]);
        assert_eq!(uniforms.light_count, 3);
        assert_eq!(uniforms.max_lights_per_tile, 128);
    }

    #[test]
    fn test_groups_follow_reallocation() {
        let rig = TestRig::new();
        let mut lights = light_buffer(&rig, 3);
        let mut culler = culler(&rig, &lights);
        let reduce = culler.gpu.reduce_group.group;
        let cull = culler.gpu.cull_group.group;

        lights.upload(&rig.device, &[GpuLight::default(); 5]).unwrap();
        culler
            .prepare(&rig.device, &rig.targets, &lights, Mat4::IDENTITY, 5)
            .unwrap();
        assert_eq!(culler.gpu.reduce_group.group, reduce);
        assert_ne!(culler.gpu.cull_group.group, cull);

        culler.ensure(&rig.device, 64, 64).unwrap();
        let mut encoder = rig.device.create_command_encoder(None);
        assert!(culler.encode_depth_reduce(encoder.as_mut()).is_err());
        drop(encoder);
        culler
            .prepare(&rig.device, &rig.targets, &lights, Mat4::IDENTITY, 5)
            .unwrap();
        assert_ne!(culler.gpu.reduce_group.group, reduce);
    }

    #[test]
    fn test_release_frees_everything() {
        let mut rig = TestRig::new();
        let mut lights = light_buffer(&rig, 3);
        let mut culler = culler(&rig, &lights);
        culler.on_shutdown(&rig.ctx);
        assert!(!culler.is_initialized());
        lights.release(&rig.device);
        rig.release();
        assert_eq!(rig.device.live_resource_count(), 0);
    }

    #[test]
    fn test_failed_meta_seed_frees_new_buffers() {
        let rig = TestRig::new();
        let mut culler = TileCuller::default();
        let live = rig.device.live_buffer_count();
        rig.device.fail_buffer_writes("tile meta");
        assert!(culler.ensure(&rig.device, 100, 40).is_err());
        assert_eq!(rig.device.live_buffer_count(), live);
        assert!(culler.grid().is_none());
        assert!(culler.meta_buffer().is_none());
        assert_eq!(culler.generation(), 0);
    }
}
