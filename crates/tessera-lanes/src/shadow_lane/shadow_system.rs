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

//! Directional, spot and point shadow maps.
//!
//! Every frame follows the same sequence: [`ShadowSystem::begin_frame`],
//! [`ShadowSystem::update_directional`], registration of the local casters
//! (usually by the light packer), [`ShadowSystem::prepare`] and then the
//! `encode_*` calls for the classes `prepare` scheduled.
//!
//! Each class refreshes on its own cadence. A class that skips a frame keeps
//! its maps and the world-space matrices they were rendered with; only the
//! view-to-light composites follow the camera.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use tessera_core::lane::{Lane, LaneContext, LaneError, LaneKind};
use tessera_core::renderer::light::ShadowCast;
use tessera_core::renderer::shadow::{
    refreshes_on, ShadowPassUniform, ShadowSettings, ShadowSlot, ShadowUniforms, MAX_CASCADES,
    MAX_POINT_SHADOWS, MAX_SPOT_SHADOWS, POINT_FACES, UNIFORM_SLOT_ALIGN,
};
use tessera_core::renderer::{
    AddressMode, BindGroupDescriptor, BindGroupEntry, BindGroupId, BufferDescriptor, BufferId,
    BufferUsage, CommandEncoder, CompareFunction, DepthBiasState, DepthStencilState, Extent3D,
    FilterMode, GraphicsDevice, Operations, PipelineLayoutId, RenderPassDepthStencilAttachment,
    RenderPassDescriptor, RenderPipelineId, ResourceError, SamplerDescriptor, SamplerId,
    TextureDescriptor, TextureFormat, TextureId, TextureViewDescriptor, TextureViewId,
};

use super::cascades::{cascade_splits, fit_cascades, Cascade, CascadeInputs};
use super::casters::{point_face_view_projections, spot_view_projection, LocalCaster, ShadowRegistrar};
use crate::render_lane::pipeline::{create_render_pipeline, release_pipelines, LaneDeps, RenderPipelineSpec};
use crate::render_lane::scene::SceneMeshes;
use crate::shaders::ShaderId;

pub const SHADOW_DIRECTIONAL_PASS: &str = "shadow_directional";
pub const SHADOW_SPOT_PASS: &str = "shadow_spot";
pub const SHADOW_POINT_PASS: &str = "shadow_point";

const SPOT_SLOT_BASE: usize = MAX_CASCADES;
const POINT_SLOT_BASE: usize = SPOT_SLOT_BASE + MAX_SPOT_SHADOWS;
const PASS_SLOT_COUNT: usize = POINT_SLOT_BASE + MAX_POINT_SHADOWS * POINT_FACES;
/// Width of the point-light PCF footprint, in texels.
const POINT_DISK_TEXELS: f32 = 2.5;

/// Shadow classes rendered this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowPasses {
    pub directional: bool,
    pub spot: bool,
    pub point: bool,
}

#[derive(Debug, Clone, Copy)]
struct SpotRecord {
    view_projection: Mat4,
    bias: ShadowCast,
}

#[derive(Debug, Clone, Copy)]
struct PointRecord {
    faces: [Mat4; POINT_FACES],
    position: Vec3,
}

/// A depth texture array with one view per layer plus a sampling view.
#[derive(Debug)]
struct LayeredMap {
    texture: TextureId,
    array_view: TextureViewId,
    layer_views: Vec<TextureViewId>,
}

impl LayeredMap {
    fn create(
        device: &dyn GraphicsDevice,
        label: &'static str,
        resolution: u32,
        layers: u32,
    ) -> Result<Self, ResourceError> {
        let texture = device.create_texture(&TextureDescriptor::render_target(
            label,
            Extent3D::layered(resolution, resolution, layers),
            TextureFormat::Depth32Float,
        ))?;
        let views = (|| {
            let array_view =
                device.create_texture_view(texture, &TextureViewDescriptor::array(label))?;
            let layer_views = (0..layers)
                .map(|layer| {
                    device.create_texture_view(texture, &TextureViewDescriptor::layer(label, layer))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, ResourceError>((array_view, layer_views))
        })();
        match views {
            Ok((array_view, layer_views)) => Ok(Self {
                texture,
                array_view,
                layer_views,
            }),
            Err(err) => {
                // Destroying the texture takes its views with it.
                let _ = device.destroy_texture(texture);
                Err(err)
            }
        }
    }

    fn release(self, device: &dyn GraphicsDevice) {
        for view in self.layer_views {
            let _ = device.destroy_texture_view(view);
        }
        let _ = device.destroy_texture_view(self.array_view);
        let _ = device.destroy_texture(self.texture);
    }
}

#[derive(Debug, Default)]
struct ShadowGpuResources {
    layout: Option<PipelineLayoutId>,
    pipeline: Option<RenderPipelineId>,
    cascade_maps: Option<LayeredMap>,
    spot_maps: Option<LayeredMap>,
    point_maps: Option<LayeredMap>,
    sampler: Option<SamplerId>,
    uniforms: Option<BufferId>,
    pass_slots: Option<BufferId>,
    pass_group: Option<BindGroupId>,
    sampling_group: Option<BindGroupId>,
}

/// Owns every shadow map and the data the lighting passes sample them with.
#[derive(Debug)]
pub struct ShadowSystem {
    settings: ShadowSettings,
    enabled: bool,
    gpu: ShadowGpuResources,

    frame: u64,
    frames_begun: u64,
    inverse_view: Mat4,

    pending_cascades: Vec<Cascade>,
    spot_count: usize,
    pending_spots: [Option<SpotRecord>; MAX_SPOT_SHADOWS],
    point_count: usize,
    pending_points: [Option<PointRecord>; MAX_POINT_SHADOWS],

    cascades: Vec<Cascade>,
    spots: Vec<SpotRecord>,
    points: Vec<PointRecord>,
    scheduled: ShadowPasses,
    uniforms: ShadowUniforms,
}

impl ShadowSystem {
    pub fn new(settings: ShadowSettings) -> Self {
        let settings = settings.sanitized();
        Self {
            enabled: settings.enabled,
            settings,
            gpu: ShadowGpuResources::default(),
            frame: 0,
            frames_begun: 0,
            inverse_view: Mat4::IDENTITY,
            pending_cascades: Vec::new(),
            spot_count: 0,
            pending_spots: [None; MAX_SPOT_SHADOWS],
            point_count: 0,
            pending_points: [None; MAX_POINT_SHADOWS],
            cascades: Vec::new(),
            spots: Vec::new(),
            points: Vec::new(),
            scheduled: ShadowPasses::default(),
            uniforms: ShadowUniforms::default(),
        }
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// `false` when shadows are switched off or failed to initialize.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Index of the frame opened by the last [`begin_frame`](Self::begin_frame).
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    /// Builds the depth pipeline and every map.
    ///
    /// The maps, the sampler and the uniform buffer are created even when
    /// shadows are off (at 1x1) so lighting passes can always bind them. A
    /// shader failure disables shadows and is returned; the system stays
    /// usable in its disabled state.
    pub fn init(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let device = deps.device();
        let mut shader_failure = None;
        if self.enabled {
            if let Err(err) = self.create_pipeline(deps) {
                log::error!("ShadowSystem: depth pipeline failed, shadows disabled: {err}");
                release_pipelines(device, [self.gpu.pipeline.take()], [self.gpu.layout.take()]);
                self.enabled = false;
                shader_failure = Some(err);
            }
        }

        if let Err(err) = self.create_resources(deps) {
            self.release(device);
            return Err(err);
        }
        self.write_uniforms(device)?;
        log::info!(
            "ShadowSystem: initialized ({} cascades at {}, spot {}, point {}, enabled {})",
            self.settings.cascade_count,
            self.settings.cascade_resolution,
            self.settings.spot_resolution,
            self.settings.point_resolution,
            self.enabled
        );
        shader_failure.map_or(Ok(()), Err)
    }

    fn create_pipeline(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let layout = deps.pipeline_layout("shadow depth", &[deps.layouts.shadow_pass])?;
        self.gpu.layout = Some(layout);
        let depth = DepthStencilState {
            bias: DepthBiasState {
                constant: self.settings.depth_bias_constant,
                slope_scale: self.settings.depth_bias_slope,
                clamp: 0.0,
            },
            ..DepthStencilState::depth32(true, CompareFunction::LessEqual)
        };
        let pipeline = deps.with_module(ShaderId::ShadowDepth, |module| {
            create_render_pipeline(
                deps.device(),
                module,
                layout,
                &RenderPipelineSpec {
                    label: "shadow depth",
                    vertex_entry: "vs_main",
                    fragment_entry: None,
                    mesh_vertices: true,
                    targets: &[],
                    cull_mode: None,
                    depth: Some(depth),
                },
            )
        })?;
        self.gpu.pipeline = Some(pipeline);
        Ok(())
    }

    fn create_resources(&mut self, deps: &LaneDeps<'_>) -> Result<(), LaneError> {
        let device = deps.device();
        let size = |resolution: u32| if self.enabled { resolution } else { 1 };
        let settings = self.settings;

        self.gpu.cascade_maps = Some(
            LayeredMap::create(
                device,
                "shadow cascades",
                size(settings.cascade_resolution),
                settings.cascade_count,
            )
            .map_err(LaneError::init)?,
        );
        self.gpu.spot_maps = Some(
            LayeredMap::create(
                device,
                "shadow spot",
                size(settings.spot_resolution),
                MAX_SPOT_SHADOWS as u32,
            )
            .map_err(LaneError::init)?,
        );
        self.gpu.point_maps = Some(
            LayeredMap::create(
                device,
                "shadow point",
                size(settings.point_resolution),
                (MAX_POINT_SHADOWS * POINT_FACES) as u32,
            )
            .map_err(LaneError::init)?,
        );

        let sampler = device
            .create_sampler(&SamplerDescriptor {
                label: Some("shadow comparison".into()),
                address_mode: AddressMode::ClampToEdge,
                mag_filter: FilterMode::Linear,
                min_filter: FilterMode::Linear,
                compare: Some(CompareFunction::LessEqual),
            })
            .map_err(LaneError::init)?;
        self.gpu.sampler = Some(sampler);

        let uniforms = device
            .create_buffer(&BufferDescriptor::writable(
                "shadow uniforms",
                std::mem::size_of::<ShadowUniforms>() as u64,
                BufferUsage::UNIFORM,
            ))
            .map_err(LaneError::init)?;
        self.gpu.uniforms = Some(uniforms);

        let pass_slots = device
            .create_buffer(&BufferDescriptor::writable(
                "shadow pass slots",
                PASS_SLOT_COUNT as u64 * UNIFORM_SLOT_ALIGN,
                BufferUsage::UNIFORM,
            ))
            .map_err(LaneError::init)?;
        self.gpu.pass_slots = Some(pass_slots);

        let pass_group = device
            .create_bind_group(&BindGroupDescriptor {
                label: Some("shadow pass"),
                layout: deps.layouts.shadow_pass,
                entries: &[BindGroupEntry::buffer_range(
                    0,
                    pass_slots,
                    0,
                    std::mem::size_of::<ShadowPassUniform>() as u64,
                )],
            })
            .map_err(LaneError::init)?;
        self.gpu.pass_group = Some(pass_group);

        let (Some(cascades), Some(spots), Some(points)) = (
            &self.gpu.cascade_maps,
            &self.gpu.spot_maps,
            &self.gpu.point_maps,
        ) else {
            return Err(LaneError::NotInitialized);
        };
        let sampling_group = device
            .create_bind_group(&BindGroupDescriptor {
                label: Some("shadow sampling"),
                layout: deps.layouts.shadow,
                entries: &[
                    BindGroupEntry::buffer(0, uniforms),
                    BindGroupEntry::texture(1, cascades.array_view),
                    BindGroupEntry::texture(2, spots.array_view),
                    BindGroupEntry::texture(3, points.array_view),
                    BindGroupEntry::sampler(4, sampler),
                ],
            })
            .map_err(LaneError::init)?;
        self.gpu.sampling_group = Some(sampling_group);
        Ok(())
    }

    /// Opens a new frame: caster counts go back to zero.
    pub fn begin_frame(&mut self) {
        self.frame = self.frames_begun;
        self.frames_begun += 1;
        self.spot_count = 0;
        self.point_count = 0;
        self.pending_spots = [None; MAX_SPOT_SHADOWS];
        self.pending_points = [None; MAX_POINT_SHADOWS];
        self.scheduled = ShadowPasses::default();
    }

    fn directional_due(&self) -> bool {
        self.enabled && refreshes_on(self.frame, self.settings.directional_update_every)
    }

    fn spot_due(&self) -> bool {
        self.enabled && refreshes_on(self.frame, self.settings.spot_update_every)
    }

    fn point_due(&self) -> bool {
        self.enabled && refreshes_on(self.frame, self.settings.point_update_every)
    }

    /// Records the camera and refits the cascades when they refresh this frame.
    pub fn update_directional(
        &mut self,
        view: Mat4,
        projection: Mat4,
        light_direction: Vec3,
        near: f32,
        far: f32,
    ) {
        self.inverse_view = view.inverse();
        if !self.directional_due() {
            return;
        }
        let splits = cascade_splits(
            near,
            far,
            self.settings.cascade_count as usize,
            self.settings.split_lambda,
        );
        self.pending_cascades = fit_cascades(
            &CascadeInputs {
                view,
                projection,
                light_direction,
                near,
                far,
            },
            &splits,
            self.settings.cascade_resolution,
            self.settings.z_padding,
        );
    }

    /// Spot casters accepted so far this frame.
    pub fn spot_count(&self) -> usize {
        self.spot_count
    }

    /// Point casters accepted so far this frame.
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Publishes the matrices of the classes that refresh this frame and
    /// uploads the pass slots and shadow uniforms.
    pub fn prepare(&mut self, device: &dyn GraphicsDevice) -> Result<ShadowPasses, LaneError> {
        if self.directional_due() {
            self.cascades = std::mem::take(&mut self.pending_cascades);
        }
        if self.spot_due() {
            self.spots = self.pending_spots.iter().flatten().copied().collect();
        }
        if self.point_due() {
            self.points = self.pending_points.iter().flatten().copied().collect();
        }
        self.scheduled = ShadowPasses {
            directional: self.directional_due() && !self.cascades.is_empty(),
            spot: self.spot_due() && !self.spots.is_empty(),
            point: self.point_due() && !self.points.is_empty(),
        };

        if let Some(pass_slots) = self.gpu.pass_slots {
            let mut slots = [ShadowPassUniform::new(Mat4::IDENTITY); PASS_SLOT_COUNT];
            for (i, cascade) in self.cascades.iter().enumerate() {
                slots[i] = ShadowPassUniform::new(cascade.view_projection);
            }
            for (i, spot) in self.spots.iter().enumerate() {
                slots[SPOT_SLOT_BASE + i] = ShadowPassUniform::new(spot.view_projection);
            }
            for (i, point) in self.points.iter().enumerate() {
                for (face, view_projection) in point.faces.iter().enumerate() {
                    slots[POINT_SLOT_BASE + i * POINT_FACES + face] =
                        ShadowPassUniform::new(*view_projection);
                }
            }
            device
                .write_buffer(pass_slots, 0, bytemuck::cast_slice(&slots))
                .map_err(LaneError::execution)?;
        }
        self.write_uniforms(device)?;
        Ok(self.scheduled)
    }

    fn write_uniforms(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        let settings = &self.settings;
        let inverse_view = self.inverse_view;
        let composite = |world: Mat4| (world * inverse_view).to_cols_array_2d();
        let point_disk = POINT_DISK_TEXELS / settings.point_resolution as f32;

        let mut uniforms = ShadowUniforms {
            inverse_view: inverse_view.to_cols_array_2d(),
            params: [
                settings.bias_min,
                settings.bias_slope,
                settings.pcf_radius as f32,
                point_disk,
            ],
            texel_size: [
                1.0 / settings.cascade_resolution as f32,
                1.0 / settings.spot_resolution as f32,
                1.0 / settings.point_resolution as f32,
                0.0,
            ],
            counts: [
                self.cascades.len() as u32,
                self.spots.len() as u32,
                self.points.len() as u32,
                u32::from(self.enabled),
            ],
            ..ShadowUniforms::default()
        };
        for (i, cascade) in self.cascades.iter().enumerate() {
            uniforms.cascade_view_to_light[i] = composite(cascade.view_projection);
            uniforms.cascade_splits[i] = cascade.split;
        }
        for (i, spot) in self.spots.iter().enumerate() {
            uniforms.spot_view_to_light[i] = composite(spot.view_projection);
            uniforms.spot_bias[i] = [spot.bias.bias_min, spot.bias.bias_slope, 0.0, 0.0];
        }
        for (i, point) in self.points.iter().enumerate() {
            for (face, view_projection) in point.faces.iter().enumerate() {
                uniforms.point_view_to_light[i * POINT_FACES + face] = composite(*view_projection);
            }
            uniforms.set_point_position(ShadowSlot(i), point.position, point_disk);
        }

        self.uniforms = uniforms;
        if let Some(buffer) = self.gpu.uniforms {
            device
                .write_buffer(buffer, 0, bytemuck::bytes_of(&self.uniforms))
                .map_err(LaneError::execution)?;
        }
        Ok(())
    }

    /// The values last uploaded to the shadow uniform buffer.
    pub fn uniforms(&self) -> &ShadowUniforms {
        &self.uniforms
    }

    /// Group 3 of every pass that samples shadows.
    pub fn sampling_group(&self) -> Option<BindGroupId> {
        self.gpu.sampling_group
    }

    pub fn encode_directional(
        &self,
        encoder: &mut dyn CommandEncoder,
        scene: &SceneMeshes,
    ) -> Result<(), LaneError> {
        if !self.scheduled.directional {
            return Ok(());
        }
        let layers = (0..self.cascades.len()).map(|i| (i, i));
        self.encode_layers(
            encoder,
            scene,
            SHADOW_DIRECTIONAL_PASS,
            self.gpu.cascade_maps.as_ref(),
            layers,
        )
    }

    pub fn encode_spot(
        &self,
        encoder: &mut dyn CommandEncoder,
        scene: &SceneMeshes,
    ) -> Result<(), LaneError> {
        if !self.scheduled.spot {
            return Ok(());
        }
        let layers = (0..self.spots.len()).map(|i| (i, SPOT_SLOT_BASE + i));
        self.encode_layers(
            encoder,
            scene,
            SHADOW_SPOT_PASS,
            self.gpu.spot_maps.as_ref(),
            layers,
        )
    }

    pub fn encode_point(
        &self,
        encoder: &mut dyn CommandEncoder,
        scene: &SceneMeshes,
    ) -> Result<(), LaneError> {
        if !self.scheduled.point {
            return Ok(());
        }
        let layers = (0..self.points.len() * POINT_FACES)
            .map(|layer| (layer, POINT_SLOT_BASE + layer));
        self.encode_layers(
            encoder,
            scene,
            SHADOW_POINT_PASS,
            self.gpu.point_maps.as_ref(),
            layers,
        )
    }

    /// One depth-only pass per `(layer, pass slot)` pair.
    fn encode_layers(
        &self,
        encoder: &mut dyn CommandEncoder,
        scene: &SceneMeshes,
        label: &'static str,
        maps: Option<&LayeredMap>,
        layers: impl Iterator<Item = (usize, usize)>,
    ) -> Result<(), LaneError> {
        let (Some(pipeline), Some(pass_group), Some(maps)) =
            (self.gpu.pipeline, self.gpu.pass_group, maps)
        else {
            return Err(LaneError::NotInitialized);
        };
        for (layer, slot) in layers {
            let view = *maps.layer_views.get(layer).ok_or(LaneError::NotInitialized)?;
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(Operations::clear(1.0)),
                }),
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, pass_group, &[(slot as u64 * UNIFORM_SLOT_ALIGN) as u32]);
            scene.draw_casters(pass.as_mut());
        }
        Ok(())
    }

    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        let gpu = std::mem::take(&mut self.gpu);
        for group in [gpu.sampling_group, gpu.pass_group].into_iter().flatten() {
            let _ = device.destroy_bind_group(group);
        }
        for buffer in [gpu.uniforms, gpu.pass_slots].into_iter().flatten() {
            let _ = device.destroy_buffer(buffer);
        }
        if let Some(sampler) = gpu.sampler {
            let _ = device.destroy_sampler(sampler);
        }
        for maps in [gpu.cascade_maps, gpu.spot_maps, gpu.point_maps].into_iter().flatten() {
            maps.release(device);
        }
        release_pipelines(device, [gpu.pipeline], [gpu.layout]);
    }
}

impl ShadowRegistrar for ShadowSystem {
    /// Accepts a spot caster into the next free slot, `None` once
    /// `MAX_SPOT_SHADOWS` casters are taken this frame.
    fn register_spot_shadow(&mut self, caster: &LocalCaster, inverse_view: Mat4) -> Option<ShadowSlot> {
        if !self.enabled || self.spot_count >= MAX_SPOT_SHADOWS {
            return None;
        }
        self.inverse_view = inverse_view;
        let slot = self.spot_count;
        self.spot_count += 1;
        self.pending_spots[slot] = Some(SpotRecord {
            view_projection: spot_view_projection(caster),
            bias: caster.bias,
        });
        Some(ShadowSlot(slot))
    }

    /// Accepts a point caster into the next free slot, `None` once
    /// `MAX_POINT_SHADOWS` casters are taken this frame.
    fn register_point_shadow(&mut self, caster: &LocalCaster) -> Option<ShadowSlot> {
        if !self.enabled || self.point_count >= MAX_POINT_SHADOWS {
            return None;
        }
        let slot = self.point_count;
        self.point_count += 1;
        self.pending_points[slot] = Some(PointRecord {
            faces: point_face_view_projections(caster),
            position: caster.position,
        });
        Some(ShadowSlot(slot))
    }
}

impl Lane for ShadowSystem {
    fn strategy_name(&self) -> &'static str {
        "ShadowSystem"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Shadow
    }

    fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError> {
        let deps = LaneDeps::from_context(ctx)?;
        self.init(&deps)
    }

    fn on_shutdown(&mut self, ctx: &LaneContext) {
        if let Some(device) = ctx.get::<Arc<dyn GraphicsDevice>>() {
            self.release(device.as_ref());
        }
    }

    fn is_initialized(&self) -> bool {
        self.gpu.sampling_group.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::test_support::TestRig;
    use approx::assert_relative_eq;
    use tessera_core::renderer::testing::RecordedCommand;

    fn caster(x: f32) -> LocalCaster {
        LocalCaster {
            position: Vec3::new(x, 4.0, 0.0),
            direction: Vec3::NEG_Y,
            radius: 8.0,
            outer_angle: 25f32.to_radians(),
            bias: ShadowCast {
                bias_min: 0.001,
                bias_slope: 0.004,
            },
        }
    }

    fn view() -> Mat4 {
        Mat4::look_at_rh(Vec3::new(10.0, 10.0, 10.0), Vec3::ZERO, Vec3::Y)
    }

    fn start_frame(shadows: &mut ShadowSystem, view: Mat4) {
        shadows.begin_frame();
        shadows.update_directional(
            view,
            Mat4::orthographic_rh(-16.0, 16.0, -9.0, 9.0, 1.0, 100.0),
            Vec3::new(-0.3, -1.0, -0.4).normalize(),
            1.0,
            100.0,
        );
    }

    fn initialized(rig: &TestRig, settings: ShadowSettings) -> ShadowSystem {
        let mut shadows = ShadowSystem::new(settings);
        shadows.on_initialize(&rig.ctx).unwrap();
        shadows
    }

    #[test]
    fn test_maps_match_settings() {
        let rig = TestRig::new();
        let shadows = initialized(&rig, ShadowSettings::default());
        let cascades = shadows.gpu.cascade_maps.as_ref().unwrap();
        let record = rig.device.texture(cascades.texture).unwrap();
        assert_eq!(record.size, Extent3D::layered(2048, 2048, 3));
        assert_eq!(record.format, TextureFormat::Depth32Float);
        let points = shadows.gpu.point_maps.as_ref().unwrap();
        assert_eq!(points.layer_views.len(), MAX_POINT_SHADOWS * POINT_FACES);
        assert!(shadows.sampling_group().is_some());
        assert_eq!(shadows.uniforms().counts[3], 1);
    }

    #[test]
    fn test_spot_capacity_and_reset() {
        let rig = TestRig::new();
        let mut shadows = initialized(&rig, ShadowSettings::default());
        start_frame(&mut shadows, view());
        let slots: Vec<_> = (0..=MAX_SPOT_SHADOWS)
            .map(|i| shadows.register_spot_shadow(&caster(i as f32), view().inverse()))
            .collect();
        assert_eq!(slots[0], Some(ShadowSlot(0)));
        assert_eq!(slots[MAX_SPOT_SHADOWS - 1], Some(ShadowSlot(MAX_SPOT_SHADOWS - 1)));
        assert_eq!(slots[MAX_SPOT_SHADOWS], None);

        shadows.begin_frame();
        assert_eq!(shadows.spot_count(), 0);
        assert_eq!(shadows.register_spot_shadow(&caster(0.0), view().inverse()), Some(ShadowSlot(0)));
    }

    #[test]
    fn test_point_capacity() {
        let rig = TestRig::new();
        let mut shadows = initialized(&rig, ShadowSettings::default());
        start_frame(&mut shadows, view());
        assert_eq!(shadows.register_point_shadow(&caster(0.0)), Some(ShadowSlot(0)));
        assert_eq!(shadows.register_point_shadow(&caster(1.0)), Some(ShadowSlot(1)));
        assert_eq!(shadows.register_point_shadow(&caster(2.0)), None);
    }

    #[test]
    fn test_one_pass_per_layer_with_dynamic_offsets() {
        let rig = TestRig::new();
        let mut shadows = initialized(&rig, ShadowSettings::default());
        start_frame(&mut shadows, view());
        shadows.register_spot_shadow(&caster(0.0), view().inverse());
        shadows.register_spot_shadow(&caster(1.0), view().inverse());
        shadows.register_point_shadow(&caster(2.0));
        let passes = shadows.prepare(&rig.device).unwrap();
        assert_eq!(
            passes,
            ShadowPasses {
                directional: true,
                spot: true,
                point: true
            }
        );

        let mut encoder = rig.device.create_command_encoder(None);
        shadows.encode_directional(encoder.as_mut(), &rig.scene).unwrap();
        shadows.encode_spot(encoder.as_mut(), &rig.scene).unwrap();
        shadows.encode_point(encoder.as_mut(), &rig.scene).unwrap();
        drop(encoder);

        let labels = rig.device.pass_labels();
        let count = |name: &str| labels.iter().filter(|l| *l == name).count();
        assert_eq!(count(SHADOW_DIRECTIONAL_PASS), 3);
        assert_eq!(count(SHADOW_SPOT_PASS), 2);
        assert_eq!(count(SHADOW_POINT_PASS), POINT_FACES);

        let offsets: Vec<u32> = rig
            .device
            .commands()
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::SetBindGroup { offsets, .. } => offsets.first().copied(),
                _ => None,
            })
            .collect();
        assert_eq!(offsets[3], (SPOT_SLOT_BASE as u64 * UNIFORM_SLOT_ALIGN) as u32);
        assert_eq!(offsets[5], (POINT_SLOT_BASE as u64 * UNIFORM_SLOT_ALIGN) as u32);
        assert_eq!(shadows.uniforms().counts, [3, 2, 1, 1]);
    }

    #[test]
    fn test_empty_classes_are_not_scheduled() {
        let rig = TestRig::new();
        let mut shadows = initialized(&rig, ShadowSettings::default());
        start_frame(&mut shadows, view());
        let passes = shadows.prepare(&rig.device).unwrap();
        assert!(passes.directional);
        assert!(!passes.spot && !passes.point);
    }

    #[test]
    fn test_throttled_spot_keeps_world_matrices() {
        let rig = TestRig::new();
        let settings = ShadowSettings {
            spot_update_every: 2,
            ..Default::default()
        };
        let mut shadows = initialized(&rig, settings);

        start_frame(&mut shadows, view());
        shadows.register_spot_shadow(&caster(0.0), view().inverse());
        assert!(shadows.prepare(&rig.device).unwrap().spot);
        let world = spot_view_projection(&caster(0.0));

        // Frame 1: the caster moved, but spot maps are not refreshed.
        let moved_view = Mat4::look_at_rh(Vec3::new(12.0, 10.0, 8.0), Vec3::ZERO, Vec3::Y);
        start_frame(&mut shadows, moved_view);
        shadows.register_spot_shadow(&caster(3.0), moved_view.inverse());
        let passes = shadows.prepare(&rig.device).unwrap();
        assert!(!passes.spot);
        assert!(passes.directional);

        let expected = world * moved_view.inverse();
        let published = Mat4::from_cols_array_2d(&shadows.uniforms().spot_view_to_light[0]);
        assert_relative_eq!(published, expected, epsilon = 1e-5);
        assert_eq!(shadows.uniforms().counts[1], 1);
    }

    #[test]
    fn test_disabled_rejects_casters_but_binds() {
        let rig = TestRig::new();
        let mut shadows = initialized(
            &rig,
            ShadowSettings {
                enabled: false,
                ..Default::default()
            },
        );
        start_frame(&mut shadows, view());
        assert_eq!(shadows.register_spot_shadow(&caster(0.0), view().inverse()), None);
        assert_eq!(shadows.prepare(&rig.device).unwrap(), ShadowPasses::default());
        assert_eq!(shadows.uniforms().counts[3], 0);
        assert!(shadows.sampling_group().is_some());
        let cascades = shadows.gpu.cascade_maps.as_ref().unwrap();
        assert_eq!(rig.device.texture(cascades.texture).unwrap().size.width, 1);
    }

    #[test]
    fn test_shader_failure_disables_shadows() {
        let rig = TestRig::new();
        rig.device.fail_shader("shadow_depth");
        let mut shadows = ShadowSystem::new(ShadowSettings::default());
        assert!(shadows.on_initialize(&rig.ctx).is_err());
        assert!(!shadows.is_enabled());
        assert!(shadows.sampling_group().is_some());
        assert_eq!(shadows.uniforms().counts[3], 0);
    }

    #[test]
    fn test_release_frees_everything() {
        let mut rig = TestRig::new();
        let mut shadows = initialized(&rig, ShadowSettings::default());
        shadows.on_shutdown(&rig.ctx);
        rig.release();
        assert_eq!(rig.device.live_resource_count(), 0);
    }
}
