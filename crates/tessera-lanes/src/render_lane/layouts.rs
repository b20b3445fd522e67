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

//! Bind group layouts shared between the lanes of a strategy.
//!
//! Every pass binds the frame uniforms at group 0. Passes that sample
//! shadows bind them at group 3, so groups they leave unused are filled
//! with the empty layout.

use tessera_core::renderer::shadow::ShadowPassUniform;
use tessera_core::renderer::{
    BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindGroupLayoutId, GraphicsDevice, PipelineLayoutDescriptor, PipelineLayoutId, ResourceError,
    SamplerBindingType, ShaderStageFlags, TextureSampleType, TextureViewDimension,
};

/// The bind group index of the shadow sampling resources.
pub const SHADOW_GROUP: u32 = 3;

/// Layout ids created once per strategy and handed to every lane through
/// the lane context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedLayouts {
    /// `FrameUniforms` uniform buffer.
    pub frame: BindGroupLayoutId,
    /// Albedo, normal and linear depth surfaces read by the deferred lighting passes.
    pub surfaces: BindGroupLayoutId,
    /// Light accumulation plus the three surfaces, read by the composite pass.
    pub composite: BindGroupLayoutId,
    /// Packed light array read by the light volumes.
    pub volume_lights: BindGroupLayoutId,
    /// Packed lights, tile meta and tile indices read by tiled shading.
    pub tiled_lights: BindGroupLayoutId,
    /// Shadow uniforms, the three map arrays and the comparison sampler.
    pub shadow: BindGroupLayoutId,
    /// One dynamic view-projection slot per shadow layer.
    pub shadow_pass: BindGroupLayoutId,
    pub empty: BindGroupLayoutId,
}

fn unfilterable(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry::texture(
        binding,
        ShaderStageFlags::FRAGMENT,
        TextureSampleType::Float { filterable: false },
        TextureViewDimension::D2,
    )
}

fn depth_array(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry::texture(
        binding,
        ShaderStageFlags::FRAGMENT,
        TextureSampleType::Depth,
        TextureViewDimension::D2Array,
    )
}

impl SharedLayouts {
    pub fn create(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let mut created = Vec::with_capacity(8);
        let result = Self::create_all(device, &mut created);
        if result.is_err() {
            for id in created {
                let _ = device.destroy_bind_group_layout(id);
            }
        }
        result
    }

    fn create_all(
        device: &dyn GraphicsDevice,
        created: &mut Vec<BindGroupLayoutId>,
    ) -> Result<Self, ResourceError> {
        let mut layout = |label: &str, entries: &[BindGroupLayoutEntry]| {
            let id = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            })?;
            created.push(id);
            Ok::<_, ResourceError>(id)
        };

        let frame = layout(
            "frame",
            &[BindGroupLayoutEntry::uniform(0, ShaderStageFlags::VERTEX_FRAGMENT)],
        )?;
        let surfaces = layout(
            "surfaces",
            &[unfilterable(0), unfilterable(1), unfilterable(2)],
        )?;
        let composite = layout(
            "composite inputs",
            &[unfilterable(0), unfilterable(1), unfilterable(2), unfilterable(3)],
        )?;
        let volume_lights = layout(
            "volume lights",
            &[BindGroupLayoutEntry::storage(0, ShaderStageFlags::VERTEX_FRAGMENT, true)],
        )?;
        let tiled_lights = layout(
            "tiled lights",
            &[
                BindGroupLayoutEntry::storage(0, ShaderStageFlags::FRAGMENT, true),
                BindGroupLayoutEntry::storage(1, ShaderStageFlags::FRAGMENT, true),
                BindGroupLayoutEntry::storage(2, ShaderStageFlags::FRAGMENT, true),
            ],
        )?;
        let shadow = layout(
            "shadow sampling",
            &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::FRAGMENT),
                depth_array(1),
                depth_array(2),
                depth_array(3),
                BindGroupLayoutEntry::sampler(
                    4,
                    ShaderStageFlags::FRAGMENT,
                    SamplerBindingType::Comparison,
                ),
            ],
        )?;
        let shadow_pass = layout(
            "shadow pass",
            &[BindGroupLayoutEntry::dynamic_uniform(
                0,
                ShaderStageFlags::VERTEX,
                std::mem::size_of::<ShadowPassUniform>() as u64,
            )],
        )?;
        let empty = layout("empty", &[])?;

        Ok(Self {
            frame,
            surfaces,
            composite,
            volume_lights,
            tiled_lights,
            shadow,
            shadow_pass,
            empty,
        })
    }

    /// Creates a pipeline layout over `groups`, in group order.
    pub fn pipeline_layout(
        device: &dyn GraphicsDevice,
        label: &str,
        groups: &[BindGroupLayoutId],
    ) -> Result<PipelineLayoutId, ResourceError> {
        device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(label.into()),
            bind_group_layouts: groups,
        })
    }

    /// A bind group of the empty layout for group slots a pass leaves unused.
    pub fn empty_bind_group(
        &self,
        device: &dyn GraphicsDevice,
    ) -> Result<BindGroupId, ResourceError> {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("empty"),
            layout: self.empty,
            entries: &[],
        })
    }

    pub fn release(&self, device: &dyn GraphicsDevice) {
        for id in [
            self.frame,
            self.surfaces,
            self.composite,
            self.volume_lights,
            self.tiled_lights,
            self.shadow,
            self.shadow_pass,
            self.empty,
        ] {
            let _ = device.destroy_bind_group_layout(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::testing::RecordingDevice;

    #[test]
    fn test_create_and_release() {
        let device = RecordingDevice::default();
        let layouts = SharedLayouts::create(&device).unwrap();
        assert_ne!(layouts.frame, layouts.empty);
        assert_eq!(device.live_resource_count(), 8);
        layouts.release(&device);
        assert_eq!(device.live_resource_count(), 0);
    }
}
