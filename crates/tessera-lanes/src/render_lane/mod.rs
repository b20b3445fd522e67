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

//! Scene passes: geometry, forward shading and the final composite.

pub mod composite_lane;
pub mod depth_prepass_lane;
pub mod forward_lane;
pub mod frame_uniforms;
pub mod gbuffer_lane;
pub mod geometry;
pub mod gpu_mesh;
pub mod layouts;
pub mod pipeline;
pub mod scene;
pub mod targets;

pub use composite_lane::{CompositeLane, COMPOSITE_PASS};
pub use depth_prepass_lane::{DepthPrepassLane, DEPTH_PREPASS_PASS};
pub use forward_lane::{ForwardLane, FORWARD_PASS};
pub use frame_uniforms::{FrameInputs, FrameUniformBuffer, FrameUniforms};
pub use gbuffer_lane::{GBufferLane, GBUFFER_PASS, GBUFFER_TARGETS};
pub use gpu_mesh::GpuMesh;
pub use layouts::SharedLayouts;
pub use pipeline::LaneDeps;
pub use scene::{SceneError, SceneMeshes};
pub use targets::{RenderTargets, Target, TargetBinding};

use tessera_core::math::LinearRgba;

/// Backbuffer colour where no geometry was drawn.
pub const BACKGROUND_COLOR: LinearRgba = LinearRgba::rgb(0.10, 0.10, 0.12);

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tessera_core::lane::LaneContext;
    use tessera_core::renderer::shadow::ShadowSettings;
    use tessera_core::renderer::testing::RecordingDevice;
    use tessera_core::renderer::tiled::TiledConfig;
    use tessera_core::renderer::{
        Extent3D, FrameTarget, GraphicsDevice, TextureDescriptor, TextureFormat, TextureId,
        TextureViewDescriptor,
    };

    use super::{FrameUniformBuffer, RenderTargets, SceneMeshes, SharedLayouts};
    use crate::shaders::ShaderLibrary;

    pub const RIG_SIZE: u32 = 64;

    /// A recording device with everything a lane expects around it.
    pub struct TestRig {
        pub device: RecordingDevice,
        pub ctx: LaneContext,
        pub layouts: SharedLayouts,
        pub frame: FrameUniformBuffer,
        pub scene: SceneMeshes,
        pub targets: RenderTargets,
        pub output: FrameTarget,
        output_texture: TextureId,
    }

    impl TestRig {
        pub fn new() -> Self {
            let device = RecordingDevice::default();
            let layouts = SharedLayouts::create(&device).unwrap();
            let mut ctx = LaneContext::new();
            ctx.insert::<Arc<dyn GraphicsDevice>>(Arc::new(device.clone()));
            ctx.insert(Arc::new(ShaderLibrary::embedded()));
            ctx.insert(layouts);
            ctx.insert(TiledConfig::default());
            ctx.insert(ShadowSettings::default());

            let frame = FrameUniformBuffer::new(&device, &layouts).unwrap();
            let scene = SceneMeshes::upload(&device).unwrap();
            let mut targets = RenderTargets::new();
            targets.ensure(&device, RIG_SIZE, RIG_SIZE).unwrap();
            let output_texture = device
                .create_texture(&TextureDescriptor::render_target(
                    "backbuffer",
                    Extent3D::flat(RIG_SIZE, RIG_SIZE),
                    TextureFormat::Bgra8UnormSrgb,
                ))
                .unwrap();
            let color = device
                .create_texture_view(output_texture, &TextureViewDescriptor::default())
                .unwrap();
            Self {
                device,
                ctx,
                layouts,
                frame,
                scene,
                targets,
                output: FrameTarget {
                    color,
                    format: TextureFormat::Bgra8UnormSrgb,
                    width: RIG_SIZE,
                    height: RIG_SIZE,
                },
                output_texture,
            }
        }

        /// Gives back everything the rig created.
        pub fn release(&mut self) {
            self.scene.release(&self.device);
            self.targets.release(&self.device);
            self.frame.release(&self.device);
            self.layouts.release(&self.device);
            let _ = self.device.destroy_texture(self.output_texture);
        }
    }
}
