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


use std::sync::Arc;

use tessera_core::platform::TesseraWindow;
use tessera_core::renderer::traits::{FrameEncoderFn, FrameTarget};
use tessera_core::renderer::{GraphicsDevice, RenderError, RenderSystem};

use super::capabilities;
use super::context::WgpuGraphicsContext;
use super::device::WgpuDevice;

/// [`RenderSystem`] backed by a `wgpu` surface.
#[derive(Debug, Default)]
pub struct WgpuRenderSystem {
    context: Option<WgpuGraphicsContext>,
    device: Option<WgpuDevice>,
    frame_count: u64,
}

impl WgpuRenderSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn acquire(&self) -> Result<Option<wgpu::SurfaceTexture>, RenderError> {
        let context = self.context.as_ref().ok_or(RenderError::NotInitialized)?;
        match context.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                log::warn!("WgpuRenderSystem: Surface lost or outdated, reconfiguring.");
                context.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("WgpuRenderSystem: Surface acquisition timed out, skipping frame.");
                Ok(None)
            }
            Err(e) => Err(RenderError::SurfaceAcquisitionFailed(e.to_string())),
        }
    }
}

impl RenderSystem for WgpuRenderSystem {
    fn init(&mut self, window: &dyn TesseraWindow) -> Result<(), RenderError> {
        if self.context.is_some() {
            return Err(RenderError::InitializationFailed(
                "WgpuRenderSystem is already initialized.".to_string(),
            ));
        }
        log::info!("WgpuRenderSystem: Initializing...");

        let context = pollster::block_on(WgpuGraphicsContext::new(
            window.clone_handle_arc(),
            window.inner_size(),
        ))
        .map_err(|e| RenderError::InitializationFailed(format!("{e:#}")))?;

        let info = context.adapter.get_info();
        let caps = capabilities::derive_capabilities(
            info.backend,
            &info.driver_info,
            &context.adapter.get_downlevel_capabilities(),
        );
        log::info!(
            "WgpuRenderSystem: Capability level {} (compute: {}, barriers: {})",
            caps.version,
            caps.compute_dispatch,
            caps.memory_barrier
        );

        self.device = Some(WgpuDevice::new(
            context.device.clone(),
            context.queue.clone(),
            capabilities::adapter_info(&info),
            caps,
            Some(context.surface_format),
        ));
        self.context = Some(context);
        Ok(())
    }

    fn resize(&mut self, new_width: u32, new_height: u32) {
        if let Some(context) = self.context.as_mut() {
            if context.resize(new_width, new_height) {
                log::info!("WgpuRenderSystem: Surface resized to {new_width}x{new_height}");
            }
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.context
            .as_ref()
            .map(WgpuGraphicsContext::size)
            .unwrap_or((0, 0))
    }

    fn render_with_encoder(&mut self, encoder_fn: FrameEncoderFn<'_>) -> Result<(), RenderError> {
        let device = self.device.clone().ok_or(RenderError::NotInitialized)?;
        let Some(frame) = self.acquire()? else {
            return Ok(());
        };

        let (width, height) = self.surface_size();
        let format = device
            .surface_format()
            .ok_or(RenderError::NotInitialized)?;
        let view = device.register_external_view(&frame.texture, "Swapchain View")?;
        let target = FrameTarget {
            color: view,
            format,
            width,
            height,
        };

        let mut encoder = device.create_command_encoder(Some("Tessera Frame Encoder"));
        let recorded = encoder_fn(encoder.as_mut(), &target);
        let command_buffer = encoder.finish();

        // The swapchain view only lives for this frame.
        if let Err(e) = device.destroy_texture_view(view) {
            log::warn!("WgpuRenderSystem: Failed to release swapchain view: {e}");
        }
        // The acquired image is presented even when recording failed.
        device.submit_command_buffer(command_buffer);
        frame.present();
        self.frame_count += 1;
        recorded
    }

    fn graphics_device(&self) -> Option<Arc<dyn GraphicsDevice>> {
        self.device
            .clone()
            .map(|device| Arc::new(device) as Arc<dyn GraphicsDevice>)
    }

    fn shutdown(&mut self) {
        log::info!("WgpuRenderSystem shutting down...");
        if let Some(device) = self.device.take() {
            let leaked = device.live_resource_count();
            if leaked > 0 {
                log::warn!("WgpuRenderSystem: {leaked} GPU resources still alive at shutdown.");
            }
            device.clear();
        }
        self.context = None;
    }
}
