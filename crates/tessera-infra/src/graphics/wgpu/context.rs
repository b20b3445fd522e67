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


use anyhow::{anyhow, Context, Result};
use tessera_core::platform::TesseraWindowHandle;
use tessera_core::renderer::TextureFormat;

use super::conversions::FromWgpu;

/// The surface-bound half of the `wgpu` state: instance, surface, adapter and
/// the swapchain configuration. Device and queue are shared with
/// [`WgpuDevice`](super::device::WgpuDevice).
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface_format: TextureFormat,
}

impl WgpuGraphicsContext {
    /// Creates the surface for `window`, picks an adapter able to present to
    /// it and configures the swapchain at `size`.
    pub async fn new(window: TesseraWindowHandle, size: (u32, u32)) -> Result<Self> {
        log::info!("Initializing WGPU Graphics Context...");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .context("Failed to create surface")?;
        log::debug!("WGPU surface created for the window.");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No graphics adapter can present to this window")?;

        let info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?}, Driver: {})",
            info.name,
            info.backend,
            info.driver_info
        );

        // Compute-heavy paths only need what the downlevel defaults already
        // guarantee; anything more stays on the adapter's own limits.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Tessera Logical Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {e}"))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e}");
        }));

        let caps = surface.get_capabilities(&adapter);
        let (format, surface_format) = pick_surface_format(&caps.formats)
            .ok_or_else(|| anyhow!("Surface supports none of {:?}", caps.formats))?;
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
            wgpu::PresentMode::Mailbox
        } else {
            wgpu::PresentMode::Fifo
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "Surface configured: {}x{} {:?} {:?}",
            surface_config.width,
            surface_config.height,
            format,
            present_mode
        );

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            surface_format,
        })
    }

    /// Reconfigures the swapchain. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            log::warn!("WGPUGraphicsContext: Ignoring resize request to {width}x{height}");
            return false;
        }
        if (width, height) == self.size() {
            return false;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure();
        true
    }

    /// Applies the current configuration again, after the surface was lost
    /// or went out of date.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}

/// Prefers an sRGB format the renderer knows, then any format it knows.
fn pick_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<(wgpu::TextureFormat, TextureFormat)> {
    let known = || {
        formats
            .iter()
            .filter_map(|&f| TextureFormat::from_wgpu(f).map(|ours| (f, ours)))
    };
    known()
        .find(|(f, _)| f.is_srgb())
        .or_else(|| known().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_srgb() {
        let picked = pick_surface_format(&[
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        assert_eq!(
            picked,
            Some((
                wgpu::TextureFormat::Bgra8UnormSrgb,
                TextureFormat::Bgra8UnormSrgb
            ))
        );
    }

    #[test]
    fn test_skips_unknown_formats() {
        let picked = pick_surface_format(&[
            wgpu::TextureFormat::Rgb10a2Unorm,
            wgpu::TextureFormat::Rgba8Unorm,
        ]);
        assert_eq!(
            picked,
            Some((wgpu::TextureFormat::Rgba8Unorm, TextureFormat::Rgba8Unorm))
        );
        assert_eq!(pick_surface_format(&[wgpu::TextureFormat::Rgb10a2Unorm]), None);
    }
}
