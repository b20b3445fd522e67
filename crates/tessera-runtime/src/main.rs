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


//! Windowed preview: opens a window, picks a render path for the adapter and
//! draws the demo scene until the window closes or Escape is pressed.

use anyhow::Result;
use env_logger::Env;
use tessera_agents::{FrameOutcome, InputResponse, RenderAgent};
use tessera_core::config::RendererConfig;
use tessera_core::platform::TesseraWindow;
use tessera_core::renderer::{CommandEncoder, FrameTarget, RenderSystem};
use tessera_infra::{translate_winit_input, WgpuRenderSystem, WinitWindow, WinitWindowBuilder};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::WindowId;

/// Everything that only exists once the event loop has a window.
struct Running {
    window: WinitWindow,
    renderer: WgpuRenderSystem,
    agent: RenderAgent,
}

struct PreviewApp {
    config: RendererConfig,
    running: Option<Running>,
}

impl PreviewApp {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let window = WinitWindowBuilder::from_config(&self.config.window).build(event_loop)?;
        let mut renderer = WgpuRenderSystem::new();
        renderer.init(&window)?;
        let device = renderer
            .graphics_device()
            .ok_or_else(|| anyhow::anyhow!("render system has no device after init"))?;

        let (width, height) = window.inner_size();
        let agent = RenderAgent::new(device, &self.config, width, height)?;
        window.set_title(&format!("{} [{}]", self.config.window.title, agent.path()));
        Ok(Running {
            window,
            renderer,
            agent,
        })
    }

    fn stop(&mut self) {
        if let Some(mut running) = self.running.take() {
            running.agent.shutdown();
            running.renderer.shutdown();
            log::info!(
                "Preview: presented {} frames",
                running.renderer.frame_count()
            );
        }
    }
}

fn redraw(running: &mut Running) {
    let agent = &mut running.agent;
    let result = running
        .renderer
        .render_with_encoder(Box::new(|encoder: &mut dyn CommandEncoder, target: &FrameTarget| {
            match agent.render_frame(encoder, target) {
                Ok(FrameOutcome::Rendered(_)) => {}
                Ok(FrameOutcome::Skipped) => log::trace!("Preview: frame skipped"),
                Err(e) => log::error!("Preview: frame failed: {e}"),
            }
            Ok(())
        }));
    if let Err(e) = result {
        log::error!("Preview: presenting failed: {e}");
    }
}

impl ApplicationHandler for PreviewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => {
                log::error!("Preview: startup failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if running.window.id() != id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Preview: close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.renderer.resize(size.width, size.height);
                if let Err(e) = running.agent.resize(size.width, size.height) {
                    log::error!("Preview: resize failed: {e}");
                }
            }
            WindowEvent::RedrawRequested => redraw(running),
            other => {
                if let Some(input) = translate_winit_input(&other) {
                    if running.agent.handle_input(&input) == InputResponse::Quit {
                        event_loop.exit();
                    }
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.stop();
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Warn)
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .init();

    let config = RendererConfig::load_default();
    let event_loop = EventLoop::new()?;
    let mut app = PreviewApp::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
