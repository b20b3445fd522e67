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


//! Defines the RenderAgent, the frame orchestrator of the renderer.

use std::sync::Arc;
use std::time::Instant;

use tessera_core::config::RendererConfig;
use tessera_core::lane::LaneContext;
use tessera_core::platform::{InputEvent, MouseButton};
use tessera_core::renderer::shadow::ShadowSettings;
use tessera_core::renderer::tiled::TiledConfig;
use tessera_core::renderer::{
    CommandEncoder, DebugView, DirectionalLight, FrameTarget, GraphicsDevice, PassList,
    PathDecision, RenderPath, RenderPathSelector,
};
use tessera_lanes::render_lane::SharedLayouts;
use tessera_lanes::ShaderLibrary;

use super::error::AgentError;
use super::resources::FrameView;
use super::strategy::{strategy_for, RenderStrategy};
use crate::camera::IsoCamera;

/// What the host should do after an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResponse {
    Continue,
    Quit,
}

/// The result of one [`RenderAgent::render_frame`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The frame was recorded following this pass list.
    Rendered(PassList),
    /// The path is not ready; nothing was recorded.
    Skipped,
}

#[derive(Debug, Default)]
struct PointerState {
    middle_down: bool,
    last: Option<(f32, f32)>,
}

/// Owns the lane context, the selected render path and the camera, and
/// drives one strategy through every frame.
///
/// The agent is the single source of truth for the viewport: a resize goes
/// to the camera and to the strategy before the next frame is recorded.
pub struct RenderAgent {
    device: Arc<dyn GraphicsDevice>,
    context: LaneContext,
    layouts: SharedLayouts,
    selector: RenderPathSelector,
    strategy: Box<dyn RenderStrategy>,
    camera: IsoCamera,
    sun: DirectionalLight,
    debug_view: DebugView,
    pointer: PointerState,
    started: Instant,
    frame_count: u64,
    warned_not_ready: bool,
    shut_down: bool,
}

impl RenderAgent {
    /// Selects the render path for `device`, builds its scene and sizes it
    /// for `width` x `height`.
    ///
    /// A path whose scene fails to build leaves the agent unready and every
    /// frame skipped; that is logged, not returned. Only failing to create
    /// the shared bind group layouts is an error.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        config: &RendererConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, AgentError> {
        let layouts = SharedLayouts::create(device.as_ref())?;
        let library = ShaderLibrary::new(config.shader_root.as_deref());

        let mut context = LaneContext::new();
        context.insert::<Arc<dyn GraphicsDevice>>(Arc::clone(&device));
        context.insert(Arc::new(library));
        context.insert(layouts);
        context.insert::<TiledConfig>(config.tiled);
        context.insert::<ShadowSettings>(config.shadows);

        let selector = RenderPathSelector::new();
        let path = selector.select(&device.capabilities(), config.force_path);
        let mut strategy = strategy_for(path, config);
        if let Err(err) = strategy.handle_resize(width, height) {
            log::error!("RenderAgent: sizing {path} failed: {err}");
        }
        match strategy.build_scene(&context) {
            Ok(()) => log::info!("RenderAgent: {path} scene ready at {width}x{height}"),
            Err(err) => log::error!("RenderAgent: {path} scene setup failed: {err}"),
        }

        Ok(Self {
            device,
            context,
            layouts,
            selector,
            strategy,
            camera: IsoCamera::new(width, height),
            sun: DirectionalLight::default(),
            debug_view: DebugView::Final,
            pointer: PointerState::default(),
            started: Instant::now(),
            frame_count: 0,
            warned_not_ready: false,
            shut_down: false,
        })
    }

    pub fn path(&self) -> RenderPath {
        self.strategy.path()
    }

    /// The path decision with the reasons the higher paths were refused.
    pub fn decision(&self) -> Option<&PathDecision> {
        self.selector.decision()
    }

    pub fn is_ready(&self) -> bool {
        !self.shut_down && self.strategy.is_ready()
    }

    pub fn camera(&self) -> &IsoCamera {
        &self.camera
    }

    pub fn debug_view(&self) -> DebugView {
        self.debug_view
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn sun(&self) -> &DirectionalLight {
        &self.sun
    }

    /// Applies one input event to the camera or the debug view.
    pub fn handle_input(&mut self, event: &InputEvent) -> InputResponse {
        if let Some(digit) = event.pressed_digit() {
            if let Some(view) = DebugView::from_index(u32::from(digit)) {
                if view != self.debug_view {
                    log::info!("RenderAgent: debug view {view:?}");
                    self.debug_view = view;
                }
            }
            return InputResponse::Continue;
        }

        match event {
            InputEvent::KeyPressed { key_code } if key_code == "Escape" => {
                return InputResponse::Quit;
            }
            InputEvent::MouseWheelScrolled { delta_y, .. } => {
                if *delta_y > 0.0 {
                    self.camera.zoom_in();
                } else if *delta_y < 0.0 {
                    self.camera.zoom_out();
                }
            }
            InputEvent::MouseButtonPressed {
                button: MouseButton::Middle,
            } => self.pointer.middle_down = true,
            InputEvent::MouseButtonReleased {
                button: MouseButton::Middle,
            } => self.pointer.middle_down = false,
            InputEvent::MouseMoved { x, y } => {
                if let (true, Some((last_x, last_y))) = (self.pointer.middle_down, self.pointer.last)
                {
                    self.camera.drag(x - last_x, y - last_y);
                }
                self.pointer.last = Some((*x, *y));
            }
            _ => {}
        }
        InputResponse::Continue
    }

    /// Propagates a new viewport size. Zero sizes (a minimised window) are
    /// ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), AgentError> {
        if width == 0 || height == 0 {
            log::debug!("RenderAgent: ignoring resize to {width}x{height}");
            return Ok(());
        }
        if self.camera.set_viewport(width, height) {
            log::debug!("RenderAgent: viewport {width}x{height}");
        }
        self.strategy.handle_resize(width, height)
    }

    /// Records a frame animated to the wall-clock time since construction.
    pub fn render_frame(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        output: &FrameTarget,
    ) -> Result<FrameOutcome, AgentError> {
        let time = self.started.elapsed().as_secs_f32();
        self.render_frame_at(encoder, output, time)
    }

    /// Records a frame with the lights animated to `time` seconds.
    pub fn render_frame_at(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        output: &FrameTarget,
        time: f32,
    ) -> Result<FrameOutcome, AgentError> {
        if self.camera.viewport() != (output.width, output.height) {
            self.resize(output.width, output.height)?;
        }
        if !self.is_ready() {
            if !self.warned_not_ready {
                log::warn!("RenderAgent: {} is not ready, skipping frames", self.path());
                self.warned_not_ready = true;
            }
            return Ok(FrameOutcome::Skipped);
        }
        self.warned_not_ready = false;
        self.camera.refresh();

        let (width, height) = self.camera.viewport();
        let view = FrameView {
            view: self.camera.view(),
            projection: self.camera.projection(),
            near: self.camera.near(),
            far: self.camera.far(),
            width,
            height,
            time,
            debug_view: self.debug_view,
            sun: self.sun,
        };
        let passes = self.strategy.render_frame(encoder, &view, output)?;
        self.frame_count += 1;
        log::trace!(
            "RenderAgent: frame {} recorded {} passes",
            self.frame_count,
            passes.len()
        );
        Ok(FrameOutcome::Rendered(passes))
    }

    /// Releases every GPU resource of the path. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.strategy.shutdown(&self.context);
        self.layouts.release(self.device.as_ref());
        self.shut_down = true;
        log::info!("RenderAgent: shut down after {} frames", self.frame_count);
    }
}
