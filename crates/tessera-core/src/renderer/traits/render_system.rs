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

use crate::platform::TesseraWindow;
use crate::renderer::api::{TextureFormat, TextureViewId};
use crate::renderer::error::RenderError;
use crate::renderer::traits::{CommandEncoder, GraphicsDevice};

/// The backbuffer a frame renders into.
#[derive(Debug, Clone, Copy)]
pub struct FrameTarget {
    pub color: TextureViewId,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
}

/// Callback recording one frame into the backend's encoder.
pub type FrameEncoderFn<'a> =
    Box<dyn FnOnce(&mut dyn CommandEncoder, &FrameTarget) -> Result<(), RenderError> + 'a>;

/// Owns the presentable surface and the device created for it.
pub trait RenderSystem: std::fmt::Debug {
    /// Creates the device and surface for `window`.
    fn init(&mut self, window: &dyn TesseraWindow) -> Result<(), RenderError>;

    /// Reconfigures the surface. Zero sizes are ignored.
    fn resize(&mut self, new_width: u32, new_height: u32);

    /// Current surface size in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Acquires the backbuffer, lets `encoder_fn` record the frame, submits
    /// the commands and presents.
    fn render_with_encoder(&mut self, encoder_fn: FrameEncoderFn<'_>) -> Result<(), RenderError>;

    /// Returns the device used to create all other GPU resources.
    fn graphics_device(&self) -> Option<Arc<dyn GraphicsDevice>>;

    /// Releases the surface and device.
    fn shutdown(&mut self);
}
